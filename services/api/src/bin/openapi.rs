//! services/api/src/bin/openapi.rs
//!
//! Dumps the booking API document for client generation.
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let doc = ApiDoc::openapi();
    let routes: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
    std::fs::write(&output, doc.to_pretty_json()?)?;

    println!("Wrote {} ({} routes)", output.display(), routes.len());
    for route in routes {
        println!("  {}", route);
    }
    Ok(())
}
