//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the reservation endpoints and the master
//! definition for the OpenAPI specification.

use crate::{error::ApiError, web::state::AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use booking_core::{Reservation, ReservationRequest};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_reservation_handler,
        list_reservations_handler,
        disabled_dates_handler,
        class_disabled_dates_handler,
        disabled_time_slots_handler,
    ),
    components(
        schemas(
            CreateReservationRequest,
            CreateReservationResponse,
            ReservationResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Glass Class Booking API", description = "Reservation calendar and booking endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Body of a booking request. Every field is optional at the wire level so that
/// missing fields are reported with a readable message.
#[derive(Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub class_id: Option<i64>,
    /// `YYYY-MM-DD`
    pub reservation_date: Option<String>,
    /// One of `10:00:00`, `12:00:00`, `14:00:00`, `16:00:00`
    pub reservation_time: Option<String>,
}

impl From<CreateReservationRequest> for ReservationRequest {
    fn from(body: CreateReservationRequest) -> Self {
        ReservationRequest {
            class_id: body.class_id,
            reservation_date: body.reservation_date,
            reservation_time: body.reservation_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub class_id: i64,
    pub user_id: Uuid,
    pub reservation_date: NaiveDate,
    pub reservation_time: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            class_id: r.class_id,
            user_id: r.user_id,
            reservation_date: r.date,
            reservation_time: r.time_slot.to_string(),
            status: r.status.as_str().to_string(),
            created_at: r.created_at,
        }
    }
}

/// The response payload sent after successfully booking a slot.
#[derive(Serialize, ToSchema)]
pub struct CreateReservationResponse {
    pub message: String,
    pub reservation: ReservationResponse,
}

/// Shape of every error body.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReservationsParams {
    pub class_id: Option<i64>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DisabledTimeSlotsParams {
    /// `YYYY-MM-DD`
    pub selected_date: Option<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Book one slot of a class for the authenticated user.
#[utoipa::path(
    post,
    path = "/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = CreateReservationResponse),
        (status = 400, description = "Invalid request, unavailable date/time or duplicate booking", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "Unknown class", body = ErrorResponse)
    )
)]
pub async fn create_reservation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let reservation = app_state
        .allocator
        .create_reservation(user_id, body.into())
        .await?;

    let response = CreateReservationResponse {
        message: "Reservation created successfully".to_string(),
        reservation: reservation.into(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List a class's reservations inside the current booking horizon.
#[utoipa::path(
    get,
    path = "/reservations",
    params(ListReservationsParams),
    responses(
        (status = 200, description = "Reservations of the class", body = Vec<ReservationResponse>),
        (status = 400, description = "class_id missing or malformed", body = ErrorResponse),
        (status = 404, description = "Unknown class", body = ErrorResponse)
    )
)]
pub async fn list_reservations_handler(
    State(app_state): State<Arc<AppState>>,
    params: Result<Query<ListReservationsParams>, QueryRejection>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let reservations = app_state.query.list_reservations(params.class_id).await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// Dates in the horizon that cannot be booked for any class.
#[utoipa::path(
    get,
    path = "/reservations/disabled-dates",
    responses(
        (status = 200, description = "Closed or fully booked dates", body = Vec<NaiveDate>)
    )
)]
pub async fn disabled_dates_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    Ok(Json(app_state.query.disabled_dates().await?))
}

/// Dates in the horizon that cannot be booked for one class.
#[utoipa::path(
    get,
    path = "/classes/{class_id}/disabled-dates",
    params(
        ("class_id" = i64, Path, description = "Id of the class.")
    ),
    responses(
        (status = 200, description = "Closed dates and dates this class has filled", body = Vec<NaiveDate>),
        (status = 404, description = "Unknown class", body = ErrorResponse)
    )
)]
pub async fn class_disabled_dates_handler(
    State(app_state): State<Arc<AppState>>,
    class_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    let Path(class_id) = class_id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(app_state.query.disabled_dates_for_class(class_id).await?))
}

/// Time slots on a date that are already booked or too close to start.
#[utoipa::path(
    get,
    path = "/reservations/disabled-time-slots",
    params(DisabledTimeSlotsParams),
    responses(
        (status = 200, description = "Unavailable `HH:MM:SS` slots", body = Vec<String>),
        (status = 400, description = "selected_date missing or malformed", body = ErrorResponse)
    )
)]
pub async fn disabled_time_slots_handler(
    State(app_state): State<Arc<AppState>>,
    params: Result<Query<DisabledTimeSlotsParams>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let slots = app_state
        .query
        .disabled_time_slots(params.selected_date.as_deref())
        .await?;
    Ok(Json(slots.into_iter().map(|s| s.to_string()).collect()))
}

/// Serves the generated OpenAPI document.
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
