// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_models::scheduling::ActorRole;

use crate::models::{CreateAppointmentRequest, UpdateStatusRequest};
use crate::services::AppointmentServices;

#[axum::debug_handler]
pub async fn book_appointment(
    State(services): State<Arc<AppointmentServices>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Only clients book, and always for themselves
    if actor.role != ActorRole::Client {
        warn!("{} {} attempted to book an appointment", actor.role, actor.id);
        return Err(AppError::Forbidden("Only clients can book appointments".to_string()));
    }

    let appointment = services.booking.create_appointment(actor.id, request).await?;
    let view = services
        .queries
        .hydrate(vec![appointment])
        .await?
        .into_iter()
        .next();

    Ok(Json(json!({
        "appointment": view,
        "message": "Appointment booked"
    })))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(services): State<Arc<AppointmentServices>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let appointments = services.queries.my_appointments(&actor).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(services): State<Arc<AppointmentServices>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let updated = services
        .lifecycle
        .update_status(&actor, appointment_id, &request.status)
        .await?;
    let view = services.queries.hydrate(vec![updated]).await?.into_iter().next();

    Ok(Json(json!({
        "appointment": view,
        "message": "Appointment status updated"
    })))
}

#[axum::debug_handler]
pub async fn get_dashboard_stats(
    State(services): State<Arc<AppointmentServices>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let stats = services
        .queries
        .dashboard_stats(&actor, Local::now().naive_local())
        .await?;

    Ok(Json(json!(stats)))
}
