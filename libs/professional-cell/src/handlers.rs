use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{SetAvailabilityRequest, SlotQuery};
use crate::services::{AvailabilityService, CatalogService, SlotService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(store): State<Arc<dyn SchedulingStore>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slot_service = SlotService::new(store);

    let slots = slot_service
        .get_available_slots(professional_id, query.service_id, query.date)
        .await?;

    Ok(Json(json!({
        "slots": slots,
        "professional_id": professional_id,
        "service_id": query.service_id,
        "date": query.date,
        "total_slots": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_availabilities(
    State(store): State<Arc<dyn SchedulingStore>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(store);

    let availabilities = availability_service.get_weekly_availability(professional_id).await?;

    Ok(Json(json!({
        "availabilities": availabilities,
        "professional_id": professional_id
    })))
}

#[axum::debug_handler]
pub async fn get_services(
    State(store): State<Arc<dyn SchedulingStore>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(store);

    let services = catalog.get_services(professional_id).await?;

    Ok(Json(json!({
        "services": services,
        "professional_id": professional_id
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_availabilities(
    State(store): State<Arc<dyn SchedulingStore>>,
    Path(professional_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(store);

    let availabilities = availability_service
        .set_weekly_availability(&actor, professional_id, request.availabilities)
        .await?;

    Ok(Json(json!({
        "availabilities": availabilities,
        "professional_id": professional_id,
        "message": "Weekly availability updated"
    })))
}

#[axum::debug_handler]
pub async fn deactivate_service(
    State(store): State<Arc<dyn SchedulingStore>>,
    Path((professional_id, service_id)): Path<(Uuid, Uuid)>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(store);

    catalog.deactivate_service(&actor, professional_id, service_id).await?;

    Ok(Json(json!({
        "service_id": service_id,
        "is_active": false,
        "message": "Service deactivated"
    })))
}
