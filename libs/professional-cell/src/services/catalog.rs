use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::scheduling::Service;

use crate::error::ProfessionalError;
use crate::services::ownership::require_owner;

pub struct CatalogService {
    store: Arc<dyn SchedulingStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Active services offered by a professional.
    pub async fn get_services(&self, professional_id: Uuid) -> Result<Vec<Service>, ProfessionalError> {
        Ok(self.store.list_active_services(professional_id).await?)
    }

    /// Soft-delete: the service disappears from the catalog and can no longer
    /// be booked, existing appointments keep referencing it.
    pub async fn deactivate_service(
        &self,
        actor: &Actor,
        professional_id: Uuid,
        service_id: Uuid,
    ) -> Result<(), ProfessionalError> {
        require_owner(self.store.as_ref(), actor, professional_id).await?;

        self.store.deactivate_service(professional_id, service_id).await?;

        info!("Service {} deactivated by professional {}", service_id, professional_id);
        Ok(())
    }
}
