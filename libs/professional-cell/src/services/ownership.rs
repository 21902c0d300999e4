use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::scheduling::{ActorRole, Professional};

use crate::error::ProfessionalError;

/// Resolve `professional_id` and check that `actor` is the account behind it.
pub async fn require_owner(
    store: &dyn SchedulingStore,
    actor: &Actor,
    professional_id: uuid::Uuid,
) -> Result<Professional, ProfessionalError> {
    if actor.role != ActorRole::Professional {
        return Err(ProfessionalError::Forbidden(
            "Only professionals can manage their profile".to_string(),
        ));
    }

    let professional = store
        .get_professional(professional_id)
        .await?
        .ok_or_else(|| ProfessionalError::NotFound(format!("Professional {}", professional_id)))?;

    if professional.user_id != actor.id {
        return Err(ProfessionalError::Forbidden(
            "You can only manage your own professional profile".to_string(),
        ));
    }

    Ok(professional)
}
