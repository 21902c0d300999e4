// libs/appointment-cell/src/services/query.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::scheduling::{ActorRole, Appointment, AppointmentStatus};

use crate::models::{
    AppointmentError, AppointmentView, DashboardStats, ProfessionalSummary, ServiceSummary,
};

pub struct AppointmentQueryService {
    store: Arc<dyn SchedulingStore>,
}

impl AppointmentQueryService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// The actor's appointments, newest start first.
    pub async fn my_appointments(&self, actor: &Actor) -> Result<Vec<AppointmentView>, AppointmentError> {
        let mut appointments = match actor.role {
            ActorRole::Client => self.store.list_client_appointments(actor.id).await?,
            ActorRole::Professional => match self.store.find_professional_by_user(actor.id).await? {
                Some(professional) => self.store.list_professional_appointments(professional.id).await?,
                None => Vec::new(),
            },
        };

        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        self.hydrate(appointments).await
    }

    /// Resolve related records with one store call per record kind.
    pub async fn hydrate(&self, appointments: Vec<Appointment>) -> Result<Vec<AppointmentView>, AppointmentError> {
        if appointments.is_empty() {
            return Ok(Vec::new());
        }

        let professional_ids = distinct(appointments.iter().map(|a| a.professional_id));
        let service_ids = distinct(appointments.iter().map(|a| a.service_id));

        let professionals: HashMap<Uuid, _> = self
            .store
            .get_professionals(&professional_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let user_ids = distinct(
            appointments
                .iter()
                .map(|a| a.client_id)
                .chain(professionals.values().map(|p| p.user_id)),
        );
        let users: HashMap<Uuid, _> = self
            .store
            .get_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let services: HashMap<Uuid, _> = self
            .store
            .get_services(&service_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        debug!(
            "Hydrating {} appointments ({} professionals, {} users, {} services)",
            appointments.len(),
            professionals.len(),
            users.len(),
            services.len()
        );

        Ok(appointments
            .into_iter()
            .map(|apt| {
                let client = users.get(&apt.client_id);
                let professional = professionals
                    .get(&apt.professional_id)
                    .map(|p| ProfessionalSummary::new(p, users.get(&p.user_id)));

                AppointmentView {
                    id: apt.id,
                    client_id: apt.client_id,
                    client_name: client.map(|c| c.full_name()).unwrap_or_default(),
                    client_phone: client.and_then(|c| c.phone.clone()),
                    professional,
                    service: services.get(&apt.service_id).map(ServiceSummary::from),
                    start_time: apt.start_time,
                    end_time: apt.end_time,
                    status: apt.status,
                    notes: apt.notes,
                }
            })
            .collect())
    }

    /// Counts over the professional's non-cancelled appointments.
    pub async fn dashboard_stats(&self, actor: &Actor, now: NaiveDateTime) -> Result<DashboardStats, AppointmentError> {
        if actor.role != ActorRole::Professional {
            return Err(AppointmentError::Forbidden(
                "Only professionals have a dashboard".to_string(),
            ));
        }

        let professional = self
            .store
            .find_professional_by_user(actor.id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound("Professional profile".to_string()))?;

        let appointments = self.store.list_professional_appointments(professional.id).await?;
        let today = now.date();

        Ok(appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .fold(DashboardStats::default(), |mut stats, apt| {
                stats.total += 1;
                if apt.start_time.date() == today {
                    stats.today += 1;
                }
                if apt.start_time > now {
                    stats.upcoming += 1;
                }
                if apt.status == AppointmentStatus::Completed {
                    stats.completed += 1;
                }
                stats
            }))
    }
}

fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    ids.collect::<HashSet<_>>().into_iter().collect()
}
