use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::database::{
    InMemoryStore, PostgresDatabase,
    repository_ports::{
        JobRepository, LicenseRepository, RunnerLockRepository,
        ScheduleRepository, SessionRepository,
    },
};

/// Aggregates the repository ports used by the control-plane services.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub runner_lock: Arc<dyn RunnerLockRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub licenses: Arc<dyn LicenseRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("runner_lock", &type_name_of_val(self.runner_lock.as_ref()))
            .field("schedules", &type_name_of_val(self.schedules.as_ref()))
            .field("sessions", &type_name_of_val(self.sessions.as_ref()))
            .field("licenses", &type_name_of_val(self.licenses.as_ref()))
            .field("jobs", &type_name_of_val(self.jobs.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    pub fn from_postgres(db: &PostgresDatabase) -> Self {
        Self {
            runner_lock: Arc::new(db.runner_lock_repository()),
            schedules: Arc::new(db.schedule_repository()),
            sessions: Arc::new(db.session_repository()),
            licenses: Arc::new(db.license_repository()),
            jobs: Arc::new(db.job_repository()),
        }
    }

    /// Every port backed by the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            runner_lock: store.clone(),
            schedules: store.clone(),
            sessions: store.clone(),
            licenses: store.clone(),
            jobs: store,
        }
    }
}
