use std::{fmt, sync::Arc};

use onair_core::{
    AppUnitOfWork, Clock, SecretHasher,
    domain::{
        jobs::DowngradeCascade,
        license::{LicenseManager, LicensePolicy},
        sessions::SessionService,
    },
};

/// Shared handles for the HTTP handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    unit_of_work: Arc<AppUnitOfWork>,
    licenses: Arc<LicenseManager>,
    cascade: DowngradeCascade,
    sessions: SessionService,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        unit_of_work: AppUnitOfWork,
        clock: Arc<dyn Clock>,
        hasher: SecretHasher,
        policy: LicensePolicy,
    ) -> Self {
        let cascade = DowngradeCascade::new(unit_of_work.jobs.clone(), clock.clone())
            .with_max_attempts(policy.cascade_attempts);
        let licenses = LicenseManager::new(
            unit_of_work.licenses.clone(),
            cascade.clone(),
            Arc::new(hasher),
            clock.clone(),
            policy,
        );
        let sessions = SessionService::new(
            unit_of_work.jobs.clone(),
            unit_of_work.schedules.clone(),
            unit_of_work.sessions.clone(),
            clock,
        );

        Self {
            unit_of_work: Arc::new(unit_of_work),
            licenses: Arc::new(licenses),
            cascade,
            sessions,
        }
    }

    pub fn unit_of_work(&self) -> &Arc<AppUnitOfWork> {
        &self.unit_of_work
    }

    pub fn licenses(&self) -> &LicenseManager {
        &self.licenses
    }

    pub fn cascade(&self) -> &DowngradeCascade {
        &self.cascade
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }
}
