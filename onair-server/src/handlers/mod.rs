pub mod jobs;
pub mod license;
pub mod schedules;
pub mod sessions;
