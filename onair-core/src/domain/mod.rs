pub mod jobs;
pub mod license;
pub mod runner;
pub mod sessions;
