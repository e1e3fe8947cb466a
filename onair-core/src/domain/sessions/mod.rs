pub mod error;
pub mod service;

pub use error::{ScheduleError, SessionError};
pub use service::SessionService;
