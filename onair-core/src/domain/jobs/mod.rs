pub mod downgrade;
pub mod error;

pub use downgrade::{DowngradeCascade, DowngradeReport, demote};
pub use error::DowngradeError;
