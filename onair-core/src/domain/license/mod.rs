//! License lifecycle: activation, lease renewal, outage grace, and the
//! downgrade that follows expiry or grace exhaustion.

pub mod error;
pub mod manager;
pub mod policy;

pub use error::LicenseError;
pub use manager::{IssueLicense, LicenseManager};
pub use policy::{LicensePolicy, OutageDecision, evaluate_outage};
