use thiserror::Error;

use crate::{domain::jobs::DowngradeError, error::CoreError};

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("no member license issued for install {0}")]
    LicenseNotIssued(String),

    #[error("member license for install {0} is missing or inactive")]
    LicenseInactive(String),

    #[error("member license for install {0} has expired")]
    LicenseExpired(String),

    #[error("install secret does not match")]
    SecretMismatch,

    #[error("no license state")]
    NoLicenseState,

    #[error("downgrade cascade failed: {0}")]
    Cascade(#[from] DowngradeError),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

impl LicenseError {
    /// Terminal rejection of the caller's request, as opposed to a missing
    /// record or an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LicenseError::LicenseNotIssued(_)
                | LicenseError::LicenseInactive(_)
                | LicenseError::LicenseExpired(_)
                | LicenseError::SecretMismatch
        )
    }
}
