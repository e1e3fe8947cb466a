use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    ids::{LicenseActivityId, MemberLicenseId},
    tier::Tier,
};

/// Operator-issued entitlement for one installation. Source of truth for the
/// tier an installation may activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLicense {
    pub id: MemberLicenseId,
    pub install_id: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub tier: Tier,
    pub notes: Option<String>,
    pub active: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemberLicense {
    /// Hard expiry has been reached (`expires_at <= now`).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// The currently activated installation.
///
/// Lifecycle phases are derived from field combinations, see
/// [`LicensePhase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseState {
    pub install_id: String,
    pub activated_tier: Tier,
    pub lease_expires_at: DateTime<Utc>,
    pub last_check_at: Option<DateTime<Utc>>,
    pub grace_started_at: Option<DateTime<Utc>>,
    pub member_license_id: MemberLicenseId,
}

impl LicenseState {
    pub fn phase(&self) -> LicensePhase {
        if self.activated_tier.is_basic() {
            LicensePhase::Downgraded
        } else if self.grace_started_at.is_some() {
            LicensePhase::Grace
        } else {
            LicensePhase::Active
        }
    }
}

/// Conceptual lifecycle phase. `Unactivated` corresponds to no state row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicensePhase {
    Unactivated,
    Active,
    Grace,
    Downgraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseAction {
    Issued,
    Revoked,
    Activated,
    Renewed,
    GraceStarted,
    Expired,
    Downgraded,
}

impl LicenseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseAction::Issued => "issued",
            LicenseAction::Revoked => "revoked",
            LicenseAction::Activated => "activated",
            LicenseAction::Renewed => "renewed",
            LicenseAction::GraceStarted => "grace_started",
            LicenseAction::Expired => "expired",
            LicenseAction::Downgraded => "downgraded",
        }
    }
}

impl FromStr for LicenseAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(LicenseAction::Issued),
            "revoked" => Ok(LicenseAction::Revoked),
            "activated" => Ok(LicenseAction::Activated),
            "renewed" => Ok(LicenseAction::Renewed),
            "grace_started" => Ok(LicenseAction::GraceStarted),
            "expired" => Ok(LicenseAction::Expired),
            "downgraded" => Ok(LicenseAction::Downgraded),
            other => Err(ModelError::unknown("license action", other)),
        }
    }
}

impl fmt::Display for LicenseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry for a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseActivity {
    pub id: LicenseActivityId,
    pub install_id: String,
    pub action: LicenseAction,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LicenseActivity {
    pub fn new(
        install_id: impl Into<String>,
        action: LicenseAction,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LicenseActivityId::new(),
            install_id: install_id.into(),
            action,
            message,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state() -> LicenseState {
        let now = Utc::now();
        LicenseState {
            install_id: "host-1".into(),
            activated_tier: Tier::Premium,
            lease_expires_at: now + Duration::hours(1),
            last_check_at: Some(now),
            grace_started_at: None,
            member_license_id: MemberLicenseId::new(),
        }
    }

    #[test]
    fn phase_follows_field_combinations() {
        let mut state = state();
        assert_eq!(state.phase(), LicensePhase::Active);

        state.grace_started_at = state.last_check_at;
        assert_eq!(state.phase(), LicensePhase::Grace);

        state.activated_tier = Tier::Basic;
        assert_eq!(state.phase(), LicensePhase::Downgraded);
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let member = MemberLicense {
            id: MemberLicenseId::new(),
            install_id: "host-1".into(),
            secret_hash: "digest".into(),
            tier: Tier::Premium,
            notes: None,
            active: true,
            issued_at: now,
            expires_at: Some(now),
        };
        assert!(member.is_expired(now));
        assert!(!member.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn member_secret_hash_is_never_serialized() {
        let member = MemberLicense {
            id: MemberLicenseId::new(),
            install_id: "host-1".into(),
            secret_hash: "digest".into(),
            tier: Tier::Basic,
            notes: None,
            active: true,
            issued_at: Utc::now(),
            expires_at: None,
        };
        let value = serde_json::to_value(&member).unwrap();
        assert!(value.get("secret_hash").is_none());
    }
}
