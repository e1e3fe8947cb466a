use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use onair_model::{
    InvalidReason, LicenseAction, LicenseActivity, LicenseState, MemberLicense,
    MemberLicenseId, Tier, TierCounts,
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    clock::Clock,
    crypto::SecretHasher,
    database::repository_ports::LicenseRepository,
    domain::jobs::DowngradeCascade,
};

use super::{
    error::LicenseError,
    policy::{LicensePolicy, evaluate_outage},
};

/// Operator request to create or update a member license.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLicense {
    pub install_id: String,
    pub secret: String,
    pub tier: Tier,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Drives the license state machine: Unactivated, Active, Grace, Downgraded.
///
/// Every transition reads and writes the state while holding `transitions`,
/// so a renew cannot be overwritten by an enforcement pass that read the
/// state before it.
pub struct LicenseManager {
    licenses: Arc<dyn LicenseRepository>,
    transitions: Mutex<()>,
    cascade: DowngradeCascade,
    hasher: Arc<SecretHasher>,
    clock: Arc<dyn Clock>,
    policy: LicensePolicy,
}

impl fmt::Debug for LicenseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseManager")
            .field("licenses", &type_name_of_val(self.licenses.as_ref()))
            .field("cascade", &self.cascade)
            .field("policy", &self.policy)
            .finish()
    }
}

impl LicenseManager {
    pub fn new(
        licenses: Arc<dyn LicenseRepository>,
        cascade: DowngradeCascade,
        hasher: Arc<SecretHasher>,
        clock: Arc<dyn Clock>,
        policy: LicensePolicy,
    ) -> Self {
        Self {
            licenses,
            transitions: Mutex::new(()),
            cascade: cascade.with_max_attempts(policy.cascade_attempts),
            hasher,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LicensePolicy {
        &self.policy
    }

    /// Create or update the member for `install_id`. The secret is always
    /// re-hashed and the member is (re)activated.
    pub async fn issue(
        &self,
        request: IssueLicense,
    ) -> Result<MemberLicense, LicenseError> {
        let now = self.clock.now();
        let member = MemberLicense {
            id: MemberLicenseId::new(),
            secret_hash: self.hasher.hash_secret(&request.secret),
            install_id: request.install_id,
            tier: request.tier,
            notes: request.notes,
            active: true,
            issued_at: now,
            expires_at: request.expires_at,
        };
        let stored = self.licenses.upsert_member(&member).await?;

        self.record(
            &stored.install_id,
            LicenseAction::Issued,
            Some(format!("{} tier issued", stored.tier)),
            now,
        )
        .await?;
        info!(install_id = %stored.install_id, tier = %stored.tier, "member license issued");
        Ok(stored)
    }

    pub async fn revoke(&self, install_id: &str) -> Result<MemberLicense, LicenseError> {
        let now = self.clock.now();
        let member = self
            .licenses
            .set_member_active(install_id, false)
            .await?
            .ok_or_else(|| LicenseError::LicenseNotIssued(install_id.to_string()))?;

        self.record(install_id, LicenseAction::Revoked, None, now).await?;
        info!(install_id, "member license revoked");
        Ok(member)
    }

    /// Bind this deployment to `install_id` after checking the member
    /// license and secret.
    pub async fn activate(
        &self,
        install_id: &str,
        secret: &str,
    ) -> Result<LicenseState, LicenseError> {
        let _transition = self.transitions.lock().await;
        let now = self.clock.now();
        let member = self
            .licenses
            .find_member_by_install_id(install_id)
            .await?
            .filter(|member| member.active)
            .ok_or_else(|| LicenseError::LicenseInactive(install_id.to_string()))?;

        if member.is_expired(now) {
            return Err(LicenseError::LicenseExpired(install_id.to_string()));
        }
        if !self.hasher.verify_secret(secret, &member.secret_hash) {
            warn!(install_id, "license activation rejected: secret mismatch");
            return Err(LicenseError::SecretMismatch);
        }

        let state = LicenseState {
            install_id: member.install_id.clone(),
            activated_tier: member.tier,
            lease_expires_at: now + self.policy.lease,
            last_check_at: Some(now),
            grace_started_at: None,
            member_license_id: member.id,
        };
        self.licenses.save_state(&state).await?;
        self.record(
            install_id,
            LicenseAction::Activated,
            Some(format!("{} tier activated", member.tier)),
            now,
        )
        .await?;

        info!(install_id, tier = %member.tier, "license activated");
        Ok(state)
    }

    /// Extend the lease, or force Basic when the bound member has expired.
    /// Outage enforcement runs afterwards in both cases.
    pub async fn renew(&self) -> Result<LicenseState, LicenseError> {
        let _transition = self.transitions.lock().await;
        let now = self.clock.now();
        let mut state = self.read().await?.ok_or(LicenseError::NoLicenseState)?;
        let member = self
            .licenses
            .get_member(state.member_license_id)
            .await?
            .ok_or_else(|| LicenseError::LicenseNotIssued(state.install_id.clone()))?;

        if member.is_expired(now) {
            let report = self.cascade.downgrade_all(InvalidReason::LicenseExpired).await?;
            state.activated_tier = Tier::Basic;
            self.licenses.save_state(&state).await?;
            self.record(
                &state.install_id,
                LicenseAction::Expired,
                Some(format!("{} jobs downgraded", report.downgraded.len())),
                now,
            )
            .await?;
            warn!(
                install_id = %state.install_id,
                jobs = report.downgraded.len(),
                "member license expired; forced Basic"
            );
        } else {
            state.lease_expires_at = now + self.policy.lease;
            state.last_check_at = Some(now);
            state.grace_started_at = None;
            self.licenses.save_state(&state).await?;
            self.record(&state.install_id, LicenseAction::Renewed, None, now)
                .await?;
        }

        self.enforce(state).await
    }

    /// Current state as stored. Performs no enforcement.
    pub async fn read(&self) -> Result<Option<LicenseState>, LicenseError> {
        Ok(self.licenses.load_state().await?)
    }

    /// Load the stored state and apply outage enforcement to it, persisting
    /// any transition and running the downgrade cascade when grace is
    /// exhausted. Idempotent.
    ///
    /// Grace start is saved before the cascade runs; the tier only moves to
    /// Basic after the cascade commits, so a failed cascade is retried by the
    /// next call.
    ///
    /// A grace downgrade clears `grace_started_at` but leaves `last_check_at`
    /// untouched. The next call therefore starts grace again from the same
    /// backdated instant and records one more `grace_started` entry; the tier
    /// is already Basic, so no further downgrade follows.
    pub async fn reconcile(&self) -> Result<LicenseState, LicenseError> {
        let _transition = self.transitions.lock().await;
        let state = self.read().await?.ok_or(LicenseError::NoLicenseState)?;
        self.enforce(state).await
    }

    /// Outage enforcement on a state read under the transition lock.
    async fn enforce(
        &self,
        mut state: LicenseState,
    ) -> Result<LicenseState, LicenseError> {
        let now = self.clock.now();
        let decision = evaluate_outage(&state, now, &self.policy);
        if decision.is_noop() {
            return Ok(state);
        }

        if let Some(grace_started_at) = decision.start_grace_at {
            state.grace_started_at = Some(grace_started_at);
            self.licenses.save_state(&state).await?;
            self.record(
                &state.install_id,
                LicenseAction::GraceStarted,
                Some(format!("grace started at {}", grace_started_at.to_rfc3339())),
                now,
            )
            .await?;
            warn!(
                install_id = %state.install_id,
                grace_started_at = %grace_started_at,
                "license check-ins missed; grace started"
            );
        }

        if decision.downgrade {
            let report = self
                .cascade
                .downgrade_all(InvalidReason::LicenseGraceExpired)
                .await?;
            state.activated_tier = Tier::Basic;
            state.grace_started_at = None;
            self.licenses.save_state(&state).await?;
            self.record(
                &state.install_id,
                LicenseAction::Downgraded,
                Some(format!("{} jobs downgraded", report.downgraded.len())),
                now,
            )
            .await?;
            warn!(
                install_id = %state.install_id,
                jobs = report.downgraded.len(),
                "license grace exhausted; downgraded to Basic"
            );
        }

        Ok(state)
    }

    /// The current state after outage enforcement.
    ///
    /// This read has side effects: it may start grace or downgrade. See
    /// [`LicenseManager::reconcile`] for the repeated grace entry after a
    /// grace downgrade.
    pub async fn get_state(&self) -> Result<LicenseState, LicenseError> {
        self.reconcile().await
    }

    /// Explicit on-demand outage enforcement.
    pub async fn outage_check(&self) -> Result<LicenseState, LicenseError> {
        self.get_state().await
    }

    /// Active member licenses per tier.
    pub async fn metrics(&self) -> Result<TierCounts, LicenseError> {
        Ok(self.licenses.count_active_members_by_tier().await?)
    }

    pub async fn list_activity(
        &self,
        limit: u32,
    ) -> Result<Vec<LicenseActivity>, LicenseError> {
        Ok(self.licenses.list_activity(limit).await?)
    }

    async fn record(
        &self,
        install_id: &str,
        action: LicenseAction,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LicenseError> {
        let activity = LicenseActivity::new(install_id, action, message, now);
        Ok(self.licenses.append_activity(&activity).await?)
    }
}
