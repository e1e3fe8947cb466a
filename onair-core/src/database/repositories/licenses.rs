use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{
    LicenseActivity, LicenseState, MemberLicense, MemberLicenseId, Tier,
    TierCounts,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::repository_ports::LicenseRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresLicenseRepository {
    pool: PgPool,
}

impl PostgresLicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_member(row: MemberRow) -> Result<MemberLicense> {
        Ok(MemberLicense {
            id: row.id.into(),
            install_id: row.install_id,
            secret_hash: row.secret_hash,
            tier: row.tier.parse()?,
            notes: row.notes,
            active: row.active,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        })
    }

    fn map_state(row: StateRow) -> Result<LicenseState> {
        Ok(LicenseState {
            install_id: row.install_id,
            activated_tier: row.activated_tier.parse()?,
            lease_expires_at: row.lease_expires_at,
            last_check_at: row.last_check_at,
            grace_started_at: row.grace_started_at,
            member_license_id: row.member_license_id.into(),
        })
    }

    fn map_activity(row: ActivityRow) -> Result<LicenseActivity> {
        Ok(LicenseActivity {
            id: row.id.into(),
            install_id: row.install_id,
            action: row.action.parse()?,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    install_id: String,
    secret_hash: String,
    tier: String,
    notes: Option<String>,
    active: bool,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    install_id: String,
    activated_tier: String,
    lease_expires_at: DateTime<Utc>,
    last_check_at: Option<DateTime<Utc>>,
    grace_started_at: Option<DateTime<Utc>>,
    member_license_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    install_id: String,
    action: String,
    message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TierCountRow {
    tier: String,
    total: i64,
}

const MEMBER_COLUMNS: &str =
    "id, install_id, secret_hash, tier, notes, active, issued_at, expires_at";

#[async_trait]
impl LicenseRepository for PostgresLicenseRepository {
    async fn upsert_member(&self, member: &MemberLicense) -> Result<MemberLicense> {
        let query = format!(
            r#"
            INSERT INTO member_licenses
                (id, install_id, secret_hash, tier, notes, active, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (install_id) DO UPDATE
                SET secret_hash = EXCLUDED.secret_hash,
                    tier = EXCLUDED.tier,
                    notes = EXCLUDED.notes,
                    active = EXCLUDED.active,
                    issued_at = EXCLUDED.issued_at,
                    expires_at = EXCLUDED.expires_at
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MemberRow>(&query)
            .bind(member.id.to_uuid())
            .bind(&member.install_id)
            .bind(&member.secret_hash)
            .bind(member.tier.as_str())
            .bind(&member.notes)
            .bind(member.active)
            .bind(member.issued_at)
            .bind(member.expires_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to upsert member license {}: {e}",
                    member.install_id
                ))
            })?;

        Self::map_member(row)
    }

    async fn find_member_by_install_id(
        &self,
        install_id: &str,
    ) -> Result<Option<MemberLicense>> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM member_licenses WHERE install_id = $1"
        );
        let row = sqlx::query_as::<_, MemberRow>(&query)
            .bind(install_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to load member license {install_id}: {e}"
                ))
            })?;

        row.map(Self::map_member).transpose()
    }

    async fn get_member(&self, id: MemberLicenseId) -> Result<Option<MemberLicense>> {
        let query =
            format!("SELECT {MEMBER_COLUMNS} FROM member_licenses WHERE id = $1");
        let row = sqlx::query_as::<_, MemberRow>(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to load member license {id}: {e}"
                ))
            })?;

        row.map(Self::map_member).transpose()
    }

    async fn set_member_active(
        &self,
        install_id: &str,
        active: bool,
    ) -> Result<Option<MemberLicense>> {
        let query = format!(
            "UPDATE member_licenses SET active = $2 WHERE install_id = $1 \
             RETURNING {MEMBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MemberRow>(&query)
            .bind(install_id)
            .bind(active)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to update member license {install_id}: {e}"
                ))
            })?;

        row.map(Self::map_member).transpose()
    }

    async fn count_active_members_by_tier(&self) -> Result<TierCounts> {
        let rows = sqlx::query_as::<_, TierCountRow>(
            r#"
            SELECT tier, COUNT(*) AS total
            FROM member_licenses
            WHERE active
            GROUP BY tier
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to count member licenses: {e}"))
        })?;

        let mut counts = TierCounts::default();
        for row in rows {
            let tier: Tier = row.tier.parse()?;
            counts.record(tier, u64::try_from(row.total).unwrap_or_default());
        }
        Ok(counts)
    }

    async fn load_state(&self) -> Result<Option<LicenseState>> {
        let row = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT install_id, activated_tier, lease_expires_at,
                   last_check_at, grace_started_at, member_license_id
            FROM license_state
            WHERE state_id = 1
            "#,
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to load license state: {e}"))
        })?;

        row.map(Self::map_state).transpose()
    }

    async fn save_state(&self, state: &LicenseState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO license_state
                (state_id, install_id, activated_tier, lease_expires_at,
                 last_check_at, grace_started_at, member_license_id)
            VALUES (1, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (state_id) DO UPDATE
                SET install_id = EXCLUDED.install_id,
                    activated_tier = EXCLUDED.activated_tier,
                    lease_expires_at = EXCLUDED.lease_expires_at,
                    last_check_at = EXCLUDED.last_check_at,
                    grace_started_at = EXCLUDED.grace_started_at,
                    member_license_id = EXCLUDED.member_license_id
            "#,
        )
        .bind(&state.install_id)
        .bind(state.activated_tier.as_str())
        .bind(state.lease_expires_at)
        .bind(state.last_check_at)
        .bind(state.grace_started_at)
        .bind(state.member_license_id.to_uuid())
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to save license state: {e}"))
        })?;

        Ok(())
    }

    async fn append_activity(&self, activity: &LicenseActivity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO license_activity (id, install_id, action, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(activity.id.to_uuid())
        .bind(&activity.install_id)
        .bind(activity.action.as_str())
        .bind(&activity.message)
        .bind(activity.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to append license activity: {e}"))
        })?;

        Ok(())
    }

    async fn list_activity(&self, limit: u32) -> Result<Vec<LicenseActivity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, install_id, action, message, created_at
            FROM license_activity
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to list license activity: {e}"))
        })?;

        rows.into_iter().map(Self::map_activity).collect()
    }
}
