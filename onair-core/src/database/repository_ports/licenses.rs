use async_trait::async_trait;
use onair_model::{
    LicenseActivity, LicenseState, MemberLicense, MemberLicenseId, TierCounts,
};

use crate::error::Result;

#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Create or update the member keyed by `install_id`. An existing row
    /// keeps its id; the stored record is returned.
    async fn upsert_member(&self, member: &MemberLicense) -> Result<MemberLicense>;

    async fn find_member_by_install_id(
        &self,
        install_id: &str,
    ) -> Result<Option<MemberLicense>>;

    async fn get_member(&self, id: MemberLicenseId) -> Result<Option<MemberLicense>>;

    /// Flip the `active` flag. Returns the updated member, or `None` when no
    /// member exists for `install_id`.
    async fn set_member_active(
        &self,
        install_id: &str,
        active: bool,
    ) -> Result<Option<MemberLicense>>;

    async fn count_active_members_by_tier(&self) -> Result<TierCounts>;

    async fn load_state(&self) -> Result<Option<LicenseState>>;

    /// Replace the singleton license state.
    async fn save_state(&self, state: &LicenseState) -> Result<()>;

    async fn append_activity(&self, activity: &LicenseActivity) -> Result<()>;

    /// Most recent entries first.
    async fn list_activity(&self, limit: u32) -> Result<Vec<LicenseActivity>>;
}
