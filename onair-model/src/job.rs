use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::ModelError,
    ids::JobId,
    reasons::{InvalidReason, InvalidReasons},
    tier::Tier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Draft,
    Valid,
    Invalid,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Valid => "valid",
            JobStatus::Invalid => "invalid",
        }
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JobStatus::Draft),
            "valid" => Ok(JobStatus::Valid),
            "invalid" => Ok(JobStatus::Invalid),
            other => Err(ModelError::unknown("job status", other)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the job's audio track is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    #[default]
    None,
    Replace,
    Mix,
}

impl AudioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMode::None => "none",
            AudioMode::Replace => "replace",
            AudioMode::Mix => "mix",
        }
    }
}

impl FromStr for AudioMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AudioMode::None),
            "replace" => Ok(AudioMode::Replace),
            "mix" => Ok(AudioMode::Mix),
            other => Err(ModelError::unknown("audio mode", other)),
        }
    }
}

/// When a swapped-in asset takes over the live output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotSwapMode {
    #[default]
    Immediate,
    EndOfLoop,
}

impl HotSwapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotSwapMode::Immediate => "immediate",
            HotSwapMode::EndOfLoop => "end_of_loop",
        }
    }
}

impl FromStr for HotSwapMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(HotSwapMode::Immediate),
            "end_of_loop" => Ok(HotSwapMode::EndOfLoop),
            other => Err(ModelError::unknown("hot swap mode", other)),
        }
    }
}

/// A streaming job as seen by the control plane.
///
/// Jobs are created and edited by the admin surface; the control plane only
/// demotes them (downgrade cascade) and restores them from backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub tier_required: Tier,
    pub destination_id: Uuid,
    pub video_asset_id: Uuid,
    pub loop_enabled: bool,
    pub crossfade_enabled: bool,
    pub audio_mode: AudioMode,
    pub audio_asset_id: Option<Uuid>,
    pub auto_recovery: bool,
    pub hot_swap_mode: HotSwapMode,
    pub scenes_enabled: bool,
    pub swap_rules: Option<Value>,
    pub scene_overrides: Option<Value>,
    pub preset_id: Option<Uuid>,
    pub status: JobStatus,
    #[serde(default)]
    pub invalid_reasons: InvalidReasons,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A Basic-tier draft with every premium feature off.
    pub fn new(
        name: impl Into<String>,
        destination_id: Uuid,
        video_asset_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            tier_required: Tier::Basic,
            destination_id,
            video_asset_id,
            loop_enabled: false,
            crossfade_enabled: false,
            audio_mode: AudioMode::None,
            audio_asset_id: None,
            auto_recovery: false,
            hot_swap_mode: HotSwapMode::Immediate,
            scenes_enabled: false,
            swap_rules: None,
            scene_overrides: None,
            preset_id: None,
            status: JobStatus::Draft,
            invalid_reasons: InvalidReasons::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Feature combinations the job's own tier does not entitle.
    pub fn feature_violations(&self) -> InvalidReasons {
        let mut reasons = InvalidReasons::new();
        if self.crossfade_enabled && !self.loop_enabled {
            reasons.insert(InvalidReason::CrossfadeRequiresLoop);
        }
        if self.audio_mode != AudioMode::None && self.tier_required.is_basic() {
            reasons.insert(InvalidReason::AudioRequiresPremium);
        }
        if self.scenes_enabled && self.tier_required != Tier::Ultimate {
            reasons.insert(InvalidReason::ScenesRequireUltimate);
        }
        reasons
    }
}
