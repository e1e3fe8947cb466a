use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Entitlement level gating premium job features.
///
/// Ordering follows entitlement: `Basic < Premium < Ultimate`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub enum Tier {
    #[default]
    Basic,
    Premium,
    Ultimate,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Premium, Tier::Ultimate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "Basic",
            Tier::Premium => "Premium",
            Tier::Ultimate => "Ultimate",
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, Tier::Basic)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Basic" => Ok(Tier::Basic),
            "Premium" => Ok(Tier::Premium),
            "Ultimate" => Ok(Tier::Ultimate),
            other => Err(ModelError::unknown("tier", other)),
        }
    }
}

/// Number of active member licenses per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "Basic")]
    pub basic: u64,
    #[serde(rename = "Premium")]
    pub premium: u64,
    #[serde(rename = "Ultimate")]
    pub ultimate: u64,
}

impl TierCounts {
    pub fn record(&mut self, tier: Tier, count: u64) {
        match tier {
            Tier::Basic => self.basic += count,
            Tier::Premium => self.premium += count,
            Tier::Ultimate => self.ultimate += count,
        }
    }

    pub fn get(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Basic => self.basic,
            Tier::Premium => self.premium,
            Tier::Ultimate => self.ultimate,
        }
    }

    pub fn total(&self) -> u64 {
        self.basic + self.premium + self.ultimate
    }
}
