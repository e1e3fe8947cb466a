use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured cause attached to a job whose status is `invalid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "code", content = "detail")]
pub enum InvalidReason {
    /// The bound member license passed its hard expiry.
    LicenseExpired,
    /// The installation stopped checking in for longer than the grace tolerance.
    LicenseGraceExpired,
    CrossfadeRequiresLoop,
    AudioRequiresPremium,
    ScenesRequireUltimate,
    Other(String),
}

impl InvalidReason {
    pub fn message(&self) -> &str {
        match self {
            InvalidReason::LicenseExpired => "License expired",
            InvalidReason::LicenseGraceExpired => "License grace period expired",
            InvalidReason::CrossfadeRequiresLoop => "Crossfade requires loop",
            InvalidReason::AudioRequiresPremium => {
                "Audio replacement requires Premium"
            }
            InvalidReason::ScenesRequireUltimate => "Scenes require Ultimate",
            InvalidReason::Other(message) => message,
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Ordered, duplicate-free collection of [`InvalidReason`]s.
///
/// Insertion order is preserved so the rendered form reads in the order the
/// reasons were discovered. Rendering joins with `"; "`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvalidReasons(Vec<InvalidReason>);

impl InvalidReasons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `reason` unless it is already present. Returns `true` when added.
    pub fn insert(&mut self, reason: InvalidReason) -> bool {
        if self.0.contains(&reason) {
            return false;
        }
        self.0.push(reason);
        true
    }

    pub fn contains(&self, reason: &InvalidReason) -> bool {
        self.0.contains(reason)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvalidReason> {
        self.0.iter()
    }
}

impl FromIterator<InvalidReason> for InvalidReasons {
    fn from_iter<I: IntoIterator<Item = InvalidReason>>(iter: I) -> Self {
        let mut reasons = InvalidReasons::new();
        for reason in iter {
            reasons.insert(reason);
        }
        reasons
    }
}

impl fmt::Display for InvalidReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, reason) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            f.write_str(reason.message())?;
        }
        Ok(())
    }
}
