use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a streaming job.
    JobId
);
record_id!(
    /// Identifier of a time-based schedule attached to a job.
    ScheduleId
);
record_id!(
    /// Identifier of an execution session.
    SessionId
);
record_id!(
    /// Identifier of an operator-issued member license.
    MemberLicenseId
);
record_id!(JobBackupId);
record_id!(LicenseActivityId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_uuid() {
        let id = JobId::new();
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, format!("\"{}\"", id.0));
    }

    #[test]
    fn fresh_ids_are_time_ordered() {
        let first = ScheduleId::new();
        let second = ScheduleId::new();
        assert!(first < second);
    }
}
