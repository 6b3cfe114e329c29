//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `*_states` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Generation job lifecycle status.
    JobStatus {
        Queued = 1,
        Running = 2,
        Succeeded = 3,
        Failed = 4,
        Cancelled = 5,
    }
}

define_status_enum! {
    /// Credit reservation lifecycle. A reservation leaves `Held` exactly
    /// once, to `Committed` or `Refunded`, never both.
    ReservationState {
        Held = 1,
        Committed = 2,
        Refunded = 3,
    }
}

define_status_enum! {
    /// Broadcast lifecycle status.
    BroadcastStatus {
        Pending = 1,
        InProgress = 2,
        Completed = 3,
        PartiallyFailed = 4,
    }
}

define_status_enum! {
    /// Per-target broadcast delivery outcome.
    TargetState {
        Pending = 1,
        Delivered = 2,
        Failed = 3,
    }
}

impl JobStatus {
    /// Parse a wire name (as used in list filters).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Wire name for API responses.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Queued.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Succeeded.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
        assert_eq!(JobStatus::Cancelled.id(), 5);
    }

    #[test]
    fn reservation_state_ids_match_seed_data() {
        assert_eq!(ReservationState::Held.id(), 1);
        assert_eq!(ReservationState::Committed.id(), 2);
        assert_eq!(ReservationState::Refunded.id(), 3);
    }

    #[test]
    fn broadcast_status_ids_match_seed_data() {
        assert_eq!(BroadcastStatus::Pending.id(), 1);
        assert_eq!(BroadcastStatus::InProgress.id(), 2);
        assert_eq!(BroadcastStatus::Completed.id(), 3);
        assert_eq!(BroadcastStatus::PartiallyFailed.id(), 4);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = JobStatus::Queued.into();
        assert_eq!(id, 1);
    }

    #[test]
    fn job_status_names_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_name(status.name()), Some(status));
        }
    }

    #[test]
    fn unknown_job_status_name_rejected() {
        assert_eq!(JobStatus::from_name("paused"), None);
    }
}
