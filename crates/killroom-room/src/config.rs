//! Service configuration.

use chrono::{FixedOffset, Offset, Utc};

/// Offset kill times are stamped in when nothing else is configured.
pub const DEFAULT_KILL_TIME_OFFSET_HOURS: i32 = 9;

/// Default number of draws before id generation gives up.
pub const DEFAULT_ID_ATTEMPTS: usize = 8;

/// Settings for a [`RoomService`](crate::RoomService).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// How many ids to draw when creating a room or player before
    /// reporting [`RoomError::IdSpaceExhausted`](crate::RoomError).
    /// A draw is rejected when the id is already taken.
    pub id_attempts: usize,

    /// Wall-clock offset used for `killedTime`.
    pub kill_time_offset: FixedOffset,
}

impl ServiceConfig {
    /// Builds an offset from whole hours east of UTC.
    ///
    /// Returns `None` outside `-23..=23`.
    pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .filter(|_| (-23..=23).contains(&hours))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id_attempts: DEFAULT_ID_ATTEMPTS,
            kill_time_offset: Self::offset_from_hours(DEFAULT_KILL_TIME_OFFSET_HOURS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.id_attempts, 8);
        assert_eq!(config.kill_time_offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_offset_from_hours_bounds() {
        assert_eq!(
            ServiceConfig::offset_from_hours(-5).unwrap().local_minus_utc(),
            -5 * 3600
        );
        assert!(ServiceConfig::offset_from_hours(0).is_some());
        assert!(ServiceConfig::offset_from_hours(24).is_none());
        assert!(ServiceConfig::offset_from_hours(i32::MAX).is_none());
    }
}
