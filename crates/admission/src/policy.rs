//! Rate policy: how much capacity each pool has and how fast it comes back.
//!
//! The defaults follow the platform's published guidance: about 30 messages
//! per second overall, about one message per second to a single chat, and
//! no more than 20 messages per minute to a group.

use std::time::Duration;

use botapi::ChatId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capacity and spacing of one pool.
///
/// A unit consumed at time `t` can be reused no earlier than `t + interval`,
/// so the pool sustains at most `capacity` units per `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPolicy {
    /// Nominal number of units; also the largest burst.
    pub capacity: u32,
    /// Minimum spacing, in milliseconds, between consuming a unit and
    /// reusing it.
    pub interval_ms: u64,
}

impl PoolPolicy {
    /// Creates a [`PoolPolicy`].
    pub fn new(capacity: u32, interval: Duration) -> Self {
        Self {
            capacity,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Spacing as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Errors detected when validating a [`RatePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A pool with zero capacity could never admit anything.
    #[error("pool '{pool}' must have a capacity of at least 1")]
    ZeroCapacity {
        /// Which pool was misconfigured.
        pool: &'static str,
    },
}

/// Pool policies for the global pool and each destination class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatePolicy {
    /// Shared by every call.
    pub global: PoolPolicy,
    /// Applied to each private chat (positive chat ids).
    pub private_chat: PoolPolicy,
    /// Applied to each group, supergroup or channel.
    pub group_chat: PoolPolicy,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            global: PoolPolicy::new(30, Duration::from_secs(1)),
            private_chat: PoolPolicy::new(1, Duration::from_secs(1)),
            group_chat: PoolPolicy::new(1, Duration::from_secs(3)),
        }
    }
}

impl RatePolicy {
    /// Uses one policy for every destination regardless of chat kind.
    pub fn uniform(global: PoolPolicy, destination: PoolPolicy) -> Self {
        Self {
            global,
            private_chat: destination,
            group_chat: destination,
        }
    }

    /// Policy of the pool that meters `chat`.
    pub fn for_chat(&self, chat: &ChatId) -> PoolPolicy {
        if chat.is_group_like() {
            self.group_chat
        } else {
            self.private_chat
        }
    }

    /// Rejects policies that could never admit a call.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (pool, policy) in [
            ("global", self.global),
            ("private_chat", self.private_chat),
            ("group_chat", self.group_chat),
        ] {
            if policy.capacity == 0 {
                return Err(PolicyError::ZeroCapacity { pool });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_limits() {
        let policy = RatePolicy::default();
        assert_eq!(policy.global.capacity, 30);
        assert_eq!(policy.global.interval(), Duration::from_secs(1));
        assert_eq!(policy.for_chat(&ChatId::Id(10)).interval(), Duration::from_secs(1));
        assert_eq!(policy.for_chat(&ChatId::Id(-10)).interval(), Duration::from_secs(3));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut policy = RatePolicy::default();
        policy.group_chat.capacity = 0;
        assert_eq!(
            policy.validate(),
            Err(PolicyError::ZeroCapacity { pool: "group_chat" })
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy: RatePolicy = toml::from_str(
            r#"
            [global]
            capacity = 10
            interval_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(policy.global, PoolPolicy::new(10, Duration::from_millis(500)));
        assert_eq!(policy.private_chat, RatePolicy::default().private_chat);
    }
}
