//! One capacity pool: outstanding units, cooling units and their timing.
//!
//! Pure bookkeeping with time passed in explicitly; locking and waiting live
//! in [`crate::scheduler`].

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::PoolPolicy;

/// Units returned by a lease that are not reusable yet.
#[derive(Debug, Clone, Copy)]
struct Cooldown {
    ready_at: Instant,
    units: u32,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    /// Nominal capacity.
    pub capacity: u32,
    /// Units held by live leases.
    pub outstanding: u32,
    /// Units released but still inside their spacing interval.
    pub cooling: u32,
    /// Units that can be reserved right now.
    pub available: u32,
}

#[derive(Debug)]
pub(crate) struct Pool {
    capacity: u32,
    interval: Duration,
    outstanding: u32,
    cooling: Vec<Cooldown>,
}

impl Pool {
    pub(crate) fn new(policy: PoolPolicy) -> Self {
        Self {
            capacity: policy.capacity.max(1),
            interval: policy.interval(),
            outstanding: 0,
            cooling: Vec::new(),
        }
    }

    /// Units a lease of `weight` reserves from this pool.
    ///
    /// Oversize weights reserve the whole pool; [`Pool::give_back`] stretches
    /// their cooldown instead.
    pub(crate) fn units_for(&self, weight: u32) -> u32 {
        weight.clamp(1, self.capacity)
    }

    /// Drops cooldowns that have elapsed.
    pub(crate) fn refresh(&mut self, now: Instant) {
        self.cooling.retain(|c| c.ready_at > now);
    }

    fn cooling_units(&self, now: Instant) -> u32 {
        self.cooling
            .iter()
            .filter(|c| c.ready_at > now)
            .map(|c| c.units)
            .sum()
    }

    pub(crate) fn available(&self, now: Instant) -> u32 {
        self.capacity
            .saturating_sub(self.outstanding)
            .saturating_sub(self.cooling_units(now))
    }

    /// Reserves `units` if they are available now.
    pub(crate) fn try_take(&mut self, units: u32, now: Instant) -> bool {
        if self.available(now) < units {
            return false;
        }
        self.outstanding += units;
        true
    }

    /// Returns a lease's units. They stay unusable until the interval since
    /// `acquired_at` has elapsed, scaled by how many times the lease's weight
    /// overflowed the reservation.
    pub(crate) fn give_back(&mut self, units: u32, weight: u32, acquired_at: Instant, now: Instant) {
        self.outstanding = self.outstanding.saturating_sub(units);
        let rounds = weight.max(1).div_ceil(units.max(1));
        let ready_at = acquired_at + self.interval.saturating_mul(rounds);
        if ready_at > now {
            self.cooling.push(Cooldown { ready_at, units });
        }
    }

    /// Earliest instant at which a cooling unit becomes reusable.
    pub(crate) fn next_ready(&self) -> Option<Instant> {
        self.cooling.iter().map(|c| c.ready_at).min()
    }

    /// No live leases and nothing cooling.
    pub(crate) fn is_idle(&self, now: Instant) -> bool {
        self.outstanding == 0 && self.cooling_units(now) == 0
    }

    pub(crate) fn snapshot(&self, now: Instant) -> PoolSnapshot {
        PoolSnapshot {
            capacity: self.capacity,
            outstanding: self.outstanding,
            cooling: self.cooling_units(now),
            available: self.available(now),
        }
    }
}
