//! The admission scheduler: reserve capacity before a call, return it after.
//!
//! ## Model
//!
//! Every call draws `weight` units from the global pool and, unless it is
//! account-scoped, from its destination's pool. Units come back when the
//! [`Lease`] is released, but only become reusable once the pool's interval
//! has elapsed since they were consumed. The scheduler therefore limits the
//! *rate* of calls, not only how many are in flight.
//!
//! ## Waiting
//!
//! Pool counters sit behind one mutex that is never held across an `.await`.
//! A caller that cannot be admitted parks on a [`Notify`] (signalled whenever
//! units are returned or a queue head changes) and, when units are cooling,
//! on a timer for the earliest one, racing its [`CancellationToken`].
//!
//! ## Ordering
//!
//! Within a destination, callers are admitted strictly in arrival order. A
//! caller whose destination is ready but who is short on global capacity
//! joins a global queue; later callers cannot overtake it on the global pool.
//! There is no ordering between destinations otherwise.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use botapi::{ChatId, Destination};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::pool::{Pool, PoolSnapshot};
use crate::{AdmissionError, PolicyError, RatePolicy};

/// How often idle destination pools are swept out of the map.
const SWEEP_EVERY: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Public views
// ---------------------------------------------------------------------------

/// Monotonic counters for leak checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Leases granted.
    pub acquired: u64,
    /// Leases released.
    pub released: u64,
    /// Sum of granted lease weights.
    pub acquired_weight: u64,
    /// Sum of released lease weights.
    pub released_weight: u64,
}

impl SchedulerStats {
    /// Leases currently alive.
    pub fn in_flight(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Point-in-time view of every non-idle pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// The global pool.
    pub global: PoolSnapshot,
    /// Destination pools with outstanding or cooling units.
    pub destinations: BTreeMap<ChatId, PoolSnapshot>,
    /// Callers currently blocked in [`Scheduler::acquire`].
    pub waiting: usize,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DestinationPool {
    pool: Pool,
    queue: VecDeque<u64>,
}

impl DestinationPool {
    fn is_removable(&self, now: Instant) -> bool {
        self.queue.is_empty() && self.pool.is_idle(now)
    }
}

#[derive(Debug)]
struct State {
    policy: RatePolicy,
    global: Pool,
    destinations: HashMap<ChatId, DestinationPool>,
    global_queue: BTreeSet<u64>,
    next_ticket: u64,
    waiting: usize,
    next_sweep: Instant,
    stats: SchedulerStats,
}

impl State {
    fn destination(&mut self, chat: &ChatId) -> &mut DestinationPool {
        let policy = self.policy.for_chat(chat);
        self.destinations
            .entry(chat.clone())
            .or_insert_with(|| DestinationPool {
                pool: Pool::new(policy),
                queue: VecDeque::new(),
            })
    }

    fn prune(&mut self, chat: &ChatId, now: Instant) {
        if self
            .destinations
            .get(chat)
            .is_some_and(|d| d.is_removable(now))
        {
            self.destinations.remove(chat);
        }
    }

    fn sweep(&mut self, now: Instant) {
        if now < self.next_sweep {
            return;
        }
        self.destinations.retain(|_, d| {
            d.pool.refresh(now);
            !d.is_removable(now)
        });
        self.next_sweep = now + SWEEP_EVERY;
    }
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

/// Outcome of one admission attempt.
enum Attempt {
    Admitted(Grant),
    Blocked { wake_at: Option<Instant> },
}

#[derive(Debug, Clone, Copy)]
struct Grant {
    global_units: u32,
    destination_units: u32,
    acquired_at: Instant,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, chat: Option<&ChatId>) -> u64 {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting += 1;
        if let Some(chat) = chat {
            state.destination(chat).queue.push_back(ticket);
        }
        ticket
    }

    fn try_admit(&self, ticket: u64, chat: Option<&ChatId>, weight: u32) -> Attempt {
        let mut state = self.lock();
        let now = Instant::now();
        state.sweep(now);
        state.global.refresh(now);

        let destination_units = match chat {
            Some(chat) => {
                let destination = state.destination(chat);
                destination.pool.refresh(now);
                if destination.queue.front() != Some(&ticket) {
                    return Attempt::Blocked { wake_at: None };
                }
                let units = destination.pool.units_for(weight);
                if destination.pool.available(now) < units {
                    return Attempt::Blocked {
                        wake_at: destination.pool.next_ready(),
                    };
                }
                units
            }
            None => 0,
        };

        if state.global_queue.first().is_some_and(|&first| first < ticket) {
            state.global_queue.insert(ticket);
            return Attempt::Blocked { wake_at: None };
        }
        let global_units = state.global.units_for(weight);
        if !state.global.try_take(global_units, now) {
            state.global_queue.insert(ticket);
            return Attempt::Blocked {
                wake_at: state.global.next_ready(),
            };
        }

        if let Some(chat) = chat {
            let destination = state.destination(chat);
            let taken = destination.pool.try_take(destination_units, now);
            debug_assert!(taken, "destination availability checked under the same lock");
            destination.queue.pop_front();
        }
        state.global_queue.remove(&ticket);
        state.waiting = state.waiting.saturating_sub(1);
        state.stats.acquired += 1;
        state.stats.acquired_weight += u64::from(weight);

        Attempt::Admitted(Grant {
            global_units,
            destination_units,
            acquired_at: now,
        })
    }

    fn abandon(&self, ticket: u64, chat: Option<&ChatId>) {
        {
            let mut state = self.lock();
            let now = Instant::now();
            if let Some(chat) = chat {
                if let Some(destination) = state.destinations.get_mut(chat) {
                    destination.queue.retain(|&t| t != ticket);
                }
                state.prune(chat, now);
            }
            state.global_queue.remove(&ticket);
            state.waiting = state.waiting.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    fn release(&self, lease: &Lease) {
        {
            let mut state = self.lock();
            let now = Instant::now();
            state
                .global
                .give_back(lease.global_units, lease.weight, lease.acquired_at, now);
            if let Destination::Chat(chat) = &lease.destination {
                if let Some(destination) = state.destinations.get_mut(chat) {
                    destination.pool.give_back(
                        lease.destination_units,
                        lease.weight,
                        lease.acquired_at,
                        now,
                    );
                }
                state.prune(chat, now);
            }
            state.stats.released += 1;
            state.stats.released_weight += u64::from(lease.weight);
        }
        debug!(
            destination = %lease.destination,
            weight = lease.weight,
            held_ms = lease.acquired_at.elapsed().as_millis() as u64,
            "capacity released"
        );
        self.notify.notify_waiters();
    }
}

/// Removes a caller's queue entries if it stops waiting before admission,
/// including when the `acquire` future is dropped.
struct Waiter<'a> {
    inner: &'a Inner,
    ticket: u64,
    chat: Option<&'a ChatId>,
    admitted: bool,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if !self.admitted {
            self.inner.abandon(self.ticket, self.chat);
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Admission-control service shared by every call of one client.
///
/// Cheap to clone; clones share the same pools. Each independent client (or
/// test) constructs its own.
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Creates a scheduler with the given policy.
    ///
    /// Zero capacities are raised to one; use [`Scheduler::try_new`] to reject
    /// them instead.
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    policy,
                    global: Pool::new(policy.global),
                    destinations: HashMap::new(),
                    global_queue: BTreeSet::new(),
                    next_ticket: 0,
                    waiting: 0,
                    next_sweep: Instant::now() + SWEEP_EVERY,
                    stats: SchedulerStats::default(),
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Creates a scheduler after validating `policy`.
    pub fn try_new(policy: RatePolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self::new(policy))
    }

    /// The policy this scheduler enforces.
    pub fn policy(&self) -> RatePolicy {
        self.inner.lock().policy
    }

    /// Reserves `weight` units for a call to `destination`.
    ///
    /// Waits (without holding any lock) until capacity is available. Fails
    /// only if `cancel` fires first, in which case no pool is changed.
    pub async fn acquire(
        &self,
        destination: &Destination,
        weight: u32,
        cancel: &CancellationToken,
    ) -> Result<Lease, AdmissionError> {
        if cancel.is_cancelled() {
            return Err(AdmissionError::Cancelled);
        }
        let weight = weight.max(1);
        let chat = match destination {
            Destination::Account => None,
            Destination::Chat(chat) => Some(chat),
        };

        let mut waiter = Waiter {
            inner: &self.inner,
            ticket: self.inner.enqueue(chat),
            chat,
            admitted: false,
        };

        loop {
            // Register for wake-ups before inspecting state so a release
            // between the check and the wait is not missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.inner.try_admit(waiter.ticket, chat, weight) {
                Attempt::Admitted(grant) => {
                    waiter.admitted = true;
                    // The next caller in this destination's queue may now proceed.
                    self.inner.notify.notify_waiters();

                    if grant.global_units < weight
                        || (chat.is_some() && grant.destination_units < weight)
                    {
                        warn!(
                            %destination,
                            weight,
                            global_units = grant.global_units,
                            destination_units = grant.destination_units,
                            "weight exceeds pool capacity; reserving whole pool with stretched cooldown"
                        );
                    }
                    debug!(%destination, weight, ticket = waiter.ticket, "capacity acquired");

                    return Ok(Lease {
                        inner: Arc::clone(&self.inner),
                        destination: destination.clone(),
                        weight,
                        global_units: grant.global_units,
                        destination_units: grant.destination_units,
                        acquired_at: grant.acquired_at,
                    });
                }
                Attempt::Blocked { wake_at } => {
                    trace!(%destination, weight, ticket = waiter.ticket, ?wake_at, "waiting for capacity");
                    let timer = async {
                        match wake_at {
                            Some(at) => sleep_until(at).await,
                            None => std::future::pending().await,
                        }
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!(%destination, weight, ticket = waiter.ticket, "admission cancelled");
                            return Err(AdmissionError::Cancelled);
                        }
                        _ = &mut notified => {}
                        _ = timer => {}
                    }
                }
            }
        }
    }

    /// Returns a lease's capacity. Equivalent to dropping it.
    pub fn release(&self, lease: Lease) {
        lease.release();
    }

    /// Runs `work` while holding a lease, releasing it however `work` ends.
    ///
    /// `work` is not polled until admission succeeds; if this future is
    /// dropped mid-way the lease is released by its destructor.
    pub async fn admitted<F: Future>(
        &self,
        destination: &Destination,
        weight: u32,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<F::Output, AdmissionError> {
        let lease = self.acquire(destination, weight, cancel).await?;
        let output = work.await;
        lease.release();
        Ok(output)
    }

    /// Current state of every non-idle pool.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.inner.lock();
        let now = Instant::now();
        SchedulerSnapshot {
            global: state.global.snapshot(now),
            destinations: state
                .destinations
                .iter()
                .filter(|(_, d)| !d.pool.is_idle(now))
                .map(|(chat, d)| (chat.clone(), d.pool.snapshot(now)))
                .collect(),
            waiting: state.waiting,
        }
    }

    /// Lifetime acquire/release counters.
    pub fn stats(&self) -> SchedulerStats {
        self.inner.lock().stats
    }
}

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

/// Capacity reserved for one in-flight call.
///
/// Released exactly once: by [`Lease::release`], or when dropped on any
/// other exit path (error, cancellation, panic).
pub struct Lease {
    inner: Arc<Inner>,
    destination: Destination,
    weight: u32,
    global_units: u32,
    destination_units: u32,
    acquired_at: Instant,
}

impl Lease {
    /// Destination this lease was charged to.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Weight requested for this lease.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// When the lease was granted.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Returns the reserved capacity.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.inner.release(self);
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("destination", &self.destination)
            .field("weight", &self.weight)
            .field("global_units", &self.global_units)
            .field("destination_units", &self.destination_units)
            .finish()
    }
}
