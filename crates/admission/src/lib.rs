//! Courier admission control.
//!
//! Every outbound Bot API call is bracketed by [`Scheduler::acquire`] and the
//! release of the returned [`Lease`]. Capacity is drawn from a global pool and
//! from a per-destination pool, weighted by the number of remote-visible
//! actions the call performs, and returned units only become reusable after
//! the pool's spacing interval. This models the platform's flood limits as a
//! rate, not as a concurrency cap.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** This crate decides *when* a call may start. It never
//! sees request bodies or responses; the `client` crate sequences admission,
//! encoding and transport.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`policy`] | `RatePolicy` / `PoolPolicy` configuration |
//! | [`scheduler`] | `Scheduler`, `Lease`, snapshots and counters |
//! | [`error`] | `AdmissionError` |

pub mod error;
pub mod policy;
mod pool;
pub mod scheduler;

pub use error::AdmissionError;
pub use policy::{PolicyError, PoolPolicy, RatePolicy};
pub use pool::PoolSnapshot;
pub use scheduler::{Lease, Scheduler, SchedulerSnapshot, SchedulerStats};
