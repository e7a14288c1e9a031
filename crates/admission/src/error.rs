//! Admission failures.

use thiserror::Error;

/// Why [`crate::Scheduler::acquire`] gave up.
///
/// Exhaustion alone never fails an acquisition; the caller waits instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The caller's cancellation token fired before capacity was granted.
    #[error("admission cancelled before capacity was granted")]
    Cancelled,
}
