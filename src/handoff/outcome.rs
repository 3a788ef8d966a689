//! Step outcomes and the absorb policy of best-effort sequences.

use log::{error, warn};

use crate::metrics;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Unknown operation selector (errno EINVAL).
pub const EXIT_EINVAL: i32 = 22;

/// Result of one orchestrator step.
///
/// - `Ok` - step done.
/// - `Degraded` - step failed, the invocation can still succeed.
/// - `Fatal` - step failed and nothing after it makes sense.
///
/// Whether a failure is absorbed is decided by the caller: the protect and
/// teardown sequences absorb both `Degraded` and `Fatal` from their steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Ok(T),
    Degraded(String),
    Fatal(String),
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded(r) | Outcome::Fatal(r) => Some(r),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Degraded(r) => Outcome::Degraded(r),
            Outcome::Fatal(r) => Outcome::Fatal(r),
        }
    }

    /// Fatal becomes Degraded (используется для augmentation-пути).
    pub fn degrade(self) -> Self {
        match self {
            Outcome::Fatal(r) => Outcome::Degraded(r),
            other => other,
        }
    }

    /// Process exit status for a top-level outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Fatal(_) => EXIT_FAILURE,
            _ => EXIT_OK,
        }
    }
}

/// Collects the failures absorbed by a best-effort sequence.
#[derive(Debug, Default)]
pub struct Absorbed {
    reasons: Vec<String>,
}

impl Absorbed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unwrap a step's value; failures are logged, counted and remembered.
    pub fn take<T>(&mut self, step: &str, outcome: Outcome<T>) -> Option<T> {
        match outcome {
            Outcome::Ok(v) => Some(v),
            Outcome::Degraded(r) => {
                warn!("{}: {} (continuing)", step, r);
                self.note(step, r);
                None
            }
            Outcome::Fatal(r) => {
                error!("{}: {} (continuing)", step, r);
                self.note(step, r);
                None
            }
        }
    }

    fn note(&mut self, step: &str, reason: String) {
        metrics::record_degraded_step();
        self.reasons.push(format!("{}: {}", step, reason));
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn finish(self) -> Outcome {
        if self.reasons.is_empty() {
            Outcome::Ok(())
        } else {
            Outcome::Degraded(self.reasons.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Ok(()).exit_code(), EXIT_OK);
        assert_eq!(Outcome::<()>::Degraded("x".into()).exit_code(), EXIT_OK);
        assert_eq!(Outcome::<()>::Fatal("x".into()).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn absorbed_collects_reasons() {
        let mut a = Absorbed::new();
        assert_eq!(a.take("one", Outcome::Ok(5)), Some(5));
        assert_eq!(a.take::<()>("two", Outcome::Degraded("offline".into())), None);
        assert_eq!(a.take::<()>("three", Outcome::Fatal("io".into())), None);
        assert_eq!(
            a.finish(),
            Outcome::Degraded("two: offline; three: io".to_string())
        );
        assert!(Absorbed::new().finish().is_ok());
    }

    #[test]
    fn degrade_only_touches_fatal() {
        assert!(Outcome::<()>::Fatal("x".into()).degrade().is_degraded());
        assert!(Outcome::Ok(()).degrade().is_ok());
        assert_eq!(Outcome::Ok(2).map(|v| v * 2).ok(), Some(4));
    }
}
