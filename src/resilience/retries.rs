//! Bounded retry.
//!
//! # Responsibilities
//! - Run an operation up to a fixed number of attempts
//! - Keep every failure so callers can report all causes, not just the last
//!
//! # Design Decisions
//! - No delay between attempts; framing retries continue on the same stream
//! - The attempt number is passed in so callers can log and count per attempt

use std::fmt::Display;

/// Run `op` until it succeeds or `max_attempts` have failed.
///
/// `op` receives the 1-based attempt number. On exhaustion the errors are
/// returned in attempt order. A `max_attempts` of zero is treated as one.
pub fn bounded<T, E, F>(max_attempts: usize, mut op: F) -> Result<T, Vec<E>>
where
    E: Display,
    F: FnMut(usize) -> Result<T, E>,
{
    let max_attempts = max_attempts.max(1);
    let mut errors = Vec::with_capacity(max_attempts);

    for attempt in 1..=max_attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < max_attempts {
                    tracing::debug!(attempt, max_attempts, error = %e, "attempt failed, retrying");
                }
                errors.push(e);
            }
        }
    }

    Err(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_stops() {
        let mut calls = 0;
        let result: Result<u32, Vec<String>> = bounded(2, |_| {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_then_success() {
        let result = bounded(2, |attempt| {
            if attempt == 1 {
                Err("transient")
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn exhaustion_keeps_every_error_in_order() {
        let mut calls = 0;
        let result: Result<(), Vec<String>> = bounded(2, |attempt| {
            calls += 1;
            Err(format!("failure {attempt}"))
        });
        assert_eq!(result.unwrap_err(), vec!["failure 1", "failure 2"]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_attempts_runs_once() {
        let mut calls = 0;
        let _: Result<(), Vec<&str>> = bounded(0, |_| {
            calls += 1;
            Err("no")
        });
        assert_eq!(calls, 1);
    }
}
