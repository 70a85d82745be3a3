//! Ordered-fallback execution
//!
//! Several operations share one shape: try a list of candidates in order,
//! stop at the first success, and decide after each failure whether the next
//! candidate is worth trying. This module implements that shape once.
//!
//! Call sites:
//! - credential retry: `[WithCredentials, WithoutCredentials]`, falling
//!   through only when the failure is a credential expiry
//! - translation mirrors: every configured backend, falling through on any error
//! - voiceover cascade: dubbed track first, falling through to the
//!   duration-selected method when the dubbed download fails
//!
//! # Example
//!
//! ```no_run
//! use audiofeed::fallback::{run_in_order, FallbackError};
//!
//! # async fn example() {
//! let mirrors = vec!["https://a.example", "https://b.example"];
//! let result = run_in_order(
//!     mirrors,
//!     |mirror| async move { Err::<String, _>(format!("{mirror} is down")) },
//!     |_, _| true,
//! )
//! .await;
//! assert!(matches!(result, Err(FallbackError::Failed(_))));
//! # }
//! ```

use std::fmt::{Debug, Display};
use std::future::Future;

/// Winning attempt of an ordered fallback
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Success<C, T> {
    /// The candidate that succeeded
    pub candidate: C,
    /// Its result
    pub value: T,
    /// Number of attempts made, including the winning one
    pub attempts: usize,
}

/// Why an ordered fallback produced no result
#[derive(Debug, thiserror::Error)]
pub enum FallbackError<E> {
    /// The candidate list was empty
    #[error("no candidates to try")]
    NoCandidates,
    /// The last attempted candidate failed with this error
    #[error("{0}")]
    Failed(E),
}

impl<E> FallbackError<E> {
    /// Collapse into the underlying error, mapping an empty list through `empty`
    pub fn into_error(self, empty: impl FnOnce() -> E) -> E {
        match self {
            FallbackError::NoCandidates => empty(),
            FallbackError::Failed(e) => e,
        }
    }
}

/// Whether an attempt should go out with stored credentials attached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Pass the configured cookies file
    With,
    /// Omit it
    Without,
}

impl Credentials {
    /// Candidate list for the credential-expiry retry
    ///
    /// Without a configured cookies file there is nothing to drop, so the
    /// call runs exactly once.
    pub fn candidates(has_credentials: bool) -> Vec<Credentials> {
        if has_credentials {
            vec![Credentials::With, Credentials::Without]
        } else {
            vec![Credentials::Without]
        }
    }
}

/// Try `candidates` in order until one succeeds
///
/// After each failure `fall_through(&candidate, &error)` decides whether the
/// next candidate is tried. When it declines, or the list runs out, the error
/// of the last attempt is returned; earlier errors are logged and dropped.
pub async fn run_in_order<C, T, E, I, F, Fut, P>(
    candidates: I,
    mut attempt: F,
    mut fall_through: P,
) -> Result<Success<C, T>, FallbackError<E>>
where
    I: IntoIterator<Item = C>,
    C: Clone + Debug,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&C, &E) -> bool,
    E: Display,
{
    let mut candidates = candidates.into_iter().peekable();
    let mut attempts = 0;

    while let Some(candidate) = candidates.next() {
        attempts += 1;
        match attempt(candidate.clone()).await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(?candidate, attempts, "Succeeded after fallback");
                }
                return Ok(Success {
                    candidate,
                    value,
                    attempts,
                });
            }
            Err(e) => {
                let proceed = candidates.peek().is_some() && fall_through(&candidate, &e);
                if proceed {
                    tracing::warn!(
                        ?candidate,
                        error = %e,
                        attempt = attempts,
                        "Candidate failed, trying next"
                    );
                } else {
                    tracing::debug!(?candidate, error = %e, attempts, "Fallback exhausted");
                    return Err(FallbackError::Failed(e));
                }
            }
        }
    }

    // every failure either falls through to a next candidate or returns above
    Err(FallbackError::NoCandidates)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ToolFailure, classify_tool_failure};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_success_wins_without_further_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = run_in_order(
            vec![1, 2, 3],
            |n| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(n * 10)
                }
            },
            |_, _| true,
        )
        .await
        .unwrap();

        assert_eq!(result.candidate, 1);
        assert_eq!(result.value, 10);
        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn third_mirror_wins_and_earlier_failures_are_hidden() {
        let mirrors = vec!["first", "second", "third"];

        let result = run_in_order(
            mirrors,
            |mirror| async move {
                if mirror == "third" {
                    Ok(format!("translated by {mirror}"))
                } else {
                    Err(format!("{mirror} failed"))
                }
            },
            |_, _| true,
        )
        .await
        .unwrap();

        assert_eq!(result.value, "translated by third");
        assert_eq!(result.candidate, "third");
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn all_failing_surfaces_last_error() {
        let result = run_in_order(
            vec!["a", "b"],
            |m| async move { Err::<(), _>(format!("{m} down")) },
            |_, _| true,
        )
        .await;

        match result {
            Err(FallbackError::Failed(e)) => assert_eq!(e, "b down"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn credential_expiry_retries_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        let result = run_in_order(
            Credentials::candidates(true),
            |creds| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(creds);
                    let msg = match creds {
                        Credentials::With => "ERROR: cookies are no longer valid (first)",
                        Credentials::Without => "ERROR: Sign in to confirm your age (second)",
                    };
                    Err::<(), _>(msg.to_string())
                }
            },
            |_, e| classify_tool_failure(e) == ToolFailure::CredentialExpired,
        )
        .await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Credentials::With, Credentials::Without]
        );
        match result {
            Err(FallbackError::Failed(e)) => assert!(e.contains("(second)")),
            other => panic!("expected second failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_credential_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = run_in_order(
            Credentials::candidates(true),
            |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("ERROR: Video unavailable".to_string())
                }
            },
            |_, e| classify_tool_failure(e) == ToolFailure::CredentialExpired,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_credentials_means_single_attempt() {
        assert_eq!(Credentials::candidates(false), vec![Credentials::Without]);
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let result = run_in_order(
            Vec::<u8>::new(),
            |_| async { Ok::<(), String>(()) },
            |_, _| true,
        )
        .await;
        assert!(matches!(result, Err(FallbackError::NoCandidates)));
        assert_eq!(
            result.unwrap_err().into_error(|| "none".to_string()),
            "none"
        );
    }
}
