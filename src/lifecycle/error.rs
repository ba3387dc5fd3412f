//! Combined result of a lifecycle run.

use std::fmt;

use thiserror::Error;

use crate::lifecycle::server::{ServeError, ShutdownError};

/// A single cause recorded during a run.
#[derive(Debug, Error)]
pub enum Failure {
    /// The serve loop failed with something other than the close sentinel.
    #[error("server listen and serve: {0}")]
    Serve(#[from] ServeError),

    /// The shutdown call failed or ran past its deadline.
    #[error("server shutdown: {0}")]
    Shutdown(#[from] ShutdownError),

    /// Signal subscription could not be registered; the server was not started.
    #[error("register signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

/// Every failure recorded during one run, in the order they were recorded.
///
/// Never empty: a clean run returns `Ok(())` instead.
#[derive(Debug)]
pub struct LifecycleError {
    failures: Vec<Failure>,
}

impl LifecycleError {
    /// Merge recorded failures. Returns `None` when there are none.
    pub fn join(failures: impl IntoIterator<Item = Failure>) -> Option<Self> {
        let failures: Vec<Failure> = failures.into_iter().collect();
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    /// The serve failure, if one was recorded.
    pub fn serve_error(&self) -> Option<&ServeError> {
        self.failures.iter().find_map(|f| match f {
            Failure::Serve(e) => Some(e),
            _ => None,
        })
    }

    /// The shutdown failure, if one was recorded.
    pub fn shutdown_error(&self) -> Option<&ShutdownError> {
        self.failures.iter().find_map(|f| match f {
            Failure::Shutdown(e) => Some(e),
            _ => None,
        })
    }
}

impl From<Failure> for LifecycleError {
    fn from(failure: Failure) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| f as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_nothing_is_none() {
        assert!(LifecycleError::join(Vec::new()).is_none());
    }

    #[test]
    fn display_lists_every_failure() {
        let err = LifecycleError::join(vec![
            Failure::Serve(ServeError::Io(std::io::Error::other("accept failed"))),
            Failure::Shutdown(ShutdownError::DeadlineExceeded),
        ])
        .unwrap();

        let text = err.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("accept failed"));
        assert!(text.contains("shutdown deadline exceeded"));
        assert!(err.serve_error().is_some());
        assert!(matches!(err.shutdown_error(), Some(ShutdownError::DeadlineExceeded)));
    }
}
