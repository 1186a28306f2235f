//! Enrollment session state machine.

use mien_core::{Descriptor, Identity};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("enrollment name must not be empty")]
    InvalidInput,
    #[error("enrollment already in progress for '{0}'")]
    Busy(String),
}

/// Outcome of offering a descriptor to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    /// No session is active. The descriptor is handed back so the caller
    /// can route it to the recognition branch instead.
    Ignored(Descriptor),
    /// Sample accepted; the session keeps collecting.
    Collected { count: usize, quota: usize },
    /// This sample reached the quota: the session committed and
    /// deactivated, yielding the finished identity.
    Committed(Identity),
}

/// An abandoned in-progress enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct Cancelled {
    pub name: String,
    pub collected: usize,
}

enum State {
    Inactive,
    Collecting {
        name: String,
        samples: Vec<Descriptor>,
    },
}

/// Guided multi-sample enrollment.
///
/// Accumulates a fixed quota of descriptors for a newly named identity
/// and auto-commits when the quota is reached. Auto-commit is the sole
/// commit path; there is no manual finish operation. One session exists
/// pipeline-wide.
pub struct EnrollmentSession {
    state: State,
    quota: usize,
}

impl EnrollmentSession {
    pub fn new(quota: usize) -> Self {
        Self {
            state: State::Inactive,
            quota,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Collecting { .. })
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Begin collecting samples for `name` (trimmed).
    ///
    /// An in-progress session must finish or be cancelled first; it is
    /// never silently overwritten.
    pub fn start(&mut self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidInput);
        }
        if let State::Collecting { name: current, .. } = &self.state {
            return Err(SessionError::Busy(current.clone()));
        }
        self.state = State::Collecting {
            name: name.to_string(),
            samples: Vec::with_capacity(self.quota),
        };
        Ok(())
    }

    /// Offer one descriptor to the session.
    ///
    /// Transitions replace the whole state value in one step, so an
    /// observer never sees a half-committed session.
    pub fn offer(&mut self, descriptor: Descriptor) -> Offer {
        match std::mem::replace(&mut self.state, State::Inactive) {
            State::Inactive => Offer::Ignored(descriptor),
            State::Collecting { name, mut samples } => {
                samples.push(descriptor);
                let count = samples.len();
                if count >= self.quota {
                    Offer::Committed(Identity {
                        name,
                        descriptors: samples,
                    })
                } else {
                    self.state = State::Collecting { name, samples };
                    Offer::Collected {
                        count,
                        quota: self.quota,
                    }
                }
            }
        }
    }

    /// Abandon the in-progress session, if any, discarding its samples.
    /// Idempotent: cancelling an inactive session is a successful no-op.
    pub fn cancel(&mut self) -> Option<Cancelled> {
        match std::mem::replace(&mut self.state, State::Inactive) {
            State::Inactive => None,
            State::Collecting { name, samples } => Some(Cancelled {
                name,
                collected: samples.len(),
            }),
        }
    }

    /// Collection progress while active: `(samples collected, quota)`.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match &self.state {
            State::Inactive => None,
            State::Collecting { samples, .. } => Some((samples.len(), self.quota)),
        }
    }
}
