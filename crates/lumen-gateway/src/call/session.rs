//! Tracked call sessions.
//!
//! Every 1:1 call gets a server-side session so concurrent answers from
//! multiple devices of the same target resolve deterministically: the
//! first answer wins, later answers are rejected. Transitions happen
//! under the table's per-entry lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use lumen_core::types::{CallId, UserId};

use crate::event::CallType;

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// `call:incoming` delivered, waiting for a device to answer.
    Initiated,
    /// One device answered; the call is live.
    Accepted,
    /// Terminal: rejected or ended.
    Ended,
}

/// A tracked 1:1 call.
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Unique call id.
    pub call_id: CallId,
    /// Initiating user.
    pub caller_id: UserId,
    /// Target user (any of their devices may answer).
    pub target_user_id: UserId,
    /// Audio or video.
    pub call_type: CallType,
    /// Current state.
    pub state: CallState,
    /// When the call was initiated.
    pub created_at: DateTime<Utc>,
}

/// Result of attempting to answer a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// This answer won; relay `call:accepted`.
    Accepted,
    /// Another device answered first.
    AlreadyAnswered,
    /// No active session for the call id.
    Unknown,
}

/// Result of attempting to reject a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    /// Rejected; relay `call:rejected`.
    Rejected,
    /// The call was already answered; a reject no longer applies.
    AlreadyAnswered,
    /// Already in a terminal state; nothing to do.
    Noop,
    /// No active session for the call id.
    Unknown,
}

/// Result of attempting to end a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// Ended; relay `call:ended`.
    Ended,
    /// Already ended; ending twice is a no-op.
    Noop,
    /// No active session for the call id.
    Unknown,
}

/// Table of active call sessions.
#[derive(Debug, Default)]
pub struct CallSessionTable {
    sessions: DashMap<CallId, CallSession>,
}

impl CallSessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new session in the `Initiated` state, returning its id.
    pub fn create(&self, caller_id: UserId, target_user_id: UserId, call_type: CallType) -> CallId {
        let call_id = Uuid::new_v4();
        self.sessions.insert(
            call_id,
            CallSession {
                call_id,
                caller_id,
                target_user_id,
                call_type,
                state: CallState::Initiated,
                created_at: Utc::now(),
            },
        );
        call_id
    }

    /// Attempts the `Initiated → Accepted` transition.
    pub fn answer(&self, call_id: &CallId) -> AnswerOutcome {
        match self.sessions.get_mut(call_id) {
            Some(mut session) => match session.state {
                CallState::Initiated => {
                    session.state = CallState::Accepted;
                    AnswerOutcome::Accepted
                }
                CallState::Accepted => AnswerOutcome::AlreadyAnswered,
                CallState::Ended => AnswerOutcome::Unknown,
            },
            None => AnswerOutcome::Unknown,
        }
    }

    /// Attempts the `Initiated → Ended` transition via reject.
    pub fn reject(&self, call_id: &CallId) -> RejectOutcome {
        match self.sessions.get_mut(call_id) {
            Some(mut session) => match session.state {
                CallState::Initiated => {
                    session.state = CallState::Ended;
                    RejectOutcome::Rejected
                }
                CallState::Accepted => RejectOutcome::AlreadyAnswered,
                CallState::Ended => RejectOutcome::Noop,
            },
            None => RejectOutcome::Unknown,
        }
    }

    /// Ends a call. Idempotent: a second end on the same session is a
    /// no-op, not an error.
    pub fn end(&self, call_id: &CallId) -> EndOutcome {
        match self.sessions.get_mut(call_id) {
            Some(mut session) => match session.state {
                CallState::Initiated | CallState::Accepted => {
                    session.state = CallState::Ended;
                    EndOutcome::Ended
                }
                CallState::Ended => EndOutcome::Noop,
            },
            None => EndOutcome::Unknown,
        }
    }

    /// Returns a snapshot of a session.
    pub fn get(&self, call_id: &CallId) -> Option<CallSession> {
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    /// Removes ended sessions and sessions older than `max_age_seconds`.
    /// Returns how many were dropped.
    pub fn prune(&self, max_age_seconds: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_seconds);
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.state != CallState::Ended && session.created_at > cutoff);
        before - self.sessions.len()
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
