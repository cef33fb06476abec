//! 1:1 call signaling relay.
//!
//! Calls are addressed by user id: `call:incoming` fans out to every
//! device of the target so any one of them can answer. Session state
//! lives in [`CallSessionTable`]; this relay turns transition outcomes
//! into deliveries and error acknowledgements.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use lumen_core::types::{CallId, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::SocketRegistry;
use crate::event::{CallType, ServerEvent, codes};
use crate::metrics::GatewayMetrics;
use crate::push::PushSender;

use super::session::{AnswerOutcome, CallSessionTable, EndOutcome, RejectOutcome};

/// Relays 1:1 call signaling with tracked sessions.
#[derive(Debug)]
pub struct CallRelay {
    registry: Arc<SocketRegistry>,
    sessions: Arc<CallSessionTable>,
    push: Arc<dyn PushSender>,
    metrics: Arc<GatewayMetrics>,
}

impl CallRelay {
    /// Creates a new call relay.
    pub fn new(
        registry: Arc<SocketRegistry>,
        sessions: Arc<CallSessionTable>,
        push: Arc<dyn PushSender>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            sessions,
            push,
            metrics,
        }
    }

    /// Initiates a call: creates the session, fans `call:incoming` out to
    /// every device of the target, and fires a best-effort push
    /// notification for backgrounded devices.
    ///
    /// A target with zero live connections is not an error here; the
    /// push notification is the path that reaches them.
    pub fn initiate(
        &self,
        caller: &Arc<ConnectionHandle>,
        target_user_id: UserId,
        call_type: CallType,
        caller_info: Option<Value>,
    ) -> CallId {
        let call_id =
            self.sessions
                .create(caller.user_id.clone(), target_user_id.clone(), call_type);
        self.metrics.call_initiated();

        info!(
            call_id = %call_id,
            caller_id = %caller.user_id,
            target_user_id = %target_user_id,
            "Call initiated"
        );

        let incoming = ServerEvent::CallIncoming {
            call_id,
            caller_id: caller.user_id.clone(),
            call_type,
            caller_info: caller_info.clone(),
        };
        let sent = self.registry.send_to_user(&target_user_id, &incoming);
        self.metrics.messages_sent(sent);

        caller.send(&ServerEvent::CallInitiated {
            call_id,
            target_user_id: target_user_id.clone(),
        });
        self.metrics.messages_sent(1);

        let push = self.push.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            metrics.push_attempted();
            if let Err(e) = push
                .send_call_notification(&target_user_id, call_id, call_type, caller_info.as_ref())
                .await
            {
                metrics.push_failed();
                warn!(call_id = %call_id, error = %e, "Call push notification failed");
            }
        });

        call_id
    }

    /// Answers a call. First answer wins; later answers are rejected with
    /// `CALL_ALREADY_ANSWERED`.
    pub fn answer(
        &self,
        answerer: &Arc<ConnectionHandle>,
        call_id: CallId,
        target_user_id: UserId,
        sdp: Value,
    ) {
        match self.sessions.answer(&call_id) {
            AnswerOutcome::Accepted => {
                let event = ServerEvent::CallAccepted {
                    call_id,
                    user_id: answerer.user_id.clone(),
                    sdp,
                };
                self.relay_or_unreachable(answerer, &target_user_id, &event);
            }
            AnswerOutcome::AlreadyAnswered => {
                self.reject_event(
                    answerer,
                    codes::CALL_ALREADY_ANSWERED,
                    "Another device already answered this call",
                );
            }
            AnswerOutcome::Unknown => {
                self.reject_event(answerer, codes::UNKNOWN_CALL, "No active call for this id");
            }
        }
    }

    /// Rejects a call. Only applies before an answer.
    pub fn reject(&self, rejecter: &Arc<ConnectionHandle>, call_id: CallId, target_user_id: UserId) {
        match self.sessions.reject(&call_id) {
            RejectOutcome::Rejected => {
                let event = ServerEvent::CallRejected {
                    call_id,
                    user_id: rejecter.user_id.clone(),
                };
                self.relay_or_unreachable(rejecter, &target_user_id, &event);
            }
            RejectOutcome::AlreadyAnswered => {
                self.reject_event(
                    rejecter,
                    codes::CALL_ALREADY_ANSWERED,
                    "The call was already answered",
                );
            }
            RejectOutcome::Noop => {}
            RejectOutcome::Unknown => {
                self.reject_event(rejecter, codes::UNKNOWN_CALL, "No active call for this id");
            }
        }
    }

    /// Ends a call. Ending an already-ended call is a no-op.
    pub fn end(&self, ender: &Arc<ConnectionHandle>, call_id: CallId, target_user_id: UserId) {
        match self.sessions.end(&call_id) {
            EndOutcome::Ended => {
                let event = ServerEvent::CallEnded {
                    call_id,
                    user_id: ender.user_id.clone(),
                };
                self.relay_or_unreachable(ender, &target_user_id, &event);
            }
            EndOutcome::Noop => {}
            EndOutcome::Unknown => {
                self.reject_event(ender, codes::UNKNOWN_CALL, "No active call for this id");
            }
        }
    }

    /// Relays an ICE candidate. Not validated against the session table:
    /// candidates legitimately race call teardown.
    pub fn ice_candidate(
        &self,
        sender: &Arc<ConnectionHandle>,
        call_id: CallId,
        target_user_id: UserId,
        candidate: Value,
    ) {
        let event = ServerEvent::CallIceCandidate {
            call_id,
            user_id: sender.user_id.clone(),
            candidate,
        };
        self.relay_or_unreachable(sender, &target_user_id, &event);
    }

    /// Relays a bare SDP offer outside the tracked handshake.
    pub fn offer(&self, sender: &Arc<ConnectionHandle>, target_user_id: UserId, sdp: Value) {
        let event = ServerEvent::CallOffer {
            from_user_id: sender.user_id.clone(),
            sdp,
        };
        self.relay_or_unreachable(sender, &target_user_id, &event);
    }

    /// Delivers to every device of the target, surfacing an unreachable
    /// target to the sender.
    fn relay_or_unreachable(
        &self,
        sender: &Arc<ConnectionHandle>,
        target_user_id: &UserId,
        event: &ServerEvent,
    ) {
        let sent = self.registry.send_to_user(target_user_id, event);
        if sent == 0 {
            self.reject_event(
                sender,
                codes::TARGET_UNREACHABLE,
                "Target user has no live connection",
            );
        } else {
            self.metrics.messages_sent(sent);
        }
    }

    fn reject_event(&self, recipient: &Arc<ConnectionHandle>, code: &str, message: &str) {
        self.metrics.event_rejected();
        recipient.send(&ServerEvent::error(code, message));
    }
}
