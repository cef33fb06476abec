//! 1:1 call signaling with tracked call sessions.

pub mod relay;
pub mod session;

pub use relay::CallRelay;
pub use session::{AnswerOutcome, CallSession, CallSessionTable, CallState, EndOutcome, RejectOutcome};
