//! Coaching core: conversation log, task timer, and the negotiation engine

pub mod conversation;
pub mod engine;
pub mod timer;

pub use conversation::{ConversationLog, Role, Turn};
pub use engine::{
    compose_content, compose_reflection, render_duration, FailureKind, NegotiationEngine,
    QuickReply, Session, SubmitOutcome,
};
pub use timer::{CountdownTimer, TimerState, TimerTick};
