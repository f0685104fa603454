//! Recognition event model and observer fan-out
//!
//! Events are grouped into delivery categories (connection, session,
//! recognizing, recognized, canceled). The dispatcher guarantees
//! registration-order delivery within a category and isolates observer
//! failures from the session state machine.

mod dispatcher;
mod event;

pub use dispatcher::{EventDispatcher, Observer, SubscriptionHandle};
pub use event::{
    CancelErrorCode, CancelReason, EventCategory, Hypothesis, NoMatchReason, RecognitionEvent,
    RecognizedOutcome,
};
