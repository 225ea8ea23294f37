//! Operator strokes: events, the gesture state machine and the queue
//! that hands strokes to the iteration loop.

pub mod event;
pub mod gesture;
pub mod queue;

pub use event::{InteractionEvent, ViewportId};
pub use gesture::{GestureState, GestureTracker};
pub use queue::{BacklogPolicy, InteractionQueue, SOFT_BACKLOG_LIMIT};
