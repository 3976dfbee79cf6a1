//! Calculation events on the broker: publishing after a calculation is
//! stored, and the background consumer that drains the same topic.

pub mod consumer;
pub mod handler;
pub mod publisher;

pub use consumer::{ConsumerHandle, ConsumerState, EventConsumer};
pub use handler::{EventHandler, EventIndex, HandleOutcome, HandlerError};
pub use publisher::{EventPublisher, PublishError};
