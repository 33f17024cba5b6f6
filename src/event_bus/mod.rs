//! In-process event plumbing for a run.
//!
//! Producers push [`Event`]s onto a flume channel; a listener task fans
//! them out to [`EventSink`]s. The wire multiplexer is just another sink
//! consumer, attached through a [`ChannelSink`].

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{
    DiagnosticEvent, Event, RunEndedEvent, RunOutcome, StepUpdateEvent, TokenEvent,
};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
