//! Domain events and their distribution.
//!
//! Billing aggregates describe every committed change as an event. The
//! application layer wraps those events in an [`EventEnvelope`] and publishes
//! them on an [`EventBus`] so audit consumers see the full history of each
//! quotation and invoice.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
