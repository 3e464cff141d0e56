//! Event bus adapters.
//!
//! - `InMemoryEventBus` - in-process bus that records and dispatches events

mod in_memory;

pub use in_memory::InMemoryEventBus;
