//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus capturing events for assertions

mod in_memory;

pub use in_memory::InMemoryEventBus;
