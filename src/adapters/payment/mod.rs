//! Payment processor adapters.

mod mock_processor;

pub use mock_processor::{MockPaymentProcessor, ScriptedCharge};
