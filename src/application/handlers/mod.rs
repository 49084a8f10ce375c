//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod purchase;

pub use purchase::{
    BalanceLedger, ChargeExecutor, PreviewPlanHandler, PreviewPlanQuery, PurchaseCommand,
    PurchaseDependencies, PurchaseLocks, PurchaseOrchestrator, RecurringBilling,
    SubscriptionManager, TransactionRecorder,
};
