//! Purchase handlers.
//!
//! ## Commands
//! - Buying a plan for a host, including bundled plans
//! - Renewing and switching subscriptions (`RecurringBilling`)
//!
//! ## Queries
//! - Previewing the plan a purchase would bill

mod balance_ledger;
mod charge;
mod dependencies;
mod prepare;
mod preview_plan;
mod purchase_locks;
mod purchase_plan;
mod recurring_billing;
mod subscription_manager;
mod transaction_recorder;

pub use balance_ledger::BalanceLedger;
pub use charge::ChargeExecutor;
pub use dependencies::PurchaseDependencies;
pub use purchase_locks::PurchaseLocks;
pub use subscription_manager::SubscriptionManager;
pub use transaction_recorder::TransactionRecorder;

// Commands
pub use purchase_plan::{PurchaseCommand, PurchaseOrchestrator};
pub use recurring_billing::RecurringBilling;

// Queries
pub use preview_plan::{PreviewPlanHandler, PreviewPlanQuery};
