//! Purchase Engine - Purchase and Subscription Orchestration
//!
//! This crate decides how a plan purchase on a host is carried out (new sale,
//! renewal, billing-frequency switch or reactivation), drives payment through
//! an external processor and records the outcome as transactions and invoices.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
