//! Core domain types and logic.

pub mod price;
pub mod panel;
pub mod indicator;
pub mod features;
pub mod selector;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
