//! Payroll Cycle Engine
//!
//! This crate implements the payroll cycle workflow: the employee-side pay
//! period window and submission ledger, and the admin-side batch pipeline
//! that locks FX rates, clears exceptions, gathers approval, executes
//! payments one at a time and reconciles the resulting receipts.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod workflow;
