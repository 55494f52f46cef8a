//! AUTOTRADER — Autonomous Multi-Chain Token Trading Engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod error;
pub mod types;
pub mod chain;
pub mod data;
pub mod engine;
pub mod server;
