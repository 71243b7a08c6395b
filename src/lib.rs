// ABOUTME: Library root for deployer - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod process;
pub mod replay;
pub mod types;
