//! Core domain types and logic.

pub mod money;
pub mod position;
pub mod portfolio;
pub mod hooks;
pub mod replay;
pub mod simulation;
pub mod config;
pub mod error;
