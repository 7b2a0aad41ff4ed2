//! Port traits for the collaborators the accounting core depends on.

pub mod config_port;
pub mod market_port;
