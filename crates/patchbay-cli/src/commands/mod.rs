//! CLI command implementations.

pub mod channels;
pub mod common;
pub mod control_panel;
pub mod devices;
pub mod rates;
pub mod run;
pub mod session;
