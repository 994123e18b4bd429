// src/lib.rs
//! Message validation and evidence checks for the Hare agreement protocol.
//!
//! The state machine driving an instance calls, for each received message,
//! [`MessageValidator::syntactically_validate_message`], then
//! [`MessageValidator::contextually_validate_message`] with its current
//! round, then [`EligibilityValidator::validate_role`]. Proposal SVPs and
//! Notify certificates are re-checked by every recipient through the same
//! quorum-bundle rules.
pub mod config;
pub mod hare;
pub mod signing;

pub use crate::config::{ConfigError, HareConfig};
pub use crate::hare::{EligibilityValidator, MessageValidator};
