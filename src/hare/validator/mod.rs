// src/hare/validator/mod.rs
mod context;
mod quorum;
mod svp;

pub use context::{acceptance, Acceptance, ValidOffsets};
pub use quorum::Predicate;

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HareConfig;
use crate::hare::message::{MessageType, Msg};
use crate::hare::set::{Set, Value};
use crate::signing::SignatureVerifier;

/// Per-member eligibility check applied to every message inside a bundle.
pub type MemberCheck = Arc<dyn Fn(&Msg) -> bool + Send + Sync>;

/// Syntactic, contextual and bundle validation for one Hare instance.
///
/// All checks are pure functions of the message, the round snapshot passed
/// in by the caller, and the static configuration, so a single validator
/// can be shared across delivery paths.
#[derive(Clone)]
pub struct MessageValidator {
    threshold: usize,
    set_size: usize,
    verifier: Arc<dyn SignatureVerifier>,
    member_check: MemberCheck,
}

impl fmt::Debug for MessageValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageValidator")
            .field("threshold", &self.threshold)
            .field("set_size", &self.set_size)
            .finish()
    }
}

impl MessageValidator {
    pub fn new(
        config: &HareConfig,
        verifier: Arc<dyn SignatureVerifier>,
        member_check: MemberCheck,
    ) -> Self {
        Self {
            threshold: config.threshold,
            set_size: config.set_size,
            verifier,
            member_check,
        }
    }

    /// Validator that accepts every bundle member's role.
    pub fn without_member_check(config: &HareConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self::new(config, verifier, Arc::new(|_: &Msg| true))
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_size(&self) -> usize {
        self.set_size
    }

    /// Check that a message is self-consistent.
    ///
    /// Every message must name a sender and declare between one and
    /// `set_size` values. Proposals must carry a valid SVP. Notify messages
    /// must carry a valid certificate from their own instance for exactly
    /// the values they declare.
    pub fn syntactically_validate_message(&self, msg: &Msg) -> bool {
        let pub_key = match msg.pub_key {
            Some(key) => key,
            None => {
                warn!("Syntax validation failed: missing sender public key");
                return false;
            }
        };

        let inner = match msg.inner() {
            Some(inner) => inner,
            None => {
                warn!(
                    "Syntax validation failed: missing inner message from {}",
                    pub_key.short()
                );
                return false;
            }
        };

        if self.decode_values(&inner.values).is_none() {
            warn!(
                "Syntax validation failed: {} message from {} declares {} values (allowed 1..={})",
                inner.msg_type,
                pub_key.short(),
                inner.values.len(),
                self.set_size
            );
            return false;
        }

        match inner.msg_type {
            MessageType::Proposal => {
                if inner.svp.is_none() {
                    warn!(
                        "Syntax validation failed: proposal from {} has no SVP",
                        pub_key.short()
                    );
                    return false;
                }
                self.validate_svp(msg)
            }
            MessageType::Notify => {
                let cert = match inner.cert.as_ref() {
                    Some(cert) => cert,
                    None => {
                        warn!(
                            "Syntax validation failed: notify from {} has no certificate",
                            pub_key.short()
                        );
                        return false;
                    }
                };
                if self.decode_values(&cert.values) != self.decode_values(&inner.values) {
                    warn!(
                        "Syntax validation failed: notify from {} declares values its certificate does not prove",
                        pub_key.short()
                    );
                    return false;
                }
                self.validate_certificate_for(Some(cert), inner.instance_id)
            }
            MessageType::Status | MessageType::Commit | MessageType::PreRound => {
                debug!(
                    "{} message from {} is syntactically valid",
                    inner.msg_type,
                    pub_key.short()
                );
                true
            }
        }
    }

    /// Decode a declared value list into a non-empty set within capacity.
    /// The bound applies to the list as sent, before duplicates collapse.
    pub(crate) fn decode_values(&self, values: &[Value]) -> Option<Set> {
        if values.len() > self.set_size {
            return None;
        }
        match Set::from_values(self.set_size, values) {
            Ok(set) if !set.is_empty() => Some(set),
            _ => None,
        }
    }
}
