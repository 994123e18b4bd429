// src/hare/error.rs
use thiserror::Error;

use crate::hare::message::InstanceId;
use crate::signing::PublicKey;

/// Error type returned by external collaborators (role oracle, identity
/// state). Passed through unchanged so callers can decide on retries.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome classes of per-message validation that are not a plain
/// accept/drop verdict.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is absent. Never retried.
    #[error("malformed message: inner message is missing")]
    MalformedMessage,
    /// The message is one round ahead of local progress; buffer it and
    /// re-check after the round advances.
    #[error("early message: round is one step ahead of local progress")]
    EarlyMessage,
    /// The oracle or identity provider failed; the verdict is inconclusive.
    #[error(transparent)]
    Collaborator(CollaboratorError),
}

impl ValidationError {
    pub fn is_early(&self) -> bool {
        matches!(self, Self::EarlyMessage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    #[error("set capacity of {capacity} values exceeded")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("invalid round value {0} on the wire")]
    InvalidWireRound(i32),
    #[error("round {0} does not fit the wire encoding")]
    RoundOverflow(u32),
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),
}

/// First reason an aggregated bundle was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("bundle is missing")]
    Missing,
    #[error("bundle holds {have} messages, threshold is {need}")]
    BelowThreshold { have: usize, need: usize },
    #[error("member {index} has an invalid signature")]
    InvalidSignature { index: usize },
    #[error("member {index} is syntactically invalid")]
    MalformedMember { index: usize },
    #[error("member {index} is not eligible")]
    IneligibleMember { index: usize },
    #[error("member {index} failed a bundle predicate")]
    PredicateFailed { index: usize },
    #[error("equivocation: signer {signer} appears more than once")]
    DuplicateSigner { signer: PublicKey },
    #[error("equivocation: instance {found} does not match {expected}")]
    InstanceMismatch {
        expected: InstanceId,
        found: InstanceId,
    },
}

impl BundleError {
    /// Duplicate signers and disagreeing instances are proof of
    /// misbehaviour rather than an incomplete bundle.
    pub fn is_equivocation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSigner { .. } | Self::InstanceMismatch { .. }
        )
    }
}
