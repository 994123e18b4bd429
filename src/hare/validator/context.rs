// src/hare/validator/context.rs
use tracing::debug;

use super::MessageValidator;
use crate::hare::error::ValidationError;
use crate::hare::message::{MessageType, Msg, Round};

/// Offsets, relative to the start of the message's iteration, at which a
/// message type is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidOffsets {
    Any,
    Only(&'static [i64]),
}

impl ValidOffsets {
    pub fn contains(&self, offset: i64) -> bool {
        match self {
            ValidOffsets::Any => true,
            ValidOffsets::Only(offsets) => offsets.contains(&offset),
        }
    }
}

/// Round window of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    pub valid: ValidOffsets,
    /// Offset one round before the window opens; reported as early.
    pub early: Option<i64>,
}

/// The acceptance table. This is the whole round-window policy.
pub const fn acceptance(msg_type: MessageType) -> Acceptance {
    match msg_type {
        MessageType::PreRound | MessageType::Notify => Acceptance {
            valid: ValidOffsets::Any,
            early: None,
        },
        MessageType::Status => Acceptance {
            valid: ValidOffsets::Only(&[0]),
            early: Some(-1),
        },
        MessageType::Proposal => Acceptance {
            valid: ValidOffsets::Only(&[1, 2]),
            early: Some(0),
        },
        MessageType::Commit => Acceptance {
            valid: ValidOffsets::Only(&[2]),
            early: Some(1),
        },
    }
}

impl MessageValidator {
    /// Check whether a message may enter the pools at local round `k`.
    ///
    /// `Ok(false)` means stale or inapplicable and should be dropped
    /// silently. [`ValidationError::EarlyMessage`] asks the caller to buffer
    /// the message until its round advances.
    pub fn contextually_validate_message(
        &self,
        msg: &Msg,
        k: Round,
    ) -> Result<bool, ValidationError> {
        let inner = msg.inner().ok_or(ValidationError::MalformedMessage)?;
        let window = acceptance(inner.msg_type);
        let offset = k.as_i64() - inner.k.iteration_start().as_i64();

        if window.early == Some(offset) {
            debug!(
                "Early {} message for round {} at local round {}",
                inner.msg_type, inner.k, k
            );
            return Err(ValidationError::EarlyMessage);
        }

        let accepted = window.valid.contains(offset);
        if !accepted {
            debug!(
                "Dropping {} message for round {} at local round {}",
                inner.msg_type, inner.k, k
            );
        }
        Ok(accepted)
    }
}
