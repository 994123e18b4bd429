// src/hare/eligibility.rs
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HareConfig;
use crate::hare::error::{CollaboratorError, ValidationError};
use crate::hare::message::{InstanceId, Msg, Round};
use crate::hare::validator::MemberCheck;
use crate::signing::PublicKey;

/// Lottery deciding which identities act in a round.
pub trait RoleOracle: Send + Sync {
    fn eligible(
        &self,
        instance_id: InstanceId,
        round: Round,
        committee_size: usize,
        pub_key: &PublicKey,
        proof: &[u8],
    ) -> Result<bool, CollaboratorError>;
}

/// Source of truth for which identities are active.
pub trait IdentityStateQuerier: Send + Sync {
    fn is_identity_active(
        &self,
        pub_key: &PublicKey,
        instance_id: InstanceId,
    ) -> Result<bool, CollaboratorError>;
}

/// Gates committee membership of a message's sender.
#[derive(Clone)]
pub struct EligibilityValidator {
    oracle: Arc<dyn RoleOracle>,
    identities: Arc<dyn IdentityStateQuerier>,
    committee_size: usize,
}

impl EligibilityValidator {
    pub fn new(
        oracle: Arc<dyn RoleOracle>,
        identities: Arc<dyn IdentityStateQuerier>,
        committee_size: usize,
    ) -> Self {
        Self {
            oracle,
            identities,
            committee_size,
        }
    }

    /// Validator sized by the instance configuration.
    pub fn from_config(
        config: &HareConfig,
        oracle: Arc<dyn RoleOracle>,
        identities: Arc<dyn IdentityStateQuerier>,
    ) -> Self {
        Self::new(oracle, identities, config.committee_size)
    }

    pub fn committee_size(&self) -> usize {
        self.committee_size
    }

    /// Decide whether the sender may act in the message's round.
    ///
    /// The identity check runs first. A collaborator error is returned
    /// as-is and means the verdict is inconclusive.
    pub fn validate_role(&self, msg: &Msg) -> Result<bool, ValidationError> {
        let inner = msg.inner().ok_or(ValidationError::MalformedMessage)?;
        let pub_key = msg.pub_key.ok_or(ValidationError::MalformedMessage)?;

        let active = self
            .identities
            .is_identity_active(&pub_key, inner.instance_id)
            .map_err(ValidationError::Collaborator)?;
        if !active {
            debug!(
                "Identity {} is not active for instance {}",
                pub_key.short(),
                inner.instance_id
            );
            return Ok(false);
        }

        let eligible = self
            .oracle
            .eligible(
                inner.instance_id,
                inner.k,
                self.committee_size,
                &pub_key,
                &inner.role_proof,
            )
            .map_err(ValidationError::Collaborator)?;
        if !eligible {
            debug!(
                "Identity {} is not eligible for round {} of instance {}",
                pub_key.short(),
                inner.k,
                inner.instance_id
            );
        }
        Ok(eligible)
    }

    /// Adapt [`validate_role`](Self::validate_role) to the bundle member
    /// check. Inconclusive results count as ineligible.
    pub fn member_check(&self) -> MemberCheck {
        let validator = self.clone();
        Arc::new(move |msg: &Msg| match validator.validate_role(msg) {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!("Role validation of bundle member failed: {}", e);
                false
            }
        })
    }
}
