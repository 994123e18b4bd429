// src/hare/validator/quorum.rs
use std::collections::HashSet;
use tracing::{debug, warn};

use super::MessageValidator;
use crate::hare::error::BundleError;
use crate::hare::message::{AggregatedMessages, Certificate, InstanceId, MessageType, Msg};

/// Condition every message of a bundle must satisfy.
pub type Predicate<'a> = &'a dyn Fn(&Msg) -> bool;

impl MessageValidator {
    /// Check a bundle against the quorum rules and `predicates`.
    ///
    /// The bundle needs at least `threshold` members. Each member must carry
    /// a valid signature, satisfy every predicate, and pass syntactic
    /// validation and the member eligibility check, in that order. Members
    /// must have distinct signers and a common instance. The first violation
    /// rejects the whole bundle.
    pub fn check_aggregated(
        &self,
        bundle: Option<&AggregatedMessages>,
        predicates: &[Predicate<'_>],
    ) -> Result<(), BundleError> {
        let bundle = bundle.ok_or(BundleError::Missing)?;
        if bundle.messages.len() < self.threshold {
            return Err(BundleError::BelowThreshold {
                have: bundle.messages.len(),
                need: self.threshold,
            });
        }

        let mut signers = HashSet::with_capacity(bundle.messages.len());
        let mut instance = None;

        for (index, message) in bundle.messages.iter().enumerate() {
            let inner = message
                .inner
                .as_ref()
                .ok_or(BundleError::MalformedMember { index })?;

            // Only authenticated members may raise equivocation errors
            let msg = Msg::from_message(message.clone(), self.verifier.as_ref())
                .map_err(|_| BundleError::InvalidSignature { index })?;
            let signer = msg.pub_key.ok_or(BundleError::InvalidSignature { index })?;

            if !signers.insert(signer) {
                return Err(BundleError::DuplicateSigner { signer });
            }
            match instance {
                None => instance = Some(inner.instance_id),
                Some(expected) if expected != inner.instance_id => {
                    return Err(BundleError::InstanceMismatch {
                        expected,
                        found: inner.instance_id,
                    });
                }
                Some(_) => {}
            }

            if !predicates.iter().all(|predicate| predicate(&msg)) {
                return Err(BundleError::PredicateFailed { index });
            }
            // Recursive: nested SVPs and certificates are checked here
            if !self.syntactically_validate_message(&msg) {
                return Err(BundleError::MalformedMember { index });
            }
            if !(self.member_check)(&msg) {
                return Err(BundleError::IneligibleMember { index });
            }
        }

        Ok(())
    }

    /// Boolean form of [`check_aggregated`](Self::check_aggregated).
    pub fn validate_aggregated(
        &self,
        bundle: Option<&AggregatedMessages>,
        predicates: &[Predicate<'_>],
    ) -> bool {
        match self.check_aggregated(bundle, predicates) {
            Ok(()) => true,
            Err(e) if e.is_equivocation() => {
                warn!("Aggregated bundle rejected, equivocation detected: {}", e);
                false
            }
            Err(e) => {
                warn!("Aggregated bundle rejected: {}", e);
                false
            }
        }
    }

    /// Check that a certificate proves its values were committed by a
    /// quorum of distinct signers.
    pub fn validate_certificate(&self, cert: Option<&Certificate>) -> bool {
        self.check_certificate(cert, None)
    }

    /// Like [`validate_certificate`](Self::validate_certificate), but the
    /// commits must also belong to `instance_id`.
    pub fn validate_certificate_for(
        &self,
        cert: Option<&Certificate>,
        instance_id: InstanceId,
    ) -> bool {
        self.check_certificate(cert, Some(instance_id))
    }

    fn check_certificate(&self, cert: Option<&Certificate>, instance: Option<InstanceId>) -> bool {
        let cert = match cert {
            Some(cert) => cert,
            None => {
                warn!("Certificate validation failed: certificate is missing");
                return false;
            }
        };
        if cert.agg_msgs.is_none() {
            warn!("Certificate validation failed: aggregated messages are missing");
            return false;
        }
        let values = match self.decode_values(&cert.values) {
            Some(values) => values,
            None => {
                warn!(
                    "Certificate validation failed: {} values declared",
                    cert.values.len()
                );
                return false;
            }
        };

        let is_commit = |m: &Msg| m.msg_type() == Some(MessageType::Commit);
        let commits_values = |m: &Msg| {
            m.inner()
                .and_then(|inner| self.decode_values(&inner.values))
                .map_or(false, |committed| committed == values)
        };

        let in_instance = |m: &Msg| match instance {
            Some(id) => m.inner().map_or(false, |inner| inner.instance_id == id),
            None => true,
        };

        let valid = self.validate_aggregated(
            cert.agg_msgs.as_ref(),
            &[&is_commit, &in_instance, &commits_values],
        );
        if valid {
            debug!("Certificate for {} is valid", values);
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hare::message::Round;
    use crate::hare::test_utils::*;
    use crate::signing::Signature;

    #[test]
    fn test_missing_or_short_bundles() {
        let validator = validator_with(10, 10);
        assert_eq!(validator.check_aggregated(None, &[]), Err(BundleError::Missing));
        assert!(!validator.validate_aggregated(None, &[]));

        let empty = AggregatedMessages::default();
        assert_eq!(
            validator.check_aggregated(Some(&empty), &[]),
            Err(BundleError::BelowThreshold { have: 0, need: 10 })
        );
    }

    #[test]
    fn test_threshold_boundary() {
        let threshold = 4;
        let validator = validator_with(threshold, 10);
        let set = set_of(&[value(1)]);

        let short = build_svp(None, &vec![set.clone(); threshold - 1]);
        assert!(!validator.validate_aggregated(Some(&short), &[]));

        let exact = build_svp(None, &vec![set.clone(); threshold]);
        assert!(validator.validate_aggregated(Some(&exact), &[]));
    }

    #[test]
    fn test_bad_signature_fails_bundle() {
        let validator = validator_with(3, 10);
        let mut bundle = build_svp(None, &vec![set_of(&[value(1)]); 3]);
        assert!(validator.validate_aggregated(Some(&bundle), &[]));

        bundle.messages[0].signature = Signature::from_bytes(vec![1]);
        assert_eq!(
            validator.check_aggregated(Some(&bundle), &[]),
            Err(BundleError::InvalidSignature { index: 0 })
        );
    }

    #[test]
    fn test_predicates_are_all_required() {
        let validator = validator_with(2, 10);
        let bundle = build_svp(None, &vec![set_of(&[value(1)]); 2]);

        let accept = |_: &Msg| true;
        let reject = |_: &Msg| false;
        assert!(validator.validate_aggregated(Some(&bundle), &[&accept]));
        assert_eq!(
            validator.check_aggregated(Some(&bundle), &[&accept, &reject]),
            Err(BundleError::PredicateFailed { index: 0 })
        );
    }

    #[test]
    fn test_duplicate_signer_is_equivocation() {
        let validator = validator_with(3, 10);
        let twice = signer();
        let set = set_of(&[value(1)]);
        let other = set_of(&[value(2)]);

        let bundle = AggregatedMessages::new(vec![
            status_msg(&twice, &set, None),
            status_msg(&signer(), &set, None),
            status_msg(&twice, &other, None),
        ]);
        let err = validator
            .check_aggregated(Some(&bundle), &[])
            .expect_err("duplicate signer must fail");
        assert_eq!(
            err,
            BundleError::DuplicateSigner {
                signer: twice.public_key()
            }
        );
        assert!(err.is_equivocation());
    }

    #[test]
    fn test_instance_mismatch_is_equivocation() -> Result<(), Box<dyn std::error::Error>> {
        let validator = validator_with(2, 10);
        let set = set_of(&[value(1)]);

        let first = status_msg(&signer(), &set, None);
        let second = MessageBuilder::new(MessageType::Status)
            .instance(InstanceId(7))
            .set(&set)
            .sign(&signer())?;
        let bundle = AggregatedMessages::new(vec![first, second]);

        let err = validator
            .check_aggregated(Some(&bundle), &[])
            .expect_err("instance mismatch must fail");
        assert_eq!(
            err,
            BundleError::InstanceMismatch {
                expected: InstanceId(0),
                found: InstanceId(7)
            }
        );
        assert!(err.is_equivocation());
        Ok(())
    }

    #[test]
    fn test_forged_member_is_not_equivocation() -> Result<(), Box<dyn std::error::Error>> {
        let validator = validator_with(2, 10);
        let set = set_of(&[value(1)]);

        let mut forged = MessageBuilder::new(MessageType::Status)
            .instance(InstanceId(7))
            .set(&set)
            .sign(&signer())?;
        forged.signature = Signature::from_bytes(vec![0; crate::signing::SIGNATURE_SIZE]);
        let bundle = AggregatedMessages::new(vec![status_msg(&signer(), &set, None), forged]);

        let err = validator
            .check_aggregated(Some(&bundle), &[])
            .expect_err("forged member must fail");
        assert_eq!(err, BundleError::InvalidSignature { index: 1 });
        assert!(!err.is_equivocation());
        Ok(())
    }

    #[test]
    fn test_predicates_run_before_nested_checks() -> Result<(), Box<dyn std::error::Error>> {
        let validator = validator_with(2, 10);
        let set = set_of(&[value(1)]);

        // Notify members without certificates are syntactically invalid
        let mut members = Vec::new();
        for _ in 0..2 {
            members.push(
                MessageBuilder::new(MessageType::Notify)
                    .round(Round::At(3))
                    .set(&set)
                    .sign(&signer())?,
            );
        }
        let bundle = AggregatedMessages::new(members);

        let is_status = |m: &Msg| m.msg_type() == Some(MessageType::Status);
        assert_eq!(
            validator.check_aggregated(Some(&bundle), &[&is_status]),
            Err(BundleError::PredicateFailed { index: 0 })
        );
        assert_eq!(
            validator.check_aggregated(Some(&bundle), &[]),
            Err(BundleError::MalformedMember { index: 0 })
        );
        Ok(())
    }

    #[test]
    fn test_ineligible_member_fails() {
        let config = config_with(2, 10);
        let banned = signer();
        let banned_key = banned.public_key();
        let validator = MessageValidator::new(
            &config,
            std::sync::Arc::new(crate::signing::Ed25519Verifier),
            std::sync::Arc::new(move |m: &Msg| m.pub_key != Some(banned_key)),
        );
        let set = set_of(&[value(1)]);
        let bundle = AggregatedMessages::new(vec![
            status_msg(&signer(), &set, None),
            status_msg(&banned, &set, None),
        ]);
        assert_eq!(
            validator.check_aggregated(Some(&bundle), &[]),
            Err(BundleError::IneligibleMember { index: 1 })
        );
    }

    #[test]
    fn test_certificate_validation() {
        let threshold = 5;
        let validator = validator_with(threshold, 10);
        let set = set_of(&[value(1), value(2)]);

        assert!(!validator.validate_certificate(None));

        let mut cert = Certificate::default();
        assert!(!validator.validate_certificate(Some(&cert)));

        cert.agg_msgs = Some(AggregatedMessages::default());
        assert!(!validator.validate_certificate(Some(&cert)));

        cert.values = set.to_vec();
        cert.agg_msgs = Some(commit_bundle(threshold - 1, &set));
        assert!(!validator.validate_certificate(Some(&cert)));

        cert.agg_msgs = Some(commit_bundle(threshold, &set));
        assert!(validator.validate_certificate(Some(&cert)));
    }

    #[test]
    fn test_certificate_bound_to_instance() {
        let validator = validator_with(2, 10);
        let set = set_of(&[value(1)]);
        let cert = Certificate {
            agg_msgs: Some(commit_bundle(2, &set)),
            values: set.to_vec(),
        };

        assert!(validator.validate_certificate(Some(&cert)));
        assert!(validator.validate_certificate_for(Some(&cert), InstanceId(0)));
        assert!(!validator.validate_certificate_for(Some(&cert), InstanceId(5)));
        assert!(!validator.validate_certificate_for(None, InstanceId(0)));
    }

    #[test]
    fn test_certificate_values_must_match_commits() {
        let validator = validator_with(3, 10);
        let committed = set_of(&[value(1), value(2)]);

        let cert = Certificate {
            agg_msgs: Some(commit_bundle(3, &committed)),
            values: vec![value(1)],
        };
        assert!(!validator.validate_certificate(Some(&cert)));

        // One commit disagreeing on the value set
        let mut bundle = commit_bundle(2, &committed);
        bundle
            .messages
            .push(commit_msg(&signer(), &set_of(&[value(1), value(3)])));
        let cert = Certificate {
            agg_msgs: Some(bundle),
            values: committed.to_vec(),
        };
        assert!(!validator.validate_certificate(Some(&cert)));
    }

    #[test]
    fn test_certificate_requires_commit_members() {
        let validator = validator_with(2, 10);
        let set = set_of(&[value(1)]);
        let cert = Certificate {
            agg_msgs: Some(build_svp(None, &[set.clone(), set.clone()])),
            values: set.to_vec(),
        };
        assert!(!validator.validate_certificate(Some(&cert)));

        let mut bundle = commit_bundle(2, &set);
        if let Some(inner) = bundle.messages[1].inner.as_mut() {
            inner.k = Round::At(6);
        }
        // Re-signing is required after edits; the stale signature fails
        let cert = Certificate {
            agg_msgs: Some(bundle),
            values: set.to_vec(),
        };
        assert!(!validator.validate_certificate(Some(&cert)));
    }
}
