// src/hare/validator/svp.rs
use tracing::{debug, warn};

use super::MessageValidator;
use crate::hare::message::{AggregatedMessages, MessageType, Msg};
use crate::hare::set::Set;

impl MessageValidator {
    /// Check that a proposal's set follows from the Status round before it.
    ///
    /// The SVP must be a quorum of Status messages of the preceding round
    /// and the same instance. If none of them reports a certificate the
    /// proposal must offer exactly the union of their sets (type A);
    /// otherwise exactly the set reported with the highest `Ki` (type B).
    pub fn validate_svp(&self, msg: &Msg) -> bool {
        let inner = match msg.inner() {
            Some(inner) => inner,
            None => return false,
        };
        let svp = match inner.svp.as_ref() {
            Some(svp) => svp,
            None => {
                warn!("SVP validation failed: proposal has no SVP");
                return false;
            }
        };
        let status_round = match inner.k.previous() {
            Some(round) => round,
            None => {
                warn!("SVP validation failed: proposal round {} has no preceding round", inner.k);
                return false;
            }
        };
        let proposed = match self.decode_values(&inner.values) {
            Some(set) => set,
            None => return false,
        };

        let instance_id = inner.instance_id;
        let is_status = |m: &Msg| m.msg_type() == Some(MessageType::Status);
        let is_status_round = |m: &Msg| m.inner().map_or(false, |i| i.k == status_round);
        let same_instance = |m: &Msg| m.inner().map_or(false, |i| i.instance_id == instance_id);

        if !self.validate_aggregated(Some(svp), &[&is_status, &is_status_round, &same_instance]) {
            warn!(
                "SVP validation failed: status bundle for round {} rejected",
                status_round
            );
            return false;
        }

        let max_ki = svp
            .messages
            .iter()
            .filter_map(|m| m.inner.as_ref())
            .filter_map(|i| i.ki)
            .max();

        let valid = match max_ki {
            None => self.validate_svp_type_a(svp, &proposed),
            Some(ki) => self.validate_svp_type_b(svp, ki, &proposed),
        };
        if !valid {
            warn!(
                "SVP validation failed: proposal {} does not follow from status round {}",
                proposed, status_round
            );
        }
        valid
    }

    /// No member holds a certificate: the proposal must equal the union of
    /// every reported set.
    pub(crate) fn validate_svp_type_a(&self, svp: &AggregatedMessages, proposed: &Set) -> bool {
        let mut union = Set::new(self.set_size);
        for inner in svp.messages.iter().filter_map(|m| m.inner.as_ref()) {
            let reported = match self.decode_values(&inner.values) {
                Some(set) => set,
                None => return false,
            };
            union = match union.union(&reported) {
                Ok(union) => union,
                Err(e) => {
                    debug!("SVP union exceeds set size: {}", e);
                    return false;
                }
            };
        }

        debug!("SVP type A: union {} against proposal {}", union, proposed);
        union == *proposed
    }

    /// Some member holds a certificate from round `max_ki`: the proposal
    /// must carry that member's set forward unchanged.
    pub(crate) fn validate_svp_type_b(
        &self,
        svp: &AggregatedMessages,
        max_ki: u32,
        proposed: &Set,
    ) -> bool {
        let mut reference: Option<Set> = None;
        for inner in svp
            .messages
            .iter()
            .filter_map(|m| m.inner.as_ref())
            .filter(|i| i.ki == Some(max_ki))
        {
            let reported = match self.decode_values(&inner.values) {
                Some(set) => set,
                None => return false,
            };
            match &reference {
                None => reference = Some(reported),
                Some(existing) if *existing != reported => {
                    warn!(
                        "SVP type B: conflicting sets {} and {} certified at round {}",
                        existing, reported, max_ki
                    );
                    return false;
                }
                Some(_) => {}
            }
        }

        match reference {
            Some(reference) => {
                debug!(
                    "SVP type B: certified set {} at round {} against proposal {}",
                    reference, max_ki, proposed
                );
                reference == *proposed
            }
            None => false,
        }
    }
}
