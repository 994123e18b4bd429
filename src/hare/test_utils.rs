// src/hare/test_utils.rs
//! Builders shared by the unit tests.
use std::sync::Arc;

pub use crate::hare::builder::MessageBuilder;
use crate::config::HareConfig;
use crate::hare::message::{AggregatedMessages, Message, MessageType, Msg, Round};
use crate::hare::set::{Set, Value, VALUE_SIZE};
use crate::hare::validator::MessageValidator;
use crate::signing::{Ed25519Verifier, Signer};

pub const DEFAULT_THRESHOLD: usize = 10;
pub const DEFAULT_SET_SIZE: usize = 10;

pub fn value(n: u8) -> Value {
    Value::from_bytes([n; VALUE_SIZE])
}

pub fn set_of(values: &[Value]) -> Set {
    Set::from_values(DEFAULT_SET_SIZE, values).expect("test set within capacity")
}

pub fn signer() -> Signer {
    Signer::generate().expect("key generation")
}

pub fn config_with(threshold: usize, set_size: usize) -> HareConfig {
    HareConfig {
        committee_size: threshold.max(1) * 2,
        threshold,
        set_size,
    }
}

pub fn validator_with(threshold: usize, set_size: usize) -> MessageValidator {
    MessageValidator::without_member_check(
        &config_with(threshold, set_size),
        Arc::new(Ed25519Verifier),
    )
}

pub fn default_validator() -> MessageValidator {
    validator_with(DEFAULT_THRESHOLD, DEFAULT_SET_SIZE)
}

pub fn verified(message: Message) -> Msg {
    Msg::from_message(message, &Ed25519Verifier).expect("valid test signature")
}

pub fn pre_round_msg(signer: &Signer, values: &[Value]) -> Message {
    MessageBuilder::new(MessageType::PreRound)
        .round(Round::Pre)
        .values(values.to_vec())
        .sign(signer)
        .expect("sign pre-round")
}

/// Message of `msg_type` at round `k` declaring a single value.
pub fn typed_msg(signer: &Signer, msg_type: MessageType, k: Round) -> Message {
    MessageBuilder::new(msg_type)
        .round(k)
        .values(vec![value(1)])
        .sign(signer)
        .expect("sign message")
}

pub fn status_msg(signer: &Signer, set: &Set, ki: Option<u32>) -> Message {
    MessageBuilder::new(MessageType::Status)
        .round(Round::At(0))
        .ki(ki)
        .set(set)
        .sign(signer)
        .expect("sign status")
}

pub fn proposal_msg(signer: &Signer, set: &Set, svp: AggregatedMessages) -> Message {
    MessageBuilder::new(MessageType::Proposal)
        .round(Round::At(1))
        .set(set)
        .svp(svp)
        .sign(signer)
        .expect("sign proposal")
}

pub fn commit_msg(signer: &Signer, set: &Set) -> Message {
    MessageBuilder::new(MessageType::Commit)
        .round(Round::At(2))
        .set(set)
        .sign(signer)
        .expect("sign commit")
}

/// Status messages from distinct signers, one per set, all reporting `ki`.
pub fn build_svp(ki: Option<u32>, sets: &[Set]) -> AggregatedMessages {
    AggregatedMessages::new(
        sets.iter()
            .map(|set| status_msg(&signer(), set, ki))
            .collect(),
    )
}

/// `count` Commit messages from distinct signers for `set`.
pub fn commit_bundle(count: usize, set: &Set) -> AggregatedMessages {
    AggregatedMessages::new((0..count).map(|_| commit_msg(&signer(), set)).collect())
}
