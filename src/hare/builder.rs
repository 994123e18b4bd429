// src/hare/builder.rs
use tracing::debug;

use crate::hare::message::{
    AggregatedMessages, Certificate, InnerMessage, InstanceId, Message, MessageType, Round,
};
use crate::hare::set::{Set, Value};
use crate::signing::{SignatureError, Signer};

/// Assembles and signs protocol messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    inner: InnerMessage,
}

impl MessageBuilder {
    /// Start a message of `msg_type` for instance 0, round 0, with no
    /// certificate held.
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            inner: InnerMessage {
                msg_type,
                instance_id: InstanceId(0),
                k: Round::At(0),
                ki: None,
                values: Vec::new(),
                role_proof: Vec::new(),
                svp: None,
                cert: None,
            },
        }
    }

    pub fn instance(mut self, instance_id: InstanceId) -> Self {
        self.inner.instance_id = instance_id;
        self
    }

    pub fn round(mut self, k: Round) -> Self {
        self.inner.k = k;
        self
    }

    pub fn ki(mut self, ki: Option<u32>) -> Self {
        self.inner.ki = ki;
        self
    }

    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.inner.values = values;
        self
    }

    pub fn set(mut self, set: &Set) -> Self {
        self.inner.values = set.to_vec();
        self
    }

    pub fn role_proof(mut self, proof: Vec<u8>) -> Self {
        self.inner.role_proof = proof;
        self
    }

    pub fn svp(mut self, svp: AggregatedMessages) -> Self {
        self.inner.svp = Some(svp);
        self
    }

    pub fn certificate(mut self, cert: Certificate) -> Self {
        self.inner.cert = Some(cert);
        self
    }

    /// The unsigned payload.
    pub fn build_inner(self) -> InnerMessage {
        self.inner
    }

    /// Sign the payload with `signer`.
    pub fn sign(self, signer: &Signer) -> Result<Message, SignatureError> {
        let payload = self.inner.signing_bytes()?;
        let signature = signer.sign(&payload);
        debug!(
            "Signed {} message for instance {} round {} ({} bytes)",
            self.inner.msg_type,
            self.inner.instance_id,
            self.inner.k,
            payload.len()
        );

        Ok(Message {
            inner: Some(self.inner),
            signature,
        })
    }
}
