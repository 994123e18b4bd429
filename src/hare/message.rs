// src/hare/message.rs
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::convert::TryFrom;
use std::fmt;

use crate::hare::error::RoundError;
use crate::hare::set::Value;
use crate::signing::{PublicKey, Signature, SignatureError, SignatureVerifier};

/// Wire value standing for "no round" (pre-round phase, or no certificate).
pub const WIRE_NONE: i32 = -1;

/// Rounds per iteration: Status, Proposal, Commit, Notify.
pub const ROUNDS_PER_ITERATION: u32 = 4;

/// Identifier of one consensus instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round counter of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Round {
    /// Before the first Status round; `-1` on the wire.
    Pre,
    At(u32),
}

impl Round {
    /// Iteration the round belongs to. The pre-round counts as iteration 0.
    pub fn iteration(self) -> u32 {
        match self {
            Round::Pre => 0,
            Round::At(k) => k / ROUNDS_PER_ITERATION,
        }
    }

    /// First round of this round's iteration.
    pub fn iteration_start(self) -> Round {
        Round::At(self.iteration() * ROUNDS_PER_ITERATION)
    }

    /// The round immediately before this one, if any.
    pub fn previous(self) -> Option<Round> {
        match self {
            Round::Pre => None,
            Round::At(0) => Some(Round::Pre),
            Round::At(k) => Some(Round::At(k - 1)),
        }
    }

    pub fn next(self) -> Round {
        match self {
            Round::Pre => Round::At(0),
            Round::At(k) => Round::At(k.saturating_add(1)),
        }
    }

    /// Signed value of the round, `-1` for [`Round::Pre`].
    pub fn as_i64(self) -> i64 {
        match self {
            Round::Pre => i64::from(WIRE_NONE),
            Round::At(k) => i64::from(k),
        }
    }

    pub fn to_wire(self) -> Result<i32, RoundError> {
        match self {
            Round::Pre => Ok(WIRE_NONE),
            Round::At(k) => i32::try_from(k).map_err(|_| RoundError::RoundOverflow(k)),
        }
    }
}

impl TryFrom<i32> for Round {
    type Error = RoundError;

    fn try_from(wire: i32) -> Result<Self, Self::Error> {
        match wire {
            WIRE_NONE => Ok(Round::Pre),
            k if k >= 0 => Ok(Round::At(k as u32)),
            k => Err(RoundError::InvalidWireRound(k)),
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::Pre => write!(f, "pre-round"),
            Round::At(k) => write!(f, "{}", k),
        }
    }
}

fn ki_to_wire(ki: Option<u32>) -> Result<i32, RoundError> {
    match ki {
        None => Ok(WIRE_NONE),
        Some(k) => i32::try_from(k).map_err(|_| RoundError::RoundOverflow(k)),
    }
}

fn ki_from_wire(wire: i32) -> Result<Option<u32>, RoundError> {
    match wire {
        WIRE_NONE => Ok(None),
        k if k >= 0 => Ok(Some(k as u32)),
        k => Err(RoundError::InvalidWireRound(k)),
    }
}

/// Message types of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Status,
    Proposal,
    Commit,
    Notify,
    PreRound,
}

impl MessageType {
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::Status => 0,
            MessageType::Proposal => 1,
            MessageType::Commit => 2,
            MessageType::Notify => 3,
            MessageType::PreRound => 10,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = RoundError;

    fn try_from(wire: u8) -> Result<Self, Self::Error> {
        match wire {
            0 => Ok(MessageType::Status),
            1 => Ok(MessageType::Proposal),
            2 => Ok(MessageType::Commit),
            3 => Ok(MessageType::Notify),
            10 => Ok(MessageType::PreRound),
            other => Err(RoundError::UnknownMessageType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Status => "status",
            MessageType::Proposal => "proposal",
            MessageType::Commit => "commit",
            MessageType::Notify => "notify",
            MessageType::PreRound => "pre-round",
        };
        write!(f, "{}", name)
    }
}

/// Signed payload of a protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerMessage {
    pub msg_type: MessageType,
    pub instance_id: InstanceId,
    /// Round the sender claims this message belongs to.
    pub k: Round,
    /// Round of the last certificate the sender holds for its set.
    pub ki: Option<u32>,
    pub values: Vec<Value>,
    /// Eligibility proof handed to the role oracle.
    pub role_proof: Vec<u8>,
    /// Status evidence; only on Proposal messages.
    pub svp: Option<AggregatedMessages>,
    /// Commit certificate; only on Notify messages.
    pub cert: Option<Certificate>,
}

impl InnerMessage {
    /// Canonical encoding covered by the message signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, SignatureError> {
        bincode::serialize(self).map_err(|e| SignatureError::Encoding(e.to_string()))
    }
}

#[derive(Serialize)]
struct WireInnerRef<'a> {
    #[serde(rename = "type")]
    msg_type: u8,
    instance_id: InstanceId,
    k: i32,
    ki: i32,
    values: &'a [Value],
    #[serde(with = "base64_bytes")]
    role_proof: &'a Vec<u8>,
    svp: &'a Option<AggregatedMessages>,
    cert: &'a Option<Certificate>,
}

#[derive(Deserialize)]
struct WireInner {
    #[serde(rename = "type")]
    msg_type: u8,
    instance_id: InstanceId,
    k: i32,
    ki: i32,
    values: Vec<Value>,
    #[serde(with = "base64_bytes")]
    role_proof: Vec<u8>,
    svp: Option<AggregatedMessages>,
    cert: Option<Certificate>,
}

impl Serialize for InnerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        WireInnerRef {
            msg_type: self.msg_type.to_wire(),
            instance_id: self.instance_id,
            k: self.k.to_wire().map_err(S::Error::custom)?,
            ki: ki_to_wire(self.ki).map_err(S::Error::custom)?,
            values: &self.values,
            role_proof: &self.role_proof,
            svp: &self.svp,
            cert: &self.cert,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InnerMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let wire = WireInner::deserialize(deserializer)?;
        Ok(InnerMessage {
            msg_type: MessageType::try_from(wire.msg_type).map_err(D::Error::custom)?,
            instance_id: wire.instance_id,
            k: Round::try_from(wire.k).map_err(D::Error::custom)?,
            ki: ki_from_wire(wire.ki).map_err(D::Error::custom)?,
            values: wire.values,
            role_proof: wire.role_proof,
            svp: wire.svp,
            cert: wire.cert,
        })
    }
}

/// Identity of a message: hash of its full encoding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId([u8; 32]);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", hex::encode(&self.0[..5]))
    }
}

/// Wire message: inner payload plus its detached signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Message {
    pub inner: Option<InnerMessage>,
    pub signature: Signature,
}

impl Message {
    pub fn id(&self) -> Result<MessageId, SignatureError> {
        let bytes = bincode::serialize(self).map_err(|e| SignatureError::Encoding(e.to_string()))?;
        let mut id = [0u8; 32];
        id.copy_from_slice(&Sha3_256::digest(&bytes));
        Ok(MessageId(id))
    }

    /// Verify the signature and return the signer.
    pub fn recover_signer(
        &self,
        verifier: &dyn SignatureVerifier,
    ) -> Result<PublicKey, SignatureError> {
        let inner = self.inner.as_ref().ok_or(SignatureError::MissingPayload)?;
        verifier.recover(&inner.signing_bytes()?, &self.signature)
    }
}

/// A received [`Message`] together with its sender's key, established once
/// at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub message: Message,
    pub pub_key: Option<PublicKey>,
}

impl Msg {
    /// Wrap a message whose sender has not been established.
    pub fn unverified(message: Message) -> Self {
        Self {
            message,
            pub_key: None,
        }
    }

    /// Recover the sender from the message signature.
    pub fn from_message(
        message: Message,
        verifier: &dyn SignatureVerifier,
    ) -> Result<Self, SignatureError> {
        let pub_key = message.recover_signer(verifier)?;
        Ok(Self {
            message,
            pub_key: Some(pub_key),
        })
    }

    pub fn inner(&self) -> Option<&InnerMessage> {
        self.message.inner.as_ref()
    }

    pub fn msg_type(&self) -> Option<MessageType> {
        self.inner().map(|inner| inner.msg_type)
    }
}

/// Ordered bundle of messages used as evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AggregatedMessages {
    pub messages: Vec<Message>,
}

impl AggregatedMessages {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Proof that `values` was committed by a quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Certificate {
    pub agg_msgs: Option<AggregatedMessages>,
    pub values: Vec<Value>,
}

mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&base64::encode(bytes.as_ref()))
        } else {
            serializer.serialize_bytes(bytes.as_ref())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            base64::decode(&s).map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}
