// src/signing.rs
use rand::rngs::OsRng;
use rand::RngCore;
use ring::signature::{self, Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub const PUBLIC_KEY_SIZE: usize = 32;
const ED25519_SIG_SIZE: usize = 64;
/// Wire width of a [`Signature`]: the signer key followed by the Ed25519
/// signature.
pub const SIGNATURE_SIZE: usize = PUBLIC_KEY_SIZE + ED25519_SIG_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature has {0} bytes, expected {SIGNATURE_SIZE}")]
    InvalidLength(usize),
    #[error("signature does not verify against the payload")]
    Invalid,
    #[error("message has no payload to verify")]
    MissingPayload,
    #[error("failed to generate signing key")]
    KeyGeneration,
    #[error("failed to encode payload: {0}")]
    Encoding(String),
}

/// Ed25519 public key identifying a participant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..5])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.short())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.0))
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let mut bytes = [0u8; PUBLIC_KEY_SIZE];
            hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
            Ok(Self(bytes))
        } else {
            <[u8; PUBLIC_KEY_SIZE]>::deserialize(deserializer).map(Self)
        }
    }
}

/// Detached signature over a message's canonical encoding.
///
/// Ed25519 cannot recover the signer from a signature, so the key travels
/// in the first [`PUBLIC_KEY_SIZE`] bytes. The length is only checked when
/// the signature is verified, so malformed signatures can still be carried
/// and rejected.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}B)", self.0.len())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&base64::encode(&self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            base64::decode(&s)
                .map(Self)
                .map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer).map(Self)
        }
    }
}

/// Recovers the signer of a payload.
pub trait SignatureVerifier: Send + Sync {
    fn recover(&self, payload: &[u8], signature: &Signature) -> Result<PublicKey, SignatureError>;
}

/// [`SignatureVerifier`] for signatures produced by [`Signer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn recover(&self, payload: &[u8], sig: &Signature) -> Result<PublicKey, SignatureError> {
        let bytes = sig.as_bytes();
        if bytes.len() != SIGNATURE_SIZE {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }
        let (key, ed_sig) = bytes.split_at(PUBLIC_KEY_SIZE);

        signature::UnparsedPublicKey::new(&signature::ED25519, key)
            .verify(payload, ed_sig)
            .map_err(|_| SignatureError::Invalid)?;

        let mut pub_key = [0u8; PUBLIC_KEY_SIZE];
        pub_key.copy_from_slice(key);
        Ok(PublicKey(pub_key))
    }
}

/// Ed25519 signing key of a participant.
pub struct Signer {
    keypair: Ed25519KeyPair,
    public_key: PublicKey,
}

impl Signer {
    /// Create a signer with a freshly generated key.
    pub fn generate() -> Result<Self, SignatureError> {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SignatureError> {
        let keypair =
            Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| SignatureError::KeyGeneration)?;
        let mut public_key = [0u8; PUBLIC_KEY_SIZE];
        public_key.copy_from_slice(keypair.public_key().as_ref());
        debug!("Loaded Ed25519 signer {}", hex::encode(&public_key[..5]));

        Ok(Self {
            keypair,
            public_key: PublicKey(public_key),
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        let ed_sig = self.keypair.sign(payload);
        let mut bytes = Vec::with_capacity(SIGNATURE_SIZE);
        bytes.extend_from_slice(self.public_key.as_bytes());
        bytes.extend_from_slice(ed_sig.as_ref());
        Signature(bytes)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &self.public_key)
            .finish()
    }
}
