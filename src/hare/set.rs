// src/hare/set.rs
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::collections::BTreeSet;
use std::fmt;

use crate::hare::error::SetError;

/// Width in bytes of a value identifier.
pub const VALUE_SIZE: usize = 32;

/// Opaque, content-addressed identifier of a proposed value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value([u8; VALUE_SIZE]);

impl Value {
    pub const fn from_bytes(bytes: [u8; VALUE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier of some content.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha3_256::digest(content);
        let mut bytes = [0u8; VALUE_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VALUE_SIZE] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; VALUE_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({}..)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.0))
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Value::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; VALUE_SIZE]>::deserialize(deserializer).map(Value)
        }
    }
}

/// Unordered collection of unique values, bounded by a capacity.
///
/// Members are kept sorted so that [`Set::to_vec`] and [`Set::id`] are
/// deterministic across nodes.
#[derive(Clone, Debug)]
pub struct Set {
    values: BTreeSet<Value>,
    capacity: usize,
}

impl Set {
    /// Create an empty set holding at most `capacity` values.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: BTreeSet::new(),
            capacity,
        }
    }

    /// Create a set from an initial list. Duplicates collapse; a list with
    /// more than `capacity` distinct values is rejected rather than
    /// truncated.
    pub fn from_values<'a, I>(capacity: usize, values: I) -> Result<Self, SetError>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut set = Self::new(capacity);
        for value in values {
            set.add(*value)?;
        }
        Ok(set)
    }

    /// Insert a value. Returns `Ok(false)` if it was already present.
    pub fn add(&mut self, value: Value) -> Result<bool, SetError> {
        if self.values.contains(&value) {
            return Ok(false);
        }
        if self.values.len() >= self.capacity {
            return Err(SetError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(self.values.insert(value))
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.values.remove(value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Union of both sets, bounded by this set's capacity.
    pub fn union(&self, other: &Set) -> Result<Set, SetError> {
        let mut result = self.clone();
        for value in &other.values {
            result.add(*value)?;
        }
        Ok(result)
    }

    pub fn intersection(&self, other: &Set) -> Set {
        Set {
            values: self.values.intersection(&other.values).copied().collect(),
            capacity: self.capacity,
        }
    }

    pub fn is_subset(&self, other: &Set) -> bool {
        self.values.is_subset(&other.values)
    }

    /// Members in ascending byte order.
    pub fn to_vec(&self) -> Vec<Value> {
        self.values.iter().copied().collect()
    }

    /// Content identifier of the set, independent of insertion order.
    pub fn id(&self) -> Value {
        let mut hasher = Sha3_256::new();
        for value in &self.values {
            hasher.update(value.as_bytes());
        }
        let mut bytes = [0u8; VALUE_SIZE];
        bytes.copy_from_slice(&hasher.finalize());
        Value(bytes)
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Set {}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", &value.to_string()[..8])?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(seed: u8) -> Value {
        Value::from_bytes([seed; VALUE_SIZE])
    }

    #[test]
    fn test_add_and_contains() {
        let mut set = Set::new(3);
        assert!(set.is_empty());
        assert_eq!(set.add(value(1)), Ok(true));
        assert_eq!(set.add(value(1)), Ok(false));
        assert!(set.contains(&value(1)));
        assert!(!set.contains(&value(2)));
        assert_eq!(set.len(), 1);

        assert!(set.remove(&value(1)));
        assert!(!set.remove(&value(1)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut set = Set::new(2);
        set.add(value(1)).unwrap();
        set.add(value(2)).unwrap();
        assert_eq!(
            set.add(value(3)),
            Err(SetError::CapacityExceeded { capacity: 2 })
        );
        // Re-adding an existing member at capacity is not an overflow
        assert_eq!(set.add(value(2)), Ok(false));
        assert_eq!(set.len(), 2);

        let too_many = [value(1), value(2), value(3)];
        assert!(Set::from_values(2, &too_many).is_err());

        let with_duplicates = [value(1), value(1), value(2)];
        assert_eq!(Set::from_values(2, &with_duplicates).unwrap().len(), 2);
    }

    #[test]
    fn test_equality_ignores_order_and_capacity() {
        let a = Set::from_values(5, &[value(3), value(1), value(2)]).unwrap();
        let b = Set::from_values(10, &[value(1), value(2), value(3)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.to_vec(), vec![value(1), value(2), value(3)]);

        let c = Set::from_values(5, &[value(1), value(2)]).unwrap();
        assert_ne!(a, c);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_union_and_intersection() {
        let a = Set::from_values(4, &[value(1), value(5)]).unwrap();
        let b = Set::from_values(4, &[value(1), value(4)]).unwrap();

        let union = a.union(&b).unwrap();
        assert_eq!(
            union,
            Set::from_values(4, &[value(1), value(4), value(5)]).unwrap()
        );
        assert!(a.is_subset(&union));

        let intersection = a.intersection(&b);
        assert_eq!(intersection, Set::from_values(4, &[value(1)]).unwrap());

        let small = Set::from_values(2, &[value(1), value(5)]).unwrap();
        assert!(small.union(&b).is_err());
    }

    #[test]
    fn test_value_from_content() {
        let a = Value::from_content(b"block-a");
        assert_eq!(a, Value::from_content(b"block-a"));
        assert_ne!(a, Value::from_content(b"block-b"));
        assert_eq!(Value::from_hex(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn test_value_serde_formats() {
        let v = value(0xab);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(VALUE_SIZE)));
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);

        let encoded = bincode::serialize(&v).unwrap();
        assert_eq!(encoded.len(), VALUE_SIZE);
        assert_eq!(bincode::deserialize::<Value>(&encoded).unwrap(), v);
    }
}
