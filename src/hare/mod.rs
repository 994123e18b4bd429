// src/hare/mod.rs
pub mod builder;
pub mod eligibility;
pub mod error;
pub mod message;
pub mod set;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::MessageBuilder;
pub use eligibility::{EligibilityValidator, IdentityStateQuerier, RoleOracle};
pub use error::{BundleError, CollaboratorError, RoundError, SetError, ValidationError};
pub use message::{
    AggregatedMessages, Certificate, InnerMessage, InstanceId, Message, MessageId, MessageType,
    Msg, Round,
};
pub use set::{Set, Value};
pub use validator::{MemberCheck, MessageValidator};
