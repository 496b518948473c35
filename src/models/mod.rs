//! Status page record types.
//!
//! Components and incidents as the Cachet API reads and writes them, plus the
//! check outcomes that drive reconciliation.

mod check;
mod component;
mod envelope;
mod incident;
mod timestamp;

pub use check::*;
pub use component::*;
pub use envelope::*;
pub use incident::*;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Input rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name of the {0} can not be empty")]
    EmptyName(&'static str),
    #[error("message of the incident can not be empty")]
    EmptyMessage,
    #[error("{kind} status {value} is out of range (expected 1-4)")]
    StatusOutOfRange { kind: &'static str, value: u8 },
}

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
