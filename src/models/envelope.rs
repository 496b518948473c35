use serde::{Deserialize, Serialize};

/// The `{ "data": ... }` wrapper around every API payload.
///
/// Collections use the same shape with a list, see [`EnvelopeCollection`].
/// Pagination `meta` sent alongside collections is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

pub type EnvelopeCollection<T> = Envelope<Vec<T>>;
