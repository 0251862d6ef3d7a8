use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};

/// A value paired with the causal history known to the writer at write
/// time. Generic over the payload, mirroring how the teacher's
/// `VersionedData<T>` carries an arbitrary payload alongside a clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<V> {
    pub value: V,
    pub clock: VectorClock,
}

impl<V> Versioned<V> {
    pub fn new(value: V, clock: VectorClock) -> Self {
        Self { value, clock }
    }

    /// A fresh write envelope: an empty clock signals to the primary
    /// replica that this is an origin-write and it should mint the clock.
    pub fn origin(value: V) -> Self {
        Self {
            value,
            clock: VectorClock::new(),
        }
    }
}
