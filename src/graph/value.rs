//! Values: the data nodes of a graphical model.

use crate::graph::payload::Payload;
use std::collections::BTreeMap;
use std::fmt;

/// Handle of a [Value] within its [GraphicalModel](crate::graph::GraphicalModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) usize);

/// Handle of a generator within its [GraphicalModel](crate::graph::GraphicalModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(pub(crate) usize);

impl ValueId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl GeneratorId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

// =#========================================================================#=
// VALUE
// =#========================================================================#=
/// A node of the model graph holding a [Payload].
///
/// A value without producing generator is a constant; a value produced by a
/// stochastic generator is a random variable. Identity is the [ValueId],
/// never payload equality.
#[derive(Debug, Clone)]
pub struct Value {
    /// Identifier, `None` for anonymous values
    id: Option<String>,
    payload: Payload,
    /// Generator producing this value
    generator: Option<GeneratorId>,
    /// Generators consuming this value, with the number of parameters bound to it
    outputs: BTreeMap<GeneratorId, usize>,
}

impl Value {
    pub(crate) fn new(id: Option<String>, payload: Payload, generator: Option<GeneratorId>) -> Self {
        Value {
            id,
            payload,
            generator,
            outputs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the payload.
    pub fn value(&self) -> &Payload {
        &self.payload
    }

    pub fn generator(&self) -> Option<GeneratorId> {
        self.generator
    }

    pub fn is_constant(&self) -> bool {
        self.generator.is_none()
    }

    /// Returns the generators that take this value as input.
    pub fn outputs(&self) -> Vec<GeneratorId> {
        self.outputs.keys().copied().collect()
    }

    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }

    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    pub(crate) fn add_output(&mut self, generator: GeneratorId) {
        *self.outputs.entry(generator).or_insert(0) += 1;
    }

    pub(crate) fn remove_output(&mut self, generator: GeneratorId) {
        if let Some(count) = self.outputs.get_mut(&generator) {
            *count -= 1;
            if *count == 0 {
                self.outputs.remove(&generator);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} = {}", id, self.payload),
            None => write!(f, "{}", self.payload),
        }
    }
}
