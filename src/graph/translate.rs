//! Conversion hook for exporting a model to an external inference engine.
//!
//! The crate does not know any engine. An [EngineTranslator] decides how a
//! constant and how each generator (given its already converted inputs)
//! become engine objects; [GraphicalModel::translate] drives it over the
//! model in dependency order.

use crate::error::Result;
use crate::graph::model::{GeneratorNode, GraphicalModel};
use crate::graph::value::{Value, ValueId};
use std::collections::BTreeMap;

/// Converts model values into objects of some external engine.
pub trait EngineTranslator {
    /// Engine-native object.
    type Object;

    /// Converts a value without generator.
    fn convert_constant(&mut self, id: ValueId, value: &Value) -> Result<Self::Object>;

    /// Converts a generator given its inputs, converted and in schema order,
    /// and its current output value.
    fn convert_generator(
        &mut self,
        generator: &GeneratorNode,
        inputs: &[(&'static str, &Self::Object)],
        output: &Value,
    ) -> Result<Self::Object>;
}

impl GraphicalModel {
    /// Converts every value with `translator`: constants first, then the
    /// output of each generator in topological order.
    ///
    /// # Returns
    /// The converted object of every value, keyed by handle.
    pub fn translate<T: EngineTranslator>(&self, translator: &mut T) -> Result<BTreeMap<ValueId, T::Object>> {
        let mut converted = BTreeMap::new();

        for (id, value) in self.values() {
            if value.is_constant() {
                converted.insert(id, translator.convert_constant(id, value)?);
            }
        }

        for generator_id in self.topological_order()? {
            let node = self.generator(generator_id);
            let object = {
                let inputs: Vec<(&'static str, &T::Object)> = node
                    .params()
                    .iter()
                    .filter_map(|&(name, value)| converted.get(&value).map(|object| (name, object)))
                    .collect();
                translator.convert_generator(node, &inputs, self.value(node.output()))?
            };
            converted.insert(node.output(), object);
        }

        Ok(converted)
    }
}
