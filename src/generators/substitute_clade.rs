//! Deterministic replacement of a subtree by a donor clade.

use crate::error::{ModelError, Result};
use crate::graph::{Arguments, DeterministicFunction, ParamSpec, Payload, PayloadKind};

/// Copy of `baseTree` in which the subtree below node `node` is replaced by
/// `cladeTree`, whose root is placed at age `time` and labelled `nodeLabel`.
///
/// See [TimeTree::graft_clade](crate::tree::TimeTree::graft_clade).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstituteClade;

const SUBSTITUTE_CLADE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("baseTree", PayloadKind::Tree, "tree receiving the clade"),
    ParamSpec::required("cladeTree", PayloadKind::Tree, "donor clade"),
    ParamSpec::required("node", PayloadKind::Integer, "index of the node to replace in the base tree"),
    ParamSpec::required("time", PayloadKind::Number, "age of the donor root"),
    ParamSpec::required("nodeLabel", PayloadKind::Text, "identifier of the donor root"),
];

impl DeterministicFunction for SubstituteClade {
    fn name(&self) -> &'static str {
        "substituteClade"
    }

    fn params(&self) -> &'static [ParamSpec] {
        SUBSTITUTE_CLADE_PARAMS
    }

    fn apply(&self, args: &Arguments<'_>) -> Result<Payload> {
        let base = args.tree("baseTree")?;
        let clade = args.tree("cladeTree")?;
        let node = args.integer("node")?;
        let time = args.number("time")?;
        let label = args.text("nodeLabel")?;

        let node = usize::try_from(node)
            .ok()
            .filter(|&i| i < base.node_count())
            .ok_or_else(|| {
                ModelError::invalid_argument(format!(
                    "node {} is not a node index of the base tree ({} nodes)",
                    node,
                    base.node_count()
                ))
            })?;

        let mut tree = base.clone();
        tree.graft_clade(node, clade, time, label)?;
        Ok(Payload::Tree(tree))
    }
}
