//! Edit commands
//!
//! Structural edits as serializable commands, so drag-drop gestures and
//! toolbar buttons can be delivered, logged or replayed as plain data.
//! Also hosts the drag affordance predicates the gesture layer consults
//! before it offers a drop.
//!
//! Author: Moroya Sakamoto

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::field::{Attributes, FieldId, FieldNode};
use crate::tree::FieldTree;

/// One structural edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    /// Append a fresh node under `parent` (root sequence when `None`)
    Insert {
        parent: Option<FieldId>,
        attributes: Attributes,
    },
    /// Remove a node and its subtree
    Delete { id: FieldId },
    /// Replace a node's attributes wholesale
    Update { id: FieldId, attributes: Attributes },
    /// Duplicate a subtree next to the original
    Clone { id: FieldId },
    /// Re-parent `source` as the last child of `target`
    MoveToParent { source: FieldId, target: FieldId },
    MoveUp { id: FieldId },
    MoveDown { id: FieldId },
}

impl EditOp {
    /// Node the command primarily acts on (`None` for inserts)
    pub fn target(&self) -> Option<FieldId> {
        match self {
            EditOp::Insert { .. } => None,
            EditOp::Delete { id }
            | EditOp::Update { id, .. }
            | EditOp::Clone { id }
            | EditOp::MoveUp { id }
            | EditOp::MoveDown { id } => Some(*id),
            EditOp::MoveToParent { source, .. } => Some(*source),
        }
    }
}

/// What an applied command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    Inserted(FieldId),
    /// Number of nodes removed
    Deleted(usize),
    Updated,
    /// Id of the copy's root
    Cloned(FieldId),
    Moved,
    /// `false` when the node already sat at the boundary
    Reordered(bool),
}

impl FieldTree {
    /// Apply one command; on error the tree is unchanged
    pub fn apply(&mut self, op: &EditOp) -> Result<OpOutcome> {
        let outcome = match op {
            EditOp::Insert { parent, attributes } => {
                let node = FieldNode::with_attributes(attributes.clone());
                OpOutcome::Inserted(self.insert(*parent, node)?)
            }
            EditOp::Delete { id } => OpOutcome::Deleted(self.delete(*id)?),
            EditOp::Update { id, attributes } => {
                self.update(*id, attributes.clone())?;
                OpOutcome::Updated
            }
            EditOp::Clone { id } => OpOutcome::Cloned(self.clone_subtree(*id)?),
            EditOp::MoveToParent { source, target } => {
                self.move_to_parent(*source, *target)?;
                OpOutcome::Moved
            }
            EditOp::MoveUp { id } => OpOutcome::Reordered(self.move_up(*id)?),
            EditOp::MoveDown { id } => OpOutcome::Reordered(self.move_down(*id)?),
        };
        Ok(outcome)
    }

    /// Apply a batch all-or-nothing: the first failing command discards the
    /// whole batch
    pub fn apply_all(&mut self, ops: &[EditOp]) -> Result<Vec<OpOutcome>> {
        let mut scratch = self.clone();
        let outcomes = ops
            .iter()
            .map(|op| scratch.apply(op))
            .collect::<Result<Vec<_>>>()?;
        *self = scratch;
        debug!(ops = ops.len(), "batch applied");
        Ok(outcomes)
    }

    // ── Drag affordances ───────────────────────────────────────────────

    /// Only parent-type nodes are draggable
    pub fn can_drag(&self, id: FieldId) -> bool {
        self.find_by_id(id).is_some_and(FieldNode::is_parent_type)
    }

    /// Drop target must be parent-type, distinct from the source and outside
    /// the source's subtree
    pub fn can_drop(&self, source: FieldId, target: FieldId) -> bool {
        source != target
            && self.contains(source)
            && self.find_by_id(target).is_some_and(FieldNode::is_parent_type)
            && !self.is_descendant(source, target)
    }
}
