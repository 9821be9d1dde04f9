//! Field tree
//!
//! Flat arena of [`FieldNode`]s with an id index and a parent index, plus an
//! ordered root sequence. Navigation is O(1) per lookup; every mutation
//! validates first and only then touches the arena, so a failed operation
//! leaves the tree exactly as it was.
//!
//! Author: Moroya Sakamoto

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::catalog::{self, AttrKey};
use crate::error::{FormError, Result};
use crate::field::{AttrValue, Attributes, FieldId, FieldNode};

/// Result of a parent lookup for an existing node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parent<'a> {
    /// Node sits in the root sequence
    Root,
    /// Direct parent node
    Node(&'a FieldNode),
}

impl Parent<'_> {
    pub fn id(&self) -> Option<FieldId> {
        match self {
            Parent::Root => None,
            Parent::Node(node) => Some(node.id()),
        }
    }
}

/// Direction of a one-step reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

/// Form-definition tree: arena storage with O(1) id and parent lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    nodes: HashMap<FieldId, FieldNode>,
    /// Maps child id → parent id; root-level nodes have no entry
    parent_index: HashMap<FieldId, FieldId>,
    roots: Vec<FieldId>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Navigation ─────────────────────────────────────────────────────

    /// Node by id
    pub fn find_by_id(&self, id: FieldId) -> Option<&FieldNode> {
        self.nodes.get(&id)
    }

    /// Parent of an existing node; `None` when the id is not in the tree
    pub fn find_parent_by_id(&self, id: FieldId) -> Option<Parent<'_>> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        match self.parent_index.get(&id) {
            Some(parent_id) => self.nodes.get(parent_id).map(Parent::Node),
            None => Some(Parent::Root),
        }
    }

    /// Parent id, `None` for root-level or unknown nodes
    pub fn parent_of(&self, id: FieldId) -> Option<FieldId> {
        self.parent_index.get(&id).copied()
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Root sequence in display order
    pub fn roots(&self) -> &[FieldId] {
        &self.roots
    }

    /// Total node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sibling sequence the node belongs to
    pub fn siblings_of(&self, id: FieldId) -> Option<&[FieldId]> {
        match self.find_parent_by_id(id)? {
            Parent::Root => Some(&self.roots),
            Parent::Node(parent) => Some(parent.children()),
        }
    }

    /// Whether `id` lies strictly inside the subtree rooted at `ancestor`
    pub fn is_descendant(&self, ancestor: FieldId, id: FieldId) -> bool {
        let mut cursor = self.parent_of(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    /// Index path from the root sequence down to the node
    pub fn path_of(&self, id: FieldId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        loop {
            let siblings = self.siblings_of(current)?;
            path.push(siblings.iter().position(|&s| s == current)?);
            match self.parent_of(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }

    /// Nesting depth, 0 for root-level nodes
    pub fn depth(&self, id: FieldId) -> Option<usize> {
        self.path_of(id).map(|p| p.len() - 1)
    }

    /// Nodes in depth-first pre-order (root sequence, then children)
    pub fn depth_first(&self) -> Vec<&FieldNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.collect_nodes(root, &mut out);
        }
        out
    }

    fn collect_nodes<'a>(&'a self, id: FieldId, out: &mut Vec<&'a FieldNode>) {
        if let Some(node) = self.nodes.get(&id) {
            out.push(node);
            for &child in &node.children {
                self.collect_nodes(child, out);
            }
        }
    }

    /// Ids of the subtree rooted at `id`, pre-order, `id` first
    pub fn subtree_ids(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: FieldId, result: &mut Vec<FieldId>) {
        if let Some(node) = self.nodes.get(&id) {
            result.push(id);
            for &child in &node.children {
                self.collect_subtree(child, result);
            }
        }
    }

    // ── Mutation ───────────────────────────────────────────────────────

    /// Append a detached node as the last child of `parent`, or to the root
    /// sequence when `parent` is `None`
    pub fn insert(&mut self, parent: Option<FieldId>, node: FieldNode) -> Result<FieldId> {
        let id = node.id();
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                warn!(%parent_id, "insert: parent not found");
                return Err(FormError::NotFound(parent_id));
            }
        }
        if self.nodes.contains_key(&id) {
            return Err(FormError::DuplicateId(id));
        }
        if !node.children.is_empty() {
            return Err(FormError::AttachedNode(id));
        }
        catalog::check_kinds(&node.attributes)?;

        self.attach(parent, id);
        self.nodes.insert(id, node);
        debug!(%id, parent = ?parent, "field inserted");
        Ok(id)
    }

    /// Remove a node and its whole subtree; returns the number of nodes removed
    pub fn delete(&mut self, id: FieldId) -> Result<usize> {
        if !self.nodes.contains_key(&id) {
            warn!(%id, "delete: field not found");
            return Err(FormError::NotFound(id));
        }
        let doomed = self.subtree_ids(id);
        self.detach(id);
        for rid in &doomed {
            self.nodes.remove(rid);
            self.parent_index.remove(rid);
        }
        debug!(%id, removed = doomed.len(), "subtree deleted");
        Ok(doomed.len())
    }

    /// Replace a node's attribute map wholesale
    pub fn update(&mut self, id: FieldId, attributes: Attributes) -> Result<()> {
        catalog::check_kinds(&attributes)?;
        let node = self.nodes.get_mut(&id).ok_or(FormError::NotFound(id))?;
        node.attributes = attributes;
        debug!(%id, "attributes replaced");
        Ok(())
    }

    /// Deep-copy the subtree rooted at `id` under fresh ids and place the
    /// copy immediately after the original; returns the copy's root id
    pub fn clone_subtree(&mut self, id: FieldId) -> Result<FieldId> {
        if !self.nodes.contains_key(&id) {
            warn!(%id, "clone: field not found");
            return Err(FormError::NotFound(id));
        }
        let originals = self.subtree_ids(id);
        let fresh: HashMap<FieldId, FieldId> =
            originals.iter().map(|&old| (old, FieldId::new())).collect();

        let mut copies = Vec::with_capacity(originals.len());
        for old in &originals {
            let node = &self.nodes[old];
            let children = node.children.iter().map(|c| fresh[c]).collect();
            copies.push(node.rekeyed(fresh[old], children));
        }

        let copy_root = fresh[&id];
        let parent = self.parent_of(id);
        for copy in copies {
            for &child in &copy.children {
                self.parent_index.insert(child, copy.id());
            }
            self.nodes.insert(copy.id(), copy);
        }
        if let Some(parent_id) = parent {
            self.parent_index.insert(copy_root, parent_id);
        }
        let siblings = self.sibling_list_mut(parent);
        let at = siblings.iter().position(|&s| s == id).map_or(siblings.len(), |i| i + 1);
        siblings.insert(at, copy_root);

        debug!(%id, copy = %copy_root, nodes = originals.len(), "subtree cloned");
        Ok(copy_root)
    }

    /// Re-parent the subtree rooted at `source` as the last child of `target`
    pub fn move_to_parent(&mut self, source: FieldId, target: FieldId) -> Result<()> {
        for id in [source, target] {
            if !self.nodes.contains_key(&id) {
                warn!(%id, "move: field not found");
                return Err(FormError::NotFound(id));
            }
        }
        if source == target || self.is_descendant(source, target) {
            warn!(%source, %target, "move: cycle rejected");
            return Err(FormError::CycleRejected {
                moving: source,
                target,
            });
        }
        self.detach(source);
        self.attach(Some(target), source);
        debug!(%source, %target, "field re-parented");
        Ok(())
    }

    /// Move one position towards the front of the sibling sequence;
    /// `Ok(false)` when already first
    pub fn move_up(&mut self, id: FieldId) -> Result<bool> {
        self.shift(id, Shift::Up)
    }

    /// Move one position towards the back of the sibling sequence;
    /// `Ok(false)` when already last
    pub fn move_down(&mut self, id: FieldId) -> Result<bool> {
        self.shift(id, Shift::Down)
    }

    /// One-step reorder with stray-sibling absorption.
    ///
    /// A parent-type node whose non-parent-type neighbour is recorded under a
    /// different parent than the sequence it appears in takes that neighbour
    /// as its last child. Every other case swaps the two positions; each node
    /// keeps its own children.
    pub fn shift(&mut self, id: FieldId, direction: Shift) -> Result<bool> {
        if !self.nodes.contains_key(&id) {
            warn!(%id, "reorder: field not found");
            return Err(FormError::NotFound(id));
        }
        let parent = self.parent_of(id);
        let siblings = self.sibling_list(parent);
        let Some(index) = siblings.iter().position(|&s| s == id) else {
            return Err(FormError::NotFound(id));
        };
        let neighbour_index = match direction {
            Shift::Up => index.checked_sub(1),
            Shift::Down => Some(index + 1).filter(|&i| i < siblings.len()),
        };
        let Some(neighbour_index) = neighbour_index else {
            return Ok(false);
        };
        let neighbour = siblings[neighbour_index];

        let moving_is_parent = self.nodes[&id].is_parent_type();
        let neighbour_is_parent = self
            .nodes
            .get(&neighbour)
            .is_some_and(FieldNode::is_parent_type);
        let recorded_parent = self.parent_of(neighbour);

        if moving_is_parent
            && !neighbour_is_parent
            && recorded_parent != parent
            && !self.is_descendant(neighbour, id)
        {
            self.sibling_list_mut(parent).retain(|&s| s != neighbour);
            self.sibling_list_mut(recorded_parent).retain(|&s| s != neighbour);
            self.attach(Some(id), neighbour);
            debug!(%id, %neighbour, "stray sibling absorbed");
            return Ok(true);
        }

        self.sibling_list_mut(parent).swap(index, neighbour_index);
        debug!(%id, %neighbour, ?direction, "siblings swapped");
        Ok(true)
    }

    /// Set every node's sort order to its position among its siblings
    pub fn renumber_sort_order(&mut self) {
        let mut sequences = vec![self.roots.clone()];
        sequences.extend(self.nodes.values().map(|n| n.children.clone()));
        for sequence in sequences {
            for (position, id) in sequence.iter().enumerate() {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.attributes
                        .set(AttrKey::SortOrder, AttrValue::Number(position as i64));
                }
            }
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn sibling_list(&self, parent: Option<FieldId>) -> &[FieldId] {
        match parent.and_then(|p| self.nodes.get(&p)) {
            Some(node) => &node.children,
            None => &self.roots,
        }
    }

    fn sibling_list_mut(&mut self, parent: Option<FieldId>) -> &mut Vec<FieldId> {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => &mut node.children,
            None => &mut self.roots,
        }
    }

    /// Append `id` to `parent`'s children (or the roots) and record the parent
    fn attach(&mut self, parent: Option<FieldId>, id: FieldId) {
        self.sibling_list_mut(parent).push(id);
        match parent {
            Some(parent_id) => {
                self.parent_index.insert(id, parent_id);
            }
            None => {
                self.parent_index.remove(&id);
            }
        }
    }

    /// Remove `id` from its sibling sequence and forget its parent
    fn detach(&mut self, id: FieldId) {
        let parent = self.parent_index.remove(&id);
        self.sibling_list_mut(parent).retain(|&s| s != id);
    }

    /// Check arena consistency: unique ownership, parent index agreement,
    /// every node reachable from the roots
    pub fn check_integrity(&self) -> bool {
        let mut seen = HashSet::new();
        let mut stack: Vec<(Option<FieldId>, FieldId)> =
            self.roots.iter().rev().map(|&r| (None, r)).collect();
        while let Some((parent, id)) = stack.pop() {
            if !seen.insert(id) || self.parent_of(id) != parent {
                return false;
            }
            let Some(node) = self.nodes.get(&id) else {
                return false;
            };
            stack.extend(node.children.iter().rev().map(|&c| (Some(id), c)));
        }
        seen.len() == self.nodes.len() && self.parent_index.len() + self.roots.len() == seen.len()
    }
}
