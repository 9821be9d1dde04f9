//! Field node model
//!
//! One node of the form-definition tree: a stable identity, a flat
//! attribute map keyed by catalog attribute, and an ordered list of
//! child ids owned by the enclosing [`FieldTree`](crate::tree::FieldTree).
//!
//! Author: Moroya Sakamoto

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, AttrKey};

/// Unique field identifier (random v4, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(Uuid);

impl FieldId {
    /// Fresh globally-unique id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// No value (wire `null`)
    #[default]
    Unset,
    /// Checkbox value
    Bool(bool),
    /// Numeric value (sort order)
    Number(i64),
    /// Free text or a lookup option id
    Text(String),
}

static UNSET: AttrValue = AttrValue::Unset;

impl AttrValue {
    /// Unset or the empty string
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Unset => true,
            AttrValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(String::from(v))
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttrValue::Unset, Into::into)
    }
}

/// Attribute map of one node.
///
/// Unset values are not stored: an absent key and an explicit unset read
/// the same, so maps that differ only in unset entries compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<AttrKey, AttrValue>")]
pub struct Attributes(BTreeMap<AttrKey, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Value for `key`, [`AttrValue::Unset`] when absent
    pub fn get(&self, key: AttrKey) -> &AttrValue {
        self.0.get(&key).unwrap_or(&UNSET)
    }

    /// Whether a value is present for `key`
    pub fn contains(&self, key: AttrKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Set a value; setting [`AttrValue::Unset`] removes the key
    pub fn set(&mut self, key: AttrKey, value: impl Into<AttrValue>) {
        match value.into() {
            AttrValue::Unset => {
                self.0.remove(&key);
            }
            value => {
                self.0.insert(key, value);
            }
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: AttrKey, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: AttrKey) -> Option<AttrValue> {
        self.0.remove(&key)
    }

    pub fn text(&self, key: AttrKey) -> Option<&str> {
        self.get(key).as_str()
    }

    pub fn flag(&self, key: AttrKey) -> bool {
        self.get(key).as_bool().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttrKey, &AttrValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` layered over `base`: keys present here win
    pub fn merged_over(&self, base: &Attributes) -> Attributes {
        let mut merged = base.clone();
        for (key, value) in &self.0 {
            merged.0.insert(*key, value.clone());
        }
        merged
    }

    /// Field type is header or accordion
    pub fn is_parent_type(&self) -> bool {
        self.text(AttrKey::FieldType)
            .is_some_and(catalog::is_parent_field_type)
    }
}

impl From<BTreeMap<AttrKey, AttrValue>> for Attributes {
    fn from(map: BTreeMap<AttrKey, AttrValue>) -> Self {
        map.into_iter().collect()
    }
}

impl FromIterator<(AttrKey, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (AttrKey, AttrValue)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (key, value) in iter {
            attrs.set(key, value);
        }
        attrs
    }
}

/// Field node
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    id: FieldId,
    /// Flat attribute map edited by the properties panel
    pub attributes: Attributes,
    /// Child ids in display/submission order
    pub(crate) children: Vec<FieldId>,
}

impl FieldNode {
    /// New detached node with catalog defaults and a fresh id
    pub fn new() -> Self {
        Self::with_attributes(catalog::default_attributes())
    }

    /// New detached node with the given attributes and a fresh id
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self {
            id: FieldId::new(),
            attributes,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    /// Header or accordion node
    pub fn is_parent_type(&self) -> bool {
        self.attributes.is_parent_type()
    }

    /// Copy of this node under a new id with the given children
    pub(crate) fn rekeyed(&self, id: FieldId, children: Vec<FieldId>) -> Self {
        Self {
            id,
            attributes: self.attributes.clone(),
            children,
        }
    }
}

impl Default for FieldNode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_gets_fresh_id() {
        let a = FieldNode::new();
        let b = FieldNode::new();
        assert_ne!(a.id(), b.id());
        assert!(a.children().is_empty());
    }

    #[test]
    fn test_new_node_uses_catalog_defaults() {
        let node = FieldNode::new();
        assert_eq!(node.attributes.get(AttrKey::IsRtl), &AttrValue::Bool(false));
        assert_eq!(node.attributes.get(AttrKey::Code), &AttrValue::Text(String::new()));
        assert_eq!(node.attributes.get(AttrKey::Placeholder), &AttrValue::Unset);
    }

    #[test]
    fn test_set_unset_removes_key() {
        let mut attrs = Attributes::new().with(AttrKey::Code, "X");
        assert!(attrs.contains(AttrKey::Code));
        attrs.set(AttrKey::Code, AttrValue::Unset);
        assert!(!attrs.contains(AttrKey::Code));
        assert_eq!(attrs, Attributes::new());
    }

    #[test]
    fn test_is_empty_value() {
        assert!(AttrValue::Unset.is_empty());
        assert!(AttrValue::from("").is_empty());
        assert!(!AttrValue::from("x").is_empty());
        assert!(!AttrValue::Bool(false).is_empty());
        assert!(!AttrValue::Number(0).is_empty());
    }

    #[test]
    fn test_parent_type_classification() {
        let header = Attributes::new().with(AttrKey::FieldType, "header");
        let accordion = Attributes::new().with(AttrKey::FieldType, "accordion");
        let text = Attributes::new().with(AttrKey::FieldType, "text");
        assert!(header.is_parent_type());
        assert!(accordion.is_parent_type());
        assert!(!text.is_parent_type());
        assert!(!Attributes::new().is_parent_type());
    }

    #[test]
    fn test_merged_over_keeps_overrides() {
        let base = Attributes::new()
            .with(AttrKey::Code, "")
            .with(AttrKey::Enabled, false);
        let over = Attributes::new().with(AttrKey::Code, "greeting");
        let merged = over.merged_over(&base);
        assert_eq!(merged.text(AttrKey::Code), Some("greeting"));
        assert_eq!(merged.get(AttrKey::Enabled), &AttrValue::Bool(false));
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(AttrValue::from(None::<String>), AttrValue::Unset);
        assert_eq!(AttrValue::from(Some(true)), AttrValue::Bool(true));
        assert_eq!(AttrValue::from(Some(3_i64)), AttrValue::Number(3));
    }

    #[test]
    fn test_flag_defaults_to_false() {
        let attrs = Attributes::new();
        assert!(!attrs.flag(AttrKey::CanTriggerWorkflow));
        let attrs = attrs.with(AttrKey::CanTriggerWorkflow, true);
        assert!(attrs.flag(AttrKey::CanTriggerWorkflow));
    }
}
