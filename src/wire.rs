//! Wire transcoder
//!
//! Maps the internal [`FieldTree`] to and from the nested PascalCase JSON
//! document exchanged with the Form Store. The mapping is 1:1 per
//! attribute (see [`AttrKey::wire_name`]); unset values travel as `null`,
//! children travel as `ChildSections`. Ids are not carried: decoding
//! assigns fresh ones.
//!
//! Author: Moroya Sakamoto

use serde::{Deserialize, Deserializer, Serialize};
use strum::IntoEnumIterator;

use crate::catalog::AttrKey;
use crate::error::{FormError, Result};
use crate::field::{AttrValue, Attributes, FieldId, FieldNode};
use crate::tree::FieldTree;

/// One node of the wire document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WireField {
    pub code: Option<String>,
    pub field_code: Option<String>,
    pub sort_order: Option<i64>,
    pub field_type_id: Option<String>,
    pub custom_validation_id: Option<String>,
    pub placeholder: Option<String>,
    pub question_id: Option<String>,
    pub lookup_source_mapping_id: Option<String>,
    pub is_rtl: Option<bool>,
    pub helper_text_code: Option<String>,
    pub guide_url: Option<String>,
    pub guide_url_mode: Option<String>,
    pub guide_url_type: Option<String>,
    pub enabled: Option<bool>,
    pub display: Option<bool>,
    pub required: Option<bool>,
    pub version_id: Option<String>,
    pub can_trigger_workflow: Option<bool>,
    pub display_workflow_group_id: Option<String>,
    pub is_dynamic_question: Option<bool>,
    pub page_title: Option<String>,
    pub page_button_title: Option<String>,
    pub allow_submission: Option<bool>,
    pub page_break: Option<bool>,
    pub dropdown_dependency_id: Option<String>,
    pub default_value: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub child_sections: Vec<WireField>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<WireField>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<WireField>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Typed storage slot of one attribute inside a [`WireField`]
enum Slot<'a> {
    Text(&'a mut Option<String>),
    Flag(&'a mut Option<bool>),
    Order(&'a mut Option<i64>),
}

impl WireField {
    fn slot(&mut self, key: AttrKey) -> Slot<'_> {
        use Slot::{Flag, Order, Text};
        match key {
            AttrKey::Code => Text(&mut self.code),
            AttrKey::FieldCode => Text(&mut self.field_code),
            AttrKey::SortOrder => Order(&mut self.sort_order),
            AttrKey::FieldType => Text(&mut self.field_type_id),
            AttrKey::CustomValidation => Text(&mut self.custom_validation_id),
            AttrKey::Placeholder => Text(&mut self.placeholder),
            AttrKey::Question => Text(&mut self.question_id),
            AttrKey::LookupSourceMapping => Text(&mut self.lookup_source_mapping_id),
            AttrKey::IsRtl => Flag(&mut self.is_rtl),
            AttrKey::HelperTextCode => Text(&mut self.helper_text_code),
            AttrKey::GuideUrl => Text(&mut self.guide_url),
            AttrKey::GuideUrlMode => Text(&mut self.guide_url_mode),
            AttrKey::GuideUrlType => Text(&mut self.guide_url_type),
            AttrKey::Enabled => Flag(&mut self.enabled),
            AttrKey::Display => Flag(&mut self.display),
            AttrKey::Required => Flag(&mut self.required),
            AttrKey::VersionId => Text(&mut self.version_id),
            AttrKey::CanTriggerWorkflow => Flag(&mut self.can_trigger_workflow),
            AttrKey::DisplayWorkflowGroup => Text(&mut self.display_workflow_group_id),
            AttrKey::IsDynamicQuestion => Flag(&mut self.is_dynamic_question),
            AttrKey::PageTitle => Text(&mut self.page_title),
            AttrKey::PageButtonTitle => Text(&mut self.page_button_title),
            AttrKey::AllowSubmission => Flag(&mut self.allow_submission),
            AttrKey::PageBreak => Flag(&mut self.page_break),
            AttrKey::DropdownDependency => Text(&mut self.dropdown_dependency_id),
            AttrKey::DefaultValue => Text(&mut self.default_value),
        }
    }

    /// Wire form of one node's attributes (children left empty)
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        let mut wire = WireField::default();
        for (key, value) in attrs.iter() {
            match (wire.slot(key), value) {
                (_, AttrValue::Unset) => {}
                (Slot::Text(slot), AttrValue::Text(v)) => *slot = Some(v.clone()),
                (Slot::Flag(slot), AttrValue::Bool(v)) => *slot = Some(*v),
                (Slot::Order(slot), AttrValue::Number(v)) => *slot = Some(*v),
                _ => {
                    return Err(FormError::AttributeKind {
                        key,
                        expected: key.entry().kind,
                    })
                }
            }
        }
        Ok(wire)
    }

    /// Drain the attribute slots into an internal attribute map
    pub fn take_attributes(&mut self) -> Attributes {
        AttrKey::iter()
            .map(|key| {
                let value = match self.slot(key) {
                    Slot::Text(slot) => AttrValue::from(slot.take()),
                    Slot::Flag(slot) => AttrValue::from(slot.take()),
                    Slot::Order(slot) => AttrValue::from(slot.take()),
                };
                (key, value)
            })
            .collect()
    }

    /// Node count of this wire subtree
    pub fn count(&self) -> usize {
        1 + self.child_sections.iter().map(WireField::count).sum::<usize>()
    }
}

// ── Encode ─────────────────────────────────────────────────────────────

/// Encode the whole tree into wire root nodes
pub fn encode(tree: &FieldTree) -> Result<Vec<WireField>> {
    tree.roots()
        .iter()
        .map(|&id| encode_node(tree, id))
        .collect()
}

fn encode_node(tree: &FieldTree, id: FieldId) -> Result<WireField> {
    let node = tree.find_by_id(id).ok_or(FormError::NotFound(id))?;
    let mut wire = WireField::from_attributes(&node.attributes)?;
    wire.child_sections = node
        .children()
        .iter()
        .map(|&child| encode_node(tree, child))
        .collect::<Result<_>>()?;
    Ok(wire)
}

// ── Decode ─────────────────────────────────────────────────────────────

/// Decode wire root nodes into a fresh tree (new ids throughout)
pub fn decode(fields: Vec<WireField>) -> Result<FieldTree> {
    let mut tree = FieldTree::new();
    for field in fields {
        decode_node(&mut tree, None, field)?;
    }
    Ok(tree)
}

fn decode_node(tree: &mut FieldTree, parent: Option<FieldId>, mut wire: WireField) -> Result<()> {
    let children = std::mem::take(&mut wire.child_sections);
    let id = tree.insert(parent, FieldNode::with_attributes(wire.take_attributes()))?;
    for child in children {
        decode_node(tree, Some(id), child)?;
    }
    Ok(())
}

// ── JSON ───────────────────────────────────────────────────────────────

/// Serialize the tree as the wire JSON document
pub fn to_json(tree: &FieldTree) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(encode(tree)?)?)
}

/// Parse a wire JSON document; `null` reads as an empty form
pub fn from_json(value: serde_json::Value) -> Result<FieldTree> {
    if value.is_null() {
        return Ok(FieldTree::new());
    }
    decode(serde_json::from_value(value)?)
}

/// Structural shape of a tree with ids erased: attributes plus children,
/// recursively, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub attributes: Attributes,
    pub children: Vec<Shape>,
}

/// Id-free view of a tree, for comparing trees across a round trip
pub fn shape(tree: &FieldTree) -> Vec<Shape> {
    fn node_shape(tree: &FieldTree, id: FieldId) -> Option<Shape> {
        let node = tree.find_by_id(id)?;
        Some(Shape {
            attributes: node.attributes.clone(),
            children: node
                .children()
                .iter()
                .filter_map(|&c| node_shape(tree, c))
                .collect(),
        })
    }
    tree.roots()
        .iter()
        .filter_map(|&id| node_shape(tree, id))
        .collect()
}
