//! Field catalog
//!
//! Static schema of every attribute a field may carry: label, value kind,
//! lookup source, display group and the conditional requirement or
//! visibility rule evaluated against a node's (possibly unsaved)
//! attribute map.
//!
//! Rules are a closed set of typed predicates. There is no expression
//! language; a rule that references an attribute the node does not carry
//! evaluates to false.
//!
//! Author: Moroya Sakamoto

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{FormError, Result};
use crate::field::{AttrValue, Attributes};

/// Field types that make a node parent-type
pub const PARENT_FIELD_TYPES: [&str; 2] = ["header", "accordion"];

/// Whether a field type value classifies a node as parent-type
pub fn is_parent_field_type(field_type: &str) -> bool {
    PARENT_FIELD_TYPES.contains(&field_type)
}

// ── Attribute keys ─────────────────────────────────────────────────────

/// Recognized attribute key.
///
/// Declaration order matches [`entries`] and the wire table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
#[repr(u8)]
pub enum AttrKey {
    Code,
    FieldCode,
    SortOrder,
    FieldType,
    CustomValidation,
    Placeholder,
    Question,
    LookupSourceMapping,
    IsRtl,
    HelperTextCode,
    GuideUrl,
    GuideUrlMode,
    GuideUrlType,
    Enabled,
    Display,
    Required,
    VersionId,
    CanTriggerWorkflow,
    DisplayWorkflowGroup,
    IsDynamicQuestion,
    PageTitle,
    PageButtonTitle,
    AllowSubmission,
    PageBreak,
    DropdownDependency,
    DefaultValue,
}

impl AttrKey {
    /// Field name in the wire format
    pub fn wire_name(self) -> &'static str {
        match self {
            AttrKey::Code => "Code",
            AttrKey::FieldCode => "FieldCode",
            AttrKey::SortOrder => "SortOrder",
            AttrKey::FieldType => "FieldTypeId",
            AttrKey::CustomValidation => "CustomValidationId",
            AttrKey::Placeholder => "Placeholder",
            AttrKey::Question => "QuestionId",
            AttrKey::LookupSourceMapping => "LookupSourceMappingId",
            AttrKey::IsRtl => "IsRtl",
            AttrKey::HelperTextCode => "HelperTextCode",
            AttrKey::GuideUrl => "GuideUrl",
            AttrKey::GuideUrlMode => "GuideUrlMode",
            AttrKey::GuideUrlType => "GuideUrlType",
            AttrKey::Enabled => "Enabled",
            AttrKey::Display => "Display",
            AttrKey::Required => "Required",
            AttrKey::VersionId => "VersionId",
            AttrKey::CanTriggerWorkflow => "CanTriggerWorkflow",
            AttrKey::DisplayWorkflowGroup => "DisplayWorkflowGroupId",
            AttrKey::IsDynamicQuestion => "IsDynamicQuestion",
            AttrKey::PageTitle => "PageTitle",
            AttrKey::PageButtonTitle => "PageButtonTitle",
            AttrKey::AllowSubmission => "AllowSubmission",
            AttrKey::PageBreak => "PageBreak",
            AttrKey::DropdownDependency => "DropdownDependencyId",
            AttrKey::DefaultValue => "DefaultValue",
        }
    }

    /// Catalog entry for this key
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }
}

// ── Descriptors ────────────────────────────────────────────────────────

/// How an attribute's value is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ValueKind {
    /// Single option chosen from a lookup list
    Lookup,
    /// Free text
    Text,
    /// Checkbox
    Boolean,
    /// Position among siblings
    Order,
}

impl ValueKind {
    /// Whether `value` is acceptable for this kind (unset always is)
    pub fn accepts(self, value: &AttrValue) -> bool {
        matches!(
            (self, value),
            (_, AttrValue::Unset)
                | (ValueKind::Lookup | ValueKind::Text, AttrValue::Text(_))
                | (ValueKind::Boolean, AttrValue::Bool(_))
                | (ValueKind::Order, AttrValue::Number(_))
        )
    }
}

/// Where a lookup attribute takes its options from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// Named Lookup Provider category
    Category(&'static str),
    /// Columns of the entity selected in the properties panel
    EntityColumns,
}

/// Properties panel tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FieldGroup {
    BasicInformation,
    Validation,
    UiElements,
    QuestionSettings,
    Workflow,
    Page,
    Advanced,
}

impl FieldGroup {
    pub fn label(self) -> &'static str {
        match self {
            FieldGroup::BasicInformation => "Basic Information",
            FieldGroup::Validation => "Validation",
            FieldGroup::UiElements => "UI Elements",
            FieldGroup::QuestionSettings => "Question Settings",
            FieldGroup::Workflow => "Workflow",
            FieldGroup::Page => "Page",
            FieldGroup::Advanced => "Advanced",
        }
    }

    /// Catalog entries shown on this tab, in catalog order
    pub fn entries(self) -> impl Iterator<Item = &'static CatalogEntry> {
        CATALOG.iter().filter(move |e| e.group == self)
    }
}

/// Conditional rule attached to one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Required while the referenced attribute is non-empty
    RequiredWhenFilled(AttrKey),
    /// Required unless the node is parent-type
    RequiredUnlessParentType,
    /// Visible only while the referenced boolean attribute is true
    VisibleWhenTrue(AttrKey),
}

impl Rule {
    /// Evaluate the rule's condition against a node's attributes
    pub fn holds(self, attrs: &Attributes) -> bool {
        match self {
            Rule::RequiredWhenFilled(other) => !attrs.get(other).is_empty(),
            Rule::RequiredUnlessParentType => {
                attrs.contains(AttrKey::FieldType) && !attrs.is_parent_type()
            }
            Rule::VisibleWhenTrue(other) => attrs.get(other) == &AttrValue::Bool(true),
        }
    }

    fn is_requirement(self) -> bool {
        !matches!(self, Rule::VisibleWhenTrue(_))
    }
}

/// Static descriptor of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: AttrKey,
    pub label: &'static str,
    pub kind: ValueKind,
    pub lookup: Option<LookupSource>,
    pub group: FieldGroup,
    /// Unconditionally required
    pub required: bool,
    pub rule: Option<Rule>,
    pub description: &'static str,
}

// ── Catalog ────────────────────────────────────────────────────────────

pub const GLOBAL_LOCALIZATION: &str = "Global Localization (Lookup)";
pub const FIELD_TYPE_LOOKUP: &str = "Field Type (Lookup)";
pub const CUSTOM_VALIDATION_LOOKUP: &str = "Custom Validation (Lookup)";
pub const QUESTIONS_LOOKUP: &str = "Questions (Lookup)";
pub const LOOKUP_SOURCE_MAPPING: &str = "Lookup (Lookup Source Mapping)";
pub const VERSION_LOOKUP: &str = "Version (Lookup)";
pub const WORKFLOW_GROUP_LOOKUP: &str = "Workflow Group (Lookup)";
pub const DROPDOWN_DEPENDENCY_LOOKUP: &str = "Dropdown Dependency (Lookup)";
pub const HARDCODED_SELECTION: &str = "Dropdown Selection Hardcoded";
/// Entities offered by the field panel's entity selector (not an attribute)
pub const ENTITIES_LOOKUP: &str = "Entities (Lookup)";

const fn attr(
    key: AttrKey,
    label: &'static str,
    kind: ValueKind,
    group: FieldGroup,
    description: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        key,
        label,
        kind,
        lookup: None,
        group,
        required: false,
        rule: None,
        description,
    }
}

const fn lookup(
    key: AttrKey,
    label: &'static str,
    source: LookupSource,
    group: FieldGroup,
    description: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        lookup: Some(source),
        ..attr(key, label, ValueKind::Lookup, group, description)
    }
}

use FieldGroup as G;
use LookupSource::{Category, EntityColumns};

static CATALOG: [CatalogEntry; 26] = [
    CatalogEntry {
        required: true,
        ..lookup(AttrKey::Code, "Code", Category(GLOBAL_LOCALIZATION), G::BasicInformation,
            "Value must be taken from global localization lookup.")
    },
    CatalogEntry {
        rule: Some(Rule::RequiredUnlessParentType),
        ..lookup(AttrKey::FieldCode, "Field", EntityColumns, G::BasicInformation,
            "Column name, selected after choosing an entity.")
    },
    attr(AttrKey::SortOrder, "Sort Order", ValueKind::Order, G::BasicInformation,
        "Position among siblings; follows drag-and-drop order."),
    CatalogEntry {
        required: true,
        ..lookup(AttrKey::FieldType, "Field Type", Category(FIELD_TYPE_LOOKUP), G::BasicInformation,
            "Field type selected from lookup.")
    },
    lookup(AttrKey::CustomValidation, "Custom Validation", Category(CUSTOM_VALIDATION_LOOKUP),
        G::Validation, "Validation selected from lookup."),
    attr(AttrKey::Placeholder, "Placeholder", ValueKind::Text, G::UiElements,
        "Placeholder text."),
    lookup(AttrKey::Question, "Question", Category(QUESTIONS_LOOKUP), G::QuestionSettings,
        "Question selected from lookup and mapped."),
    lookup(AttrKey::LookupSourceMapping, "Lookup Source Mapping", Category(LOOKUP_SOURCE_MAPPING),
        G::BasicInformation, "Selected from lookup and mapped."),
    attr(AttrKey::IsRtl, "IsRTL", ValueKind::Boolean, G::UiElements, "Right-to-left rendering."),
    lookup(AttrKey::HelperTextCode, "Helper Text Code", Category(GLOBAL_LOCALIZATION),
        G::UiElements, "Taken from global localization lookup."),
    attr(AttrKey::GuideUrl, "Guide Url", ValueKind::Text, G::UiElements, "URL of the field guide."),
    CatalogEntry {
        rule: Some(Rule::RequiredWhenFilled(AttrKey::GuideUrl)),
        ..lookup(AttrKey::GuideUrlMode, "Guide Url Mode", Category(HARDCODED_SELECTION),
            G::UiElements, "Internal or external; required once a guide URL is set.")
    },
    CatalogEntry {
        rule: Some(Rule::RequiredWhenFilled(AttrKey::GuideUrl)),
        ..lookup(AttrKey::GuideUrlType, "Guide Url Type", Category(HARDCODED_SELECTION),
            G::UiElements, "Text, link or image; required once a guide URL is set.")
    },
    attr(AttrKey::Enabled, "Enabled", ValueKind::Boolean, G::UiElements, "Field accepts input."),
    attr(AttrKey::Display, "Display", ValueKind::Boolean, G::UiElements, "Field is rendered."),
    attr(AttrKey::Required, "Required", ValueKind::Boolean, G::UiElements,
        "End users must fill the field."),
    lookup(AttrKey::VersionId, "VersionId", Category(VERSION_LOOKUP), G::Advanced,
        "Selected from version repository."),
    attr(AttrKey::CanTriggerWorkflow, "Can Trigger Workflow", ValueKind::Boolean, G::Workflow,
        "Field changes may start a workflow."),
    CatalogEntry {
        rule: Some(Rule::VisibleWhenTrue(AttrKey::CanTriggerWorkflow)),
        ..lookup(AttrKey::DisplayWorkflowGroup, "Display Workflow Group",
            Category(WORKFLOW_GROUP_LOOKUP), G::Workflow,
            "Workflow group; only when the field can trigger a workflow.")
    },
    attr(AttrKey::IsDynamicQuestion, "Is Dynamic Question", ValueKind::Boolean,
        G::QuestionSettings, "Question resolved at runtime."),
    attr(AttrKey::PageTitle, "Page Title", ValueKind::Text, G::Page, "Title of the page."),
    attr(AttrKey::PageButtonTitle, "Page Button Title", ValueKind::Text, G::Page,
        "Caption of the page button."),
    attr(AttrKey::AllowSubmission, "Allow Submission", ValueKind::Boolean, G::Page,
        "Page may be submitted on its own."),
    attr(AttrKey::PageBreak, "Page Break", ValueKind::Boolean, G::Page,
        "Start a new page after this section."),
    lookup(AttrKey::DropdownDependency, "Dropdown Dependency", Category(DROPDOWN_DEPENDENCY_LOOKUP),
        G::Advanced, "Selected from lookup and mapped."),
    attr(AttrKey::DefaultValue, "Default Value", ValueKind::Text, G::BasicInformation,
        "Initial value of the field."),
];

/// Every catalog entry, in declaration order
pub fn entries() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Lookup categories used by the catalog, each once, in catalog order
pub fn lookup_categories() -> Vec<&'static str> {
    let mut categories = Vec::new();
    for entry in &CATALOG {
        if let Some(Category(name)) = entry.lookup {
            if !categories.contains(&name) {
                categories.push(name);
            }
        }
    }
    categories
}

// ── Defaults & predicates ──────────────────────────────────────────────

/// Default value of one attribute on a fresh node
pub fn default_value(key: AttrKey) -> AttrValue {
    let entry = key.entry();
    if entry.kind == ValueKind::Boolean {
        AttrValue::Bool(false)
    } else if entry.required {
        AttrValue::Text(String::new())
    } else {
        AttrValue::Unset
    }
}

/// Attribute map of a fresh node
pub fn default_attributes() -> Attributes {
    AttrKey::iter().map(|key| (key, default_value(key))).collect()
}

/// Whether `key` must be filled in, given the node's current attributes
pub fn is_required(key: AttrKey, attrs: &Attributes) -> bool {
    let entry = key.entry();
    entry.required
        || entry
            .rule
            .is_some_and(|rule| rule.is_requirement() && rule.holds(attrs))
}

/// Whether `key` is shown, given the node's current attributes
pub fn is_visible(key: AttrKey, attrs: &Attributes) -> bool {
    match key.entry().rule {
        Some(rule @ Rule::VisibleWhenTrue(_)) => rule.holds(attrs),
        _ => true,
    }
}

/// Required attributes that are empty, in catalog order
pub fn missing_values(attrs: &Attributes) -> Vec<AttrKey> {
    AttrKey::iter()
        .filter(|&key| is_required(key, attrs) && attrs.get(key).is_empty())
        .collect()
}

/// Reject values whose kind does not match the catalog
pub fn check_kinds(attrs: &Attributes) -> Result<()> {
    for (key, value) in attrs.iter() {
        let expected = key.entry().kind;
        if !expected.accepts(value) {
            return Err(FormError::AttributeKind { key, expected });
        }
    }
    Ok(())
}
