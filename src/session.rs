//! Editor session
//!
//! Owns the live tree, the properties-panel state machine
//! (`Closed → Open → Saved/Cancelled → Closed`) and the lookup options
//! gathered for the open panel. Structural edits go through the session so
//! a panel whose node disappears is closed along with it.
//!
//! Lookups are asynchronous. Every panel opening gets a new generation;
//! a [`LookupTicket`] remembers the generation it was issued for, and a
//! result arriving for an older generation is discarded.
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::catalog::{self, AttrKey, LookupSource, ENTITIES_LOOKUP};
use crate::config::EditorConfig;
use crate::error::{FormError, MissingValue, Result, ValidationError};
use crate::field::{AttrValue, Attributes, FieldId, FieldNode};
use crate::lookup::{LookupOption, LookupProvider};
use crate::ops::{EditOp, OpOutcome};
use crate::store::FormStore;
use crate::tree::FieldTree;
use crate::validation;
use crate::wire;

/// Attributes edited through the parent panel
pub const PARENT_PANEL_KEYS: [AttrKey; 7] = [
    AttrKey::Code,
    AttrKey::SortOrder,
    AttrKey::FieldType,
    AttrKey::PageTitle,
    AttrKey::PageButtonTitle,
    AttrKey::AllowSubmission,
    AttrKey::PageBreak,
];

// ── Panel state ────────────────────────────────────────────────────────

/// Which panel variant is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Full attribute panel for input fields
    Field,
    /// Reduced panel for header/accordion fields
    Parent,
}

/// Node the open panel edits
#[derive(Debug, Clone, PartialEq)]
pub enum PanelTarget {
    /// Node already in the tree
    Existing(FieldId),
    /// Parent field inserted on save; `node` reserves its id
    NewParent {
        parent: Option<FieldId>,
        node: FieldNode,
    },
}

impl PanelTarget {
    pub fn id(&self) -> FieldId {
        match self {
            PanelTarget::Existing(id) => *id,
            PanelTarget::NewParent { node, .. } => node.id(),
        }
    }
}

/// Unsaved edits of the open panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDraft {
    target: PanelTarget,
    kind: PanelKind,
    is_new: bool,
    values: Attributes,
    entity: Option<String>,
    generation: u64,
}

impl PanelDraft {
    pub fn target(&self) -> &PanelTarget {
        &self.target
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    /// Node was created for this panel
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn values(&self) -> &Attributes {
        &self.values
    }

    pub fn value(&self, key: AttrKey) -> &AttrValue {
        self.values.get(key)
    }

    /// Entity whose columns feed the fieldCode options
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Attributes this panel shows
    pub fn editable_keys(&self) -> Vec<AttrKey> {
        match self.kind {
            PanelKind::Field => catalog::entries().iter().map(|e| e.key).collect(),
            PanelKind::Parent => PARENT_PANEL_KEYS.to_vec(),
        }
    }

    pub fn is_required(&self, key: AttrKey) -> bool {
        catalog::is_required(key, &self.values)
    }

    pub fn is_visible(&self, key: AttrKey) -> bool {
        catalog::is_visible(key, &self.values)
    }

    /// Required attributes still empty, restricted to the panel's keys
    pub fn missing(&self) -> Vec<AttrKey> {
        let editable = self.editable_keys();
        catalog::missing_values(&self.values)
            .into_iter()
            .filter(|key| editable.contains(key))
            .collect()
    }
}

/// Properties panel state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelState {
    #[default]
    Closed,
    Open(PanelDraft),
}

impl PanelState {
    pub fn is_open(&self) -> bool {
        matches!(self, PanelState::Open(_))
    }

    pub fn draft(&self) -> Option<&PanelDraft> {
        match self {
            PanelState::Open(draft) => Some(draft),
            PanelState::Closed => None,
        }
    }
}

// ── Lookup tickets ─────────────────────────────────────────────────────

/// Lookup call to make on behalf of a panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    Category(String),
    EntityColumns(String),
}

/// Pending lookup bound to the panel opening that requested it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub request: LookupRequest,
}

impl LookupTicket {
    /// Resolve the ticket against a provider
    pub async fn fetch<P: LookupProvider>(&self, provider: &P) -> Result<Vec<LookupOption>> {
        let options = match &self.request {
            LookupRequest::Category(category) => provider.get_lookup_data(category).await,
            LookupRequest::EntityColumns(entity) => provider.get_entity_columns(entity).await,
        };
        options
            .inspect_err(|err| warn!(request = ?self.request, %err, "lookup failed"))
            .map_err(FormError::from)
    }
}

// ── Session ────────────────────────────────────────────────────────────

/// One user's editing session over one form
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    tree: FieldTree,
    panel: PanelState,
    generation: u64,
    lookups: HashMap<String, Vec<LookupOption>>,
    entity_columns: Vec<LookupOption>,
    /// Entity chosen per saved field; kept off the wire
    entities: HashMap<FieldId, String>,
    version_id: Option<String>,
    config: EditorConfig,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_tree(config: EditorConfig, tree: FieldTree) -> Self {
        Self {
            tree,
            ..Self::new(config)
        }
    }

    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn draft(&self) -> Option<&PanelDraft> {
        self.panel.draft()
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    /// Version applied to panels opened from now on
    pub fn set_version_id(&mut self, version_id: Option<String>) {
        self.version_id = version_id.filter(|v| !v.is_empty());
    }

    /// Options fetched for a category, empty until fetched
    pub fn lookup_options(&self, category: &str) -> &[LookupOption] {
        self.lookups
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Columns of the open panel's entity
    pub fn entity_columns(&self) -> &[LookupOption] {
        &self.entity_columns
    }

    /// Entity last saved for a field
    pub fn entity_of(&self, id: FieldId) -> Option<&str> {
        self.entities.get(&id).map(String::as_str)
    }

    // ── Structural edits ───────────────────────────────────────────────

    /// Apply an edit command, closing the panel if its node went away
    pub fn apply(&mut self, op: &EditOp) -> Result<OpOutcome> {
        let outcome = self.tree.apply(op)?;
        self.entities.retain(|id, _| self.tree.contains(*id));
        self.close_orphaned_panel();
        Ok(outcome)
    }

    pub fn delete_field(&mut self, id: FieldId) -> Result<usize> {
        match self.apply(&EditOp::Delete { id })? {
            OpOutcome::Deleted(count) => Ok(count),
            _ => Ok(0),
        }
    }

    pub fn clone_field(&mut self, id: FieldId) -> Result<FieldId> {
        match self.apply(&EditOp::Clone { id })? {
            OpOutcome::Cloned(copy) => Ok(copy),
            _ => Err(FormError::NotFound(id)),
        }
    }

    pub fn move_field(&mut self, source: FieldId, target: FieldId) -> Result<()> {
        self.apply(&EditOp::MoveToParent { source, target })
            .map(|_| ())
    }

    pub fn move_field_up(&mut self, id: FieldId) -> Result<bool> {
        Ok(matches!(
            self.apply(&EditOp::MoveUp { id })?,
            OpOutcome::Reordered(true)
        ))
    }

    pub fn move_field_down(&mut self, id: FieldId) -> Result<bool> {
        Ok(matches!(
            self.apply(&EditOp::MoveDown { id })?,
            OpOutcome::Reordered(true)
        ))
    }

    fn close_orphaned_panel(&mut self) {
        let orphaned = match &self.panel {
            PanelState::Closed => false,
            PanelState::Open(draft) => match &draft.target {
                PanelTarget::Existing(id) => !self.tree.contains(*id),
                PanelTarget::NewParent { parent, .. } => {
                    parent.is_some_and(|p| !self.tree.contains(p))
                }
            },
        };
        if orphaned {
            debug!("panel target removed, closing panel");
            self.close_panel();
        }
    }

    // ── Panel flow ─────────────────────────────────────────────────────

    /// Insert a fresh field with catalog defaults and open its panel
    pub fn add_field(&mut self, parent: Option<FieldId>) -> Result<FieldId> {
        let node = FieldNode::new();
        let values = self.prefill(node.attributes.clone());
        let id = self.tree.insert(parent, node)?;
        self.open(PanelDraft {
            target: PanelTarget::Existing(id),
            kind: PanelKind::Field,
            is_new: true,
            values,
            entity: None,
            generation: 0,
        });
        Ok(id)
    }

    /// Open the parent panel for a parent field not yet in the tree
    pub fn open_new_parent(&mut self, parent: Option<FieldId>) -> Result<FieldId> {
        if let Some(parent_id) = parent {
            if !self.tree.contains(parent_id) {
                return Err(FormError::NotFound(parent_id));
            }
        }
        let node = FieldNode::with_attributes(Attributes::new());
        let id = node.id();
        let values = Attributes::new()
            .with(AttrKey::Code, "")
            .with(AttrKey::SortOrder, 0_i64)
            .with(AttrKey::FieldType, "")
            .with(AttrKey::AllowSubmission, false)
            .with(AttrKey::PageBreak, false);
        self.open(PanelDraft {
            target: PanelTarget::NewParent { parent, node },
            kind: PanelKind::Parent,
            is_new: true,
            values,
            entity: None,
            generation: 0,
        });
        Ok(id)
    }

    /// Open the panel for an existing node, loading its values over the
    /// catalog defaults
    pub fn open_panel(&mut self, id: FieldId) -> Result<()> {
        let node = self.tree.find_by_id(id).ok_or(FormError::NotFound(id))?;
        let kind = if node.is_parent_type() {
            PanelKind::Parent
        } else {
            PanelKind::Field
        };
        let values = node.attributes.merged_over(&catalog::default_attributes());
        let (values, entity) = match kind {
            PanelKind::Field => (self.prefill(values), self.entities.get(&id).cloned()),
            PanelKind::Parent => (values, None),
        };
        self.open(PanelDraft {
            target: PanelTarget::Existing(id),
            kind,
            is_new: false,
            values,
            entity,
            generation: 0,
        });
        Ok(())
    }

    fn prefill(&self, mut values: Attributes) -> Attributes {
        if let Some(version) = &self.version_id {
            values.set(AttrKey::VersionId, version.as_str());
        }
        values
    }

    fn open(&mut self, mut draft: PanelDraft) {
        self.generation += 1;
        draft.generation = self.generation;
        debug!(field = %draft.target.id(), kind = ?draft.kind, generation = self.generation, "panel opened");
        self.entity_columns.clear();
        self.panel = PanelState::Open(draft);
    }

    fn draft_mut(&mut self) -> Result<&mut PanelDraft> {
        match &mut self.panel {
            PanelState::Open(draft) => Ok(draft),
            PanelState::Closed => Err(FormError::PanelClosed),
        }
    }

    /// Edit one value of the open panel
    pub fn set_value(&mut self, key: AttrKey, value: impl Into<AttrValue>) -> Result<()> {
        let value = value.into();
        let expected = key.entry().kind;
        if !expected.accepts(&value) {
            return Err(FormError::AttributeKind { key, expected });
        }
        self.draft_mut()?.values.set(key, value);
        Ok(())
    }

    /// Choose the entity whose columns feed fieldCode. A different entity
    /// clears fieldCode.
    pub fn select_entity(&mut self, entity: impl Into<String>) -> Result<LookupTicket> {
        let entity = entity.into();
        let draft = self.draft_mut()?;
        let changed = draft.entity.as_deref() != Some(entity.as_str());
        if changed {
            draft.values.set(AttrKey::FieldCode, "");
            draft.entity = Some(entity.clone());
        }
        let generation = draft.generation;
        if changed {
            self.entity_columns.clear();
        }
        Ok(LookupTicket {
            generation,
            request: LookupRequest::EntityColumns(entity),
        })
    }

    /// Lookups the open panel needs
    pub fn lookup_tickets(&self) -> Result<Vec<LookupTicket>> {
        let draft = self.draft().ok_or(FormError::PanelClosed)?;
        let mut categories = Vec::new();
        for key in draft.editable_keys() {
            if let Some(LookupSource::Category(name)) = key.entry().lookup {
                if !categories.contains(&name) {
                    categories.push(name);
                }
            }
        }
        if draft.kind == PanelKind::Field {
            categories.push(ENTITIES_LOOKUP);
        }
        let mut tickets: Vec<_> = categories
            .into_iter()
            .map(|name| LookupTicket {
                generation: draft.generation,
                request: LookupRequest::Category(name.to_string()),
            })
            .collect();
        if let Some(entity) = &draft.entity {
            tickets.push(LookupTicket {
                generation: draft.generation,
                request: LookupRequest::EntityColumns(entity.clone()),
            });
        }
        Ok(tickets)
    }

    /// Store a lookup result; `false` when the ticket's panel is gone
    pub fn apply_lookup(&mut self, ticket: &LookupTicket, options: Vec<LookupOption>) -> bool {
        let current = self.draft().map(PanelDraft::generation);
        if current != Some(ticket.generation) {
            debug!(generation = ticket.generation, ?current, "stale lookup discarded");
            return false;
        }
        match &ticket.request {
            LookupRequest::Category(category) => {
                self.lookups.insert(category.clone(), options);
            }
            LookupRequest::EntityColumns(entity) => {
                if self.draft().and_then(PanelDraft::entity) != Some(entity.as_str()) {
                    return false;
                }
                self.entity_columns = options;
            }
        }
        true
    }

    /// Fetch and apply every lookup the open panel needs; returns how many
    /// results were applied
    pub async fn refresh_lookups<P: LookupProvider>(&mut self, provider: &P) -> Result<usize> {
        let mut applied = 0;
        for ticket in self.lookup_tickets()? {
            let options = ticket.fetch(provider).await?;
            if self.apply_lookup(&ticket, options) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Write the panel's values into the tree and close it
    pub fn save_panel(&mut self) -> Result<FieldId> {
        let draft = self.draft().ok_or(FormError::PanelClosed)?;
        let id = draft.target.id();

        let missing = draft.missing();
        if !missing.is_empty() {
            let path = self.draft_path(draft);
            let missing = missing
                .into_iter()
                .map(|key| MissingValue {
                    field: id,
                    path: path.clone(),
                    key,
                })
                .collect();
            warn!(%id, "panel save blocked by missing values");
            return Err(ValidationError::MissingValues(missing).into());
        }

        let attributes = match draft.kind {
            PanelKind::Field => self.prefill(draft.values.clone()),
            PanelKind::Parent => {
                let field_type = draft.values.text(AttrKey::FieldType).unwrap_or_default();
                if !catalog::is_parent_field_type(field_type) {
                    return Err(ValidationError::NotParentType(field_type.to_string()).into());
                }
                self.parent_attributes(draft)
            }
        };

        let entity = match draft.kind {
            PanelKind::Field => draft.entity.clone(),
            PanelKind::Parent => None,
        };
        match draft.target.clone() {
            PanelTarget::Existing(id) => self.tree.update(id, attributes)?,
            PanelTarget::NewParent { parent, mut node } => {
                node.attributes = attributes;
                self.tree.insert(parent, node)?;
            }
        }
        if let Some(entity) = entity {
            self.entities.insert(id, entity);
        }
        debug!(%id, "panel saved");
        self.close_panel();
        Ok(id)
    }

    fn parent_attributes(&self, draft: &PanelDraft) -> Attributes {
        let mut attrs = draft.values.clone();
        if attrs.get(AttrKey::SortOrder).is_empty() {
            attrs.set(AttrKey::SortOrder, 0_i64);
        }
        if attrs.get(AttrKey::HelperTextCode).is_empty() {
            let code = attrs.get(AttrKey::Code).clone();
            attrs.set(AttrKey::HelperTextCode, code);
        }
        if draft.is_new {
            attrs.set(AttrKey::Enabled, true);
            attrs.set(AttrKey::Display, true);
            attrs.set(AttrKey::IsRtl, false);
            if let Some(version) = &self.version_id {
                attrs.set(AttrKey::VersionId, version.as_str());
            }
        }
        attrs
    }

    /// Index path of the draft's node; a new parent reports the position it
    /// would take
    fn draft_path(&self, draft: &PanelDraft) -> Vec<usize> {
        match &draft.target {
            PanelTarget::Existing(id) => self.tree.path_of(*id).unwrap_or_default(),
            PanelTarget::NewParent { parent, .. } => {
                let (mut path, siblings) = match parent {
                    Some(p) => (
                        self.tree.path_of(*p).unwrap_or_default(),
                        self.tree.find_by_id(*p).map_or(0, |n| n.children().len()),
                    ),
                    None => (Vec::new(), self.tree.roots().len()),
                };
                path.push(siblings);
                path
            }
        }
    }

    /// Discard the panel's edits. A field created by
    /// [`add_field`](Self::add_field) stays in the tree with its defaults.
    pub fn cancel_panel(&mut self) {
        if self.panel.is_open() {
            debug!("panel cancelled");
            self.close_panel();
        }
    }

    fn close_panel(&mut self) {
        self.panel = PanelState::Closed;
        self.entity_columns.clear();
        self.generation += 1;
    }

    // ── Load & submit ──────────────────────────────────────────────────

    /// Replace the tree with the stored form. An empty stored form keeps
    /// the current tree; the tree is untouched on error.
    pub async fn load<S: FormStore>(&mut self, store: &S) -> Result<usize> {
        let roots = store
            .get_form()
            .await
            .inspect_err(|err| warn!(%err, "form load failed"))?;
        if roots.is_empty() {
            debug!("stored form is empty, keeping current tree");
            return Ok(0);
        }
        let tree = wire::decode(roots)?;
        let count = tree.len();
        self.tree = tree;
        self.entities.clear();
        self.close_panel();
        info!(fields = count, "form loaded");
        Ok(count)
    }

    /// Validate, encode and save the tree; the tree is untouched on error
    pub async fn submit<S: FormStore>(&mut self, store: &S) -> Result<serde_json::Value> {
        if let Err(err) = validation::validate_tree(&self.tree) {
            warn!(%err, "submission blocked");
            return Err(err.into());
        }
        let mut outgoing = self.tree.clone();
        if self.config.renumber_on_submit {
            outgoing.renumber_sort_order();
        }
        let roots = wire::encode(&outgoing)?;
        let payload = store
            .create_form(roots)
            .await
            .inspect_err(|err| warn!(%err, "form submission failed"))?;
        self.tree = outgoing;
        info!(fields = self.tree.len(), "form submitted");
        Ok(payload)
    }
}
