//! Form Tree — form-definition tree editor core
//!
//! Don't patch nested objects, edit the tree.
//!
//! In-memory model and editing engine for nested form definitions:
//! - Arena tree of header/accordion sections and input fields, O(1) parent lookup
//! - All-or-nothing structural edits (insert, delete, clone, re-parent, reorder)
//! - Static field catalog with typed requirement and visibility rules
//! - Lossless transcoding to the nested PascalCase wire document
//! - Editor session with a properties-panel state machine and stale-safe lookups
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Attribute catalog, value kinds, lookup sources, rules |
//! | [`config`] | Editor configuration (env / JSON) |
//! | [`error`] | Error taxonomy |
//! | [`field`] | Field ids, attribute values and maps, field nodes |
//! | [`lookup`] | Lookup Provider contract and static provider |
//! | [`ops`] | Serializable edit commands and drag affordances |
//! | [`session`] | Editor session: panel flow, lookups, load and submit |
//! | [`store`] | Form Store contract and in-memory store |
//! | [`tree`] | Field tree navigation and mutation |
//! | [`validation`] | Whole-tree submission validation |
//! | [`wire`] | Wire document encode/decode |
//! | `http` | REST backend for both collaborators (feature `http`) |
//!
//! # Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `http` | `reqwest` client implementing [`LookupProvider`] and [`FormStore`] |
//!
//! # Quick Start
//!
//! ```
//! use form_tree::{AttrKey, Attributes, FieldNode, FieldTree, Parent};
//!
//! let mut tree = FieldTree::new();
//! let section = tree
//!     .insert(None, FieldNode::with_attributes(
//!         Attributes::new().with(AttrKey::Code, "X").with(AttrKey::FieldType, "header"),
//!     ))
//!     .unwrap();
//! let field = tree
//!     .insert(Some(section), FieldNode::with_attributes(
//!         Attributes::new().with(AttrKey::Code, "Y").with(AttrKey::FieldType, "text"),
//!     ))
//!     .unwrap();
//!
//! assert_eq!(tree.find_parent_by_id(field).and_then(|p| p.id()), Some(section));
//! assert_eq!(tree.find_parent_by_id(section), Some(Parent::Root));
//!
//! // Already first among its siblings
//! assert!(!tree.move_up(field).unwrap());
//!
//! tree.delete(section).unwrap();
//! assert!(tree.is_empty());
//! ```
//!
//! Author: Moroya Sakamoto

pub mod catalog;
pub mod config;
pub mod error;
pub mod field;
#[cfg(feature = "http")]
pub mod http;
pub mod lookup;
pub mod ops;
pub mod session;
pub mod store;
pub mod tree;
pub mod validation;
pub mod wire;

pub use catalog::{AttrKey, CatalogEntry, FieldGroup, LookupSource, Rule, ValueKind};
pub use config::EditorConfig;
pub use error::{FormError, MissingValue, Result, TransportError, ValidationError};
pub use field::{AttrValue, Attributes, FieldId, FieldNode};
#[cfg(feature = "http")]
pub use http::HttpBackend;
pub use lookup::{LookupOption, LookupProvider, StaticLookupProvider};
pub use ops::{EditOp, OpOutcome};
pub use session::{
    EditorSession, LookupRequest, LookupTicket, PanelDraft, PanelKind, PanelState, PanelTarget,
};
pub use store::{FormStore, InMemoryFormStore};
pub use tree::{FieldTree, Parent, Shift};
pub use validation::validate_tree;
pub use wire::{decode, encode, from_json, to_json, WireField};
