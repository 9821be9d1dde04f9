//! Lookup provider
//!
//! Resolves a lookup category name to its `{id, name}` options and an
//! entity id to its columns. Unknown names resolve to an empty list;
//! only transport trouble is an error.
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::catalog::{
    CUSTOM_VALIDATION_LOOKUP, DROPDOWN_DEPENDENCY_LOOKUP, ENTITIES_LOOKUP, FIELD_TYPE_LOOKUP,
    GLOBAL_LOCALIZATION, HARDCODED_SELECTION, LOOKUP_SOURCE_MAPPING, QUESTIONS_LOOKUP,
    VERSION_LOOKUP, WORKFLOW_GROUP_LOOKUP,
};
use crate::error::TransportError;

/// One selectable option
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupOption {
    pub id: String,
    pub name: String,
}

impl LookupOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Source of lookup options
pub trait LookupProvider {
    /// Options of a named category; empty for unknown categories
    fn get_lookup_data(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Vec<LookupOption>, TransportError>> + Send;

    /// Columns of an entity; empty for unknown entities
    fn get_entity_columns(
        &self,
        entity: &str,
    ) -> impl Future<Output = Result<Vec<LookupOption>, TransportError>> + Send;
}

/// Provider backed by fixed in-memory lists
#[derive(Debug, Default)]
pub struct StaticLookupProvider {
    categories: HashMap<String, Vec<LookupOption>>,
    entity_columns: HashMap<String, Vec<LookupOption>>,
    offline: AtomicBool,
}

impl StaticLookupProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category's options
    pub fn with_category(mut self, category: impl Into<String>, options: Vec<LookupOption>) -> Self {
        self.categories.insert(category.into(), options);
        self
    }

    /// Register an entity's columns
    pub fn with_entity_columns(mut self, entity: impl Into<String>, columns: Vec<LookupOption>) -> Self {
        self.entity_columns.insert(entity.into(), columns);
        self
    }

    /// Simulate an unreachable backend
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Option lists used while no backend is available
    pub fn development() -> Self {
        fn options(pairs: &[(&str, &str)]) -> Vec<LookupOption> {
            pairs.iter().map(|&(id, name)| LookupOption::new(id, name)).collect()
        }

        Self::new()
            .with_category(
                GLOBAL_LOCALIZATION,
                options(&[
                    ("en_US", "English (US)"),
                    ("es_ES", "Spanish (Spain)"),
                    ("fr_FR", "French (France)"),
                ]),
            )
            .with_category(
                ENTITIES_LOOKUP,
                options(&[("customers", "Customers"), ("products", "Products"), ("orders", "Orders")]),
            )
            .with_category(
                FIELD_TYPE_LOOKUP,
                options(&[
                    ("text", "Text"),
                    ("number", "Number"),
                    ("date", "Date"),
                    ("dropdown", "Dropdown"),
                    ("checkbox", "Checkbox"),
                    ("radio", "Radio"),
                    ("header", "Header"),
                    ("accordion", "Accordion"),
                ]),
            )
            .with_category(
                CUSTOM_VALIDATION_LOOKUP,
                options(&[
                    ("email", "Email"),
                    ("phone", "Phone"),
                    ("url", "URL"),
                    ("alphanumeric", "Alphanumeric"),
                ]),
            )
            .with_category(
                QUESTIONS_LOOKUP,
                options(&[
                    ("q1", "Personal Information"),
                    ("q2", "Contact Details"),
                    ("q3", "Address Information"),
                ]),
            )
            .with_category(
                LOOKUP_SOURCE_MAPPING,
                options(&[("lsm1", "Countries"), ("lsm2", "States"), ("lsm3", "Cities")]),
            )
            .with_category(
                VERSION_LOOKUP,
                options(&[("v1", "Version 1.0"), ("v2", "Version 2.0"), ("v3", "Version 3.0")]),
            )
            .with_category(
                WORKFLOW_GROUP_LOOKUP,
                options(&[("wg1", "Approval"), ("wg2", "Notification"), ("wg3", "Integration")]),
            )
            .with_category(
                DROPDOWN_DEPENDENCY_LOOKUP,
                options(&[
                    ("dd1", "Country-State"),
                    ("dd2", "State-City"),
                    ("dd3", "Category-Subcategory"),
                ]),
            )
            .with_category(
                HARDCODED_SELECTION,
                options(&[
                    ("internal", "Internal"),
                    ("external", "External"),
                    ("text", "Text"),
                    ("link", "Link"),
                    ("image", "Image"),
                ]),
            )
            .with_entity_columns(
                "customers",
                options(&[("name", "Name"), ("email", "Email"), ("phone", "Phone")]),
            )
            .with_entity_columns(
                "products",
                options(&[("name", "Name"), ("price", "Price"), ("category", "Category")]),
            )
            .with_entity_columns(
                "orders",
                options(&[("orderId", "Order ID"), ("customer", "Customer"), ("amount", "Amount")]),
            )
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(TransportError::Unavailable(String::from("lookup provider offline")))
        } else {
            Ok(())
        }
    }
}

impl LookupProvider for StaticLookupProvider {
    async fn get_lookup_data(&self, category: &str) -> Result<Vec<LookupOption>, TransportError> {
        self.check_online()?;
        Ok(self.categories.get(category).cloned().unwrap_or_default())
    }

    async fn get_entity_columns(&self, entity: &str) -> Result<Vec<LookupOption>, TransportError> {
        self.check_online()?;
        Ok(self.entity_columns.get(entity).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[tokio::test]
    async fn test_development_covers_catalog_categories() {
        let provider = StaticLookupProvider::development();
        for category in catalog::lookup_categories() {
            let options = provider.get_lookup_data(category).await.unwrap();
            assert!(!options.is_empty(), "{category} has no options");
        }
    }

    #[tokio::test]
    async fn test_unknown_names_yield_empty_lists() {
        let provider = StaticLookupProvider::development();
        assert!(provider.get_lookup_data("Nope").await.unwrap().is_empty());
        assert!(provider.get_entity_columns("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entity_columns() {
        let provider = StaticLookupProvider::development();
        let columns = provider.get_entity_columns("orders").await.unwrap();
        let ids: Vec<_> = columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["orderId", "customer", "amount"]);
    }

    #[tokio::test]
    async fn test_offline_is_transport_error() {
        let provider = StaticLookupProvider::development();
        provider.set_offline(true);
        let err = provider.get_lookup_data(VERSION_LOOKUP).await.unwrap_err();
        assert!(err.is_retryable());
        provider.set_offline(false);
        assert_eq!(provider.get_lookup_data(VERSION_LOOKUP).await.unwrap().len(), 3);
    }
}
