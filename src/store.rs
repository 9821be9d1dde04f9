//! Form store
//!
//! Loads and saves the serialized form. Saves are kept as numbered
//! revisions; loading returns the latest one (empty before the first save).
//!
//! Author: Moroya Sakamoto

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::json;

use crate::error::TransportError;
use crate::wire::WireField;

/// Revision number of a saved form (first save is 1)
pub type Revision = u64;

/// Persistence backend for the form document
pub trait FormStore {
    /// Current form's wire root nodes, possibly empty
    fn get_form(&self) -> impl Future<Output = Result<Vec<WireField>, TransportError>> + Send;

    /// Save a form; returns the backend's success payload
    fn create_form(
        &self,
        roots: Vec<WireField>,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;
}

/// In-memory revision store
#[derive(Debug, Default)]
pub struct InMemoryFormStore {
    revisions: Mutex<Vec<Vec<WireField>>>,
    offline: AtomicBool,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with one saved form
    pub fn with_form(roots: Vec<WireField>) -> Self {
        let store = Self::new();
        store.lock().push(roots);
        store
    }

    /// Simulate an unreachable backend
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<WireField>>> {
        self.revisions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(TransportError::Unavailable(String::from("form store offline")))
        } else {
            Ok(())
        }
    }

    /// Saved form by revision number
    pub fn get(&self, revision: Revision) -> Option<Vec<WireField>> {
        let index = usize::try_from(revision).ok()?.checked_sub(1)?;
        self.lock().get(index).cloned()
    }

    /// Most recent save
    pub fn latest(&self) -> Option<Vec<WireField>> {
        self.lock().last().cloned()
    }

    /// Total saved revisions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl FormStore for InMemoryFormStore {
    async fn get_form(&self) -> Result<Vec<WireField>, TransportError> {
        self.check_online()?;
        Ok(self.latest().unwrap_or_default())
    }

    async fn create_form(&self, roots: Vec<WireField>) -> Result<serde_json::Value, TransportError> {
        self.check_online()?;
        let mut revisions = self.lock();
        revisions.push(roots);
        Ok(json!({ "success": true, "revision": revisions.len() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(code: &str) -> Vec<WireField> {
        vec![WireField {
            code: Some(String::from(code)),
            field_type_id: Some(String::from("header")),
            ..WireField::default()
        }]
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty_form() {
        let store = InMemoryFormStore::new();
        assert!(store.get_form().await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get_latest() {
        let store = InMemoryFormStore::new();
        let payload = store.create_form(form("A")).await.unwrap();
        assert_eq!(payload["revision"], 1);
        store.create_form(form("B")).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_form().await.unwrap(), form("B"));
        assert_eq!(store.get(1), Some(form("A")));
    }

    #[test]
    fn test_get_revision_zero_is_none() {
        let store = InMemoryFormStore::with_form(form("A"));
        assert!(store.get(0).is_none());
        assert!(store.get(2).is_none());
        assert_eq!(store.latest(), Some(form("A")));
    }

    #[tokio::test]
    async fn test_offline_store_fails_without_saving() {
        let store = InMemoryFormStore::new();
        store.set_offline(true);
        let err = store.create_form(form("A")).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert!(store.get_form().await.is_err());
        assert!(store.is_empty());
    }
}
