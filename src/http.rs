//! REST backend
//!
//! One `reqwest` client serving both collaborator contracts against the
//! configured base URL. With development lookups enabled, lookups are
//! answered from the built-in lists and never reach the network.
//!
//! Author: Moroya Sakamoto

use std::sync::Arc;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::error::TransportError;
use crate::lookup::{LookupOption, LookupProvider, StaticLookupProvider};
use crate::store::FormStore;
use crate::wire::WireField;

const GET_FORM_PATH: &str = "formConfiguration/GetDynamicForm";
const CREATE_FORM_PATH: &str = "formConfiguration/CreateUserInterfaceForDynamicForm";

/// HTTP client for lookups and form persistence
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: EditorConfig,
    development: Option<Arc<StaticLookupProvider>>,
}

impl HttpBackend {
    pub fn new(config: EditorConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let development = config
            .development_lookups
            .then(|| Arc::new(StaticLookupProvider::development()));
        Ok(Self {
            client,
            config,
            development,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Base URL extended by percent-encoded path segments
    fn url_for(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.config.api_base_url)
            .map_err(|err| TransportError::Unavailable(format!("invalid base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::Unavailable(String::from("base url cannot take a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON list; 404 and `null` both read as empty
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, TransportError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await.inspect_err(|err| {
            warn!(%url, %err, "request failed");
        })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = response.error_for_status()?;
        let list: Option<Vec<T>> = response.json().await?;
        Ok(list.unwrap_or_default())
    }
}

impl LookupProvider for HttpBackend {
    async fn get_lookup_data(&self, category: &str) -> Result<Vec<LookupOption>, TransportError> {
        if let Some(development) = &self.development {
            return development.get_lookup_data(category).await;
        }
        self.get_list(self.url_for(&["lookups", category])?).await
    }

    async fn get_entity_columns(&self, entity: &str) -> Result<Vec<LookupOption>, TransportError> {
        if let Some(development) = &self.development {
            return development.get_entity_columns(entity).await;
        }
        self.get_list(self.url_for(&["entities", entity, "columns"])?)
            .await
    }
}

impl FormStore for HttpBackend {
    async fn get_form(&self) -> Result<Vec<WireField>, TransportError> {
        let url = self.config.endpoint(GET_FORM_PATH);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let roots: Option<Vec<WireField>> = response.json().await?;
        Ok(roots.unwrap_or_default())
    }

    async fn create_form(&self, roots: Vec<WireField>) -> Result<serde_json::Value, TransportError> {
        let url = self.config.endpoint(CREATE_FORM_PATH);
        debug!(%url, roots = roots.len(), "POST");
        let response = self
            .client
            .post(&url)
            .json(&roots)
            .send()
            .await
            .inspect_err(|err| warn!(%url, %err, "submit failed"))?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_urls_encode_names() {
        let backend = HttpBackend::new(EditorConfig::default()).unwrap();
        let url = backend.url_for(&["lookups", "Version (Lookup)"]).unwrap();
        assert_eq!(url.path(), "/api/lookups/Version%20(Lookup)");
        let url = backend.url_for(&["entities", "a/b", "columns"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/entities/a%2Fb/columns");
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let config = EditorConfig {
            api_base_url: String::from("http://host/api/"),
            ..EditorConfig::default()
        };
        let backend = HttpBackend::new(config).unwrap();
        let url = backend.url_for(&["lookups", "Field Type (Lookup)"]).unwrap();
        assert_eq!(url.path(), "/api/lookups/Field%20Type%20(Lookup)");
    }

    #[test]
    fn test_backend_builds_from_config() {
        let backend = HttpBackend::new(EditorConfig::default()).unwrap();
        assert_eq!(
            backend.config().endpoint(GET_FORM_PATH),
            "http://localhost:3001/api/formConfiguration/GetDynamicForm"
        );
    }

    #[tokio::test]
    async fn test_development_lookups_stay_local() {
        let config = EditorConfig {
            api_base_url: String::from("http://127.0.0.1:9"),
            development_lookups: true,
            ..EditorConfig::default()
        };
        let backend = HttpBackend::new(config).unwrap();
        let columns = backend.get_entity_columns("customers").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert!(backend.get_lookup_data("Unknown").await.unwrap().is_empty());
    }
}
