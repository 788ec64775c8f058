use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use super::error::FetchError;
use super::payload::{RawNode, backend_error_message, parse_hierarchy_response};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyQuery {
    pub depth: u32,
    /// Empty asks the backend for its default focus.
    pub active_node: String,
}

impl HierarchyQuery {
    pub fn new(depth: u32, active_node: impl Into<String>) -> Self {
        Self {
            depth,
            active_node: active_node.into(),
        }
    }
}

/// Anything that can answer a hierarchy query.
pub trait HierarchySource: Send + Sync {
    fn fetch(&self, query: &HierarchyQuery) -> Result<RawNode, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpHierarchySource {
    base_url: String,
    client: Client,
}

impl HttpHierarchySource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.to_owned(),
                source,
            })?;

        Ok(Self {
            base_url: base_url.to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HierarchySource for HttpHierarchySource {
    fn fetch(&self, query: &HierarchyQuery) -> Result<RawNode, FetchError> {
        let depth = query.depth.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("depth", depth.as_str()),
                ("activeNode", query.active_node.as_str()),
            ])
            .send()
            .map_err(|source| FetchError::Http {
                url: self.base_url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().map_err(|source| FetchError::Http {
            url: self.base_url.clone(),
            source,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|parsed| backend_error_message(&parsed))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("<no reason>")
                        .to_owned()
                });
            return Err(FetchError::Status {
                code: status.as_u16(),
                message,
            });
        }

        parse_hierarchy_response(&body)
    }
}
