use thiserror::Error;

/// Failure to obtain a hierarchy payload from the backend.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend answered with status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("backend response was not a hierarchy: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("backend reported an error: {0}")]
    Backend(String),
}

/// Failure to turn a payload into a renderable graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("{role} of a link references unknown node `{endpoint}`")]
    UnresolvedReference {
        endpoint: String,
        role: EndpointRole,
    },
    #[error("link {role} has neither an id nor a name")]
    AnonymousEndpoint { role: EndpointRole },
    #[error("payload root has neither a name nor a group type")]
    EmptyPayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointRole {
    Source,
    Target,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}
