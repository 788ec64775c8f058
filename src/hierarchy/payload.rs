use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::FetchError;

/// One node of the nested hierarchy returned by the backend.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub direct_relationship: Option<bool>,
    #[serde(default)]
    pub total_nodes_displayed: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub indirect_relationships: Vec<RawIndirect>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<RawNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<RawLink>,
}

impl RawNode {
    pub fn member(name: &str, node_type: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            node_type: Some(node_type.to_owned()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn group(group_type: &str) -> Self {
        Self {
            group_type: Some(group_type.to_owned()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_children(mut self, children: Vec<RawNode>) -> Self {
        self.children = children;
        self
    }

    /// Display identity: the name, or the group category for unnamed groups.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.group_type.as_deref())
    }

    pub fn has_indirect_relationships(&self) -> bool {
        !self.indirect_relationships.is_empty()
            || self.children.iter().any(RawNode::has_indirect_relationships)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawIndirect {
    pub name: String,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RawLink {
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
}

/// A link endpoint as sent on the wire: either a bare identity or an
/// already materialized node object.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LinkEndpoint {
    Id(String),
    Node(EndpointObject),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct EndpointObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl LinkEndpoint {
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Node(node) => node.id.as_deref().or(node.name.as_deref()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a successful response body, turning an `error` field into a
/// backend failure instead of an empty hierarchy.
pub fn parse_hierarchy_response(raw: &str) -> Result<RawNode, FetchError> {
    let parsed: Value = serde_json::from_str(raw)?;
    if let Some(message) = backend_error_message(&parsed) {
        return Err(FetchError::Backend(message));
    }

    Ok(RawNode::deserialize(parsed)?)
}

/// Extracts the `error` field of a response body, if it has one.
pub fn backend_error_message(parsed: &Value) -> Option<String> {
    let error = parsed.as_object()?.get("error")?;
    Some(match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    })
}
