use std::collections::{HashMap, HashSet};

use super::category::{Category, CategoryVisibility};
use super::error::{EndpointRole, GraphError};
use super::payload::{LinkEndpoint, RawNode};

pub const INDIRECT_PLACEHOLDER_DESCRIPTION: &str = "Automatically added via indirect relationship";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Keep group nodes instead of splicing their members into the parent.
    pub aggregation: bool,
    /// Materialize `indirectRelationships` as links (and placeholder nodes).
    pub indirect_links: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Member,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Hierarchy,
    Cross,
    Indirect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub category: Category,
    pub type_label: Option<String>,
    pub description: Option<String>,
    pub relationship: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
}

impl GraphNode {
    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphLink {
    pub source: usize,
    pub target: usize,
    pub kind: LinkKind,
}

/// The filtered, flattened node/link set of one render pass.
///
/// Link endpoints are indices into `nodes`; every link refers to a node of
/// this model.
#[derive(Clone, Debug)]
pub struct GraphModel {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    active: usize,
    total_nodes_displayed: Option<u64>,
}

impl GraphModel {
    pub fn build(
        raw: &RawNode,
        visibility: &CategoryVisibility,
        options: BuildOptions,
    ) -> Result<Self, GraphError> {
        let active_name = raw
            .display_name()
            .ok_or(GraphError::EmptyPayload)?
            .to_owned();

        let mut full = merge_sibling_groups(raw);
        if options.indirect_links {
            full = attach_indirect_nodes(&full);
        }

        let known_ids = collect_identities(&full);
        let mut cross_links = Vec::new();
        collect_cross_links(&full, &known_ids, options.indirect_links, &mut cross_links)?;

        let shaped = if options.aggregation {
            full
        } else {
            flatten_groups(&full, &active_name)
        };
        let visible = filter_by_visibility(&shaped, visibility);

        let mut builder = ModelBuilder::new(&active_name);
        builder.visit(&visible, None, 0);

        let ModelBuilder {
            nodes,
            index_by_id,
            mut links,
            mut seen,
            ..
        } = builder;

        for (source_id, target_id, kind) in cross_links {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&source_id), index_by_id.get(&target_id))
            else {
                continue;
            };
            if source == target || !seen.insert(undirected(source, target)) {
                continue;
            }
            links.push(GraphLink {
                source,
                target,
                kind,
            });
        }

        Ok(Self {
            nodes,
            links,
            active: 0,
            total_nodes_displayed: raw.total_nodes_displayed,
        })
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Every simulated link, hierarchy and cross links merged.
    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn hierarchy_links(&self) -> impl Iterator<Item = &GraphLink> {
        self.links
            .iter()
            .filter(|link| link.kind == LinkKind::Hierarchy)
    }

    pub fn cross_links(&self) -> impl Iterator<Item = &GraphLink> {
        self.links
            .iter()
            .filter(|link| link.kind != LinkKind::Hierarchy)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &GraphNode {
        &self.nodes[self.active]
    }

    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    #[cfg(test)]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn total_nodes_displayed(&self) -> Option<u64> {
        self.total_nodes_displayed
    }

    pub fn home_category(&self) -> Category {
        self.active().category
    }

    /// Categories of the non-active nodes, in first-seen order.
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.active)
            .filter_map(|(_, node)| seen.insert(node.category).then_some(node.category))
            .collect()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }
}

fn undirected(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Category key used for filtering: the group category for aggregation
/// nodes, the member type otherwise.
pub fn category_key(node: &RawNode) -> Option<Category> {
    node.group_type
        .as_deref()
        .or(node.node_type.as_deref())
        .map(Category::from_label)
}

fn is_group(node: &RawNode) -> bool {
    node.group_type.is_some()
}

fn without_children(node: &RawNode) -> RawNode {
    RawNode {
        name: node.name.clone(),
        node_type: node.node_type.clone(),
        group_type: node.group_type.clone(),
        description: node.description.clone(),
        relationship: node.relationship.clone(),
        direct_relationship: node.direct_relationship,
        total_nodes_displayed: node.total_nodes_displayed,
        indirect_relationships: node.indirect_relationships.clone(),
        children: Vec::new(),
        links: node.links.clone(),
    }
}

/// Merges sibling group nodes that share a `groupType`.
///
/// Non-group children keep their order; merged groups follow them in
/// first-seen order.
pub fn merge_sibling_groups(node: &RawNode) -> RawNode {
    let mut merged = without_children(node);
    let mut groups: Vec<RawNode> = Vec::new();

    for child in &node.children {
        let child = merge_sibling_groups(child);
        match child.group_type.clone() {
            Some(group_type) => {
                if let Some(existing) = groups
                    .iter_mut()
                    .find(|group| group.group_type.as_deref() == Some(group_type.as_str()))
                {
                    existing.children.extend(child.children);
                } else {
                    groups.push(child);
                }
            }
            None => merged.children.push(child),
        }
    }

    merged.children.extend(groups);
    merged
}

/// Replaces every group child with its members, all the way down.
///
/// A group carrying the active node's name stays in place.
pub fn flatten_groups(node: &RawNode, active_name: &str) -> RawNode {
    let mut flattened = without_children(node);
    for child in &node.children {
        splice_child(child, active_name, &mut flattened.children);
    }
    flattened
}

fn splice_child(child: &RawNode, active_name: &str, out: &mut Vec<RawNode>) {
    if is_group(child) && child.name.as_deref() != Some(active_name) {
        for grandchild in &child.children {
            splice_child(grandchild, active_name, out);
        }
    } else {
        out.push(flatten_groups(child, active_name));
    }
}

/// Drops every child whose category is hidden, together with its subtree.
/// Descent continues through the children that are kept.
pub fn filter_by_visibility(node: &RawNode, visibility: &CategoryVisibility) -> RawNode {
    let mut filtered = without_children(node);
    filtered.children = node
        .children
        .iter()
        .filter(|child| category_key(child).is_none_or(|key| visibility.is_visible(key)))
        .map(|child| filter_by_visibility(child, visibility))
        .collect();
    filtered
}

/// Adds placeholder children for indirect relationship targets that the
/// payload does not contain.
pub fn attach_indirect_nodes(root: &RawNode) -> RawNode {
    let mut names = HashSet::new();
    collect_names(root, &mut names);
    attach_indirect_recursive(root, &mut names)
}

fn collect_names(node: &RawNode, names: &mut HashSet<String>) {
    if let Some(name) = &node.name {
        names.insert(name.clone());
    }
    for child in &node.children {
        collect_names(child, names);
    }
}

fn attach_indirect_recursive(node: &RawNode, names: &mut HashSet<String>) -> RawNode {
    let mut attached = without_children(node);
    for child in &node.children {
        attached.children.push(attach_indirect_recursive(child, names));
    }

    for indirect in &node.indirect_relationships {
        if names.insert(indirect.name.clone()) {
            let mut placeholder = RawNode::member(
                &indirect.name,
                indirect.node_type.as_deref().unwrap_or("Unknown"),
            );
            placeholder.description = Some(INDIRECT_PLACEHOLDER_DESCRIPTION.to_owned());
            attached.children.push(placeholder);
        }
    }
    attached
}

/// Identities a link may reference: member names (groups have none).
fn collect_identities(node: &RawNode) -> HashSet<String> {
    let mut ids = HashSet::new();
    collect_identities_into(node, true, &mut ids);
    ids
}

fn collect_identities_into(node: &RawNode, is_root: bool, ids: &mut HashSet<String>) {
    if is_root || !is_group(node) {
        if let Some(name) = node.display_name() {
            ids.insert(name.to_owned());
        }
    }
    for child in &node.children {
        collect_identities_into(child, false, ids);
    }
}

fn resolve_endpoint(
    endpoint: &LinkEndpoint,
    role: EndpointRole,
    known_ids: &HashSet<String>,
) -> Result<String, GraphError> {
    let identity = endpoint
        .identity()
        .ok_or(GraphError::AnonymousEndpoint { role })?;
    if known_ids.contains(identity) {
        Ok(identity.to_owned())
    } else {
        Err(GraphError::UnresolvedReference {
            endpoint: identity.to_owned(),
            role,
        })
    }
}

fn collect_cross_links(
    node: &RawNode,
    known_ids: &HashSet<String>,
    include_indirect: bool,
    out: &mut Vec<(String, String, LinkKind)>,
) -> Result<(), GraphError> {
    for link in &node.links {
        let source = resolve_endpoint(&link.source, EndpointRole::Source, known_ids)?;
        let target = resolve_endpoint(&link.target, EndpointRole::Target, known_ids)?;
        out.push((source, target, LinkKind::Cross));
    }

    if include_indirect && let Some(source) = &node.name {
        for indirect in &node.indirect_relationships {
            out.push((source.clone(), indirect.name.clone(), LinkKind::Indirect));
        }
    }

    for child in &node.children {
        collect_cross_links(child, known_ids, include_indirect, out)?;
    }
    Ok(())
}

struct ModelBuilder<'a> {
    active_name: &'a str,
    nodes: Vec<GraphNode>,
    index_by_id: HashMap<String, usize>,
    links: Vec<GraphLink>,
    seen: HashSet<(usize, usize)>,
}

impl<'a> ModelBuilder<'a> {
    fn new(active_name: &'a str) -> Self {
        Self {
            active_name,
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn link_child(&mut self, parent: usize, child: usize) {
        if parent == child || !self.seen.insert(undirected(parent, child)) {
            return;
        }
        self.links.push(GraphLink {
            source: parent,
            target: child,
            kind: LinkKind::Hierarchy,
        });
        self.nodes[parent].children.push(child);
    }

    fn visit(&mut self, node: &RawNode, parent: Option<usize>, depth: usize) {
        let is_root = parent.is_none();
        let group = is_group(node) && !is_root;

        // A group named after the active node would duplicate it; its
        // members hang off the parent instead.
        if group && node.name.as_deref() == Some(self.active_name) {
            for child in &node.children {
                self.visit(child, parent, depth);
            }
            return;
        }

        let Some(display_name) = node.display_name() else {
            for child in &node.children {
                self.visit(child, parent, depth);
            }
            return;
        };

        let id = match (group, parent) {
            (true, Some(parent)) => format!("{}::{}", self.nodes[parent].id, display_name),
            _ => display_name.to_owned(),
        };

        if let Some(&existing) = self.index_by_id.get(&id) {
            if let Some(parent) = parent {
                self.link_child(parent, existing);
            }
            return;
        }

        let category = category_key(node).unwrap_or(Category::Unknown);
        let index = self.nodes.len();
        self.nodes.push(GraphNode {
            id: id.clone(),
            name: display_name.to_owned(),
            kind: if group {
                NodeKind::Group
            } else {
                NodeKind::Member
            },
            category,
            type_label: node
                .node_type
                .clone()
                .or_else(|| node.group_type.clone()),
            description: node.description.clone(),
            relationship: node.relationship.clone(),
            parent,
            children: Vec::new(),
            depth,
        });
        self.index_by_id.insert(id, index);

        if let Some(parent) = parent {
            self.link_child(parent, index);
        }

        for child in &node.children {
            self.visit(child, Some(index), depth + 1);
        }
    }
}
