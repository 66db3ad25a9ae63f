//! Hierarchical queue groups.
//!
//! A group tree maps names either to a pattern (leaf) or to a nested tree.
//! Queue names are classified by whole-string matching against the leaves.

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{QueueCounts, ResolveError};

/// Compile `pattern` so that it only matches an entire subject string.
///
/// The pattern is checked on its own first, so an unbalanced pattern cannot
/// escape the anchoring group.
pub fn whole_string_match(pattern: &str) -> Result<Regex, ResolveError> {
    let invalid = |source| ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    };

    Regex::new(pattern).map_err(invalid)?;
    Regex::new(&format!(r"^(?:{pattern})\z")).map_err(invalid)
}

/// Anything classified by its queue name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

impl Named for QueueCounts {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A leaf pattern, kept together with its source text.
#[derive(Debug, Clone)]
pub struct GroupPattern {
    source: String,
    regex: Regex,
}

impl GroupPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, ResolveError> {
        let source = source.into();
        let regex = whole_string_match(&source)?;
        Ok(Self { source, regex })
    }

    /// The pattern exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for GroupPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A node of the configured group tree.
///
/// Built from the nested JSON configuration shape: a string value is a
/// leaf pattern, an object value is a nested set of groups. Sibling order
/// is kept as written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum GroupNode {
    Pattern(GroupPattern),
    Groups(Vec<(String, GroupNode)>),
}

impl GroupNode {
    /// A leaf node.
    pub fn pattern(source: impl Into<String>) -> Result<Self, ResolveError> {
        Ok(GroupNode::Pattern(GroupPattern::new(source)?))
    }

    /// An interior node with the given children, in order.
    pub fn groups<N: Into<String>>(children: impl IntoIterator<Item = (N, GroupNode)>) -> Self {
        GroupNode::Groups(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    /// Validate and convert a configuration value.
    ///
    /// `path` names the value in error messages.
    pub fn from_value(path: &str, value: &Value) -> Result<Self, ResolveError> {
        match value {
            Value::String(source) => GroupNode::pattern(source.as_str()),
            Value::Object(map) => map
                .iter()
                .map(|(name, child)| {
                    let child_path = format!("{path}/{name}");
                    GroupNode::from_value(&child_path, child).map(|node| (name.clone(), node))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(GroupNode::Groups),
            other => Err(ResolveError::InvalidGroup {
                path: path.to_string(),
                reason: format!("expected a pattern string or an object, found {other}"),
            }),
        }
    }

    /// Number of leaf patterns in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            GroupNode::Pattern(_) => 1,
            GroupNode::Groups(children) => children.iter().map(|(_, c)| c.leaf_count()).sum(),
        }
    }
}

impl TryFrom<Value> for GroupNode {
    type Error = ResolveError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        GroupNode::from_value("groups", &value)
    }
}

impl Serialize for GroupNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupNode::Pattern(pattern) => serializer.serialize_str(pattern.as_str()),
            GroupNode::Groups(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (name, child) in children {
                    map.serialize_entry(name, child)?;
                }
                map.end()
            }
        }
    }
}

/// Display-ready navigation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavNode {
    pub label: String,
    #[serde(flatten)]
    pub content: NavContent,
}

/// Either the leaf's pattern or the child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavContent {
    Data(String),
    Children(Vec<NavNode>),
}

impl NavNode {
    pub fn children(&self) -> &[NavNode] {
        match &self.content {
            NavContent::Children(children) => children,
            NavContent::Data(_) => &[],
        }
    }

    pub fn data(&self) -> Option<&str> {
        match &self.content {
            NavContent::Data(data) => Some(data),
            NavContent::Children(_) => None,
        }
    }
}

/// Mirror a group tree as navigation nodes, labelling the top node `name`.
pub fn build_nav_tree(name: &str, node: &GroupNode) -> NavNode {
    let content = match node {
        GroupNode::Pattern(pattern) => NavContent::Data(pattern.as_str().to_string()),
        GroupNode::Groups(children) => NavContent::Children(
            children
                .iter()
                .map(|(child_name, child)| build_nav_tree(child_name, child))
                .collect(),
        ),
    };

    NavNode {
        label: name.to_string(),
        content,
    }
}

/// Items whose name matches `pattern` as a whole string, in input order.
pub fn match_group<T: Named>(items: Vec<T>, pattern: &str) -> Result<Vec<T>, ResolveError> {
    let regex = whole_string_match(pattern)?;
    Ok(items
        .into_iter()
        .filter(|item| regex.is_match(item.name()))
        .collect())
}

/// Items matched by no leaf anywhere under `node`, in input order.
pub fn complement<T: Named>(items: Vec<T>, node: &GroupNode) -> Vec<T> {
    match node {
        GroupNode::Pattern(pattern) => items
            .into_iter()
            .filter(|item| !pattern.is_match(item.name()))
            .collect(),
        GroupNode::Groups(children) => {
            let mut remaining = items;
            for (_, child) in children {
                if remaining.is_empty() {
                    break;
                }
                remaining = complement(remaining, child);
            }
            remaining
        }
    }
}
