//! Target bindings: one writer per `(target, tag)`.
//!
//! [`TargetBindings`] only records which action occupies a pair. Cancelling
//! the evicted occupant is the scheduler's job, since only the scheduler owns
//! actions.

use std::collections::HashMap;
use std::fmt;

use crate::scheduler::ActionId;
use crate::target::TargetId;

/// Grouping key scoping exclusivity on a target.
///
/// Untagged actions share [`Tag::Default`], so they replace each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    #[default]
    Default,
    Named(String),
}

impl Tag {
    pub fn named(name: impl Into<String>) -> Self {
        Tag::Named(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tag::Default => "default",
            Tag::Named(name) => name,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Named(name.to_owned())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Named(name)
    }
}

impl From<Option<&str>> for Tag {
    fn from(name: Option<&str>) -> Self {
        name.map_or(Tag::Default, Tag::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingKey {
    pub target: TargetId,
    pub tag: Tag,
}

impl BindingKey {
    pub fn new(target: TargetId, tag: impl Into<Tag>) -> Self {
        Self {
            target,
            tag: tag.into(),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target, self.tag)
    }
}

/// The exclusivity table.
#[derive(Debug, Default)]
pub struct TargetBindings {
    entries: HashMap<BindingKey, ActionId>,
}

impl TargetBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupant(&self, key: &BindingKey) -> Option<ActionId> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &BindingKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Installs `id` under `key`, returning the previous occupant.
    pub fn insert(&mut self, key: BindingKey, id: ActionId) -> Option<ActionId> {
        self.entries.insert(key, id)
    }

    pub fn remove(&mut self, key: &BindingKey) -> Option<ActionId> {
        self.entries.remove(key)
    }

    /// Releases `key` only if it is still occupied by `id`.
    ///
    /// A stale release, issued by an action that was already replaced, never
    /// evicts the newer occupant.
    pub fn release(&mut self, key: &BindingKey, id: ActionId) -> bool {
        if self.entries.get(key) == Some(&id) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
