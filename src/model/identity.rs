//! Item identity resolution.
//!
//! Every identity-keyed cache in the pipeline is keyed by [`ItemKey`].
//! A key is derived from an item's global node id when present, falling back
//! to its local id. Items with neither are malformed: they never enter an
//! identity-keyed sequence but can still be rendered positionally.

use super::item::Item;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Stable identity of a logical item.
///
/// Permanent for the entity it names: payload updates replace the item but
/// keep the key. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Smart constructor: rejects empty and whitespace-only keys.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidItemKey> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            Err(InvalidItemKey::Empty)
        } else {
            Ok(Self(raw))
        }
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local item id as delivered by the data source: either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalId {
    /// Numeric id (rendered in decimal when used as a key).
    Number(u64),
    /// Negative numeric id.
    Signed(i64),
    /// String id.
    Text(String),
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalId::Number(n) => write!(f, "{n}"),
            LocalId::Signed(n) => write!(f, "{n}"),
            LocalId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for LocalId {
    fn from(id: u64) -> Self {
        LocalId::Number(id)
    }
}

impl From<&str> for LocalId {
    fn from(id: &str) -> Self {
        LocalId::Text(id.to_string())
    }
}

/// Deserialize an optional local id, mapping any other JSON shape to `None`.
///
/// A float, boolean or object id makes the item malformed rather than failing
/// the whole document it arrived in.
pub(crate) fn lenient_local_id<'de, D>(deserializer: D) -> Result<Option<LocalId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

/// Why an [`ItemKey`] could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidItemKey {
    /// The raw key was empty or whitespace.
    #[error("Item key cannot be empty")]
    Empty,
}

/// Resolve the identity of an item.
///
/// Prefers `node_id`, falls back to the local `id`. A blank `node_id` is
/// treated as absent. Returns `None` for malformed items.
pub fn resolve_identity(item: &Item) -> Option<ItemKey> {
    item.node_id
        .as_deref()
        .and_then(|node_id| ItemKey::new(node_id).ok())
        .or_else(|| {
            item.id
                .as_ref()
                .and_then(|id| ItemKey::new(id.to_string()).ok())
        })
}

/// Collect the identities of a positional sequence, skipping malformed items.
pub fn identity_keys<'a, I>(items: I) -> Vec<ItemKey>
where
    I: IntoIterator<Item = &'a std::sync::Arc<Item>>,
{
    items
        .into_iter()
        .filter_map(|item| resolve_identity(item))
        .collect()
}
