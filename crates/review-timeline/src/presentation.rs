//! Client-local expand/collapse state for feed items.
//!
//! Never persisted. Items without an explicit choice are expanded exactly when
//! they carry content the viewer is allowed to reveal.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{UpdateId, UpdateKind};
use crate::timeline::CombinedUpdate;

/// Stable key for a rendered feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateKey {
    pub kind: UpdateKind,
    pub id: UpdateId,
    pub position: usize,
}

impl UpdateKey {
    pub fn new(kind: UpdateKind, id: UpdateId, position: usize) -> Self {
        Self { kind, id, position }
    }

    pub fn for_item(item: &CombinedUpdate, position: usize) -> Self {
        Self::new(item.kind(), item.id(), position)
    }
}

impl fmt::Display for UpdateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.kind, self.id, self.position)
    }
}

/// Expand/collapse choices keyed by [`UpdateKey`].
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    choices: HashMap<UpdateKey, bool>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective state: the explicit choice if any, else the default.
    pub fn is_expanded(&self, key: UpdateKey, item: &CombinedUpdate) -> bool {
        self.choices
            .get(&key)
            .copied()
            .unwrap_or_else(|| item.has_expandable_content())
    }

    /// Flip the effective state and return the new one.
    pub fn toggle(&mut self, key: UpdateKey, item: &CombinedUpdate) -> bool {
        let expanded = !self.is_expanded(key, item);
        self.choices.insert(key, expanded);
        expanded
    }

    /// Set the state explicitly. Repeating the call changes nothing.
    pub fn set_expanded(&mut self, key: UpdateKey, expanded: bool) {
        self.choices.insert(key, expanded);
    }

    /// Drop every choice made for an update, whatever its position.
    pub fn forget(&mut self, kind: UpdateKind, id: UpdateId) {
        self.choices.retain(|key, _| !(key.kind == kind && key.id == id));
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}
