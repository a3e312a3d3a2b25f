use poi_protocol::{AgentId, Source};
use serde::{Deserialize, Serialize};

/// Agents known to already hold a fact.
///
/// Kept sorted so membership is a binary search. Only grows, except for [`reset`] when the
/// fact's value changes.
///
/// [`reset`]: RecipientSet::reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSet {
    ids: Vec<AgentId>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set for a local source, `{peer}` otherwise.
    pub fn from_source(source: Source) -> Self {
        let mut set = Self::new();
        set.reset(source);
        set
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Returns `true` if `id` was newly added.
    pub fn insert(&mut self, id: AgentId) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.ids.insert(pos, id);
                true
            }
        }
    }

    pub fn reset(&mut self, source: Source) {
        self.ids.clear();
        if let Some(peer) = source.peer() {
            self.ids.push(peer);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.ids.iter().copied()
    }
}
