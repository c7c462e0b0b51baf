use super::{load_json, persist_json};
use crate::db::KeyValueStore;
use crate::models::{EntityKind, FilterState, FilterValues};
use std::sync::Arc;

pub const LEAD_FILTERS_KEY: &str = "leadFilters";
pub const OPPORTUNITY_FILTERS_KEY: &str = "opportunityFilters";

pub struct FilterStore {
    storage: Arc<dyn KeyValueStore>,
    state: FilterState,
}

impl FilterStore {
    pub fn hydrate(storage: Arc<dyn KeyValueStore>) -> Self {
        let state = FilterState {
            leads: load_json(storage.as_ref(), LEAD_FILTERS_KEY).unwrap_or_default(),
            opportunities: load_json(storage.as_ref(), OPPORTUNITY_FILTERS_KEY).unwrap_or_default(),
        };
        Self { storage, state }
    }

    pub fn filters(&self, kind: EntityKind) -> &FilterValues {
        self.state.get(kind)
    }

    pub fn update_filters(&mut self, kind: EntityKind, values: FilterValues) {
        tracing::info!(kind = kind.as_str(), fields = values.len(), "filters updated");
        *self.state.get_mut(kind) = values;
        self.persist();
    }

    pub fn clear_filters(&mut self, kind: EntityKind) {
        tracing::info!(kind = kind.as_str(), "filters cleared");
        self.state.get_mut(kind).clear();
        self.persist();
    }

    fn persist(&self) {
        persist_json(self.storage.as_ref(), LEAD_FILTERS_KEY, &self.state.leads);
        persist_json(self.storage.as_ref(), OPPORTUNITY_FILTERS_KEY, &self.state.opportunities);
    }
}
