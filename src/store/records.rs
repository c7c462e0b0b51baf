use super::{load_json, persist_json};
use crate::db::KeyValueStore;
use crate::errors::AppResult;
use crate::models::{Lead, Opportunity};
use crate::seed;
use std::sync::Arc;

pub const LEADS_STORAGE_KEY: &str = "mini-seller-console-leads";
pub const OPPORTUNITIES_STORAGE_KEY: &str = "mini-seller-console-opportunities";

/// Owns both record collections. Every mutation replaces a whole collection
/// and writes it through to storage before returning.
pub struct RecordStore {
    storage: Arc<dyn KeyValueStore>,
    leads: Vec<Lead>,
    opportunities: Vec<Opportunity>,
    leads_version: u64,
    opportunities_version: u64,
}

impl RecordStore {
    pub fn hydrate(storage: Arc<dyn KeyValueStore>) -> AppResult<Self> {
        let leads = match load_json::<Vec<Lead>>(storage.as_ref(), LEADS_STORAGE_KEY) {
            Some(leads) => {
                tracing::info!(count = leads.len(), "hydrated leads from storage");
                leads
            }
            None => {
                let leads = seed::seed_leads()?;
                persist_json(storage.as_ref(), LEADS_STORAGE_KEY, &leads);
                tracing::info!(count = leads.len(), "hydrated leads from seed");
                leads
            }
        };

        let opportunities = match load_json::<Vec<Opportunity>>(storage.as_ref(), OPPORTUNITIES_STORAGE_KEY) {
            Some(opportunities) => {
                tracing::info!(count = opportunities.len(), "hydrated opportunities from storage");
                opportunities
            }
            None => {
                let opportunities = seed::seed_opportunities()?;
                persist_json(storage.as_ref(), OPPORTUNITIES_STORAGE_KEY, &opportunities);
                tracing::info!(count = opportunities.len(), "hydrated opportunities from seed");
                opportunities
            }
        };

        Ok(Self {
            storage,
            leads,
            opportunities,
            leads_version: 1,
            opportunities_version: 1,
        })
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn opportunities(&self) -> &[Opportunity] {
        &self.opportunities
    }

    pub fn leads_version(&self) -> u64 {
        self.leads_version
    }

    pub fn opportunities_version(&self) -> u64 {
        self.opportunities_version
    }

    pub fn replace_leads(&mut self, leads: Vec<Lead>) {
        self.leads = leads;
        self.leads_version += 1;
        persist_json(self.storage.as_ref(), LEADS_STORAGE_KEY, &self.leads);
    }

    pub fn replace_opportunities(&mut self, opportunities: Vec<Opportunity>) {
        self.opportunities = opportunities;
        self.opportunities_version += 1;
        persist_json(self.storage.as_ref(), OPPORTUNITIES_STORAGE_KEY, &self.opportunities);
    }
}
