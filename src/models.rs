use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadSource {
    Website,
    Referral,
    Event,
    #[serde(rename = "Cold Call")]
    ColdCall,
}

impl LeadSource {
    pub const ALL: [LeadSource; 4] = [Self::Website, Self::Referral, Self::Event, Self::ColdCall];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Website => "Website",
            Self::Referral => "Referral",
            Self::Event => "Event",
            Self::ColdCall => "Cold Call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Unqualified,
        Self::Converted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Unqualified => "Unqualified",
            Self::Converted => "Converted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub email: String,
    pub source: LeadSource,
    pub score: i64,
    pub status: LeadStatus,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpportunityStage {
    #[default]
    Qualification,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl OpportunityStage {
    pub const ALL: [OpportunityStage; 5] = [
        Self::Qualification,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qualification => "Qualification",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: i64,
    pub name: String,
    pub account_name: String,
    pub amount: Option<f64>,
    pub stage: OpportunityStage,
    pub lead_id: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterScalar {
    Number(f64),
    Text(String),
}

impl FilterScalar {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(value) => *value == 0.0 || value.is_nan(),
            Self::Text(value) => value.is_empty(),
        }
    }
}

impl fmt::Display for FilterScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FilterScalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for FilterScalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

pub type FilterValues = BTreeMap<String, FilterScalar>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Leads,
    Opportunities,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Opportunities => "opportunities",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub leads: FilterValues,
    pub opportunities: FilterValues,
}

impl FilterState {
    pub fn get(&self, kind: EntityKind) -> &FilterValues {
        match kind {
            EntityKind::Leads => &self.leads,
            EntityKind::Opportunities => &self.opportunities,
        }
    }

    pub fn get_mut(&mut self, kind: EntityKind) -> &mut FilterValues {
        match kind {
            EntityKind::Leads => &mut self.leads,
            EntityKind::Opportunities => &mut self.opportunities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleSettings {
    pub loading_delay_ms: u64,
    pub overflow_menu_height: f64,
    pub overflow_menu_width: f64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            loading_delay_ms: 500,
            overflow_menu_height: 200.0,
            overflow_menu_width: 192.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadPayload {
    pub lead_id: i64,
    #[serde(default)]
    pub stage: OpportunityStage,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadResponse {
    pub opportunity: Opportunity,
    pub lead: Lead,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub removed: Option<Opportunity>,
    pub restored_lead: Option<Lead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFiltersPayload {
    pub kind: EntityKind,
    pub values: FilterValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ViewState<T> {
    Loading,
    Ready { rows: Vec<T> },
}

impl<T> ViewState<T> {
    pub fn rows(&self) -> Option<&[T]> {
        match self {
            Self::Loading => None,
            Self::Ready { rows } => Some(rows),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
