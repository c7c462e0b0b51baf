use crate::errors::{AppError, AppResult};
use crate::filter_panel::{FilterField, SelectOption};
use crate::filtering::{apply_filters, SCORE_RANGE};
use crate::loading::LoadingGate;
use crate::models::{
    ConvertLeadPayload, ConvertLeadResponse, FilterValues, Lead, LeadSource, LeadStatus, Opportunity,
    OpportunityStage, ViewState,
};
use crate::store::RecordStore;
use crate::table::{CellValue, Column, TableRow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid regex"));

pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email format";
pub const FIX_ERRORS_MESSAGE: &str = "Please fix the errors before saving.";
pub const DUPLICATE_CONVERSION_MESSAGE: &str = "This lead has already been converted to an opportunity.";

impl TableRow for Lead {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "company" => self.company.as_str().into(),
            "email" => self.email.as_str().into(),
            "source" => self.source.as_str().into(),
            "score" => self.score.into(),
            "status" => self.status.as_str().into(),
            "description" => self.description.as_str().into(),
            _ => CellValue::Null,
        }
    }
}

pub fn lead_columns() -> Vec<Column> {
    vec![
        Column::new("ID", "id"),
        Column::new("Score", "score"),
        Column::new("Name", "name"),
        Column::new("Company", "company"),
        Column::new("Email", "email"),
        Column::new("Source", "source"),
        Column::new("Status", "status"),
    ]
}

pub fn lead_filter_fields() -> Vec<FilterField> {
    vec![
        FilterField::text("name", "Name"),
        FilterField::text("company", "Company"),
        FilterField::select(
            "status",
            "Status",
            LeadStatus::ALL.iter().map(|status| SelectOption::same(status.as_str())).collect(),
        ),
        FilterField::select(
            "source",
            "Source",
            LeadSource::ALL.iter().map(|source| SelectOption::same(source.as_str())).collect(),
        ),
        FilterField::number("maxScore", "Maximum Score"),
        FilterField::number("minScore", "Minimum Score"),
    ]
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation(INVALID_EMAIL_MESSAGE.to_string()))
    }
}

#[derive(Debug)]
pub struct LeadWorkflow {
    gate: LoadingGate,
    sorted: Option<(u64, Vec<Lead>)>,
}

impl LeadWorkflow {
    pub fn new(loading_delay: Duration) -> Self {
        Self {
            gate: LoadingGate::new(loading_delay),
            sorted: None,
        }
    }

    pub fn gate_mut(&mut self) -> &mut LoadingGate {
        &mut self.gate
    }

    pub fn sorted_leads(&mut self, records: &RecordStore) -> &[Lead] {
        let version = records.leads_version();
        let stale = self.sorted.as_ref().map(|(cached, _)| *cached != version).unwrap_or(true);
        if stale {
            let mut leads = records.leads().to_vec();
            leads.sort_by(|a, b| b.score.cmp(&a.score));
            self.sorted = Some((version, leads));
        }
        self.sorted.as_ref().map(|(_, leads)| leads.as_slice()).unwrap_or(&[])
    }

    pub fn view(&mut self, records: &RecordStore, filters: &FilterValues, now: Instant) -> ViewState<Lead> {
        if !self.gate.poll(now) {
            return ViewState::Loading;
        }
        let sorted = self.sorted_leads(records);
        ViewState::Ready {
            rows: apply_filters(sorted, filters, SCORE_RANGE),
        }
    }

    pub fn unmount(&mut self) {
        self.gate.cancel();
        self.sorted = None;
    }
}

pub fn save_lead(records: &mut RecordStore, lead: Lead) -> AppResult<Lead> {
    if let Err(error) = validate_email(&lead.email) {
        tracing::info!(lead_id = lead.id, "lead save rejected: invalid email");
        return Err(error);
    }
    if !records.leads().iter().any(|current| current.id == lead.id) {
        return Err(AppError::NotFound(format!("lead {} does not exist", lead.id)));
    }

    let leads = records
        .leads()
        .iter()
        .map(|current| if current.id == lead.id { lead.clone() } else { current.clone() })
        .collect();
    records.replace_leads(leads);
    tracing::info!(lead_id = lead.id, "lead saved");
    Ok(lead)
}

pub fn can_convert(lead: &Lead) -> bool {
    lead.status != LeadStatus::Converted
}

pub fn next_opportunity_id(opportunities: &[Opportunity]) -> i64 {
    opportunities.iter().map(|opportunity| opportunity.id).max().unwrap_or(0) + 1
}

pub fn convert_lead(records: &mut RecordStore, payload: ConvertLeadPayload) -> AppResult<ConvertLeadResponse> {
    let lead = records
        .leads()
        .iter()
        .find(|lead| lead.id == payload.lead_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("lead {} does not exist", payload.lead_id)))?;

    if records
        .opportunities()
        .iter()
        .any(|opportunity| opportunity.lead_id == lead.id)
    {
        tracing::warn!(lead_id = lead.id, "conversion rejected: lead already has an opportunity");
        return Err(AppError::Conflict(DUPLICATE_CONVERSION_MESSAGE.to_string()));
    }

    let opportunity = Opportunity {
        id: next_opportunity_id(records.opportunities()),
        name: format!("{} - {}", lead.company, lead.name),
        account_name: lead.company.clone(),
        amount: payload.amount.filter(|amount| amount.is_finite()),
        stage: payload.stage,
        lead_id: lead.id,
        description: lead.description.clone(),
    };
    let mut opportunities = records.opportunities().to_vec();
    opportunities.push(opportunity.clone());
    records.replace_opportunities(opportunities);

    let converted = Lead {
        status: LeadStatus::Converted,
        ..lead
    };
    let leads = records
        .leads()
        .iter()
        .map(|current| {
            if current.id == converted.id {
                converted.clone()
            } else {
                current.clone()
            }
        })
        .collect();
    records.replace_leads(leads);

    tracing::info!(
        lead_id = converted.id,
        opportunity_id = opportunity.id,
        stage = opportunity.stage.as_str(),
        "lead converted to opportunity"
    );
    Ok(ConvertLeadResponse {
        opportunity,
        lead: converted,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertForm {
    pub stage: OpportunityStage,
    pub amount: String,
}

impl Default for ConvertForm {
    fn default() -> Self {
        Self {
            stage: OpportunityStage::Qualification,
            amount: String::new(),
        }
    }
}

impl ConvertForm {
    pub fn parsed_amount(&self) -> Option<f64> {
        self.amount.trim().parse::<f64>().ok().filter(|amount| amount.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "kebab-case")]
pub enum LeadDetailEdit {
    Email(String),
    Status(LeadStatus),
    OpenConvertForm,
    ConvertStage(OpportunityStage),
    ConvertAmount(String),
    CancelConvert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetailView {
    pub lead: Lead,
    pub has_changes: bool,
    pub email_error: Option<String>,
    pub can_save: bool,
    pub can_convert: bool,
    pub convert_form: Option<ConvertForm>,
}

#[derive(Debug, Clone)]
pub struct LeadDraft {
    edited: Lead,
    has_changes: bool,
    email_error: Option<String>,
    convert_form: Option<ConvertForm>,
}

impl LeadDraft {
    pub fn new(lead: Lead) -> Self {
        Self {
            edited: lead,
            has_changes: false,
            email_error: None,
            convert_form: None,
        }
    }

    pub fn can_save(&self) -> bool {
        self.has_changes && self.email_error.is_none()
    }

    pub fn view(&self) -> LeadDetailView {
        LeadDetailView {
            lead: self.edited.clone(),
            has_changes: self.has_changes,
            email_error: self.email_error.clone(),
            can_save: self.can_save(),
            can_convert: can_convert(&self.edited),
            convert_form: self.convert_form.clone(),
        }
    }

    pub fn apply_edit(&mut self, edit: LeadDetailEdit) -> AppResult<()> {
        match edit {
            LeadDetailEdit::Email(email) => {
                self.email_error = validate_email(&email)
                    .err()
                    .map(|_| INVALID_EMAIL_MESSAGE.to_string());
                self.edited.email = email;
                self.has_changes = true;
            }
            LeadDetailEdit::Status(status) => {
                self.edited.status = status;
                self.has_changes = true;
            }
            LeadDetailEdit::OpenConvertForm => {
                if !can_convert(&self.edited) {
                    return Err(AppError::Validation(format!(
                        "lead {} is already converted",
                        self.edited.id
                    )));
                }
                self.convert_form = Some(ConvertForm::default());
            }
            LeadDetailEdit::ConvertStage(stage) => self.form_mut()?.stage = stage,
            LeadDetailEdit::ConvertAmount(amount) => self.form_mut()?.amount = amount,
            LeadDetailEdit::CancelConvert => self.convert_form = None,
        }
        Ok(())
    }

    fn form_mut(&mut self) -> AppResult<&mut ConvertForm> {
        self.convert_form
            .as_mut()
            .ok_or_else(|| AppError::Validation("convert form is not open".to_string()))
    }

    pub fn save(&mut self, records: &mut RecordStore) -> AppResult<Lead> {
        if self.email_error.is_some() {
            return Err(AppError::Validation(FIX_ERRORS_MESSAGE.to_string()));
        }
        let saved = save_lead(records, self.edited.clone())?;
        self.has_changes = false;
        Ok(saved)
    }

    pub fn apply_conversion(&mut self, records: &mut RecordStore) -> AppResult<ConvertLeadResponse> {
        let form = self
            .convert_form
            .take()
            .ok_or_else(|| AppError::Validation("convert form is not open".to_string()))?;
        let response = convert_lead(
            records,
            ConvertLeadPayload {
                lead_id: self.edited.id,
                stage: form.stage,
                amount: form.parsed_amount(),
            },
        )?;
        self.edited.status = LeadStatus::Converted;
        Ok(response)
    }
}
