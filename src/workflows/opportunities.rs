use crate::errors::{AppError, AppResult};
use crate::filter_panel::{FilterField, SelectOption};
use crate::filtering::{apply_filters, AMOUNT_RANGE};
use crate::loading::LoadingGate;
use crate::models::{FilterValues, Lead, LeadStatus, Opportunity, OpportunityStage, RollbackResponse, ViewState};
use crate::store::RecordStore;
use crate::table::{CellValue, Column, ColumnKind, TableRow};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

impl TableRow for Opportunity {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "accountName" => self.account_name.as_str().into(),
            "amount" => self.amount.into(),
            "stage" => self.stage.as_str().into(),
            "leadId" => self.lead_id.into(),
            "description" => self.description.as_str().into(),
            _ => CellValue::Null,
        }
    }
}

pub fn opportunity_columns() -> Vec<Column> {
    vec![
        Column::new("ID", "id"),
        Column::new("Name", "name"),
        Column::new("Account Name", "accountName"),
        Column::new("Amount", "amount").kind(ColumnKind::Money),
        Column::new("Stage", "stage"),
    ]
}

pub fn opportunity_filter_fields() -> Vec<FilterField> {
    vec![
        FilterField::text("name", "Name"),
        FilterField::text("accountName", "Account Name"),
        FilterField::select(
            "stage",
            "Stage",
            OpportunityStage::ALL.iter().map(|stage| SelectOption::same(stage.as_str())).collect(),
        ),
        FilterField::number("maxAmount", "Max Amount"),
        FilterField::number("minAmount", "Minimum Amount"),
    ]
}

#[derive(Debug)]
pub struct OpportunityWorkflow {
    gate: LoadingGate,
}

impl OpportunityWorkflow {
    pub fn new(loading_delay: Duration) -> Self {
        Self {
            gate: LoadingGate::new(loading_delay),
        }
    }

    pub fn gate_mut(&mut self) -> &mut LoadingGate {
        &mut self.gate
    }

    pub fn view(&mut self, records: &RecordStore, filters: &FilterValues, now: Instant) -> ViewState<Opportunity> {
        if !self.gate.poll(now) {
            return ViewState::Loading;
        }
        ViewState::Ready {
            rows: apply_filters(records.opportunities(), filters, AMOUNT_RANGE),
        }
    }

    pub fn unmount(&mut self) {
        self.gate.cancel();
    }
}

pub fn save_opportunity(records: &mut RecordStore, opportunity: Opportunity) -> AppResult<Opportunity> {
    if !records
        .opportunities()
        .iter()
        .any(|current| current.id == opportunity.id)
    {
        return Err(AppError::NotFound(format!("opportunity {} does not exist", opportunity.id)));
    }

    let opportunities = records
        .opportunities()
        .iter()
        .map(|current| {
            if current.id == opportunity.id {
                opportunity.clone()
            } else {
                current.clone()
            }
        })
        .collect();
    records.replace_opportunities(opportunities);
    tracing::info!(opportunity_id = opportunity.id, "opportunity saved");
    Ok(opportunity)
}

/// Removes the opportunity, then moves its source lead back to `New` at the
/// end of the lead list. The two writes are independent: a lead that has
/// since disappeared does not undo the removal.
pub fn rollback_opportunity(records: &mut RecordStore, opportunity_id: i64) -> AppResult<RollbackResponse> {
    let Some(removed) = records
        .opportunities()
        .iter()
        .find(|opportunity| opportunity.id == opportunity_id)
        .cloned()
    else {
        tracing::info!(opportunity_id, "rollback skipped: opportunity not found");
        return Ok(RollbackResponse::default());
    };

    let remaining = records
        .opportunities()
        .iter()
        .filter(|opportunity| opportunity.id != opportunity_id)
        .cloned()
        .collect();
    records.replace_opportunities(remaining);

    let restored_lead = match records.leads().iter().find(|lead| lead.id == removed.lead_id).cloned() {
        Some(lead) => {
            let restored = Lead {
                status: LeadStatus::New,
                ..lead
            };
            let mut leads: Vec<Lead> = records
                .leads()
                .iter()
                .filter(|lead| lead.id != restored.id)
                .cloned()
                .collect();
            leads.push(restored.clone());
            records.replace_leads(leads);
            Some(restored)
        }
        None => {
            tracing::warn!(
                opportunity_id,
                lead_id = removed.lead_id,
                "rollback found no source lead; only the opportunity was removed"
            );
            None
        }
    };

    tracing::info!(opportunity_id, lead_id = removed.lead_id, "opportunity rolled back");
    Ok(RollbackResponse {
        removed: Some(removed),
        restored_lead,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "kebab-case")]
pub enum OpportunityDetailEdit {
    Stage(OpportunityStage),
    Amount(Option<f64>),
    RequestRollback,
    CancelRollback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetailView {
    pub opportunity: Opportunity,
    pub has_changes: bool,
    pub confirming_rollback: bool,
}

#[derive(Debug, Clone)]
pub struct OpportunityDraft {
    edited: Opportunity,
    has_changes: bool,
    confirming_rollback: bool,
}

impl OpportunityDraft {
    pub fn new(opportunity: Opportunity) -> Self {
        Self {
            edited: opportunity,
            has_changes: false,
            confirming_rollback: false,
        }
    }

    pub fn view(&self) -> OpportunityDetailView {
        OpportunityDetailView {
            opportunity: self.edited.clone(),
            has_changes: self.has_changes,
            confirming_rollback: self.confirming_rollback,
        }
    }

    pub fn apply_edit(&mut self, edit: OpportunityDetailEdit) {
        match edit {
            OpportunityDetailEdit::Stage(stage) => {
                self.edited.stage = stage;
                self.has_changes = true;
            }
            OpportunityDetailEdit::Amount(amount) => {
                self.edited.amount = amount.filter(|amount| amount.is_finite());
                self.has_changes = true;
            }
            OpportunityDetailEdit::RequestRollback => self.confirming_rollback = true,
            OpportunityDetailEdit::CancelRollback => self.confirming_rollback = false,
        }
    }

    pub fn save(&mut self, records: &mut RecordStore) -> AppResult<Opportunity> {
        let saved = save_opportunity(records, self.edited.clone())?;
        self.has_changes = false;
        Ok(saved)
    }

    pub fn confirm_rollback(&mut self, records: &mut RecordStore) -> AppResult<RollbackResponse> {
        if !self.confirming_rollback {
            return Err(AppError::Validation(
                "rollback must be requested before it is confirmed".to_string(),
            ));
        }
        self.confirming_rollback = false;
        rollback_opportunity(records, self.edited.id)
    }
}
