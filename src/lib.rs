pub mod console;
pub mod db;
pub mod errors;
pub mod filter_panel;
pub mod filtering;
pub mod loading;
pub mod models;
pub mod routes;
pub mod seed;
pub mod store;
pub mod table;
pub mod workflows;

use crate::console::{ConsoleCore, FilterPanelView, TableEvent};
use crate::models::{
    ConsoleSettings, ConvertLeadPayload, ConvertLeadResponse, EntityKind, FilterValues, Lead, Opportunity,
    RollbackResponse, UpdateFiltersPayload, ViewState,
};
use crate::routes::Route;
use crate::table::TableView;
use crate::workflows::leads::{LeadDetailEdit, LeadDetailView};
use crate::workflows::opportunities::{OpportunityDetailEdit, OpportunityDetailView};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<ConsoleCore>,
}

pub fn navigate(state: &AppState, path: String) -> Result<Route, String> {
    state.core.navigate(&path).map_err(to_client_error)
}

pub fn current_route(state: &AppState) -> Result<Route, String> {
    state.core.current_route().map_err(to_client_error)
}

pub fn get_settings(state: &AppState) -> Result<ConsoleSettings, String> {
    state.core.get_settings().map_err(to_client_error)
}

pub fn update_settings(state: &AppState, update: serde_json::Value) -> Result<ConsoleSettings, String> {
    state.core.update_settings(update).map_err(to_client_error)
}

pub fn list_leads(state: &AppState) -> Result<ViewState<Lead>, String> {
    state.core.leads_view().map_err(to_client_error)
}

pub fn list_opportunities(state: &AppState) -> Result<ViewState<Opportunity>, String> {
    state.core.opportunities_view().map_err(to_client_error)
}

pub fn render_table(state: &AppState, kind: EntityKind) -> Result<Option<TableView>, String> {
    match kind {
        EntityKind::Leads => state.core.lead_table(),
        EntityKind::Opportunities => state.core.opportunity_table(),
    }
    .map_err(to_client_error)
}

pub fn table_event(state: &AppState, kind: EntityKind, event: TableEvent) -> Result<bool, String> {
    state.core.table_event(kind, event).map_err(to_client_error)
}

pub async fn wait_until_loaded(state: &AppState, route: Route) -> Result<(), String> {
    state.core.wait_until_loaded(route).await.map_err(to_client_error)
}

pub fn get_filters(state: &AppState, kind: EntityKind) -> Result<FilterValues, String> {
    state.core.get_filters(kind).map_err(to_client_error)
}

pub fn update_filters(state: &AppState, payload: UpdateFiltersPayload) -> Result<FilterValues, String> {
    state
        .core
        .update_filters(payload.kind, payload.values)
        .map_err(to_client_error)
}

pub fn clear_filters(state: &AppState, kind: EntityKind) -> Result<(), String> {
    state.core.clear_filters(kind).map_err(to_client_error)
}

pub fn open_filter_panel(state: &AppState, kind: EntityKind) -> Result<FilterPanelView, String> {
    state.core.open_filter_panel(kind).map_err(to_client_error)
}

pub fn set_filter_field(
    state: &AppState,
    kind: EntityKind,
    key: String,
    value: String,
) -> Result<FilterPanelView, String> {
    state
        .core
        .set_filter_field(kind, &key, &value)
        .map_err(to_client_error)
}

pub fn apply_filter_panel(state: &AppState, kind: EntityKind) -> Result<FilterValues, String> {
    state.core.apply_filter_panel(kind).map_err(to_client_error)
}

pub fn clear_filter_panel(state: &AppState, kind: EntityKind) -> Result<(), String> {
    state.core.clear_filter_panel(kind).map_err(to_client_error)
}

pub fn close_filter_panel(state: &AppState, kind: EntityKind) -> Result<(), String> {
    state.core.close_filter_panel(kind).map_err(to_client_error)
}

pub fn save_lead(state: &AppState, lead: Lead) -> Result<Lead, String> {
    state.core.save_lead(lead).map_err(to_client_error)
}

pub fn convert_lead(state: &AppState, payload: ConvertLeadPayload) -> Result<ConvertLeadResponse, String> {
    state.core.convert_lead(payload).map_err(to_client_error)
}

pub fn save_opportunity(state: &AppState, opportunity: Opportunity) -> Result<Opportunity, String> {
    state.core.save_opportunity(opportunity).map_err(to_client_error)
}

pub fn rollback_opportunity(state: &AppState, opportunity_id: i64) -> Result<RollbackResponse, String> {
    state
        .core
        .rollback_opportunity(opportunity_id)
        .map_err(to_client_error)
}

pub fn get_lead_detail(state: &AppState) -> Result<Option<LeadDetailView>, String> {
    state.core.lead_detail().map_err(to_client_error)
}

pub fn edit_lead_detail(state: &AppState, edit: LeadDetailEdit) -> Result<LeadDetailView, String> {
    state.core.edit_lead_detail(edit).map_err(to_client_error)
}

pub fn save_lead_detail(state: &AppState) -> Result<Lead, String> {
    state.core.save_lead_detail().map_err(to_client_error)
}

pub fn convert_lead_detail(state: &AppState) -> Result<ConvertLeadResponse, String> {
    state.core.convert_lead_detail().map_err(to_client_error)
}

pub fn close_lead_detail(state: &AppState) -> Result<(), String> {
    state.core.close_lead_detail().map_err(to_client_error)
}

pub fn get_opportunity_detail(state: &AppState) -> Result<Option<OpportunityDetailView>, String> {
    state.core.opportunity_detail().map_err(to_client_error)
}

pub fn edit_opportunity_detail(
    state: &AppState,
    edit: OpportunityDetailEdit,
) -> Result<OpportunityDetailView, String> {
    state.core.edit_opportunity_detail(edit).map_err(to_client_error)
}

pub fn save_opportunity_detail(state: &AppState) -> Result<Opportunity, String> {
    state.core.save_opportunity_detail().map_err(to_client_error)
}

pub fn confirm_opportunity_rollback(state: &AppState) -> Result<RollbackResponse, String> {
    state
        .core
        .confirm_opportunity_rollback()
        .map_err(to_client_error)
}

pub fn close_opportunity_detail(state: &AppState) -> Result<(), String> {
    state.core.close_opportunity_detail().map_err(to_client_error)
}

pub fn run(app_data_dir: PathBuf) -> Result<AppState, String> {
    std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
    init_tracing(&app_data_dir)?;

    let core = ConsoleCore::new(app_data_dir).map_err(|error| error.to_string())?;
    tracing::info!("mini seller console ready");
    Ok(AppState { core })
}

fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "console.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
