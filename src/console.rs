use crate::db::{self, Database, KeyValueStore};
use crate::errors::{AppError, AppResult};
use crate::filter_panel::{FilterInput, FilterPanel};
use crate::models::{
    ConsoleSettings, ConvertLeadPayload, ConvertLeadResponse, EntityKind, FilterValues, Lead, Opportunity,
    RollbackResponse, ViewState,
};
use crate::routes::{self, Route};
use crate::store::{FilterStore, RecordStore};
use crate::table::{ActionKind, Column, MenuSize, Rect, RowHandlers, Table, TableRow, TableState, TableView, Viewport};
use crate::workflows::leads::{self, LeadDetailEdit, LeadDetailView};
use crate::workflows::opportunities::{self, OpportunityDetailEdit, OpportunityDetailView};
use crate::workflows::{LeadDraft, LeadWorkflow, OpportunityDraft, OpportunityWorkflow};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A pointer or keyboard event against one of the two tables. Row indices
/// refer to the rows as currently displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TableEvent {
    SortBy { key: String },
    Hover { index: Option<usize> },
    DoubleClick { index: usize },
    Action { index: usize, action: ActionKind },
    ToggleOverflow { index: usize, trigger: Rect, viewport: Viewport },
    ChooseOverflowAction { action: ActionKind },
    PointerDown { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPanelView {
    pub kind: EntityKind,
    pub open: bool,
    pub inputs: Vec<FilterInput>,
}

struct ConsoleState {
    settings: ConsoleSettings,
    route: Route,
    records: RecordStore,
    filters: FilterStore,
    leads: LeadWorkflow,
    opportunities: OpportunityWorkflow,
    lead_table: TableState,
    opportunity_table: TableState,
    lead_panel: FilterPanel,
    opportunity_panel: FilterPanel,
    lead_detail: Option<LeadDraft>,
    opportunity_detail: Option<OpportunityDraft>,
}

impl ConsoleState {
    fn menu_size(&self) -> MenuSize {
        MenuSize {
            width: self.settings.overflow_menu_width,
            height: self.settings.overflow_menu_height,
        }
    }

    fn panel(&mut self, kind: EntityKind) -> &mut FilterPanel {
        match kind {
            EntityKind::Leads => &mut self.lead_panel,
            EntityKind::Opportunities => &mut self.opportunity_panel,
        }
    }

    fn apply_delay(&mut self) {
        let delay = Duration::from_millis(self.settings.loading_delay_ms);
        self.leads.gate_mut().set_delay(delay);
        self.opportunities.gate_mut().set_delay(delay);
    }

    fn leave(&mut self, route: Route) {
        match route {
            Route::Leads => {
                self.leads.unmount();
                self.lead_table = TableState::new();
                self.lead_panel.close();
                self.lead_detail = None;
            }
            Route::Opportunities => {
                self.opportunities.unmount();
                self.opportunity_table = TableState::new();
                self.opportunity_panel.close();
                self.opportunity_detail = None;
            }
        }
    }

    fn lead_rows(&mut self, now: Instant) -> ViewState<Lead> {
        let filters = self.filters.filters(EntityKind::Leads).clone();
        self.leads.view(&self.records, &filters, now)
    }

    fn opportunity_rows(&mut self, now: Instant) -> ViewState<Opportunity> {
        let filters = self.filters.filters(EntityKind::Opportunities).clone();
        self.opportunities.view(&self.records, &filters, now)
    }
}

fn row_handlers<T: Clone>(selected: &Cell<Option<T>>) -> RowHandlers<'_, T> {
    RowHandlers::new()
        .on_view(move |row: &T| selected.set(Some(row.clone())))
        .on_row_double_click(move |row: &T| selected.set(Some(row.clone())))
        .on_row_hover(|row: Option<&T>| tracing::trace!(hovered = row.is_some(), "row hover changed"))
}

fn render_table<T: TableRow + Clone>(columns: &[Column], state: &mut TableState, rows: &[T]) -> TableView {
    let selected = Cell::new(None);
    // The table must drop before `selected`.
    let view = Table::new(columns, state, row_handlers(&selected)).render(rows);
    view
}

fn dispatch_table_event<T: TableRow + Clone>(
    columns: &[Column],
    state: &mut TableState,
    rows: &[T],
    event: TableEvent,
    menu_size: MenuSize,
) -> Option<T> {
    let selected = Cell::new(None);
    {
        let mut table = Table::new(columns, state, row_handlers(&selected));
        match event {
            TableEvent::SortBy { key } => table.click_header(&key),
            TableEvent::Hover { index } => table.hover(rows, index),
            TableEvent::DoubleClick { index } => {
                table.double_click(rows, index);
            }
            TableEvent::Action { index, action } => {
                table.trigger_action(rows, index, action);
            }
            TableEvent::ToggleOverflow { index, trigger, viewport } => {
                table.toggle_overflow(index, trigger, viewport, menu_size)
            }
            TableEvent::ChooseOverflowAction { action } => {
                table.choose_overflow_action(rows, action);
            }
            TableEvent::PointerDown { x, y } => table.pointer_down(x, y),
        }
    }
    selected.into_inner()
}

pub struct ConsoleCore {
    storage: Arc<dyn KeyValueStore>,
    lead_columns: Vec<Column>,
    opportunity_columns: Vec<Column>,
    state: Mutex<ConsoleState>,
}

impl ConsoleCore {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Arc<Self>> {
        let db_path = app_data_dir.join("state.sqlite");
        let db = Arc::new(Database::new(&db_path)?);
        tracing::info!(path = %db.path().display(), "opened console storage");
        Self::with_storage(db)
    }

    pub fn with_storage(storage: Arc<dyn KeyValueStore>) -> AppResult<Arc<Self>> {
        let settings = match db::get_settings(storage.as_ref()) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read console settings");
                ConsoleSettings::default()
            }
        };
        let delay = Duration::from_millis(settings.loading_delay_ms);
        let records = RecordStore::hydrate(storage.clone())?;
        let filters = FilterStore::hydrate(storage.clone());

        let state = ConsoleState {
            settings,
            route: Route::Leads,
            records,
            filters,
            leads: LeadWorkflow::new(delay),
            opportunities: OpportunityWorkflow::new(delay),
            lead_table: TableState::new(),
            opportunity_table: TableState::new(),
            lead_panel: FilterPanel::new(EntityKind::Leads, leads::lead_filter_fields()),
            opportunity_panel: FilterPanel::new(EntityKind::Opportunities, opportunities::opportunity_filter_fields()),
            lead_detail: None,
            opportunity_detail: None,
        };

        Ok(Arc::new(Self {
            storage,
            lead_columns: leads::lead_columns(),
            opportunity_columns: opportunities::opportunity_columns(),
            state: Mutex::new(state),
        }))
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, ConsoleState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("console state mutex poisoned".to_string()))
    }

    pub fn get_settings(&self) -> AppResult<ConsoleSettings> {
        Ok(self.lock()?.settings.clone())
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<ConsoleSettings> {
        let mut state = self.lock()?;
        let settings = db::update_settings(self.storage.as_ref(), update)?;
        state.settings = settings.clone();
        state.apply_delay();
        tracing::info!(loading_delay_ms = settings.loading_delay_ms, "console settings updated");
        Ok(settings)
    }

    pub fn current_route(&self) -> AppResult<Route> {
        Ok(self.lock()?.route)
    }

    pub fn navigate(&self, path: &str) -> AppResult<Route> {
        let route = routes::resolve(path)?;
        let mut state = self.lock()?;
        if state.route != route {
            let previous = state.route;
            state.leave(previous);
            state.route = route;
            tracing::debug!(from = previous.path(), to = route.path(), "navigated");
        }
        Ok(route)
    }

    pub fn leads_view(&self) -> AppResult<ViewState<Lead>> {
        Ok(self.lock()?.lead_rows(Instant::now()))
    }

    pub fn opportunities_view(&self) -> AppResult<ViewState<Opportunity>> {
        Ok(self.lock()?.opportunity_rows(Instant::now()))
    }

    /// `None` while the view is still loading.
    pub fn lead_table(&self) -> AppResult<Option<TableView>> {
        let mut state = self.lock()?;
        let ViewState::Ready { rows } = state.lead_rows(Instant::now()) else {
            return Ok(None);
        };
        Ok(Some(render_table(&self.lead_columns, &mut state.lead_table, &rows)))
    }

    pub fn opportunity_table(&self) -> AppResult<Option<TableView>> {
        let mut state = self.lock()?;
        let ViewState::Ready { rows } = state.opportunity_rows(Instant::now()) else {
            return Ok(None);
        };
        Ok(Some(render_table(&self.opportunity_columns, &mut state.opportunity_table, &rows)))
    }

    /// Events arriving while a view is still loading are ignored. Returns
    /// whether the event opened a detail panel.
    pub fn table_event(&self, kind: EntityKind, event: TableEvent) -> AppResult<bool> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let menu_size = state.menu_size();
        let now = Instant::now();

        match kind {
            EntityKind::Leads => {
                let ViewState::Ready { rows } = state.lead_rows(now) else {
                    return Ok(false);
                };
                let selected =
                    dispatch_table_event(&self.lead_columns, &mut state.lead_table, &rows, event, menu_size);
                if let Some(lead) = selected {
                    tracing::debug!(lead_id = lead.id, "opened lead detail");
                    state.lead_detail = Some(LeadDraft::new(lead));
                    return Ok(true);
                }
            }
            EntityKind::Opportunities => {
                let ViewState::Ready { rows } = state.opportunity_rows(now) else {
                    return Ok(false);
                };
                let selected = dispatch_table_event(
                    &self.opportunity_columns,
                    &mut state.opportunity_table,
                    &rows,
                    event,
                    menu_size,
                );
                if let Some(opportunity) = selected {
                    tracing::debug!(opportunity_id = opportunity.id, "opened opportunity detail");
                    state.opportunity_detail = Some(OpportunityDraft::new(opportunity));
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    pub async fn wait_until_loaded(&self, route: Route) -> AppResult<()> {
        let remaining = {
            let mut state = self.lock()?;
            let now = Instant::now();
            let gate = match route {
                Route::Leads => state.leads.gate_mut(),
                Route::Opportunities => state.opportunities.gate_mut(),
            };
            gate.remaining_after_poll(now)
        };
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        Ok(())
    }

    pub fn get_filters(&self, kind: EntityKind) -> AppResult<FilterValues> {
        Ok(self.lock()?.filters.filters(kind).clone())
    }

    pub fn update_filters(&self, kind: EntityKind, values: FilterValues) -> AppResult<FilterValues> {
        let mut state = self.lock()?;
        state.filters.update_filters(kind, values);
        Ok(state.filters.filters(kind).clone())
    }

    pub fn clear_filters(&self, kind: EntityKind) -> AppResult<()> {
        self.lock()?.filters.clear_filters(kind);
        Ok(())
    }

    pub fn filter_panel(&self, kind: EntityKind) -> AppResult<FilterPanelView> {
        let mut state = self.lock()?;
        let panel = state.panel(kind);
        Ok(FilterPanelView {
            kind,
            open: panel.is_open(),
            inputs: panel.inputs(),
        })
    }

    pub fn open_filter_panel(&self, kind: EntityKind) -> AppResult<FilterPanelView> {
        {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            let panel = match kind {
                EntityKind::Leads => &mut state.lead_panel,
                EntityKind::Opportunities => &mut state.opportunity_panel,
            };
            panel.open(&state.filters);
        }
        self.filter_panel(kind)
    }

    pub fn set_filter_field(&self, kind: EntityKind, key: &str, value: &str) -> AppResult<FilterPanelView> {
        self.lock()?.panel(kind).set_field(key, value)?;
        self.filter_panel(kind)
    }

    pub fn apply_filter_panel(&self, kind: EntityKind) -> AppResult<FilterValues> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let panel = match kind {
            EntityKind::Leads => &mut state.lead_panel,
            EntityKind::Opportunities => &mut state.opportunity_panel,
        };
        panel.apply(&mut state.filters);
        Ok(state.filters.filters(kind).clone())
    }

    pub fn clear_filter_panel(&self, kind: EntityKind) -> AppResult<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let panel = match kind {
            EntityKind::Leads => &mut state.lead_panel,
            EntityKind::Opportunities => &mut state.opportunity_panel,
        };
        panel.clear(&mut state.filters);
        Ok(())
    }

    pub fn close_filter_panel(&self, kind: EntityKind) -> AppResult<()> {
        self.lock()?.panel(kind).close();
        Ok(())
    }

    pub fn save_lead(&self, lead: Lead) -> AppResult<Lead> {
        let mut state = self.lock()?;
        leads::save_lead(&mut state.records, lead)
    }

    pub fn convert_lead(&self, payload: ConvertLeadPayload) -> AppResult<ConvertLeadResponse> {
        let mut state = self.lock()?;
        leads::convert_lead(&mut state.records, payload)
    }

    pub fn save_opportunity(&self, opportunity: Opportunity) -> AppResult<Opportunity> {
        let mut state = self.lock()?;
        opportunities::save_opportunity(&mut state.records, opportunity)
    }

    pub fn rollback_opportunity(&self, opportunity_id: i64) -> AppResult<RollbackResponse> {
        let mut state = self.lock()?;
        opportunities::rollback_opportunity(&mut state.records, opportunity_id)
    }

    pub fn lead_detail(&self) -> AppResult<Option<LeadDetailView>> {
        Ok(self.lock()?.lead_detail.as_ref().map(LeadDraft::view))
    }

    pub fn edit_lead_detail(&self, edit: LeadDetailEdit) -> AppResult<LeadDetailView> {
        let mut state = self.lock()?;
        let draft = state.lead_detail.as_mut().ok_or_else(no_lead_detail)?;
        draft.apply_edit(edit)?;
        Ok(draft.view())
    }

    pub fn save_lead_detail(&self) -> AppResult<Lead> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let draft = state.lead_detail.as_mut().ok_or_else(no_lead_detail)?;
        draft.save(&mut state.records)
    }

    pub fn convert_lead_detail(&self) -> AppResult<ConvertLeadResponse> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let draft = state.lead_detail.as_mut().ok_or_else(no_lead_detail)?;
        draft.apply_conversion(&mut state.records)
    }

    pub fn close_lead_detail(&self) -> AppResult<()> {
        self.lock()?.lead_detail = None;
        Ok(())
    }

    pub fn opportunity_detail(&self) -> AppResult<Option<OpportunityDetailView>> {
        Ok(self.lock()?.opportunity_detail.as_ref().map(OpportunityDraft::view))
    }

    pub fn edit_opportunity_detail(&self, edit: OpportunityDetailEdit) -> AppResult<OpportunityDetailView> {
        let mut state = self.lock()?;
        let draft = state.opportunity_detail.as_mut().ok_or_else(no_opportunity_detail)?;
        draft.apply_edit(edit);
        Ok(draft.view())
    }

    pub fn save_opportunity_detail(&self) -> AppResult<Opportunity> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let draft = state.opportunity_detail.as_mut().ok_or_else(no_opportunity_detail)?;
        draft.save(&mut state.records)
    }

    pub fn confirm_opportunity_rollback(&self) -> AppResult<RollbackResponse> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let draft = state.opportunity_detail.as_mut().ok_or_else(no_opportunity_detail)?;
        let response = draft.confirm_rollback(&mut state.records)?;
        state.opportunity_detail = None;
        Ok(response)
    }

    pub fn close_opportunity_detail(&self) -> AppResult<()> {
        self.lock()?.opportunity_detail = None;
        Ok(())
    }
}

fn no_lead_detail() -> AppError {
    AppError::Validation("no lead detail is open".to_string())
}

fn no_opportunity_detail() -> AppError {
    AppError::Validation("no opportunity detail is open".to_string())
}

#[cfg(test)]
mod tests {
    use super::{ConsoleCore, TableEvent};
    use crate::db::{KeyValueStore, MemoryStore, SETTINGS_KEY};
    use crate::models::{ConsoleSettings, EntityKind, LeadStatus};
    use crate::routes::Route;
    use crate::store::testing::FailingStore;
    use crate::table::{ActionKind, Rect, TableBody, Viewport};
    use crate::workflows::leads::LeadDetailEdit;
    use std::sync::Arc;

    fn core() -> Arc<ConsoleCore> {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(SETTINGS_KEY, r#"{"loadingDelayMs":0}"#)
            .expect("seed settings");
        ConsoleCore::with_storage(storage).expect("core")
    }

    #[test]
    fn lead_table_renders_seed_sorted_by_score() {
        let core = core();
        let view = core.lead_table().expect("table").expect("ready");
        assert_eq!(view.headers.len(), 7);
        assert!(view.actions_header);
        let scores: Vec<i64> = view
            .rows()
            .iter()
            .map(|row| row.cells[1].parse::<i64>().expect("score"))
            .collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
    }

    #[test]
    fn view_action_opens_lead_detail() {
        let core = core();
        let opened = core
            .table_event(EntityKind::Leads, TableEvent::Action { index: 0, action: ActionKind::View })
            .expect("event");
        assert!(opened);
        let detail = core.lead_detail().expect("detail").expect("open");
        assert_eq!(detail.lead.score, 95);

        let edited = core
            .edit_lead_detail(LeadDetailEdit::Status(LeadStatus::Contacted))
            .expect("edit");
        assert!(edited.can_save);
        core.save_lead_detail().expect("save");
        let stored = core.leads_view().expect("view");
        assert_eq!(stored.rows().expect("ready")[0].status, LeadStatus::Contacted);
    }

    #[test]
    fn unsupported_action_does_not_open_detail() {
        let core = core();
        let opened = core
            .table_event(EntityKind::Leads, TableEvent::Action { index: 0, action: ActionKind::Delete })
            .expect("event");
        assert!(!opened);
        assert!(core.lead_detail().expect("detail").is_none());
    }

    #[test]
    fn navigation_discards_previous_view_state() {
        let core = core();
        core.table_event(EntityKind::Leads, TableEvent::DoubleClick { index: 1 })
            .expect("event");
        core.table_event(
            EntityKind::Leads,
            TableEvent::ToggleOverflow {
                index: 0,
                trigger: Rect { top: 10.0, left: 300.0, width: 24.0, height: 24.0 },
                viewport: Viewport { height: 800.0, scroll_x: 0.0, scroll_y: 0.0 },
            },
        )
        .expect("toggle");
        core.open_filter_panel(EntityKind::Leads).expect("panel");

        assert_eq!(core.navigate("/opportunities").expect("navigate"), Route::Opportunities);
        assert!(core.lead_detail().expect("detail").is_none());
        assert!(!core.filter_panel(EntityKind::Leads).expect("panel").open);
        let view = core.lead_table().expect("table").expect("ready");
        assert!(view.menu.is_none());
        assert!(core.navigate("/nowhere").is_err());
    }

    #[test]
    fn filter_panel_commits_through_store() {
        let core = core();
        core.open_filter_panel(EntityKind::Opportunities).expect("open");
        core.set_filter_field(EntityKind::Opportunities, "stage", "Closed Won")
            .expect("set");
        assert!(core.get_filters(EntityKind::Opportunities).expect("filters").is_empty());
        core.apply_filter_panel(EntityKind::Opportunities).expect("apply");

        let view = core.opportunity_table().expect("table").expect("ready");
        match &view.body {
            TableBody::Empty { placeholder, colspan } => {
                assert_eq!(placeholder, "Data not found");
                assert_eq!(*colspan, 6);
            }
            TableBody::Rows { .. } => panic!("no seeded opportunity is Closed Won"),
        }
    }

    #[test]
    fn unreadable_storage_starts_with_defaults() {
        let core = ConsoleCore::with_storage(Arc::new(FailingStore)).expect("core");
        let settings = core.get_settings().expect("settings");
        assert_eq!(settings, ConsoleSettings::default());
        assert!(core.leads_view().expect("view").is_loading());
        assert!(core.update_settings(serde_json::json!({ "loadingDelayMs": 0 })).is_err());
    }

    #[test]
    fn concurrent_settings_patches_are_all_kept() {
        let storage = Arc::new(MemoryStore::new());
        let core = ConsoleCore::with_storage(storage.clone()).expect("core");
        let handles: Vec<_> = [
            serde_json::json!({ "overflowMenuHeight": 111.0 }),
            serde_json::json!({ "overflowMenuWidth": 222.0 }),
            serde_json::json!({ "loadingDelayMs": 7 }),
        ]
        .into_iter()
        .map(|patch| {
            let core = core.clone();
            std::thread::spawn(move || core.update_settings(patch).expect("update"))
        })
        .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let settings = core.get_settings().expect("settings");
        assert_eq!(settings.overflow_menu_height, 111.0);
        assert_eq!(settings.overflow_menu_width, 222.0);
        assert_eq!(settings.loading_delay_ms, 7);
        assert_eq!(crate::db::get_settings(storage.as_ref()).expect("persisted"), settings);
    }

    #[test]
    fn settings_update_changes_loading_delay() {
        let core = ConsoleCore::with_storage(Arc::new(MemoryStore::new())).expect("core");
        assert!(core.opportunities_view().expect("view").is_loading());
        let settings = core
            .update_settings(serde_json::json!({ "loadingDelayMs": 0, "overflowMenuHeight": 120.0 }))
            .expect("update");
        assert_eq!(settings.overflow_menu_height, 120.0);
        assert!(!core.opportunities_view().expect("view").is_loading());
    }
}
