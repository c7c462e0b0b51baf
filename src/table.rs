use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const ROW_INDEX_KEY: &str = "table_index";
pub const EMPTY_PLACEHOLDER: &str = "Data not found";
const MISSING_VALUE: &str = "-";
const OVERFLOW_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    fn coerce_number(&self) -> f64 {
        let value = match self {
            Self::Null => 0.0,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Number(value) => *value,
            Self::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(0.0)
                }
            }
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

pub trait TableRow {
    fn cell(&self, key: &str) -> CellValue;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    #[default]
    Plain,
    Time,
    Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOption {
    pub label: String,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub label: String,
    pub key: String,
    pub options: Option<Vec<ColumnOption>>,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(label: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
            options: None,
            kind: ColumnKind::Plain,
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn options(mut self, options: Vec<ColumnOption>) -> Self {
        self.options = Some(options);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

/// Header click transition: a new column starts ascending, the same column
/// goes ascending -> descending -> unsorted.
pub fn next_sort(current: Option<&SortState>, key: &str) -> Option<SortState> {
    match current {
        Some(state) if state.key == key => match state.direction {
            SortDirection::Ascending => Some(SortState {
                key: key.to_string(),
                direction: SortDirection::Descending,
            }),
            SortDirection::Descending => None,
        },
        _ => Some(SortState {
            key: key.to_string(),
            direction: SortDirection::Ascending,
        }),
    }
}

fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Stable sort; ties keep their input order in both directions.
pub fn sort_rows<'r, T: TableRow>(rows: &'r [T], sort: Option<&SortState>) -> Vec<&'r T> {
    let mut sorted = rows.iter().collect::<Vec<_>>();
    if let Some(sort) = sort {
        sorted.sort_by(|a, b| {
            let ordering = compare_cells(&a.cell(&sort.key), &b.cell(&sort.key));
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }
    sorted
}

pub fn format_cell(column: &Column, value: &CellValue, row_index: usize) -> String {
    if column.key == ROW_INDEX_KEY {
        return (row_index + 1).to_string();
    }
    if column.kind == ColumnKind::Time {
        if let Some(formatted) = format_time(value) {
            return formatted;
        }
    }
    if column.kind == ColumnKind::Money {
        return format_usd(value.coerce_number());
    }
    if let Some(options) = &column.options {
        return options
            .iter()
            .find(|option| &option.value == value)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| MISSING_VALUE.to_string());
    }
    match value {
        CellValue::Null => MISSING_VALUE.to_string(),
        other => other.to_string(),
    }
}

fn format_time(value: &CellValue) -> Option<String> {
    let local: DateTime<Local> = match value {
        CellValue::Number(millis) if *millis != 0.0 => {
            DateTime::from_timestamp_millis(*millis as i64)?.with_timezone(&Local)
        }
        CellValue::Text(raw) if !raw.is_empty() => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed.with_timezone(&Local),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
                Local.from_local_datetime(&naive).earliest()?
            }
        },
        _ => return None,
    };
    Some(local.format("%d/%m/%Y - %H:%M").to_string())
}

pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    View,
    Edit,
    Configure,
    Delete,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [Self::View, Self::Edit, Self::Configure, Self::Delete];

    pub fn label(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Edit => "Edit",
            Self::Configure => "Configure",
            Self::Delete => "Delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "actions", rename_all = "kebab-case")]
pub enum ActionLayout {
    None,
    Inline(Vec<ActionKind>),
    Overflow(Vec<ActionKind>),
}

pub fn action_layout(active: &[ActionKind]) -> ActionLayout {
    if active.is_empty() {
        ActionLayout::None
    } else if active.len() < OVERFLOW_THRESHOLD {
        ActionLayout::Inline(active.to_vec())
    } else {
        ActionLayout::Overflow(active.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPlacement {
    pub top: f64,
    pub left: f64,
    pub opens_up: bool,
}

impl MenuPlacement {
    pub fn bounds(&self, size: MenuSize, viewport: Viewport) -> Rect {
        Rect {
            top: self.top - viewport.scroll_y,
            left: self.left - viewport.scroll_x,
            width: size.width,
            height: size.height,
        }
    }
}

pub fn place_overflow_menu(trigger: Rect, viewport: Viewport, size: MenuSize) -> MenuPlacement {
    let space_below = viewport.height - trigger.bottom();
    let opens_up = space_below < size.height;
    let top = if opens_up {
        trigger.top - size.height + viewport.scroll_y
    } else {
        trigger.bottom() + viewport.scroll_y
    };
    MenuPlacement {
        top,
        left: trigger.left - size.width + trigger.width + viewport.scroll_x,
        opens_up,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenMenu {
    row_index: usize,
    placement: MenuPlacement,
    size: MenuSize,
    viewport: Viewport,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableState {
    sort: Option<SortState>,
    menu: Option<OpenMenu>,
    hovered: Option<usize>,
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn open_menu_row(&self) -> Option<usize> {
        self.menu.map(|menu| menu.row_index)
    }
}

type RowCallback<'a, T> = Box<dyn Fn(&T) + 'a>;
type HoverCallback<'a, T> = Box<dyn Fn(Option<&T>) + 'a>;

pub struct RowHandlers<'a, T> {
    on_view: Option<RowCallback<'a, T>>,
    on_edit: Option<RowCallback<'a, T>>,
    on_configure: Option<RowCallback<'a, T>>,
    on_delete: Option<RowCallback<'a, T>>,
    on_row_hover: Option<HoverCallback<'a, T>>,
    on_row_double_click: Option<RowCallback<'a, T>>,
}

impl<'a, T> Default for RowHandlers<'a, T> {
    fn default() -> Self {
        Self {
            on_view: None,
            on_edit: None,
            on_configure: None,
            on_delete: None,
            on_row_hover: None,
            on_row_double_click: None,
        }
    }
}

impl<'a, T> RowHandlers<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_view(mut self, handler: impl Fn(&T) + 'a) -> Self {
        self.on_view = Some(Box::new(handler));
        self
    }

    pub fn on_edit(mut self, handler: impl Fn(&T) + 'a) -> Self {
        self.on_edit = Some(Box::new(handler));
        self
    }

    pub fn on_configure(mut self, handler: impl Fn(&T) + 'a) -> Self {
        self.on_configure = Some(Box::new(handler));
        self
    }

    pub fn on_delete(mut self, handler: impl Fn(&T) + 'a) -> Self {
        self.on_delete = Some(Box::new(handler));
        self
    }

    pub fn on_row_hover(mut self, handler: impl Fn(Option<&T>) + 'a) -> Self {
        self.on_row_hover = Some(Box::new(handler));
        self
    }

    pub fn on_row_double_click(mut self, handler: impl Fn(&T) + 'a) -> Self {
        self.on_row_double_click = Some(Box::new(handler));
        self
    }

    fn action(&self, kind: ActionKind) -> Option<&RowCallback<'a, T>> {
        match kind {
            ActionKind::View => self.on_view.as_ref(),
            ActionKind::Edit => self.on_edit.as_ref(),
            ActionKind::Configure => self.on_configure.as_ref(),
            ActionKind::Delete => self.on_delete.as_ref(),
        }
    }

    pub fn active_actions(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| self.action(*kind).is_some())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub label: String,
    pub key: String,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRow {
    pub index: usize,
    pub cells: Vec<String>,
    pub hovered: bool,
    pub actions: ActionLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TableBody {
    Empty { placeholder: String, colspan: usize },
    Rows { rows: Vec<RenderedRow> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub action: ActionKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMenuView {
    pub row_index: usize,
    pub placement: MenuPlacement,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub actions_header: bool,
    pub body: TableBody,
    pub menu: Option<OpenMenuView>,
}

impl TableView {
    pub fn rows(&self) -> &[RenderedRow] {
        match &self.body {
            TableBody::Rows { rows } => rows,
            TableBody::Empty { .. } => &[],
        }
    }
}

/// One render/interaction pass over a row collection. Row indices always
/// refer to the sorted display order.
pub struct Table<'a, T> {
    columns: &'a [Column],
    state: &'a mut TableState,
    handlers: RowHandlers<'a, T>,
}

impl<'a, T: TableRow> Table<'a, T> {
    pub fn new(columns: &'a [Column], state: &'a mut TableState, handlers: RowHandlers<'a, T>) -> Self {
        Self {
            columns,
            state,
            handlers,
        }
    }

    pub fn click_header(&mut self, key: &str) {
        self.state.sort = next_sort(self.state.sort.as_ref(), key);
        self.state.menu = None;
    }

    pub fn render(&self, rows: &[T]) -> TableView {
        let active = self.handlers.active_actions();
        let headers = self
            .columns
            .iter()
            .map(|column| HeaderCell {
                label: column.label.clone(),
                key: column.key.clone(),
                sort: self
                    .state
                    .sort
                    .as_ref()
                    .filter(|sort| sort.key == column.key)
                    .map(|sort| sort.direction),
            })
            .collect::<Vec<_>>();

        let sorted = sort_rows(rows, self.state.sort.as_ref());
        let body = if sorted.is_empty() {
            TableBody::Empty {
                placeholder: EMPTY_PLACEHOLDER.to_string(),
                colspan: self.columns.len() + usize::from(!active.is_empty()),
            }
        } else {
            let rows = sorted
                .iter()
                .enumerate()
                .map(|(index, row)| RenderedRow {
                    index,
                    cells: self
                        .columns
                        .iter()
                        .map(|column| format_cell(column, &row.cell(&column.key), index))
                        .collect(),
                    hovered: self.state.hovered == Some(index),
                    actions: action_layout(&active),
                })
                .collect();
            TableBody::Rows { rows }
        };

        let menu = self.state.menu.map(|open| OpenMenuView {
            row_index: open.row_index,
            placement: open.placement,
            items: active
                .iter()
                .map(|action| MenuItem {
                    action: *action,
                    label: action.label().to_string(),
                })
                .collect(),
        });

        TableView {
            headers,
            actions_header: !active.is_empty(),
            body,
            menu,
        }
    }

    pub fn hover(&mut self, rows: &[T], index: Option<usize>) {
        let sorted = sort_rows(rows, self.state.sort.as_ref());
        let row = index.and_then(|index| sorted.get(index).copied());
        self.state.hovered = row.and(index);
        if let Some(handler) = &self.handlers.on_row_hover {
            handler(row);
        }
    }

    pub fn double_click(&self, rows: &[T], index: usize) -> bool {
        let sorted = sort_rows(rows, self.state.sort.as_ref());
        match (sorted.get(index).copied(), &self.handlers.on_row_double_click) {
            (Some(row), Some(handler)) => {
                handler(row);
                true
            }
            _ => false,
        }
    }

    pub fn trigger_action(&self, rows: &[T], index: usize, kind: ActionKind) -> bool {
        let sorted = sort_rows(rows, self.state.sort.as_ref());
        match (sorted.get(index).copied(), self.handlers.action(kind)) {
            (Some(row), Some(handler)) => {
                handler(row);
                true
            }
            _ => false,
        }
    }

    pub fn toggle_overflow(&mut self, index: usize, trigger: Rect, viewport: Viewport, size: MenuSize) {
        if self.state.open_menu_row() == Some(index) {
            self.state.menu = None;
            return;
        }
        self.state.menu = Some(OpenMenu {
            row_index: index,
            placement: place_overflow_menu(trigger, viewport, size),
            size,
            viewport,
        });
    }

    pub fn choose_overflow_action(&mut self, rows: &[T], kind: ActionKind) -> bool {
        let Some(open) = self.state.menu.take() else {
            return false;
        };
        self.trigger_action(rows, open.row_index, kind)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if let Some(open) = self.state.menu {
            if !open.placement.bounds(open.size, open.viewport).contains(x, y) {
                self.state.menu = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        action_layout, format_cell, format_usd, next_sort, place_overflow_menu, sort_rows, ActionKind,
        ActionLayout, CellValue, Column, ColumnKind, ColumnOption, MenuSize, Rect, RowHandlers, SortDirection,
        Table, TableBody, TableRow, TableState, Viewport, EMPTY_PLACEHOLDER,
    };
    use chrono::{Local, TimeZone};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
        amount: Option<f64>,
    }

    impl TableRow for Row {
        fn cell(&self, key: &str) -> CellValue {
            match key {
                "id" => self.id.into(),
                "name" => self.name.into(),
                "amount" => self.amount.into(),
                _ => CellValue::Null,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 3, name: "beta", amount: Some(10.0) },
            Row { id: 1, name: "Alpha", amount: None },
            Row { id: 2, name: "alpha", amount: Some(2500.5) },
        ]
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("ID", "id"),
            Column::new("Name", "name"),
            Column::new("Amount", "amount").kind(ColumnKind::Money),
        ]
    }

    fn ids(sorted: &[&Row]) -> Vec<i64> {
        sorted.iter().map(|row| row.id).collect()
    }

    #[test]
    fn header_clicks_cycle_through_three_states() {
        let first = next_sort(None, "id").expect("ascending");
        assert_eq!(first.direction, SortDirection::Ascending);
        let second = next_sort(Some(&first), "id").expect("descending");
        assert_eq!(second.direction, SortDirection::Descending);
        assert!(next_sort(Some(&second), "id").is_none());

        let switched = next_sort(Some(&second), "name").expect("new column");
        assert_eq!(switched.key, "name");
        assert_eq!(switched.direction, SortDirection::Ascending);
    }

    #[test]
    fn numbers_sort_numerically_and_text_case_sensitively() {
        let data = rows();
        let by_id = next_sort(None, "id");
        assert_eq!(ids(&sort_rows(&data, by_id.as_ref())), vec![1, 2, 3]);

        let by_name = next_sort(None, "name");
        assert_eq!(ids(&sort_rows(&data, by_name.as_ref())), vec![1, 2, 3]);
        let by_name_desc = next_sort(by_name.as_ref(), "name");
        assert_eq!(ids(&sort_rows(&data, by_name_desc.as_ref())), vec![3, 2, 1]);
    }

    #[test]
    fn three_clicks_restore_original_order() {
        let data = rows();
        let columns = columns();
        let mut state = TableState::new();
        let mut table = Table::new(&columns, &mut state, RowHandlers::new());
        for _ in 0..3 {
            table.click_header("name");
        }
        let view = table.render(&data);
        let first_cells = view.rows().iter().map(|row| row.cells[0].clone()).collect::<Vec<_>>();
        assert_eq!(first_cells, vec!["3", "1", "2"]);
        assert!(view.headers.iter().all(|header| header.sort.is_none()));
    }

    #[test]
    fn money_cells_format_as_usd_and_treat_garbage_as_zero() {
        let money = Column::new("Amount", "amount").kind(ColumnKind::Money);
        assert_eq!(format_cell(&money, &CellValue::Number(2500.5), 0), "$2,500.50");
        assert_eq!(format_cell(&money, &CellValue::Null, 0), "$0.00");
        assert_eq!(format_cell(&money, &CellValue::from("abc"), 0), "$0.00");
        assert_eq!(format_cell(&money, &CellValue::from("12"), 0), "$12.00");
        assert_eq!(format_usd(-1234567.891), "-$1,234,567.89");
        assert_eq!(format_usd(999.999), "$1,000.00");
    }

    #[test]
    fn option_columns_render_labels_or_dash() {
        let column = Column::new("Flag", "flag").options(vec![
            ColumnOption { label: "Yes".to_string(), value: CellValue::Bool(true) },
            ColumnOption { label: "No".to_string(), value: CellValue::Bool(false) },
        ]);
        assert_eq!(format_cell(&column, &CellValue::Bool(true), 0), "Yes");
        assert_eq!(format_cell(&column, &CellValue::from("maybe"), 0), "-");
    }

    #[test]
    fn plain_cells_render_raw_value_or_dash() {
        let column = Column::new("Name", "name");
        assert_eq!(format_cell(&column, &CellValue::Null, 0), "-");
        assert_eq!(format_cell(&column, &CellValue::Number(42.0), 0), "42");
        assert_eq!(format_cell(&column, &CellValue::Number(4.5), 0), "4.5");
        assert_eq!(format_cell(&Column::new("#", "table_index"), &CellValue::Null, 4), "5");
    }

    #[test]
    fn time_cells_use_local_day_month_year() {
        let column = Column::new("Created", "createdAt").kind(ColumnKind::Time);
        let local = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).single().expect("local time");
        let millis = CellValue::Number(local.timestamp_millis() as f64);
        assert_eq!(format_cell(&column, &millis, 0), "07/03/2024 - 09:05");
        assert_eq!(
            format_cell(&column, &CellValue::from("2024-03-07T09:05:00"), 0),
            "07/03/2024 - 09:05"
        );
        assert_eq!(format_cell(&column, &CellValue::Null, 0), "-");
    }

    #[test]
    fn fewer_than_three_actions_stay_inline() {
        assert_eq!(action_layout(&[]), ActionLayout::None);
        assert_eq!(
            action_layout(&[ActionKind::View, ActionKind::Edit]),
            ActionLayout::Inline(vec![ActionKind::View, ActionKind::Edit])
        );
        assert!(matches!(
            action_layout(&[ActionKind::View, ActionKind::Edit, ActionKind::Delete]),
            ActionLayout::Overflow(_)
        ));
    }

    #[test]
    fn menu_opens_down_unless_space_runs_out() {
        let size = MenuSize { width: 192.0, height: 200.0 };
        let viewport = Viewport { height: 800.0, scroll_x: 0.0, scroll_y: 100.0 };
        let trigger = Rect { top: 100.0, left: 500.0, width: 24.0, height: 24.0 };

        let down = place_overflow_menu(trigger, viewport, size);
        assert!(!down.opens_up);
        assert_eq!(down.top, 224.0);
        assert_eq!(down.left, 332.0);

        let low = Rect { top: 700.0, ..trigger };
        let up = place_overflow_menu(low, viewport, size);
        assert!(up.opens_up);
        assert_eq!(up.top, 600.0);
    }

    #[test]
    fn empty_rows_render_a_single_placeholder() {
        let columns = columns();
        let mut state = TableState::new();
        let table = Table::new(&columns, &mut state, RowHandlers::<Row>::new().on_view(|_| {}));
        let view = table.render(&[]);
        assert_eq!(
            view.body,
            TableBody::Empty { placeholder: EMPTY_PLACEHOLDER.to_string(), colspan: 4 }
        );
        assert!(view.actions_header);
    }

    #[test]
    fn overflow_menu_runs_action_on_sorted_row_and_closes() {
        let data = rows();
        let columns = columns();
        let deleted = RefCell::new(Vec::new());
        let mut state = TableState::new();
        {
            let handlers = RowHandlers::new()
                .on_view(|_: &Row| {})
                .on_edit(|_: &Row| {})
                .on_delete(|row: &Row| deleted.borrow_mut().push(row.id));
            let mut table = Table::new(&columns, &mut state, handlers);
            table.click_header("id");

            let view = table.render(&data);
            assert!(matches!(view.rows()[0].actions, ActionLayout::Overflow(_)));

            let size = MenuSize { width: 192.0, height: 200.0 };
            let viewport = Viewport { height: 900.0, scroll_x: 0.0, scroll_y: 0.0 };
            let trigger = Rect { top: 50.0, left: 400.0, width: 24.0, height: 24.0 };
            table.toggle_overflow(0, trigger, viewport, size);
            table.toggle_overflow(2, trigger, viewport, size);
            let view = table.render(&data);
            let menu = view.menu.expect("menu open");
            assert_eq!(menu.row_index, 2);
            assert_eq!(menu.items.len(), 3);

            assert!(table.choose_overflow_action(&data, ActionKind::Delete));
        }
        assert_eq!(deleted.into_inner(), vec![3]);
        assert!(state.open_menu_row().is_none());
    }

    #[test]
    fn pointer_outside_closes_menu_but_inside_keeps_it() {
        let data = rows();
        let columns = columns();
        let mut state = TableState::new();
        let handlers = RowHandlers::new()
            .on_view(|_: &Row| {})
            .on_edit(|_: &Row| {})
            .on_configure(|_: &Row| {});
        let mut table = Table::new(&columns, &mut state, handlers);
        let size = MenuSize { width: 192.0, height: 200.0 };
        let viewport = Viewport { height: 900.0, scroll_x: 0.0, scroll_y: 0.0 };
        let trigger = Rect { top: 50.0, left: 400.0, width: 24.0, height: 24.0 };

        table.toggle_overflow(1, trigger, viewport, size);
        table.pointer_down(300.0, 100.0);
        assert!(table.render(&data).menu.is_some());
        table.pointer_down(10.0, 10.0);
        assert!(table.render(&data).menu.is_none());

        table.toggle_overflow(1, trigger, viewport, size);
        table.toggle_overflow(1, trigger, viewport, size);
        assert!(table.render(&data).menu.is_none());
    }

    #[test]
    fn hover_and_double_click_reach_caller() {
        let data = rows();
        let columns = columns();
        let hovered = RefCell::new(Vec::new());
        let opened = RefCell::new(None);
        let mut state = TableState::new();
        {
            let handlers = RowHandlers::new()
                .on_row_hover(|row: Option<&Row>| hovered.borrow_mut().push(row.map(|row| row.id)))
                .on_row_double_click(|row: &Row| *opened.borrow_mut() = Some(row.id));
            let mut table = Table::new(&columns, &mut state, handlers);
            table.hover(&data, Some(1));
            assert!(table.render(&data).rows()[1].hovered);
            table.hover(&data, None);
            assert!(table.double_click(&data, 2));
            assert!(!table.render(&data).actions_header);
        }
        assert_eq!(hovered.into_inner(), vec![Some(1), None]);
        assert_eq!(opened.into_inner(), Some(2));
    }
}
