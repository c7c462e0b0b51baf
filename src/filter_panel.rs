use crate::errors::{AppError, AppResult};
use crate::models::{EntityKind, FilterScalar, FilterValues};
use crate::store::FilterStore;
use serde::{Deserialize, Serialize};

pub const ALL_OPTION_LABEL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterFieldType {
    Text,
    Number,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn same(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub key: String,
    pub label: String,
    pub field_type: FilterFieldType,
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl FilterField {
    pub fn text(key: &str, label: &str) -> Self {
        Self::build(key, label, FilterFieldType::Text, Vec::new())
    }

    pub fn number(key: &str, label: &str) -> Self {
        Self::build(key, label, FilterFieldType::Number, Vec::new())
    }

    pub fn select(key: &str, label: &str, options: Vec<SelectOption>) -> Self {
        Self::build(key, label, FilterFieldType::Select, options)
    }

    fn build(key: &str, label: &str, field_type: FilterFieldType, options: Vec<SelectOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    pub key: String,
    pub label: String,
    pub field_type: FilterFieldType,
    pub value: String,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone)]
pub struct FilterPanel {
    kind: EntityKind,
    schema: Vec<FilterField>,
    draft: FilterValues,
    open: bool,
}

impl FilterPanel {
    pub fn new(kind: EntityKind, schema: Vec<FilterField>) -> Self {
        Self {
            kind,
            schema,
            draft: FilterValues::new(),
            open: false,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &FilterValues {
        &self.draft
    }

    pub fn open(&mut self, store: &FilterStore) {
        self.sync(store);
        self.open = true;
    }

    pub fn sync(&mut self, store: &FilterStore) {
        self.draft = store.filters(self.kind).clone();
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn set_field(&mut self, key: &str, value: &str) -> AppResult<()> {
        let field = self
            .schema
            .iter()
            .find(|field| field.key == key)
            .ok_or_else(|| AppError::Validation(format!("unknown filter field `{}`", key)))?;

        match field.field_type {
            FilterFieldType::Text => {}
            FilterFieldType::Number => {
                if !value.is_empty() && value.trim().parse::<f64>().is_err() {
                    return Err(AppError::Validation(format!("{} must be a number", field.label)));
                }
            }
            FilterFieldType::Select => {
                if !value.is_empty() && !field.options.iter().any(|option| option.value == value) {
                    return Err(AppError::Validation(format!(
                        "`{}` is not an option for {}",
                        value, field.label
                    )));
                }
            }
        }

        self.draft.insert(key.to_string(), FilterScalar::from(value));
        Ok(())
    }

    pub fn inputs(&self) -> Vec<FilterInput> {
        self.schema
            .iter()
            .map(|field| {
                let value = self
                    .draft
                    .get(&field.key)
                    .filter(|value| !value.is_blank())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let options = match field.field_type {
                    FilterFieldType::Select => std::iter::once(SelectOption {
                        value: String::new(),
                        label: ALL_OPTION_LABEL.to_string(),
                    })
                    .chain(field.options.iter().cloned())
                    .collect(),
                    _ => Vec::new(),
                };
                FilterInput {
                    key: field.key.clone(),
                    label: field.label.clone(),
                    field_type: field.field_type,
                    value,
                    options,
                }
            })
            .collect()
    }

    pub fn apply(&mut self, store: &mut FilterStore) {
        store.update_filters(self.kind, self.draft.clone());
        self.close();
    }

    pub fn clear(&mut self, store: &mut FilterStore) {
        self.draft.clear();
        store.clear_filters(self.kind);
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterField, FilterFieldType, FilterPanel, SelectOption, ALL_OPTION_LABEL};
    use crate::db::MemoryStore;
    use crate::models::{EntityKind, FilterScalar, FilterValues};
    use crate::store::FilterStore;
    use std::sync::Arc;

    fn schema() -> Vec<FilterField> {
        vec![
            FilterField::text("name", "Name"),
            FilterField::select("stage", "Stage", vec![SelectOption::same("Proposal")]),
            FilterField::number("minAmount", "Minimum Amount"),
        ]
    }

    fn store() -> FilterStore {
        FilterStore::hydrate(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn draft_is_only_committed_on_apply() {
        let mut store = store();
        let mut panel = FilterPanel::new(EntityKind::Opportunities, schema());
        panel.open(&store);
        panel.set_field("name", "acme").expect("set name");
        assert!(store.filters(EntityKind::Opportunities).is_empty());

        panel.apply(&mut store);
        assert!(!panel.is_open());
        assert_eq!(
            store.filters(EntityKind::Opportunities).get("name"),
            Some(&FilterScalar::Text("acme".to_string()))
        );
    }

    #[test]
    fn clear_resets_draft_and_store() {
        let mut store = store();
        let mut values = FilterValues::new();
        values.insert("name".to_string(), FilterScalar::from("acme"));
        store.update_filters(EntityKind::Opportunities, values);

        let mut panel = FilterPanel::new(EntityKind::Opportunities, schema());
        panel.open(&store);
        assert_eq!(panel.draft().len(), 1);
        panel.clear(&mut store);

        assert!(panel.draft().is_empty());
        assert!(store.filters(EntityKind::Opportunities).is_empty());
        assert!(!panel.is_open());
    }

    #[test]
    fn reopening_resyncs_from_store() {
        let mut store = store();
        let mut panel = FilterPanel::new(EntityKind::Opportunities, schema());
        panel.open(&store);
        panel.set_field("name", "stale").expect("set");

        let mut values = FilterValues::new();
        values.insert("stage".to_string(), FilterScalar::from("Proposal"));
        store.update_filters(EntityKind::Opportunities, values.clone());

        panel.open(&store);
        assert_eq!(panel.draft(), &values);
    }

    #[test]
    fn inputs_offer_all_option_for_selects() {
        let store = store();
        let mut panel = FilterPanel::new(EntityKind::Opportunities, schema());
        panel.open(&store);
        panel.set_field("stage", "Proposal").expect("set");

        let inputs = panel.inputs();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[1].field_type, FilterFieldType::Select);
        assert_eq!(inputs[1].options[0].label, ALL_OPTION_LABEL);
        assert_eq!(inputs[1].options[0].value, "");
        assert_eq!(inputs[1].value, "Proposal");
        assert!(inputs[0].options.is_empty());
        assert_eq!(inputs[2].value, "");
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut panel = FilterPanel::new(EntityKind::Opportunities, schema());
        assert!(panel.set_field("minAmount", "ten").is_err());
        assert!(panel.set_field("stage", "Won").is_err());
        assert!(panel.set_field("unknown", "x").is_err());
        panel.set_field("minAmount", "").expect("empty number clears");
        panel.set_field("stage", "").expect("All clears");
    }
}
