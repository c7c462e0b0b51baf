use crate::models::{FilterScalar, FilterValues};
use crate::table::{CellValue, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeKeys {
    pub min: &'static str,
    pub max: &'static str,
    pub field: &'static str,
}

pub const SCORE_RANGE: RangeKeys = RangeKeys {
    min: "minScore",
    max: "maxScore",
    field: "score",
};

pub const AMOUNT_RANGE: RangeKeys = RangeKeys {
    min: "minAmount",
    max: "maxAmount",
    field: "amount",
};

/// Integer-prefix parse: optional leading whitespace and sign, then digits.
/// `"12.7"` yields 12, `"abc"` yields `None`.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn parse_bound(value: Option<&FilterScalar>) -> Option<f64> {
    match value? {
        FilterScalar::Number(number) if number.is_finite() => Some(number.trunc()),
        FilterScalar::Number(_) => None,
        FilterScalar::Text(text) => parse_int_prefix(text).map(|bound| bound as f64),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    min: Option<f64>,
    max: Option<f64>,
    field: &'static str,
    needles: Vec<(String, String)>,
}

impl CompiledFilter {
    pub fn new(values: &FilterValues, range: RangeKeys) -> Self {
        let needles = values
            .iter()
            .filter(|(key, _)| key.as_str() != range.min && key.as_str() != range.max)
            .filter(|(_, value)| !value.is_blank())
            .map(|(key, value)| (key.clone(), value.to_string().to_lowercase()))
            .collect();

        Self {
            min: parse_bound(values.get(range.min)),
            max: parse_bound(values.get(range.max)),
            field: range.field,
            needles,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.needles.is_empty()
    }

    pub fn matches<T: TableRow>(&self, row: &T) -> bool {
        if self.min.is_some() || self.max.is_some() {
            let value = match row.cell(self.field) {
                CellValue::Number(number) => number,
                _ => 0.0,
            };
            if self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max) {
                return false;
            }
        }

        self.needles.iter().all(|(key, needle)| {
            row.cell(key).to_string().to_lowercase().contains(needle.as_str())
        })
    }
}

/// Range bound intersected with a case-insensitive substring match on every
/// other non-empty field, all ANDed. Input order is preserved.
pub fn apply_filters<T: TableRow + Clone>(rows: &[T], values: &FilterValues, range: RangeKeys) -> Vec<T> {
    let filter = CompiledFilter::new(values, range);
    if filter.is_unconstrained() {
        return rows.to_vec();
    }
    rows.iter().filter(|row| filter.matches(*row)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::{apply_filters, parse_bound, parse_int_prefix, SCORE_RANGE};
    use crate::models::{FilterScalar, FilterValues};
    use crate::table::{CellValue, TableRow};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
        score: Option<i64>,
    }

    impl TableRow for Row {
        fn cell(&self, key: &str) -> CellValue {
            match key {
                "id" => self.id.into(),
                "name" => self.name.into(),
                "score" => self.score.into(),
                _ => CellValue::Null,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "Ana Souza", score: Some(50) },
            Row { id: 2, name: "Bruno", score: Some(90) },
            Row { id: 3, name: "Joana", score: Some(70) },
            Row { id: 4, name: "Unscored", score: None },
        ]
    }

    fn filters(pairs: &[(&str, FilterScalar)]) -> FilterValues {
        pairs.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|row| row.id).collect()
    }

    #[test]
    fn integer_prefix_parsing() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  -7xyz"), Some(-7));
        assert_eq!(parse_int_prefix("12.9"), Some(12));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_bound(Some(&FilterScalar::Number(33.8))), Some(33.0));
        assert_eq!(parse_bound(None), None);
    }

    #[test]
    fn empty_filters_keep_everything() {
        let data = rows();
        let values = filters(&[("name", "".into()), ("minScore", "".into())]);
        assert_eq!(apply_filters(&data, &values, SCORE_RANGE), data);
    }

    #[test]
    fn bounds_are_inclusive() {
        let data = rows();
        let values = filters(&[("minScore", "50".into()), ("maxScore", "70".into())]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![1, 3]);
    }

    #[test]
    fn unparsable_bound_is_open() {
        let data = rows();
        let values = filters(&[("minScore", "lots".into()), ("maxScore", "70".into())]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![1, 3, 4]);
    }

    #[test]
    fn missing_range_field_counts_as_zero() {
        let data = rows();
        let values = filters(&[("minScore", "1".into())]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![1, 2, 3]);
    }

    #[test]
    fn substring_match_is_case_insensitive_and_anded() {
        let data = rows();
        let values = filters(&[("name", "ANA".into())]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![1, 3]);

        let values = filters(&[("name", "ana".into()), ("maxScore", "60".into())]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![1]);

        let values = filters(&[("name", "ana".into()), ("id", FilterScalar::Number(3.0))]);
        assert_eq!(ids(&apply_filters(&data, &values, SCORE_RANGE)), vec![3]);
    }

    #[test]
    fn unknown_field_excludes_every_row() {
        let data = rows();
        let values = filters(&[("region", "south".into())]);
        assert!(apply_filters(&data, &values, SCORE_RANGE).is_empty());
    }
}
