//! Result sorting for search
//!
//! Sorts are stable, so records that compare equal stay in creation order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::DynamicRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key; earlier keys take precedence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sorts records by the given keys.
pub fn sort_records(records: &mut [DynamicRecord], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in keys {
            let ordering = compare_values(a.lookup(&key.field), b.lookup(&key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Missing values first, then null < bool < number < string < array < object.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    let rank = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaId;
    use crate::store::RecordId;
    use serde_json::json;

    fn record(id: u64, data: Value) -> DynamicRecord {
        DynamicRecord::new(RecordId(id), SchemaId(1), data.as_object().cloned().unwrap())
    }

    fn ids(records: &[DynamicRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let mut records = vec![
            record(1, json!({"age": 30})),
            record(2, json!({"age": 20})),
            record(3, json!({"age": 25})),
        ];
        sort_records(&mut records, &[SortKey::asc("age")]);
        assert_eq!(ids(&records), vec![2, 3, 1]);

        sort_records(&mut records, &[SortKey::desc("age")]);
        assert_eq!(ids(&records), vec![1, 3, 2]);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let mut records = vec![record(1, json!({"age": 3})), record(2, json!({}))];
        sort_records(&mut records, &[SortKey::asc("age")]);
        assert_eq!(ids(&records), vec![2, 1]);
    }

    #[test]
    fn test_secondary_key_and_stability() {
        let mut records = vec![
            record(1, json!({"team": "b", "age": 1})),
            record(2, json!({"team": "a", "age": 2})),
            record(3, json!({"team": "a", "age": 1})),
            record(4, json!({"team": "b", "age": 1})),
        ];
        sort_records(&mut records, &[SortKey::asc("team"), SortKey::desc("age")]);
        assert_eq!(ids(&records), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_sort_by_nested_path() {
        let mut records = vec![
            record(1, json!({"address": {"city": "Oslo"}})),
            record(2, json!({"address": {"city": "Bergen"}})),
        ];
        sort_records(&mut records, &[SortKey::asc("address.city")]);
        assert_eq!(ids(&records), vec![2, 1]);
    }
}
