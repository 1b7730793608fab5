use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single cell value in a table column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Parse a raw field (e.g. a CSV cell) into a typed value.
    pub fn from_field(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Value::Null;
        }

        match trimmed {
            "TRUE" | "True" | "true" => return Value::Bool(true),
            "FALSE" | "False" | "false" => return Value::Bool(false),
            _ => {}
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return Value::Number(num);
            }
        }

        Value::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Display form: integral numbers print without a decimal point.
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Bool(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }

    /// JSON form for row records and tool payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Total order for sorting: nulls first, then booleans, numbers, text.
    pub fn cmp_for_sort(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::Text(_) => 3,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Approximate in-memory size in bytes.
    pub fn mem_size(&self) -> usize {
        match self {
            Value::Text(s) => std::mem::size_of::<Value>() + s.len(),
            _ => std::mem::size_of::<Value>(),
        }
    }
}

/// Declared type of a column, inferred from its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Bool,
    Text,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
        }
    }

    /// Infer the column type from values. Mixed or all-null columns are text.
    pub fn infer<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
        let mut seen: Option<ColumnType> = None;

        for value in values {
            let ty = match value {
                Value::Null => continue,
                Value::Number(_) => ColumnType::Number,
                Value::Bool(_) => ColumnType::Bool,
                Value::Text(_) => ColumnType::Text,
            };
            match seen {
                None => seen = Some(ty),
                Some(prev) if prev == ty => {}
                Some(_) => return ColumnType::Text,
            }
        }

        seen.unwrap_or(ColumnType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_empty_is_null() {
        assert_eq!(Value::from_field(""), Value::Null);
        assert_eq!(Value::from_field("   "), Value::Null);
    }

    #[test]
    fn test_from_field_numbers() {
        assert_eq!(Value::from_field("42"), Value::Number(42.0));
        assert_eq!(Value::from_field("-3.5"), Value::Number(-3.5));
        assert_eq!(Value::from_field(" 1e3 "), Value::Number(1000.0));
    }

    #[test]
    fn test_from_field_bools() {
        assert_eq!(Value::from_field("TRUE"), Value::Bool(true));
        assert_eq!(Value::from_field("false"), Value::Bool(false));
        // Anything else that mentions truth is just text
        assert_eq!(Value::from_field("truthy"), Value::Text("truthy".into()));
    }

    #[test]
    fn test_from_field_non_finite_is_text() {
        // "inf"/"NaN" parse as f64 but are not meaningful cell values
        assert_eq!(Value::from_field("inf"), Value::Text("inf".into()));
        assert_eq!(Value::from_field("NaN"), Value::Text("NaN".into()));
    }

    #[test]
    fn test_display_integral_number() {
        assert_eq!(Value::Number(3.0).display(), "3");
        assert_eq!(Value::Number(3.25).display(), "3.25");
        assert_eq!(Value::Null.display(), "");
    }

    #[test]
    fn test_infer_uniform_and_mixed() {
        let nums = vec![Value::Number(1.0), Value::Null, Value::Number(2.0)];
        assert_eq!(ColumnType::infer(nums.iter()), ColumnType::Number);

        let mixed = vec![Value::Number(1.0), Value::Text("x".into())];
        assert_eq!(ColumnType::infer(mixed.iter()), ColumnType::Text);

        let empty: Vec<Value> = vec![];
        assert_eq!(ColumnType::infer(empty.iter()), ColumnType::Text);
    }

    #[test]
    fn test_sort_order_nulls_first() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Null,
            Value::Number(2.0),
            Value::Number(1.0),
        ];
        values.sort_by(|a, b| a.cmp_for_sort(b));
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Number(1.0));
        assert_eq!(values[3], Value::Text("b".into()));
    }
}
