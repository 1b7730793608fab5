//! Suggestion heuristics: advisory analysis steps for a table and question.
//!
//! Purely textual. Never executes anything and never fails.

use crate::table::Table;

/// Keyword groups scanned against the lower-cased question, in fixed order.
/// Every matching group contributes one step, all sharing the same number.
const KEYWORD_GROUPS: &[(&[&str], &str)] = &[
    (
        &["correlation", "relationship", "relate"],
        "Correlation Analysis: Calculate correlations between numeric variables",
    ),
    (
        &["trend", "time", "date", "temporal"],
        "Time Series Analysis: Look for date/time columns and analyze trends",
    ),
    (
        &["group", "category", "segment"],
        "Group Analysis: Group data by categorical variables and analyze patterns",
    ),
    (
        &["outlier", "anomaly", "unusual"],
        "Outlier Detection: Identify outliers in numeric columns",
    ),
    (
        &["distribution", "histogram", "spread"],
        "Distribution Analysis: Analyze data distributions and value spread",
    ),
];

/// Suggest ordered analysis steps for a table and a free-text question.
pub fn suggest_steps(table: &Table, question: &str) -> Vec<String> {
    let mut steps = vec![
        "1. Data Overview: Check table shape, columns, and data types".to_string(),
        format!(
            "2. Data Quality: Check for missing values in {} columns",
            table.n_cols()
        ),
        "3. Statistical Summary: Generate descriptive statistics for numeric columns".to_string(),
    ];

    let numeric: Vec<&str> = table
        .numeric_columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let categorical: Vec<&str> = table
        .categorical_columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();

    if !numeric.is_empty() {
        steps.push(format!(
            "4. Numeric Analysis: Analyze {} numeric columns: {}",
            numeric.len(),
            preview(&numeric)
        ));
    }

    if !categorical.is_empty() {
        steps.push(format!(
            "5. Categorical Analysis: Analyze {} categorical columns: {}",
            categorical.len(),
            preview(&categorical)
        ));
    }

    let question_lower = question.to_lowercase();
    for (keywords, step) in KEYWORD_GROUPS {
        if keywords.iter().any(|k| question_lower.contains(k)) {
            steps.push(format!("6. {}", step));
        }
    }

    steps
}

/// First three names, with an ellipsis when truncated.
fn preview(names: &[&str]) -> String {
    if names.len() <= 3 {
        names.join(", ")
    } else {
        format!("{}...", names[..3].join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Table};
    use crate::value::Value;

    fn mixed_table() -> Table {
        Table::from_columns(vec![
            Column::new("price", vec![Value::Number(1.0)]),
            Column::new("name", vec![Value::Text("a".into())]),
        ])
        .unwrap()
    }

    #[test]
    fn test_always_starts_with_three_fixed_steps() {
        let steps = suggest_steps(&Table::new(), "anything");
        assert!(steps.len() >= 3);
        assert!(steps[0].starts_with("1. Data Overview"));
        assert!(steps[1].starts_with("2. Data Quality"));
        assert!(steps[2].starts_with("3. Statistical Summary"));
    }

    #[test]
    fn test_column_kind_steps_only_when_present() {
        let steps = suggest_steps(&mixed_table(), "hello");
        assert!(steps.iter().any(|s| s.starts_with("4. Numeric Analysis")));
        assert!(steps.iter().any(|s| s.starts_with("5. Categorical Analysis")));

        let text_only =
            Table::from_columns(vec![Column::new("c", vec![Value::Text("x".into())])]).unwrap();
        let steps = suggest_steps(&text_only, "hello");
        assert!(!steps.iter().any(|s| s.starts_with("4.")));
        assert!(steps.iter().any(|s| s.starts_with("5.")));
    }

    #[test]
    fn test_keyword_groups_append_in_fixed_order() {
        let steps = suggest_steps(
            &mixed_table(),
            "Is there a RELATIONSHIP over time between groups?",
        );
        let topical: Vec<&String> = steps.iter().filter(|s| s.starts_with("6.")).collect();
        assert_eq!(topical.len(), 3);
        assert!(topical[0].contains("Correlation"));
        assert!(topical[1].contains("Time Series"));
        assert!(topical[2].contains("Group Analysis"));
    }

    #[test]
    fn test_one_step_per_group_even_with_multiple_hits() {
        let steps = suggest_steps(&mixed_table(), "outlier anomaly unusual");
        let topical: Vec<&String> = steps.iter().filter(|s| s.starts_with("6.")).collect();
        assert_eq!(topical.len(), 1);
        assert!(topical[0].contains("Outlier"));
    }

    #[test]
    fn test_no_keywords_no_topical_steps() {
        let steps = suggest_steps(&mixed_table(), "what are the column names?");
        assert!(!steps.iter().any(|s| s.starts_with("6.")));
    }
}
