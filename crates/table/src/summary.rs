//! Table introspection: a pure, deterministic summary of a table.
//!
//! `inspect` never fails; a zero-row table produces zero-valued statistics.

use serde::Serialize;

use crate::table::{Column, Table};
use crate::value::Value;

/// Distinct-value cutoff below which a full frequency table is reported.
const CATEGORICAL_DISTINCT_LIMIT: usize = 20;

/// How many top values / sample values to report per categorical column.
const CATEGORICAL_TOP: usize = 10;

/// How many rows to include in head/tail samples.
const SAMPLE_ROWS: usize = 5;

/// Per-column shape facts: declared type and null accounting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub null_pct: f64,
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NumericStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Value distribution for one non-numeric column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoricalProfile {
    pub name: String,
    pub distinct: usize,
    /// Top value frequencies, present only when distinct <= the limit.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<(String, usize)>,
    /// Sample of distinct values, present only when distinct > the limit.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub cols: usize,
    pub memory_bytes: usize,
    pub columns: Vec<ColumnProfile>,
    pub numeric: Vec<NumericStats>,
    pub categorical: Vec<CategoricalProfile>,
    pub head: Vec<serde_json::Map<String, serde_json::Value>>,
    pub tail: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Summarize a table. Pure and idempotent.
pub fn inspect(table: &Table) -> TableSummary {
    let rows = table.n_rows();

    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let null_count = col.null_count();
            let null_pct = if rows == 0 {
                0.0
            } else {
                null_count as f64 / rows as f64 * 100.0
            };
            ColumnProfile {
                name: col.name.clone(),
                dtype: col.dtype.name().to_string(),
                null_count,
                null_pct,
            }
        })
        .collect();

    let numeric = table
        .numeric_columns()
        .iter()
        .map(|col| describe_numeric(col))
        .collect();

    let categorical = table
        .categorical_columns()
        .iter()
        .map(|col| describe_categorical(col))
        .collect();

    let tail_start = rows.saturating_sub(SAMPLE_ROWS);

    TableSummary {
        rows,
        cols: table.n_cols(),
        memory_bytes: table.mem_estimate(),
        columns,
        numeric,
        categorical,
        head: table.records(0..SAMPLE_ROWS.min(rows)),
        tail: table.records(tail_start..rows),
    }
}

fn describe_numeric(col: &Column) -> NumericStats {
    let mut values = col.numbers();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = values.len();

    if count == 0 {
        return NumericStats {
            name: col.name.clone(),
            count: 0,
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            q25: 0.0,
            median: 0.0,
            q75: 0.0,
            max: 0.0,
        };
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    // Sample standard deviation (n - 1), matching describe() conventions
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    NumericStats {
        name: col.name.clone(),
        count,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[count - 1],
    }
}

/// Linear-interpolation quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

fn describe_categorical(col: &Column) -> CategoricalProfile {
    // Count frequencies of non-null display values, preserving first-seen order
    // so that ties break deterministically.
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for value in col.values() {
        if value.is_null() {
            continue;
        }
        let key = value.display();
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    let distinct = order.len();

    if distinct <= CATEGORICAL_DISTINCT_LIMIT {
        let mut top: Vec<(String, usize)> = order
            .iter()
            .map(|k| (k.clone(), counts[k]))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1));
        top.truncate(CATEGORICAL_TOP);
        CategoricalProfile {
            name: col.name.clone(),
            distinct,
            top_values: top,
            sample_values: Vec::new(),
        }
    } else {
        CategoricalProfile {
            name: col.name.clone(),
            distinct,
            top_values: Vec::new(),
            sample_values: order.into_iter().take(CATEGORICAL_TOP).collect(),
        }
    }
}

impl TableSummary {
    /// Render the summary as prompt-ready context text.
    pub fn to_context_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Size: {} rows x {} columns\n", self.rows, self.cols));
        out.push_str(&format!(
            "Memory: {:.2} MB\n\n",
            self.memory_bytes as f64 / 1024.0 / 1024.0
        ));

        out.push_str("Columns:\n");
        for col in &self.columns {
            out.push_str(&format!(
                "  {} ({}, {} nulls, {:.1}%)\n",
                col.name, col.dtype, col.null_count, col.null_pct
            ));
        }

        if !self.numeric.is_empty() {
            out.push_str("\nNumeric summary:\n");
            for stats in &self.numeric {
                out.push_str(&format!(
                    "  {}: count={} mean={:.4} std={:.4} min={} q25={} median={} q75={} max={}\n",
                    stats.name,
                    stats.count,
                    stats.mean,
                    stats.std,
                    stats.min,
                    stats.q25,
                    stats.median,
                    stats.q75,
                    stats.max
                ));
            }
        }

        if !self.categorical.is_empty() {
            out.push_str("\nCategorical columns:\n");
            for cat in &self.categorical {
                if cat.top_values.is_empty() {
                    out.push_str(&format!(
                        "  {}: {} distinct values, sample: {}\n",
                        cat.name,
                        cat.distinct,
                        cat.sample_values.join(", ")
                    ));
                } else {
                    let counts: Vec<String> = cat
                        .top_values
                        .iter()
                        .map(|(v, n)| format!("{}={}", v, n))
                        .collect();
                    out.push_str(&format!(
                        "  {}: {} distinct values ({})\n",
                        cat.name,
                        cat.distinct,
                        counts.join(", ")
                    ));
                }
            }
        }

        if !self.head.is_empty() {
            out.push_str("\nFirst rows:\n");
            for record in &self.head {
                out.push_str(&format!(
                    "  {}\n",
                    serde_json::to_string(record).unwrap_or_default()
                ));
            }
        }

        out
    }
}
