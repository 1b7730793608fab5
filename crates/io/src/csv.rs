// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use tablepilot_table::{Column, Table, Value};

/// Import a CSV file. The first row is the header; column types are
/// inferred from the body.
pub fn import(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        // Higher field count breaks ties — more columns = more likely real delimiter
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header = match records.next() {
        Some(result) => result.map_err(|e| e.to_string())?,
        None => return Ok(Table::new()),
    };

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                format!("column_{}", i + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        for (col_idx, column) in values.iter_mut().enumerate() {
            // Flexible reader: short rows pad with nulls
            let field = record.get(col_idx).unwrap_or("");
            column.push(Value::from_field(field));
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| Column::new(name, vals))
        .collect();

    let table = Table::from_columns(columns)?;
    log::debug!(
        "imported csv: {} rows x {} cols",
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b',')
}

fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    writer
        .write_record(table.column_names())
        .map_err(|e| e.to_string())?;

    for row in 0..table.n_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|col| col.get(row).map(|v| v.display()).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablepilot_table::ColumnType;

    #[test]
    fn test_import_basic_csv() {
        let table = import_from_string("a,b\n1,x\n2,y\n3,z\n", b',').unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("a").unwrap().dtype, ColumnType::Number);
        assert_eq!(table.column("b").unwrap().dtype, ColumnType::Text);
        assert_eq!(table.get(2, "b"), Some(&Value::Text("z".into())));
    }

    #[test]
    fn test_import_short_rows_pad_with_nulls() {
        let table = import_from_string("a,b\n1,x\n2\n", b',').unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.get(1, "b"), Some(&Value::Null));
    }

    #[test]
    fn test_import_empty_header_names() {
        let table = import_from_string("a,,c\n1,2,3\n", b',').unwrap();
        assert_eq!(table.column_names(), vec!["a", "column_2", "c"]);
    }

    #[test]
    fn test_import_empty_content() {
        let table = import_from_string("", b',').unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_cols(), 0);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("a|b|c\n1|2|3\n"), b'|');
        // Single column: comma default
        assert_eq!(sniff_delimiter("a\n1\n2\n"), b',');
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let original = import_from_string("n,s\n1,alpha\n2.5,beta\n,gamma\n", b',').unwrap();
        export(&original, &path).unwrap();

        let reloaded = import(&path).unwrap();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_import_missing_file_is_error() {
        let err = import(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(err.contains("cannot open"), "unexpected error: {}", err);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "café" in Windows-1252: é = 0xE9 (invalid UTF-8 on its own)
        std::fs::write(&path, b"name\ncaf\xe9\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.get(0, "name"), Some(&Value::Text("café".into())));
    }

    proptest::proptest! {
        // Any table of simple text/number cells survives an export/import cycle
        #[test]
        fn prop_export_import_preserves_shape(rows in 1usize..20, cols in 1usize..6) {
            let columns: Vec<_> = (0..cols)
                .map(|c| {
                    let values = (0..rows).map(|r| Value::Number((r * cols + c) as f64)).collect();
                    tablepilot_table::Column::new(format!("col{}", c), values)
                })
                .collect();
            let table = Table::from_columns(columns).unwrap();

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("prop.csv");
            export(&table, &path).unwrap();
            let reloaded = import(&path).unwrap();

            proptest::prop_assert_eq!(reloaded.n_rows(), rows);
            proptest::prop_assert_eq!(reloaded.n_cols(), cols);
        }
    }
}
