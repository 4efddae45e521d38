use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::{InputError, Result};
use crate::types::Dataset;

/// Decode a CSV byte stream with a mandatory header row.
///
/// Malformed lines (too many fields, undecodable bytes) are skipped with a
/// warning; short lines are padded with empty cells. Only a missing header or
/// a table without data rows is fatal.
pub fn read_csv(bytes: &[u8]) -> std::result::Result<Dataset, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| InputError::Unreadable(e.to_string()))?
        .clone();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(InputError::Unreadable("No columns to parse from file".to_string()));
    }

    let columns = dedupe_headers(headers.iter());
    let width = columns.len();
    let mut dataset = Dataset::new(columns);

    for (i, result) in reader.records().enumerate() {
        // header is line 1, first data line is line 2
        let line = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable CSV line");
                continue;
            }
        };

        if record.len() > width {
            warn!(line, expected = width, saw = record.len(), "Skipping CSV line with too many fields");
            continue;
        }

        let cells = record
            .iter()
            .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
            .collect();
        dataset.push_row(cells);
    }

    if dataset.is_empty() {
        return Err(InputError::Empty);
    }

    Ok(dataset)
}

pub fn read_csv_path(path: &Path) -> std::result::Result<Dataset, InputError> {
    let bytes = std::fs::read(path)
        .map_err(|e| InputError::Unreadable(format!("{}: {}", path.display(), e)))?;
    read_csv(&bytes)
}

/// Encode a dataset back to CSV, writing empty cells as empty fields.
pub fn write_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(bytes)
}

/// Repeated header names get `.1`, `.2`, ... suffixes so every column stays addressable.
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|h| {
            let count = seen.entry(h.to_string()).or_insert(0);
            let name = if *count == 0 { h.to_string() } else { format!("{}.{}", h, count) };
            *count += 1;
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_file_order() {
        let ds = read_csv(b"name,email\nAnn,ann@x.com\nBob,\n").unwrap();
        assert_eq!(ds.columns(), &["name".to_string(), "email".to_string()]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "email"), Some("ann@x.com"));
        assert_eq!(ds.get(1, "email"), None);
    }

    #[test]
    fn skips_lines_with_extra_fields() {
        let ds = read_csv(b"a,b\n1,2\n3,4,5\n6\n").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "a"), Some("1"));
        assert_eq!(ds.get(1, "a"), Some("6"));
        assert_eq!(ds.get(1, "b"), None);
    }

    #[test]
    fn header_only_is_empty() {
        assert_eq!(read_csv(b"a,b\n"), Err(InputError::Empty));
    }

    #[test]
    fn no_header_is_unreadable() {
        assert!(matches!(read_csv(b""), Err(InputError::Unreadable(_))));
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let ds = read_csv(b"x,x,y\n1,2,3\n").unwrap();
        assert_eq!(ds.columns(), &["x".to_string(), "x.1".to_string(), "y".to_string()]);
        assert_eq!(ds.get(0, "x.1"), Some("2"));
    }

    #[test]
    fn write_then_read_keeps_cells() {
        let ds = read_csv(b"a,b\n\"hello, world\",\n").unwrap();
        let bytes = write_csv(&ds).unwrap();
        let again = read_csv(&bytes).unwrap();
        assert_eq!(again, ds);
    }
}
