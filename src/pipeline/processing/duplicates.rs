use std::collections::HashMap;

use super::columns::ColumnRoles;
use super::validators::is_missing;
use crate::types::Dataset;

/// Columns whose combined values identify a record: email and phone when
/// either exists, otherwise company and person name. `None` disables the check.
pub fn dedup_key(roles: &ColumnRoles) -> Option<Vec<String>> {
    let primary: Vec<String> = [&roles.email, &roles.phone].into_iter().flatten().cloned().collect();
    if !primary.is_empty() {
        return Some(primary);
    }

    let fallback: Vec<String> = [&roles.company, &roles.person_name]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    if fallback.is_empty() {
        None
    } else {
        Some(fallback)
    }
}

/// Every row belonging to a group of two or more rows with equal key cells,
/// in row order. The first occurrence is flagged along with its repeats.
///
/// An empty cell equals another empty cell, but rows whose key cells are all
/// empty carry no identity and never form a group.
pub fn find_duplicate_rows(dataset: &Dataset, key: &[String]) -> Vec<usize> {
    let mut groups: HashMap<Vec<Option<String>>, Vec<usize>> = HashMap::new();

    for row in 0..dataset.len() {
        let values: Vec<Option<String>> = key
            .iter()
            .map(|col| {
                let cell = dataset.get(row, col);
                if is_missing(cell) {
                    None
                } else {
                    cell.map(|v| v.trim().to_string())
                }
            })
            .collect();

        if values.iter().all(Option::is_none) {
            continue;
        }
        groups.entry(values).or_default().push(row);
    }

    let mut flagged: Vec<usize> = groups
        .into_values()
        .filter(|rows| rows.len() > 1)
        .flatten()
        .collect();
    flagged.sort_unstable();
    flagged
}

/// Rows sharing trimmed, lowercased values on `columns` with at least one
/// other row. Unknown columns are dropped; empty cells equal each other.
/// Returns nothing when none of the columns exist.
pub fn find_matching_rows(dataset: &Dataset, columns: &[String]) -> Vec<usize> {
    let indices: Vec<usize> = columns.iter().filter_map(|c| dataset.column_index(c)).collect();
    if indices.is_empty() {
        return Vec::new();
    }

    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (row, cells) in dataset.rows().enumerate() {
        let values = indices
            .iter()
            .map(|&i| {
                let cell = cells.get(i).and_then(|c| c.as_deref());
                if is_missing(cell) {
                    String::new()
                } else {
                    cell.unwrap_or_default().trim().to_lowercase()
                }
            })
            .collect();
        groups.entry(values).or_default().push(row);
    }

    let mut matched: Vec<usize> = groups
        .into_values()
        .filter(|rows| rows.len() > 1)
        .flatten()
        .collect();
    matched.sort_unstable();
    matched
}
