use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::pipeline::processing::duplicates::find_matching_rows;
use crate::pipeline::processing::validators::is_missing;
use crate::types::{Change, Dataset, FixType};

pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Which stored file of a run to page through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Original,
    #[default]
    Cleaned,
}

/// Row filters for a data page. A row is kept when it matches any active flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFilters {
    pub duplicate: bool,
    pub email: bool,
    pub phone: bool,
    /// Company unification
    pub unify: bool,
    pub job_normalization: bool,
    pub fake_domain: bool,
    pub missing_fields: bool,
    /// Extra duplicate check over these columns; only read when `duplicate` is set
    pub duplicate_columns: Vec<String>,
}

impl DataFilters {
    pub fn is_active(&self) -> bool {
        self.duplicate
            || self.email
            || self.phone
            || self.unify
            || self.job_normalization
            || self.fake_domain
            || self.missing_fields
    }

    fn selects(&self, fix_type: FixType) -> bool {
        match fix_type {
            FixType::Duplicate => self.duplicate,
            FixType::Email => self.email,
            FixType::Phone => self.phone,
            FixType::Company => self.unify,
            FixType::JobTitle => self.job_normalization,
            FixType::Domain => self.fake_domain,
        }
    }
}

/// One page of rows from a stored run file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPage {
    /// Rows left after filtering, before paging
    pub total: usize,
    pub columns: Vec<String>,
    pub data: Vec<Value>,
    pub offset: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DataPage {
    pub fn empty(offset: usize, limit: usize, message: impl Into<String>) -> Self {
        Self {
            total: 0,
            columns: Vec::new(),
            data: Vec::new(),
            offset,
            limit,
            message: Some(message.into()),
        }
    }
}

fn rows_with_missing_cells(dataset: &Dataset) -> impl Iterator<Item = usize> + '_ {
    dataset
        .rows()
        .enumerate()
        .filter(|(_, cells)| {
            cells.len() < dataset.column_count() || cells.iter().any(|c| is_missing(c.as_deref()))
        })
        .map(|(row, _)| row)
}

/// Filter `dataset` down to the rows selected by `filters`, then cut one page.
///
/// `changes` is the run's ledger; its row indices address `dataset` directly
/// because a pass never adds or drops rows.
pub fn data_page(dataset: &Dataset, changes: &[Change], filters: &DataFilters, offset: usize, limit: usize) -> DataPage {
    let records = dataset.to_records();

    let selected: Vec<Value> = if filters.is_active() {
        let mut rows: BTreeSet<usize> = changes
            .iter()
            .filter(|c| filters.selects(c.fix_type))
            .map(|c| c.row_index)
            .collect();
        if filters.duplicate && !filters.duplicate_columns.is_empty() {
            rows.extend(find_matching_rows(dataset, &filters.duplicate_columns));
        }
        if filters.missing_fields {
            rows.extend(rows_with_missing_cells(dataset));
        }
        rows.into_iter().filter_map(|row| records.get(row).cloned()).collect()
    } else {
        records
    };

    DataPage {
        total: selected.len(),
        columns: dataset.columns().to_vec(),
        data: selected.into_iter().skip(offset).take(limit).collect(),
        offset,
        limit,
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_csv;
    use crate::types::ChangeStatus;

    const PEOPLE: &[u8] = b"name,email,phone\n\
Ann,ann@x.com,1\n\
Bob,,2\n\
ANN ,ann@x.com,3\n\
Cy,cy@x.com,4\n\
Di,di@x.com,5\n";

    fn change(row: usize, column: &str, fix_type: FixType) -> Change {
        Change::new(row, column, Some("old"), "new".to_string(), 0.9, fix_type, ChangeStatus::NeedsReview)
    }

    fn names(page: &DataPage) -> Vec<&str> {
        page.data.iter().filter_map(|r| r["name"].as_str()).collect()
    }

    #[test]
    fn inactive_filters_return_every_row() {
        let ds = read_csv(PEOPLE).unwrap();
        let filters = DataFilters {
            duplicate_columns: vec!["name".to_string()],
            ..Default::default()
        };
        let page = data_page(&ds, &[change(3, "email", FixType::Email)], &filters, 0, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.total, 5);
        assert_eq!(page.columns, vec!["name", "email", "phone"]);
        assert_eq!(page.limit, 50);
        assert!(page.message.is_none());
    }

    #[test]
    fn a_row_matching_any_filter_is_kept() {
        let ds = read_csv(PEOPLE).unwrap();
        let changes = vec![
            change(3, "phone", FixType::Phone),
            change(4, "company", FixType::Company),
            change(4, "email", FixType::Email),
        ];

        let phone_only = DataFilters {
            phone: true,
            ..Default::default()
        };
        assert_eq!(names(&data_page(&ds, &changes, &phone_only, 0, 50)), vec!["Cy"]);

        let union = DataFilters {
            phone: true,
            unify: true,
            missing_fields: true,
            duplicate: true,
            duplicate_columns: vec!["name".to_string(), "fax".to_string()],
            ..Default::default()
        };
        let page = data_page(&ds, &changes, &union, 0, 50);
        assert_eq!(page.total, 5);
        assert_eq!(names(&page), vec!["Ann", "Bob", "ANN ", "Cy", "Di"]);

        let missing_and_dupes = DataFilters {
            missing_fields: true,
            duplicate: true,
            duplicate_columns: vec!["name".to_string()],
            ..Default::default()
        };
        assert_eq!(
            names(&data_page(&ds, &changes, &missing_and_dupes, 0, 50)),
            vec!["Ann", "Bob", "ANN "]
        );
    }

    #[test]
    fn duplicate_columns_need_the_duplicate_flag() {
        let ds = read_csv(PEOPLE).unwrap();
        let filters = DataFilters {
            email: true,
            duplicate_columns: vec!["email".to_string()],
            ..Default::default()
        };
        let page = data_page(&ds, &[], &filters, 0, 50);
        assert_eq!(page.total, 0);
        assert!(page.data.is_empty());
    }

    #[test]
    fn pages_are_cut_after_filtering() {
        let ds = read_csv(PEOPLE).unwrap();
        let filters = DataFilters {
            missing_fields: true,
            duplicate: true,
            duplicate_columns: vec!["email".to_string()],
            ..Default::default()
        };

        let first = data_page(&ds, &[], &filters, 0, 2);
        assert_eq!(first.total, 3);
        assert_eq!(names(&first), vec!["Ann", "Bob"]);

        let second = data_page(&ds, &[], &filters, 2, 2);
        assert_eq!(second.total, 3);
        assert_eq!(second.offset, 2);
        assert_eq!(names(&second), vec!["ANN "]);

        assert!(data_page(&ds, &[], &filters, 10, 2).data.is_empty());
    }
}
