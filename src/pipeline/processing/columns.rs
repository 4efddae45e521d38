use serde::{Deserialize, Serialize};

use crate::config::ColumnKeywords;

/// Which actual column plays each semantic role, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub company: Option<String>,
    pub domain: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
    /// Only used to build the fallback duplicate key
    pub person_name: Option<String>,
}

fn first_containing(columns: &[String], keywords: &[String]) -> Option<String> {
    columns
        .iter()
        .find(|c| {
            let lowered = c.to_lowercase();
            keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
        })
        .cloned()
}

/// Resolve roles from header names alone. The first column (in header order)
/// containing any keyword of a role claims it; a column may serve several roles.
pub fn resolve_roles(columns: &[String], keywords: &ColumnKeywords) -> ColumnRoles {
    let person_name = columns
        .iter()
        .find(|c| {
            let lowered = c.to_lowercase();
            lowered.contains("name") && !lowered.contains("company")
        })
        .cloned();

    ColumnRoles {
        company: first_containing(columns, &keywords.company),
        domain: first_containing(columns, &keywords.domain),
        phone: first_containing(columns, &keywords.phone),
        email: first_containing(columns, &keywords.email),
        job_title: first_containing(columns, &keywords.job_title),
        person_name,
    }
}
