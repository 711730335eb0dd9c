//! CSV participant import.
//!
//! The file needs `name` and `email` columns (any case, any position). Every
//! row is validated on its own; valid rows can be imported while the invalid
//! ones are reported with their line number.

use crate::models::{Email, EmailError, Participant};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV must contain 'name' and 'email' columns")]
    MissingColumns,

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A row ready to be added
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    pub line: u64,
    pub name: String,
    pub email: Email,
}

/// A rejected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportPlan {
    pub valid: Vec<ImportRow>,
    pub errors: Vec<RowError>,
}

/// Validate a CSV upload against the participants already registered.
pub fn plan_import(data: &[u8], existing: &[Participant]) -> Result<ImportPlan, ImportError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let column = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    };
    let (Some(name_col), Some(email_col)) = (column("name"), column("email")) else {
        return Err(ImportError::MissingColumns);
    };

    let mut seen: HashSet<Email> = existing.iter().map(|p| p.email.clone()).collect();
    let mut plan = ImportPlan::default();

    for (index, record) in reader.records().enumerate() {
        // header is line 1
        let fallback_line = index as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                plan.errors.push(RowError {
                    line: e.position().map_or(fallback_line, |p| p.line()),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, |p| p.line());
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let name = record.get(name_col).unwrap_or("").trim();
        let raw_email = record.get(email_col).unwrap_or("");

        let reject = |message: &str| RowError {
            line,
            message: message.to_string(),
        };
        if name.is_empty() {
            plan.errors.push(reject("Missing name"));
            continue;
        }
        let email = match Email::parse(raw_email) {
            Ok(email) => email,
            Err(EmailError::Missing) => {
                plan.errors.push(reject("Missing email"));
                continue;
            }
            Err(EmailError::Invalid) => {
                plan.errors.push(reject("Invalid email"));
                continue;
            }
        };
        if !seen.insert(email.clone()) {
            plan.errors.push(reject("Duplicate email"));
            continue;
        }

        plan.valid.push(ImportRow {
            line,
            name: name.to_string(),
            email,
        });
    }

    tracing::debug!(
        valid = plan.valid.len(),
        rejected = plan.errors.len(),
        "Planned participant import"
    );
    Ok(plan)
}
