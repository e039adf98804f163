//! CSV customer ingest
//!
//! Parses a headed CSV export of the customer table into typed records.
//! Header matching is case-insensitive and ignores underscores, so
//! `MonthlyCharges`, `monthlycharges`, and `monthly_charges` all resolve
//! to the same column.

use anyhow::{Context, Result};
use churnml_types::{CustomerRecord, DataError};
use std::path::Path;

const TENURE: &str = "tenure";
const MONTHLY_CHARGES: &str = "monthlycharges";
const TOTAL_CHARGES: &str = "totalcharges";
const SENIOR_CITIZEN: &str = "seniorcitizen";
const CHURN: &str = "churn";

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect::<String>()
        .to_lowercase()
}

struct ColumnMap {
    tenure: usize,
    monthly_charges: usize,
    total_charges: usize,
    senior_citizen: usize,
    churn: usize,
}

impl ColumnMap {
    fn from_header(header: &str) -> Result<Self, DataError> {
        let names: Vec<String> = header.split(',').map(normalize).collect();
        let position = |wanted: &str| -> Result<usize, DataError> {
            names
                .iter()
                .position(|name| name == wanted)
                .ok_or_else(|| DataError::MissingColumn(wanted.to_string()))
        };

        Ok(Self {
            tenure: position(TENURE)?,
            monthly_charges: position(MONTHLY_CHARGES)?,
            total_charges: position(TOTAL_CHARGES)?,
            senior_citizen: position(SENIOR_CITIZEN)?,
            churn: position(CHURN)?,
        })
    }
}

/// Load customer records from a CSV file with a header row.
pub fn read_customers_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CustomerRecord>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read {}", path.as_ref().display()))?;

    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines.next().ok_or(DataError::Empty)?;
    let columns = ColumnMap::from_header(header)?;

    let mut records = Vec::new();
    for (row, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        records.push(parse_row(row, &fields, &columns)?);
    }

    if records.is_empty() {
        return Err(DataError::Empty.into());
    }

    Ok(records)
}

fn parse_row(row: usize, fields: &[&str], columns: &ColumnMap) -> Result<CustomerRecord, DataError> {
    let field = |index: usize, column: &str| -> Result<&str, DataError> {
        fields.get(index).copied().ok_or_else(|| DataError::InvalidValue {
            row,
            column: column.to_string(),
            value: "<absent>".to_string(),
        })
    };

    let invalid = |column: &str, value: &str| DataError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    };

    let tenure_raw = field(columns.tenure, TENURE)?;
    let tenure = tenure_raw
        .parse::<u32>()
        .map_err(|_| invalid(TENURE, tenure_raw))?;

    let monthly_raw = field(columns.monthly_charges, MONTHLY_CHARGES)?;
    let monthly_charges = monthly_raw
        .parse::<f64>()
        .map_err(|_| invalid(MONTHLY_CHARGES, monthly_raw))?;

    let total_raw = field(columns.total_charges, TOTAL_CHARGES)?;
    let total_charges = total_raw
        .parse::<f64>()
        .map_err(|_| invalid(TOTAL_CHARGES, total_raw))?;

    let senior_raw = field(columns.senior_citizen, SENIOR_CITIZEN)?;
    let senior_citizen = match senior_raw {
        "0" | "false" | "False" => false,
        "1" | "true" | "True" => true,
        other => return Err(invalid(SENIOR_CITIZEN, other)),
    };

    let churn = field(columns.churn, CHURN)?.to_string();

    Ok(CustomerRecord {
        tenure,
        monthly_charges,
        total_charges,
        senior_citizen,
        churn,
    })
}
