//! Catalog schema and CSV ingestion using Polars

use polars::prelude::*;

use crate::error::{Error, Result};

/// Expected header of the operator-name column.
pub const OPERATOR: &str = "Operator";
/// Expected header of the price column, in currency units.
pub const PRICE: &str = "Price";
/// Expected header of the main-quota column.
pub const MAIN_QUOTA: &str = "Main Quota (GB)";
/// Expected header of the validity-period column.
pub const VALIDITY: &str = "Validity (Days)";
/// Expected header of the bundled-app-quota column.
pub const APP_QUOTA: &str = "App Quota (GB)";
/// Expected header of the fair-usage-policy threshold column.
pub const FUP: &str = "FUP (GB)";

/// One product offer as advertised by an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    /// Operator selling the offer.
    pub operator: String,
    /// Price in currency units.
    pub price: f64,
    /// Primary data quota in GB; 0 for uncapped offers.
    pub main_quota_gb: f64,
    /// Validity period in days.
    pub validity_days: f64,
    /// Dedicated app quota in GB; 0 when the offer bundles no apps.
    pub app_quota_gb: f64,
    /// Fair-usage-policy threshold in GB; 0 for capped offers.
    pub fup_gb: f64,
}

/// Load a product catalog from a CSV file with the fixed schema.
///
/// Missing numeric cells read as 0; a missing column is an error.
pub fn load_catalog(path: &str) -> Result<Vec<CatalogRecord>> {
    let df = CsvReader::from_path(path)?.has_header(true).finish()?;
    from_dataframe(&df)
}

/// Convert an already-parsed table into catalog records.
///
/// This is the seam for callers that load the snapshot themselves.
pub fn from_dataframe(df: &DataFrame) -> Result<Vec<CatalogRecord>> {
    let operators = string_column(df, OPERATOR)?;
    let prices = numeric_column(df, PRICE)?;
    let main_quotas = numeric_column(df, MAIN_QUOTA)?;
    let validities = numeric_column(df, VALIDITY)?;
    let app_quotas = numeric_column(df, APP_QUOTA)?;
    let fups = numeric_column(df, FUP)?;

    let records = (0..df.height())
        .map(|i| CatalogRecord {
            operator: operators[i].clone(),
            price: prices[i],
            main_quota_gb: main_quotas[i],
            validity_days: validities[i],
            app_quota_gb: app_quotas[i],
            fup_gb: fups[i],
        })
        .collect();

    Ok(records)
}

fn string_column(df: &DataFrame, name: &'static str) -> Result<Vec<String>> {
    let series = df.column(name).map_err(|_| Error::MissingColumn(name))?;
    Ok(series
        .utf8()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

fn numeric_column(df: &DataFrame, name: &'static str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| Error::MissingColumn(name))?
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}
