//! Offline dashboard summaries.

pub mod generator;

pub use generator::*;

use crate::analysis::{build_dashboard, Dashboard};
use crate::models::DemographicRecord;
use crate::store::InstitutionSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a generated summary.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// When the summary was generated.
    pub generated_at: DateTime<Utc>,
    /// Directory the data files were read from.
    pub data_dir: String,
    pub institutions: usize,
    pub municipalities: usize,
    pub demographic_rows: usize,
}

/// A dashboard snapshot written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub dashboard: Dashboard,
}

impl Report {
    /// Build a report from freshly loaded data.
    pub fn build(
        snapshot: &InstitutionSnapshot,
        records: &[DemographicRecord],
        data_dir: &str,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                data_dir: data_dir.to_string(),
                institutions: snapshot.book.institution_count(),
                municipalities: snapshot.known_municipalities.len(),
                demographic_rows: records.len(),
            },
            dashboard: build_dashboard(snapshot, records),
        }
    }
}
