//! Counter aggregation and statistics.
//!
//! This module derives the dashboard views from loaded institutions and
//! demographic records: status per municipality, totals per counter,
//! region and municipality, and the demographic cross-tabulations.

use crate::models::{
    AgeRange, Category, Counters, DemographicRecord, InstitutionBook, MunicipalityStatus,
};
use crate::store::InstitutionSnapshot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Region spellings that mean "not informed", already accent-folded.
const PLACEHOLDER_REGIONS: [&str; 2] = ["nao informada", "nao informado"];

/// Totals of each counter across every institution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    #[serde(rename = "oficinas")]
    pub workshops: u64,
    #[serde(rename = "ta")]
    pub assistive_tech: u64,
    #[serde(rename = "recursos_pedagogicos")]
    pub pedagogical: u64,
    pub open_day: u64,
    #[serde(rename = "total_geral")]
    pub grand_total: u64,
}

/// Totals per counter and per region, as shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstitutionSummary {
    #[serde(rename = "totais")]
    pub totals: CategoryTotals,
    #[serde(rename = "regioes")]
    pub regions: BTreeMap<String, u64>,
}

/// Per-municipality rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MunicipalitySummary {
    #[serde(rename = "regiao")]
    pub region: String,
    #[serde(rename = "instituicoes")]
    pub institutions: usize,
    #[serde(flatten)]
    pub counters: Counters,
}

/// Disability type × age range distribution for the public dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemographicDistribution {
    #[serde(rename = "faixas")]
    pub age_ranges: Vec<AgeRange>,
    #[serde(rename = "tipos")]
    pub types: Vec<String>,
    pub data: BTreeMap<String, BTreeMap<AgeRange, u64>>,
    pub total: u64,
}

/// Fixed 4×4 grid of admin categories × age ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditGrid {
    cells: [[u64; 4]; 4],
}

impl EditGrid {
    pub fn get(&self, category: Category, range: AgeRange) -> u64 {
        self.cells[category_index(category)][range_index(range)]
    }
}

fn category_index(category: Category) -> usize {
    Category::ALL
        .iter()
        .position(|c| *c == category)
        .unwrap_or_default()
}

fn range_index(range: AgeRange) -> usize {
    AgeRange::ALL
        .iter()
        .position(|r| *r == range)
        .unwrap_or_default()
}

/// Fold the accented letters used in Portuguese to their ASCII base.
fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Whether a region is blank or one of the "not informed" placeholders.
pub fn is_unreported_region(region: &str) -> bool {
    let region = region.trim();
    if region.is_empty() {
        return true;
    }
    let folded = fold_accents(&region.to_lowercase());
    PLACEHOLDER_REGIONS.contains(&folded.as_str())
}

/// Service status for every known municipality.
///
/// Municipalities without institutions in `book` report no services.
pub fn status_view(
    known: &BTreeSet<String>,
    book: &InstitutionBook,
) -> BTreeMap<String, MunicipalityStatus> {
    known
        .iter()
        .map(|name| {
            let total = book
                .get(name)
                .map(|m| {
                    m.institutions
                        .iter()
                        .fold(0u64, |acc, i| acc.saturating_add(i.counters.total()))
                })
                .unwrap_or(0);
            (name.clone(), MunicipalityStatus::from_total(total))
        })
        .collect()
}

/// Sum each counter across every institution.
pub fn category_totals(book: &InstitutionBook) -> CategoryTotals {
    let mut sums = Counters::default();
    for (_, inst) in book.iter() {
        sums.add(&inst.counters);
    }

    CategoryTotals {
        workshops: sums.workshops,
        assistive_tech: sums.assistive_tech,
        pedagogical: sums.pedagogical,
        open_day: sums.open_day,
        grand_total: sums.total(),
    }
}

/// Sum each institution's counter total into its region.
///
/// Blank and placeholder regions are left out.
pub fn region_totals(book: &InstitutionBook) -> BTreeMap<String, u64> {
    let mut regions: BTreeMap<String, u64> = BTreeMap::new();

    for (_, inst) in book.iter() {
        if is_unreported_region(&inst.region) {
            continue;
        }
        let total = regions.entry(inst.region.trim().to_string()).or_default();
        *total = total.saturating_add(inst.counters.total());
    }

    regions
}

/// Counter and region totals for the dashboard.
pub fn summarize_institutions(book: &InstitutionBook) -> InstitutionSummary {
    InstitutionSummary {
        totals: category_totals(book),
        regions: region_totals(book),
    }
}

/// Institution count, counter sums and region for each municipality.
///
/// When institutions disagree on the region, the last non-blank one wins.
pub fn municipality_summaries(book: &InstitutionBook) -> BTreeMap<String, MunicipalitySummary> {
    book.municipalities()
        .iter()
        .map(|m| {
            let mut summary = MunicipalitySummary {
                institutions: m.institutions.len(),
                ..Default::default()
            };
            for inst in &m.institutions {
                if !inst.region.is_empty() {
                    summary.region = inst.region.clone();
                }
                summary.counters.add(&inst.counters);
            }
            (m.name.clone(), summary)
        })
        .collect()
}

/// Build the public disability type × age range distribution.
///
/// Types are every distinct type seen, sorted. Age ranges outside the
/// fixed set are dropped and do not count toward the total.
pub fn demographic_distribution(records: &[DemographicRecord]) -> DemographicDistribution {
    let types: Vec<String> = records
        .iter()
        .map(|r| r.disability_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut data: BTreeMap<String, BTreeMap<AgeRange, u64>> = types
        .iter()
        .map(|t| (t.clone(), AgeRange::ALL.iter().map(|r| (*r, 0)).collect()))
        .collect();

    let mut total = 0u64;
    for record in records {
        let Some(range) = AgeRange::from_label(&record.age_range) else {
            continue;
        };
        if let Some(row) = data.get_mut(&record.disability_type) {
            let cell = row.entry(range).or_default();
            *cell = cell.saturating_add(record.count);
            total = total.saturating_add(record.count);
        }
    }

    DemographicDistribution {
        age_ranges: AgeRange::ALL.to_vec(),
        types,
        data,
        total,
    }
}

/// Build the admin edit grid. Records outside the fixed sets are ignored.
pub fn edit_grid(records: &[DemographicRecord]) -> EditGrid {
    let mut grid = EditGrid::default();

    for record in records {
        let (Some(category), Some(range)) = (
            Category::from_label(&record.disability_type),
            AgeRange::from_label(&record.age_range),
        ) else {
            continue;
        };
        let cell = &mut grid.cells[category_index(category)][range_index(range)];
        *cell = cell.saturating_add(record.count);
    }

    grid
}

/// Count municipalities per status.
pub fn status_counts(
    status: &BTreeMap<String, MunicipalityStatus>,
) -> BTreeMap<MunicipalityStatus, usize> {
    let mut counts = BTreeMap::new();
    for value in status.values() {
        *counts.entry(*value).or_default() += 1;
    }
    counts
}

/// Every view shown on the public dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    #[serde(rename = "municipiosStatus")]
    pub status: BTreeMap<String, MunicipalityStatus>,
    #[serde(rename = "municipiosTotais")]
    pub totals_by_municipality: BTreeMap<String, u64>,
    #[serde(rename = "municipio_regiao")]
    pub region_by_municipality: BTreeMap<String, String>,
    #[serde(rename = "status_contagem")]
    pub status_counts: BTreeMap<MunicipalityStatus, usize>,
    #[serde(rename = "instituicoes_resumo")]
    pub summary: InstitutionSummary,
    #[serde(rename = "municipios_resumo")]
    pub municipalities: BTreeMap<String, MunicipalitySummary>,
    #[serde(rename = "demografia_distribuicao")]
    pub demographics: DemographicDistribution,
}

/// Derive every dashboard view from freshly loaded data.
pub fn build_dashboard(snapshot: &InstitutionSnapshot, records: &[DemographicRecord]) -> Dashboard {
    Dashboard {
        status: snapshot.status_by_municipality.clone(),
        totals_by_municipality: snapshot.totals_by_municipality.clone(),
        region_by_municipality: snapshot.region_by_municipality.clone(),
        status_counts: status_counts(&snapshot.status_by_municipality),
        summary: summarize_institutions(&snapshot.book),
        municipalities: municipality_summaries(&snapshot.book),
        demographics: demographic_distribution(records),
    }
}
