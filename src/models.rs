//! Data models for the outreach dashboard.
//!
//! This module contains the core records (institutions, demographic
//! counts) and the small fixed vocabularies the admin panel edits with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CSV column names for the four service counters, in file order.
pub const COUNTER_KEYS: [&str; 4] = [
    "quantidade_oficinas",
    "quantidade_ta",
    "quantidade_recursos_pedagogicos",
    "quantidade_open_day",
];

/// Human labels for the counters, same order as [`COUNTER_KEYS`].
pub const COUNTER_LABELS: [&str; 4] = [
    "Qt Oficinas",
    "Qt Recursos de TA",
    "Qt Recursos Pedagógicos",
    "Qt Open Day",
];

/// Region choices offered by the admin form.
pub const REGION_OPTIONS: [&str; 6] = [
    "Grande Florianópolis",
    "Sul",
    "Norte",
    "Vale do Itajaí",
    "Serra",
    "Oeste",
];

/// Parse a loosely formatted integer, never failing.
///
/// Empty input yields `default`, unparseable input yields `default`,
/// and negative values are clamped to zero.
pub fn to_non_negative_int(value: &str, default: u64) -> u64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse::<i64>() {
        Ok(n) if n < 0 => 0,
        Ok(n) => n as u64,
        Err(_) => default,
    }
}

/// Normalize an institution category.
///
/// The legacy value "Ambos" (any case) became "Todos"; everything else is
/// kept as trimmed text.
pub fn normalize_category(value: &str) -> String {
    let category = value.trim();
    if category.eq_ignore_ascii_case("ambos") {
        return Category::All.as_str().to_string();
    }
    category.to_string()
}

/// Category of service offering, as edited by the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Every kind of service.
    #[serde(rename = "Todos")]
    All,
    /// Workshops.
    #[serde(rename = "Oficinas")]
    Workshops,
    /// Assistive-technology resources.
    #[serde(rename = "Recursos de TA")]
    AssistiveTech,
    /// Open-day events.
    #[serde(rename = "Open Day")]
    OpenDay,
}

impl Category {
    /// All admin categories, in display order.
    pub const ALL: [Category; 4] = [
        Category::All,
        Category::Workshops,
        Category::AssistiveTech,
        Category::OpenDay,
    ];

    /// The label stored in the CSV files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "Todos",
            Category::Workshops => "Oficinas",
            Category::AssistiveTech => "Recursos de TA",
            Category::OpenDay => "Open Day",
        }
    }

    /// Look up an admin category by its stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label.trim())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age range of a demographic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "0-12")]
    Child,
    #[serde(rename = "13-17")]
    Teen,
    #[serde(rename = "18-59")]
    Adult,
    #[serde(rename = "60+")]
    Senior,
}

impl AgeRange {
    /// The fixed, ordered set of age ranges.
    pub const ALL: [AgeRange; 4] = [
        AgeRange::Child,
        AgeRange::Teen,
        AgeRange::Adult,
        AgeRange::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::Child => "0-12",
            AgeRange::Teen => "13-17",
            AgeRange::Adult => "18-59",
            AgeRange::Senior => "60+",
        }
    }

    /// Parse a stored label; anything outside the fixed set is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == label.trim())
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four service tallies kept per institution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Workshops delivered.
    #[serde(rename = "quantidade_oficinas")]
    pub workshops: u64,
    /// Assistive-technology resources.
    #[serde(rename = "quantidade_ta")]
    pub assistive_tech: u64,
    /// Pedagogical resources.
    #[serde(rename = "quantidade_recursos_pedagogicos")]
    pub pedagogical: u64,
    /// Open-day events.
    #[serde(rename = "quantidade_open_day")]
    pub open_day: u64,
}

impl Counters {
    /// Build counters from raw strings in [`COUNTER_KEYS`] order.
    pub fn from_raw(values: [&str; 4]) -> Self {
        Self {
            workshops: to_non_negative_int(values[0], 0),
            assistive_tech: to_non_negative_int(values[1], 0),
            pedagogical: to_non_negative_int(values[2], 0),
            open_day: to_non_negative_int(values[3], 0),
        }
    }

    /// Values in [`COUNTER_KEYS`] order.
    pub fn as_array(&self) -> [u64; 4] {
        [
            self.workshops,
            self.assistive_tech,
            self.pedagogical,
            self.open_day,
        ]
    }

    /// Sum of all four counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.as_array().iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Accumulate another set of counters into this one.
    pub fn add(&mut self, other: &Counters) {
        self.workshops = self.workshops.saturating_add(other.workshops);
        self.assistive_tech = self.assistive_tech.saturating_add(other.assistive_tech);
        self.pedagogical = self.pedagogical.saturating_add(other.pedagogical);
        self.open_day = self.open_day.saturating_add(other.open_day);
    }
}

/// A participating institution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub name: String,
    pub region: String,
    pub category: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub counters: Counters,
}

/// One municipality and its institutions, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    pub institutions: Vec<Institution>,
}

/// Institutions grouped by municipality, preserving first-seen order.
///
/// The position of an institution inside its municipality is its identity
/// for the admin form; there is no other key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionBook {
    municipalities: Vec<Municipality>,
}

impl InstitutionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Municipalities in insertion order.
    pub fn municipalities(&self) -> &[Municipality] {
        &self.municipalities
    }

    pub fn get(&self, municipality: &str) -> Option<&Municipality> {
        self.municipalities.iter().find(|m| m.name == municipality)
    }

    pub fn get_mut(&mut self, municipality: &str) -> Option<&mut Municipality> {
        self.municipalities
            .iter_mut()
            .find(|m| m.name == municipality)
    }

    /// Get a municipality, creating an empty one at the end if unknown.
    pub fn entry(&mut self, municipality: &str) -> &mut Municipality {
        let pos = match self
            .municipalities
            .iter()
            .position(|m| m.name == municipality)
        {
            Some(pos) => pos,
            None => {
                self.municipalities.push(Municipality {
                    name: municipality.to_string(),
                    institutions: Vec::new(),
                });
                self.municipalities.len() - 1
            }
        };
        &mut self.municipalities[pos]
    }

    /// Append an institution to a municipality.
    pub fn push(&mut self, municipality: &str, institution: Institution) {
        self.entry(municipality).institutions.push(institution);
    }

    /// Iterate `(municipality, institution)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Institution)> {
        self.municipalities.iter().flat_map(|m| {
            m.institutions
                .iter()
                .map(move |inst| (m.name.as_str(), inst))
        })
    }

    /// Total number of institutions across all municipalities.
    pub fn institution_count(&self) -> usize {
        self.municipalities.iter().map(|m| m.institutions.len()).sum()
    }
}

/// A count of people served, by disability type and age range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub disability_type: String,
    pub age_range: String,
    pub count: u64,
}

impl DemographicRecord {
    pub fn new(disability_type: &str, age_range: &str, count: u64) -> Self {
        Self {
            disability_type: disability_type.to_string(),
            age_range: age_range.to_string(),
            count,
        }
    }
}

/// Derived service status of a municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MunicipalityStatus {
    /// At least one counter is positive.
    #[serde(rename = "Com capacitações/recursos")]
    WithServices,
    /// Every counter is zero, or there are no institutions.
    #[serde(rename = "Nenhum")]
    NoServices,
}

impl MunicipalityStatus {
    pub fn from_total(total: u64) -> Self {
        if total > 0 {
            MunicipalityStatus::WithServices
        } else {
            MunicipalityStatus::NoServices
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MunicipalityStatus::WithServices => "Com capacitações/recursos",
            MunicipalityStatus::NoServices => "Nenhum",
        }
    }
}

impl fmt::Display for MunicipalityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
