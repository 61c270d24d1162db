//! CSV-backed storage for institutions and demographic counts.
//!
//! Both files are read in full on every call and rewritten in full on
//! every save. A missing data file is first seeded from the bundled
//! default of the same name, copied byte for byte.

use super::error::{StoreError, StoreResult};
use crate::analysis::status_view;
use crate::models::{
    normalize_category, Counters, DemographicRecord, Institution, InstitutionBook,
    to_non_negative_int, MunicipalityStatus, COUNTER_KEYS,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File name of the institutions table.
pub const INSTITUTIONS_FILE: &str = "dados.csv";
/// File name of the demographics table.
pub const DEMOGRAPHICS_FILE: &str = "demografia.csv";
/// File name of the municipality boundary map (served from the seed dir).
pub const GEOJSON_FILE: &str = "sc_municipios.geojson";

const INSTITUTION_HEADER: [&str; 11] = [
    "municipio",
    "regiao",
    "nome",
    "tipo",
    "endereco",
    "telefone",
    "email",
    COUNTER_KEYS[0],
    COUNTER_KEYS[1],
    COUNTER_KEYS[2],
    COUNTER_KEYS[3],
];

const DEMOGRAPHIC_HEADER: [&str; 3] = ["tipo_deficiencia", "faixa_etaria", "quantidade"];

/// One raw row of the institutions file. Missing columns read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstitutionRow {
    municipio: String,
    regiao: String,
    nome: String,
    tipo: String,
    endereco: String,
    telefone: String,
    email: String,
    quantidade_oficinas: String,
    quantidade_ta: String,
    quantidade_recursos_pedagogicos: String,
    quantidade_open_day: String,
}

/// One raw row of the demographics file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemographicRow {
    tipo_deficiencia: String,
    faixa_etaria: String,
    /// Older exports used `faixa` for the age range column.
    faixa: String,
    quantidade: String,
}

/// Everything derived while loading the institutions file.
#[derive(Debug, Clone, Default)]
pub struct InstitutionSnapshot {
    /// Institutions grouped by municipality, in file order.
    pub book: InstitutionBook,
    /// Every municipality seen, including ones with no named institution.
    pub known_municipalities: BTreeSet<String>,
    /// Derived service status for every known municipality.
    pub status_by_municipality: BTreeMap<String, MunicipalityStatus>,
    /// Counter totals, only for municipalities with named institutions.
    pub totals_by_municipality: BTreeMap<String, u64>,
    /// Last non-empty region seen per municipality.
    pub region_by_municipality: BTreeMap<String, String>,
}

/// Reads and writes the two data files inside a data directory.
#[derive(Debug, Clone)]
pub struct TabularStore {
    data_dir: PathBuf,
    seed_dir: PathBuf,
}

impl TabularStore {
    /// Create a store over `data_dir`, seeding missing files from `seed_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, seed_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            seed_dir: seed_dir.into(),
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn prepare(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn institutions_path(&self) -> PathBuf {
        self.data_dir.join(INSTITUTIONS_FILE)
    }

    pub fn demographics_path(&self) -> PathBuf {
        self.data_dir.join(DEMOGRAPHICS_FILE)
    }

    pub fn geojson_path(&self) -> PathBuf {
        self.seed_dir.join(GEOJSON_FILE)
    }

    /// Load the institutions file and derive per-municipality views.
    pub fn load_institutions(&self) -> StoreResult<InstitutionSnapshot> {
        let path = self.institutions_path();
        self.ensure_seed_file(&path, INSTITUTIONS_FILE)?;

        let mut snapshot = InstitutionSnapshot::default();
        if !path.exists() {
            debug!("No institutions file at {}, starting empty", path.display());
            return Ok(snapshot);
        }

        let mut reader = open_reader(&path)?;
        for row in reader.deserialize::<InstitutionRow>() {
            let row = row.map_err(|e| StoreError::csv(&path, e))?;

            let municipality = row.municipio.trim();
            if municipality.is_empty() {
                continue;
            }
            snapshot
                .known_municipalities
                .insert(municipality.to_string());

            let name = row.nome.trim();
            if name.is_empty() {
                continue;
            }

            let region = row.regiao.trim();
            if !region.is_empty() {
                snapshot
                    .region_by_municipality
                    .insert(municipality.to_string(), region.to_string());
            }

            let institution = Institution {
                name: name.to_string(),
                region: region.to_string(),
                category: normalize_category(&row.tipo),
                address: row.endereco.trim().to_string(),
                phone: row.telefone.trim().to_string(),
                email: row.email.trim().to_string(),
                counters: Counters::from_raw([
                    row.quantidade_oficinas.as_str(),
                    row.quantidade_ta.as_str(),
                    row.quantidade_recursos_pedagogicos.as_str(),
                    row.quantidade_open_day.as_str(),
                ]),
            };

            let total = snapshot
                .totals_by_municipality
                .entry(municipality.to_string())
                .or_insert(0);
            *total = total.saturating_add(institution.counters.total());
            snapshot.book.push(municipality, institution);
        }

        snapshot.status_by_municipality =
            status_view(&snapshot.known_municipalities, &snapshot.book);

        debug!(
            "Loaded {} institutions across {} municipalities",
            snapshot.book.institution_count(),
            snapshot.known_municipalities.len()
        );
        Ok(snapshot)
    }

    /// Load the demographics file. Rows without type or age range are skipped.
    pub fn load_demographics(&self) -> StoreResult<Vec<DemographicRecord>> {
        let path = self.demographics_path();
        self.ensure_seed_file(&path, DEMOGRAPHICS_FILE)?;

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut reader = open_reader(&path)?;
        for row in reader.deserialize::<DemographicRow>() {
            let row = row.map_err(|e| StoreError::csv(&path, e))?;

            let disability_type = row.tipo_deficiencia.trim();
            let age_range = match row.faixa_etaria.trim() {
                "" => row.faixa.trim(),
                value => value,
            };
            if disability_type.is_empty() || age_range.is_empty() {
                continue;
            }

            records.push(DemographicRecord::new(
                disability_type,
                age_range,
                to_non_negative_int(&row.quantidade, 0),
            ));
        }

        Ok(records)
    }

    /// Rewrite the institutions file from `book`.
    pub fn save_institutions(&self, book: &InstitutionBook) -> StoreResult<()> {
        let path = self.institutions_path();
        let rows = book.iter().map(|(municipality, inst)| {
            let counters = inst.counters.as_array();
            vec![
                municipality.to_string(),
                inst.region.clone(),
                inst.name.clone(),
                inst.category.clone(),
                inst.address.clone(),
                inst.phone.clone(),
                inst.email.clone(),
                counters[0].to_string(),
                counters[1].to_string(),
                counters[2].to_string(),
                counters[3].to_string(),
            ]
        });

        self.write_atomically(&path, &INSTITUTION_HEADER, rows)?;
        info!(
            "Saved {} institutions to {}",
            book.institution_count(),
            path.display()
        );
        Ok(())
    }

    /// Rewrite the demographics file from `records`.
    pub fn save_demographics(&self, records: &[DemographicRecord]) -> StoreResult<()> {
        let path = self.demographics_path();
        let rows = records.iter().map(|r| {
            vec![
                r.disability_type.clone(),
                r.age_range.clone(),
                r.count.to_string(),
            ]
        });

        self.write_atomically(&path, &DEMOGRAPHIC_HEADER, rows)?;
        info!(
            "Saved {} demographic rows to {}",
            records.len(),
            path.display()
        );
        Ok(())
    }

    /// Raw bytes of the institutions file, seeding it first.
    pub fn institutions_csv_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        let path = self.institutions_path();
        self.ensure_seed_file(&path, INSTITUTIONS_FILE)?;
        read_if_exists(&path)
    }

    /// Raw bytes of the demographics file, seeding it first.
    pub fn demographics_csv_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        let path = self.demographics_path();
        self.ensure_seed_file(&path, DEMOGRAPHICS_FILE)?;
        read_if_exists(&path)
    }

    /// Raw bytes of the bundled boundary map.
    pub fn geojson_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        read_if_exists(&self.geojson_path())
    }

    /// Copy the bundled default over `target` when `target` is missing.
    fn ensure_seed_file(&self, target: &Path, file_name: &str) -> StoreResult<()> {
        if target.exists() {
            return Ok(());
        }
        let source = self.seed_dir.join(file_name);
        if !source.exists() {
            return Ok(());
        }

        fs::copy(&source, target).map_err(|e| StoreError::io(target, e))?;
        info!("Seeded {} from {}", target.display(), source.display());
        Ok(())
    }

    /// Write a header plus rows to a temp file, then rename it over `path`.
    fn write_atomically<I>(&self, path: &Path, header: &[&str], rows: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut tmp = NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| StoreError::io(&self.data_dir, e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::CRLF)
                .from_writer(tmp.as_file_mut());
            writer
                .write_record(header)
                .map_err(|e| StoreError::csv(path, e))?;
            for row in rows {
                writer
                    .write_record(&row)
                    .map_err(|e| StoreError::csv(path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(path, e))?;
        }

        if let Some(permissions) = target_permissions(path) {
            tmp.as_file()
                .set_permissions(permissions)
                .map_err(|e| StoreError::io(path, e))?;
        }
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| StoreError::io(path, e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }
}

/// Permissions for a rewritten file: those of the file it replaces, or
/// 0644 when it is new. Temp files start out as 0600.
fn target_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn open_reader(path: &Path) -> StoreResult<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))
}

fn read_if_exists(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
