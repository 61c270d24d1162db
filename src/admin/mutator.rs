//! Applies admin form submissions to the stored collections.
//!
//! Institution writes run delete, then edit, then add, against one
//! snapshot. Rows are addressed by `{municipality}_{index}`, where the
//! index is the row's position inside its municipality. Deletions happen
//! first, so an edit field rendered for a row after a deleted one points
//! at a shifted (or vanished) position.

use super::form::{grid_field, parse_edit_key, FormFields, FormKind};
use crate::models::{
    normalize_category, to_non_negative_int, AgeRange, Category, Counters, DemographicRecord,
    Institution, InstitutionBook, COUNTER_KEYS,
};
use crate::store::{StoreResult, TabularStore};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What an institution write changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstitutionChanges {
    pub deleted: usize,
    pub edited: usize,
    pub added: bool,
}

/// Result of one admin write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Institutions(InstitutionChanges),
    Demographics { rows: usize },
    Ignored,
}

/// Build an institution from fields named `{base}{suffix}`.
///
/// A blank region falls back to the municipality's known region.
fn institution_from_fields(
    form: &FormFields,
    name: String,
    suffix: &str,
    fallback_region: &str,
) -> Institution {
    let field = |base: &str| format!("{}{}", base, suffix);

    let region = match form.text(&field("regiao")) {
        r if r.is_empty() => fallback_region.to_string(),
        r => r,
    };

    let raw: Vec<String> = COUNTER_KEYS
        .into_iter()
        .map(|key| form.get_or(&field(key), "").to_string())
        .collect();

    Institution {
        name,
        region,
        category: normalize_category(form.get_or(&field("tipo"), "")),
        address: form.text(&field("endereco")),
        phone: form.text(&field("telefone")),
        email: form.text(&field("email")),
        counters: Counters::from_raw([
            raw[0].as_str(),
            raw[1].as_str(),
            raw[2].as_str(),
            raw[3].as_str(),
        ]),
    }
}

/// Apply delete, edit and add from an institutions form, in that order.
pub fn apply_institution_form(
    book: &mut InstitutionBook,
    form: &FormFields,
    regions: &BTreeMap<String, String>,
) -> InstitutionChanges {
    let mut changes = InstitutionChanges::default();

    let deletes = form.get_all("delete");
    if !deletes.is_empty() {
        for municipality in book_municipality_names(book) {
            let Some(entry) = book.get_mut(&municipality) else {
                continue;
            };
            let before = entry.institutions.len();
            let mut index = 0;
            entry.institutions.retain(|_| {
                let marker = format!("{}_{}", municipality, index);
                index += 1;
                !deletes.contains(&marker.as_str())
            });
            changes.deleted += before - entry.institutions.len();
        }
    }

    for key in form.keys() {
        let Some((municipality, index)) = parse_edit_key(key) else {
            continue;
        };
        let fallback = regions.get(municipality).map(String::as_str).unwrap_or("");
        let Some(entry) = book.get_mut(municipality) else {
            debug!("Ignoring edit for unknown municipality {}", municipality);
            continue;
        };
        if index >= entry.institutions.len() {
            debug!("Ignoring edit for {} index {} (out of range)", municipality, index);
            continue;
        }

        let suffix = format!("_{}_{}", municipality, index);
        let name = form.text(key);
        entry.institutions[index] = institution_from_fields(form, name, &suffix, fallback);
        changes.edited += 1;
    }

    if form.is_set("add") {
        let municipality = form.text("municipio");
        if !municipality.is_empty() {
            let fallback = regions.get(&municipality).map(String::as_str).unwrap_or("");
            let institution = institution_from_fields(form, form.text("nome"), "", fallback);
            book.push(&municipality, institution);
            changes.added = true;
        }
    }

    changes
}

fn book_municipality_names(book: &InstitutionBook) -> Vec<String> {
    book.municipalities().iter().map(|m| m.name.clone()).collect()
}

/// Rebuild the full demographic grid from a demographics form.
///
/// Missing cells read as zero. The result replaces the whole file.
pub fn demographic_rows_from_form(form: &FormFields) -> Vec<DemographicRecord> {
    let mut rows = Vec::with_capacity(Category::ALL.len() * AgeRange::ALL.len());
    for category in Category::ALL {
        for range in AgeRange::ALL {
            let raw = form.get_or(&grid_field(category.as_str(), range.as_str()), "0");
            rows.push(DemographicRecord::new(
                category.as_str(),
                range.as_str(),
                to_non_negative_int(raw, 0),
            ));
        }
    }
    rows
}

/// Load, mutate and persist according to one admin submission.
pub fn apply_admin_write(store: &TabularStore, form: &FormFields) -> StoreResult<WriteOutcome> {
    match form.kind() {
        FormKind::Institutions => {
            let mut snapshot = store.load_institutions()?;
            let changes =
                apply_institution_form(&mut snapshot.book, form, &snapshot.region_by_municipality);
            store.save_institutions(&snapshot.book)?;
            info!(
                "Institutions updated: {} deleted, {} edited, added: {}",
                changes.deleted, changes.edited, changes.added
            );
            Ok(WriteOutcome::Institutions(changes))
        }
        FormKind::Demographics => {
            let rows = demographic_rows_from_form(form);
            store.save_demographics(&rows)?;
            info!("Demographics replaced with {} rows", rows.len());
            Ok(WriteOutcome::Demographics { rows: rows.len() })
        }
        FormKind::Unknown => {
            debug!("Admin submission without a known form_type; nothing to do");
            Ok(WriteOutcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn named(name: &str) -> Institution {
        Institution {
            name: name.to_string(),
            region: "Serra".to_string(),
            category: "Todos".to_string(),
            ..Default::default()
        }
    }

    fn book_with_three() -> InstitutionBook {
        let mut book = InstitutionBook::new();
        book.push("X", named("A"));
        book.push("X", named("B"));
        book.push("X", named("C"));
        book.push("Y", named("D"));
        book
    }

    fn names(book: &InstitutionBook, municipality: &str) -> Vec<String> {
        book.get(municipality)
            .map(|m| m.institutions.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_delete_shifts_later_indices() {
        let mut book = book_with_three();
        let form: FormFields = [("form_type", "instituicoes"), ("delete", "X_1")]
            .into_iter()
            .collect();

        let changes = apply_institution_form(&mut book, &form, &BTreeMap::new());

        assert_eq!(changes.deleted, 1);
        assert_eq!(names(&book, "X"), vec!["A", "C"]);
        assert_eq!(names(&book, "Y"), vec!["D"]);
    }

    #[test]
    fn test_stale_index_after_delete_is_ignored() {
        let mut book = book_with_three();
        // The page was rendered before the delete: C was X_2.
        let form: FormFields = [
            ("delete", "X_1"),
            ("nome_X_2", "C renamed"),
            ("nome_X_0", "A renamed"),
        ]
        .into_iter()
        .collect();

        let changes = apply_institution_form(&mut book, &form, &BTreeMap::new());

        assert_eq!(changes.edited, 1);
        assert_eq!(names(&book, "X"), vec!["A renamed", "C"]);
    }

    #[test]
    fn test_edit_overwrites_all_fields() {
        let mut book = book_with_three();
        let mut regions = BTreeMap::new();
        regions.insert("X".to_string(), "Oeste".to_string());

        let form: FormFields = [
            ("nome_X_1", " Novo Nome "),
            ("regiao_X_1", ""),
            ("tipo_X_1", "ambos"),
            ("endereco_X_1", "Rua 1"),
            ("telefone_X_1", "4899"),
            ("email_X_1", "b@x.org"),
            ("quantidade_oficinas_X_1", "3"),
            ("quantidade_ta_X_1", "-2"),
            ("quantidade_recursos_pedagogicos_X_1", "x"),
        ]
        .into_iter()
        .collect();

        apply_institution_form(&mut book, &form, &regions);

        let edited = &book.get("X").unwrap().institutions[1];
        assert_eq!(edited.name, "Novo Nome");
        assert_eq!(edited.region, "Oeste");
        assert_eq!(edited.category, "Todos");
        assert_eq!(edited.address, "Rua 1");
        assert_eq!(edited.phone, "4899");
        assert_eq!(edited.email, "b@x.org");
        assert_eq!(edited.counters.as_array(), [3, 0, 0, 0]);
    }

    #[test]
    fn test_edit_for_unknown_rows_is_ignored() {
        let mut book = book_with_three();
        let before = book.clone();
        let form: FormFields = [("nome_Z_0", "ghost"), ("nome_Y_5", "ghost"), ("nome_Y_x", "ghost")]
            .into_iter()
            .collect();

        let changes = apply_institution_form(&mut book, &form, &BTreeMap::new());

        assert_eq!(changes, InstitutionChanges::default());
        assert_eq!(book, before);
    }

    #[test]
    fn test_add_normalizes_counters() {
        let mut book = book_with_three();
        let mut regions = BTreeMap::new();
        regions.insert("Lages".to_string(), "Serra".to_string());

        let form: FormFields = [
            ("add", "1"),
            ("municipio", " Lages "),
            ("nome", "APAE"),
            ("tipo", "Oficinas"),
            ("quantidade_oficinas", "abc"),
            ("quantidade_open_day", "4"),
        ]
        .into_iter()
        .collect();

        let changes = apply_institution_form(&mut book, &form, &regions);

        assert!(changes.added);
        let added = &book.get("Lages").unwrap().institutions[0];
        assert_eq!(added.name, "APAE");
        assert_eq!(added.region, "Serra");
        assert_eq!(added.counters.as_array(), [0, 0, 0, 4]);
    }

    #[test]
    fn test_add_requires_flag_and_municipality() {
        let mut book = InstitutionBook::new();
        let form: FormFields = [("municipio", "Lages"), ("nome", "APAE")].into_iter().collect();
        assert!(!apply_institution_form(&mut book, &form, &BTreeMap::new()).added);

        let form: FormFields = [("add", "1"), ("municipio", "  "), ("nome", "APAE")]
            .into_iter()
            .collect();
        assert!(!apply_institution_form(&mut book, &form, &BTreeMap::new()).added);
        assert_eq!(book.institution_count(), 0);
    }

    #[test]
    fn test_demographic_rows_from_form() {
        let form: FormFields = [
            ("demografia[Oficinas][0-12]", "5"),
            ("demografia[Open Day][60+]", "-1"),
            ("demografia[Todos][13-17]", "abc"),
        ]
        .into_iter()
        .collect();

        let rows = demographic_rows_from_form(&form);

        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0], DemographicRecord::new("Todos", "0-12", 0));
        assert!(rows.contains(&DemographicRecord::new("Oficinas", "0-12", 5)));
        assert!(rows.contains(&DemographicRecord::new("Open Day", "60+", 0)));
        assert_eq!(rows.iter().map(|r| r.count).sum::<u64>(), 5);
    }

    #[test]
    fn test_admin_add_persists_zero_for_bad_counter() {
        let dir = TempDir::new().unwrap();
        let store = TabularStore::new(dir.path(), dir.path());
        let form: FormFields = [
            ("form_type", "instituicoes"),
            ("add", "1"),
            ("municipio", "Lages"),
            ("nome", "APAE Lages"),
            ("quantidade_oficinas", "abc"),
        ]
        .into_iter()
        .collect();

        let outcome = apply_admin_write(&store, &form).unwrap();
        assert!(matches!(outcome, WriteOutcome::Institutions(c) if c.added));

        let written = fs::read_to_string(store.institutions_path()).unwrap();
        assert!(written.contains("Lages,,APAE Lages,,,,,0,0,0,0"));
    }

    #[test]
    fn test_demographic_write_drops_out_of_grid_rows() {
        let dir = TempDir::new().unwrap();
        let store = TabularStore::new(dir.path(), dir.path());
        fs::write(
            store.demographics_path(),
            "tipo_deficiencia,faixa_etaria,quantidade\nVisual,0-12,40\n",
        )
        .unwrap();

        let form: FormFields = [("form_type", "demografia"), ("demografia[Oficinas][18-59]", "7")]
            .into_iter()
            .collect();
        let outcome = apply_admin_write(&store, &form).unwrap();
        assert_eq!(outcome, WriteOutcome::Demographics { rows: 16 });

        let records = store.load_demographics().unwrap();
        assert_eq!(records.len(), 16);
        assert!(records.iter().all(|r| r.disability_type != "Visual"));
        assert!(records.contains(&DemographicRecord::new("Oficinas", "18-59", 7)));
    }

    #[test]
    fn test_unknown_form_type_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = TabularStore::new(dir.path(), dir.path());
        let form: FormFields = [("add", "1"), ("municipio", "Lages")].into_iter().collect();

        assert_eq!(apply_admin_write(&store, &form).unwrap(), WriteOutcome::Ignored);
        assert!(!store.institutions_path().exists());
    }
}
