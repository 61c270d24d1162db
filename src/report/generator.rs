//! Markdown and JSON summary generation.
//!
//! This module renders a [`Report`] for sharing outside the web panel.

use super::{Report, ReportMetadata};
use crate::analysis::{CategoryTotals, DemographicDistribution, MunicipalitySummary};
use crate::models::{MunicipalityStatus, COUNTER_LABELS};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Generate a complete Markdown summary.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Painel CERTA - Resumo\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_status_section(&report.dashboard.status_counts));
    output.push_str(&generate_totals_section(&report.dashboard.summary.totals));
    output.push_str(&generate_regions_section(&report.dashboard.summary.regions));
    output.push_str(&generate_municipalities_section(
        &report.dashboard.status,
        &report.dashboard.municipalities,
    ));
    output.push_str(&generate_demographics_section(&report.dashboard.demographics));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadados\n\n");
    section.push_str(&format!(
        "- **Gerado em:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Diretório de dados:** `{}`\n", metadata.data_dir));
    section.push_str(&format!("- **Instituições:** {}\n", metadata.institutions));
    section.push_str(&format!("- **Municípios:** {}\n", metadata.municipalities));
    section.push_str(&format!(
        "- **Registros demográficos:** {}\n\n",
        metadata.demographic_rows
    ));

    section
}

fn generate_status_section(counts: &BTreeMap<MunicipalityStatus, usize>) -> String {
    let mut section = String::new();

    section.push_str("## Situação dos municípios\n\n");
    section.push_str("| Situação | Municípios |\n");
    section.push_str("|:---|:---:|\n");
    for (status, count) in counts {
        section.push_str(&format!("| {} | {} |\n", status, count));
    }
    section.push('\n');

    section
}

fn generate_totals_section(totals: &CategoryTotals) -> String {
    let mut section = String::new();

    section.push_str("## Totais\n\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **Total** |\n",
        COUNTER_LABELS[0], COUNTER_LABELS[1], COUNTER_LABELS[2], COUNTER_LABELS[3]
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        totals.workshops,
        totals.assistive_tech,
        totals.pedagogical,
        totals.open_day,
        totals.grand_total
    ));

    section
}

fn generate_regions_section(regions: &BTreeMap<String, u64>) -> String {
    let mut section = String::new();

    section.push_str("## Por região\n\n");
    if regions.is_empty() {
        section.push_str("Nenhuma região informada.\n\n");
        return section;
    }

    section.push_str("| Região | Total |\n");
    section.push_str("|:---|:---:|\n");

    let mut sorted: Vec<_> = regions.iter().collect();
    sorted.sort_by_key(|(_, total)| std::cmp::Reverse(**total));
    for (region, total) in sorted {
        section.push_str(&format!("| {} | {} |\n", region, total));
    }
    section.push('\n');

    section
}

fn generate_municipalities_section(
    status: &BTreeMap<String, MunicipalityStatus>,
    summaries: &BTreeMap<String, MunicipalitySummary>,
) -> String {
    let mut section = String::new();

    section.push_str("## Municípios\n\n");
    section.push_str("| Município | Região | Situação | Instituições | Total |\n");
    section.push_str("|:---|:---|:---|:---:|:---:|\n");

    for (name, state) in status {
        let (region, institutions, total) = match summaries.get(name) {
            Some(s) => (s.region.as_str(), s.institutions, s.counters.total()),
            None => ("", 0, 0),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            name, region, state, institutions, total
        ));
    }
    section.push('\n');

    section
}

fn generate_demographics_section(dist: &DemographicDistribution) -> String {
    let mut section = String::new();

    section.push_str("## Público atendido\n\n");
    if dist.types.is_empty() {
        section.push_str("Nenhum registro demográfico.\n\n");
        return section;
    }

    section.push_str("| Tipo |");
    for range in &dist.age_ranges {
        section.push_str(&format!(" {} |", range));
    }
    section.push_str("\n|:---|");
    for _ in &dist.age_ranges {
        section.push_str(":---:|");
    }
    section.push('\n');

    for kind in &dist.types {
        section.push_str(&format!("| {} |", kind));
        for range in &dist.age_ranges {
            let count = dist
                .data
                .get(kind)
                .and_then(|row| row.get(range))
                .copied()
                .unwrap_or(0);
            section.push_str(&format!(" {} |", count));
        }
        section.push('\n');
    }
    section.push_str(&format!("\n**Total atendido:** {}\n\n", dist.total));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Resumo gerado por certa-painel v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON summary.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the rendered summary to `path`.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::status_view;
    use crate::models::{Counters, DemographicRecord, Institution, InstitutionBook};
    use crate::store::InstitutionSnapshot;
    use tempfile::TempDir;

    fn create_test_report() -> Report {
        let mut book = InstitutionBook::new();
        book.push(
            "Lages",
            Institution {
                name: "APAE Lages".to_string(),
                region: "Serra".to_string(),
                category: "Todos".to_string(),
                counters: Counters {
                    workshops: 3,
                    open_day: 1,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let known = ["Lages".to_string(), "Chapecó".to_string()].into();
        let snapshot = InstitutionSnapshot {
            status_by_municipality: status_view(&known, &book),
            known_municipalities: known,
            book,
            ..Default::default()
        };
        let records = vec![
            DemographicRecord::new("Visual", "0-12", 4),
            DemographicRecord::new("Auditiva", "60+", 2),
        ];

        Report::build(&snapshot, &records, "/srv/certa")
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# Painel CERTA - Resumo"));
        assert!(markdown.contains("- **Instituições:** 1"));
        assert!(markdown.contains("- **Municípios:** 2"));
        assert!(markdown.contains("| Com capacitações/recursos | 1 |"));
        assert!(markdown.contains("| Nenhum | 1 |"));
        assert!(markdown.contains("| 3 | 0 | 0 | 1 | **4** |"));
        assert!(markdown.contains("| Serra | 4 |"));
        assert!(markdown.contains("| Lages | Serra | Com capacitações/recursos | 1 | 4 |"));
        assert!(markdown.contains("| Chapecó |  | Nenhum | 0 | 0 |"));
        assert!(markdown.contains("| Visual | 4 | 0 | 0 | 0 |"));
        assert!(markdown.contains("**Total atendido:** 6"));
    }

    #[test]
    fn test_empty_sections() {
        let report = Report::build(&InstitutionSnapshot::default(), &[], ".");
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("Nenhuma região informada."));
        assert!(markdown.contains("Nenhum registro demográfico."));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["data_dir"], "/srv/certa");
        assert_eq!(value["instituicoes_resumo"]["totais"]["total_geral"], 4);
        assert_eq!(value["municipiosStatus"]["Chapecó"], "Nenhum");
        assert_eq!(value["demografia_distribuicao"]["total"], 6);
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resumo.md");
        write_report("# Resumo\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Resumo\n");

        assert!(write_report("x", &dir.path().join("missing").join("r.md")).is_err());
    }
}
