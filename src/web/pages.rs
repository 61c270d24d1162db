//! HTML page rendering.
//!
//! Pages are assembled as plain strings. Every piece of stored text goes
//! through [`escape`] before it reaches the markup.

use crate::admin::form::{grid_field, row_field};
use crate::analysis::{CategoryTotals, Dashboard, EditGrid};
use crate::models::{
    AgeRange, Category, Institution, InstitutionBook, COUNTER_KEYS, COUNTER_LABELS,
    REGION_OPTIONS,
};
use std::collections::BTreeMap;

/// Everything the admin page shows.
pub struct AdminView<'a> {
    pub book: &'a InstitutionBook,
    pub regions: &'a BTreeMap<String, String>,
    pub totals: CategoryTotals,
    pub grid: EditGrid,
}

/// Escape text for HTML element content and quoted attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    page.push_str(&format!("<title>{}</title>\n", escape(title)));
    page.push_str("</head>\n<body>\n");
    page.push_str(body);
    page.push_str("</body>\n</html>\n");

    page
}

/// The public dashboard.
///
/// The full view model is also embedded as JSON for the map script,
/// which draws `/sc_municipios.geojson` colored by status.
pub fn dashboard_page(dashboard: &Dashboard, book: &InstitutionBook) -> String {
    let mut body = String::new();

    body.push_str("<header>\n<h1>Painel CERTA</h1>\n");
    body.push_str("<nav><a href=\"/dados.csv\">dados.csv</a> · ");
    body.push_str("<a href=\"/demografia.csv\">demografia.csv</a> · ");
    body.push_str("<a href=\"/login\">Área administrativa</a></nav>\n</header>\n");

    body.push_str(&totals_section(&dashboard.summary.totals));

    // Status overview
    body.push_str("<section id=\"status\">\n<h2>Municípios</h2>\n<ul>\n");
    for (status, count) in &dashboard.status_counts {
        body.push_str(&format!("<li>{}: {}</li>\n", escape(status.as_str()), count));
    }
    body.push_str("</ul>\n");
    body.push_str("<div id=\"mapa\" data-geojson=\"/sc_municipios.geojson\"></div>\n");
    body.push_str("</section>\n");

    // Region totals
    body.push_str("<section id=\"regioes\">\n<h2>Por região</h2>\n");
    if dashboard.summary.regions.is_empty() {
        body.push_str("<p>Nenhuma região informada.</p>\n");
    } else {
        body.push_str("<table>\n<tr><th>Região</th><th>Total</th></tr>\n");
        for (region, total) in &dashboard.summary.regions {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(region),
                total
            ));
        }
        body.push_str("</table>\n");
    }
    body.push_str("</section>\n");

    // Municipality table with institutions
    body.push_str("<section id=\"municipios\">\n<h2>Instituições por município</h2>\n");
    body.push_str("<table>\n<tr><th>Município</th><th>Região</th><th>Status</th><th>Instituições</th>");
    for label in COUNTER_LABELS {
        body.push_str(&format!("<th>{}</th>", escape(label)));
    }
    body.push_str("</tr>\n");
    for (name, status) in &dashboard.status {
        let summary = dashboard.municipalities.get(name);
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape(name),
            escape(
                dashboard
                    .region_by_municipality
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or("")
            ),
            escape(status.as_str()),
            summary.map(|s| s.institutions).unwrap_or(0),
        ));
        let counters = summary.map(|s| s.counters.as_array()).unwrap_or_default();
        for value in counters {
            body.push_str(&format!("<td>{}</td>", value));
        }
        body.push_str("</tr>\n");

        if let Some(municipality) = book.get(name) {
            for inst in &municipality.institutions {
                body.push_str(&institution_row(inst));
            }
        }
    }
    body.push_str("</table>\n</section>\n");

    body.push_str(&demographics_section(dashboard));

    body.push_str("<script type=\"application/json\" id=\"painel-dados\">");
    body.push_str(&embedded_json(dashboard));
    body.push_str("</script>\n");

    layout("Painel CERTA", &body)
}

fn totals_section(totals: &CategoryTotals) -> String {
    let mut section = String::new();

    section.push_str("<section id=\"totais\">\n<h2>Totais</h2>\n<table>\n<tr>");
    for label in COUNTER_LABELS {
        section.push_str(&format!("<th>{}</th>", escape(label)));
    }
    section.push_str("<th>Total geral</th></tr>\n");
    section.push_str(&format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        totals.workshops,
        totals.assistive_tech,
        totals.pedagogical,
        totals.open_day,
        totals.grand_total
    ));
    section.push_str("</table>\n</section>\n");

    section
}

fn institution_row(inst: &Institution) -> String {
    let contact = [inst.address.as_str(), inst.phone.as_str(), inst.email.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(escape)
        .collect::<Vec<_>>()
        .join(" · ");

    let mut row = format!(
        "<tr class=\"instituicao\"><td></td><td colspan=\"3\">{} <small>{}</small><br><small>{}</small></td>",
        escape(&inst.name),
        escape(&inst.category),
        contact
    );
    for value in inst.counters.as_array() {
        row.push_str(&format!("<td>{}</td>", value));
    }
    row.push_str("</tr>\n");
    row
}

fn demographics_section(dashboard: &Dashboard) -> String {
    let dist = &dashboard.demographics;
    let mut section = String::new();

    section.push_str("<section id=\"demografia\">\n<h2>Público atendido</h2>\n");
    if dist.types.is_empty() {
        section.push_str("<p>Nenhum registro demográfico.</p>\n</section>\n");
        return section;
    }

    section.push_str("<table>\n<tr><th>Tipo de deficiência</th>");
    for range in &dist.age_ranges {
        section.push_str(&format!("<th>{}</th>", range.as_str()));
    }
    section.push_str("</tr>\n");
    for kind in &dist.types {
        section.push_str(&format!("<tr><td>{}</td>", escape(kind)));
        for range in &dist.age_ranges {
            let count = dist
                .data
                .get(kind)
                .and_then(|row| row.get(range))
                .copied()
                .unwrap_or(0);
            section.push_str(&format!("<td>{}</td>", count));
        }
        section.push_str("</tr>\n");
    }
    section.push_str("</table>\n");
    section.push_str(&format!("<p>Total: {}</p>\n</section>\n", dist.total));

    section
}

/// Dashboard JSON safe to place inside a `<script>` element.
fn embedded_json(dashboard: &Dashboard) -> String {
    serde_json::to_string(dashboard)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

/// The login form, optionally with an error message.
pub fn login_page(error: Option<&str>) -> String {
    let mut body = String::new();

    body.push_str("<h1>Acesso administrativo</h1>\n");
    if let Some(message) = error {
        body.push_str(&format!("<p class=\"erro\">{}</p>\n", escape(message)));
    }
    body.push_str("<form method=\"post\" action=\"/login\">\n");
    body.push_str("<label>Usuário <input name=\"username\" autocomplete=\"username\"></label>\n");
    body.push_str(
        "<label>Senha <input name=\"password\" type=\"password\" autocomplete=\"current-password\"></label>\n",
    );
    body.push_str("<button type=\"submit\">Entrar</button>\n</form>\n");
    body.push_str("<p><a href=\"/\">Voltar ao painel</a></p>\n");

    layout("Login - Painel CERTA", &body)
}

fn text_input(name: &str, value: &str) -> String {
    format!(
        "<input name=\"{}\" value=\"{}\">",
        escape(name),
        escape(value)
    )
}

fn number_input(name: &str, value: u64) -> String {
    format!(
        "<input name=\"{}\" type=\"number\" min=\"0\" value=\"{}\">",
        escape(name),
        value
    )
}

/// A `<select>` over `options`, keeping `current` selectable even when it
/// is not one of them.
fn select(name: &str, options: &[&str], current: &str, blank: bool) -> String {
    let mut html = format!("<select name=\"{}\">", escape(name));
    if blank {
        html.push_str("<option value=\"\"></option>");
    }
    if !current.is_empty() && !options.contains(&current) {
        html.push_str(&format!(
            "<option value=\"{0}\" selected>{0}</option>",
            escape(current)
        ));
    }
    for option in options {
        let selected = if *option == current { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{0}\"{1}>{0}</option>",
            escape(option),
            selected
        ));
    }
    html.push_str("</select>");
    html
}

fn category_options() -> Vec<&'static str> {
    Category::ALL.iter().map(|c| c.as_str()).collect()
}

/// The admin panel: institution editor, add form and demographic grid.
pub fn admin_page(view: &AdminView<'_>) -> String {
    let mut body = String::new();

    body.push_str("<header>\n<h1>Administração CERTA</h1>\n");
    body.push_str("<nav><a href=\"/\">Painel</a> · <a href=\"/logout\">Sair</a></nav>\n</header>\n");

    body.push_str(&totals_section(&view.totals));
    body.push_str(&editor_section(view));
    body.push_str(&add_section(view.regions));
    body.push_str(&grid_section(&view.grid));

    layout("Administração - Painel CERTA", &body)
}

fn editor_section(view: &AdminView<'_>) -> String {
    let categories = category_options();
    let mut section = String::new();

    section.push_str("<section id=\"instituicoes\">\n<h2>Instituições</h2>\n");
    if view.book.institution_count() == 0 {
        section.push_str("<p>Nenhuma instituição cadastrada.</p>\n</section>\n");
        return section;
    }

    section.push_str("<form method=\"post\" action=\"/admin\">\n");
    section.push_str("<input type=\"hidden\" name=\"form_type\" value=\"instituicoes\">\n");
    section.push_str("<table>\n<tr><th>Excluir</th><th>Município</th><th>Nome</th><th>Região</th>");
    section.push_str("<th>Tipo</th><th>Endereço</th><th>Telefone</th><th>E-mail</th>");
    for label in COUNTER_LABELS {
        section.push_str(&format!("<th>{}</th>", escape(label)));
    }
    section.push_str("</tr>\n");

    for municipality in view.book.municipalities() {
        let m = municipality.name.as_str();
        for (i, inst) in municipality.institutions.iter().enumerate() {
            section.push_str("<tr>");
            section.push_str(&format!(
                "<td><input type=\"checkbox\" name=\"delete\" value=\"{}\"></td>",
                escape(&format!("{}_{}", m, i))
            ));
            section.push_str(&format!("<td>{}</td>", escape(m)));
            section.push_str(&format!(
                "<td>{}</td>",
                text_input(&row_field("nome", m, i), &inst.name)
            ));
            section.push_str(&format!(
                "<td>{}</td>",
                select(&row_field("regiao", m, i), &REGION_OPTIONS, &inst.region, true)
            ));
            section.push_str(&format!(
                "<td>{}</td>",
                select(&row_field("tipo", m, i), &categories, &inst.category, false)
            ));
            section.push_str(&format!(
                "<td>{}</td>",
                text_input(&row_field("endereco", m, i), &inst.address)
            ));
            section.push_str(&format!(
                "<td>{}</td>",
                text_input(&row_field("telefone", m, i), &inst.phone)
            ));
            section.push_str(&format!(
                "<td>{}</td>",
                text_input(&row_field("email", m, i), &inst.email)
            ));
            for (key, value) in COUNTER_KEYS.iter().zip(inst.counters.as_array()) {
                section.push_str(&format!(
                    "<td>{}</td>",
                    number_input(&row_field(key, m, i), value)
                ));
            }
            section.push_str("</tr>\n");
        }
    }

    section.push_str("</table>\n<button type=\"submit\">Salvar alterações</button>\n</form>\n");
    section.push_str("</section>\n");

    section
}

fn add_section(regions: &BTreeMap<String, String>) -> String {
    let categories = category_options();
    let mut section = String::new();

    section.push_str("<section id=\"adicionar\">\n<h2>Adicionar instituição</h2>\n");
    section.push_str("<form method=\"post\" action=\"/admin\">\n");
    section.push_str("<input type=\"hidden\" name=\"form_type\" value=\"instituicoes\">\n");
    section.push_str("<input type=\"hidden\" name=\"add\" value=\"1\">\n");

    section.push_str(
        "<label>Município <input name=\"municipio\" list=\"municipios\" required></label>\n",
    );
    section.push_str("<datalist id=\"municipios\">");
    for name in regions.keys() {
        section.push_str(&format!("<option value=\"{}\">", escape(name)));
    }
    section.push_str("</datalist>\n");

    section.push_str(&format!("<label>Nome {}</label>\n", text_input("nome", "")));
    section.push_str(&format!(
        "<label>Região {}</label>\n",
        select("regiao", &REGION_OPTIONS, "", true)
    ));
    section.push_str(&format!(
        "<label>Tipo {}</label>\n",
        select("tipo", &categories, Category::All.as_str(), false)
    ));
    section.push_str(&format!("<label>Endereço {}</label>\n", text_input("endereco", "")));
    section.push_str(&format!("<label>Telefone {}</label>\n", text_input("telefone", "")));
    section.push_str(&format!("<label>E-mail {}</label>\n", text_input("email", "")));
    for (key, label) in COUNTER_KEYS.iter().zip(COUNTER_LABELS) {
        section.push_str(&format!(
            "<label>{} {}</label>\n",
            escape(label),
            number_input(key, 0)
        ));
    }

    section.push_str("<button type=\"submit\">Adicionar</button>\n</form>\n</section>\n");

    section
}

fn grid_section(grid: &EditGrid) -> String {
    let mut section = String::new();

    section.push_str("<section id=\"demografia\">\n<h2>Público atendido</h2>\n");
    section.push_str("<form method=\"post\" action=\"/admin\">\n");
    section.push_str("<input type=\"hidden\" name=\"form_type\" value=\"demografia\">\n");
    section.push_str("<table>\n<tr><th>Tipo</th>");
    for range in AgeRange::ALL {
        section.push_str(&format!("<th>{}</th>", range.as_str()));
    }
    section.push_str("</tr>\n");

    for category in Category::ALL {
        section.push_str(&format!("<tr><td>{}</td>", escape(category.as_str())));
        for range in AgeRange::ALL {
            section.push_str(&format!(
                "<td>{}</td>",
                number_input(
                    &grid_field(category.as_str(), range.as_str()),
                    grid.get(category, range)
                )
            ));
        }
        section.push_str("</tr>\n");
    }

    section.push_str("</table>\n<button type=\"submit\">Salvar público</button>\n</form>\n");
    section.push_str("</section>\n");

    section
}
