//! Form field access for admin submissions.
//!
//! Submissions arrive as ordered `(name, value)` pairs. Lookups never
//! fail: a missing field reads as the supplied default.

use serde::Deserialize;

/// Which collection an admin submission targets (`form_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Institutions,
    Demographics,
    Unknown,
}

/// Ordered multi-valued form fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `name`, or `default` when absent.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Trimmed first value for `name`, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.get_or(name, "").trim().to_string()
    }

    /// Every value submitted under `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct field names in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.pairs {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
        keys
    }

    /// Whether a field is present with a non-empty value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    pub fn kind(&self) -> FormKind {
        match self.get("form_type") {
            Some("instituicoes") => FormKind::Institutions,
            Some("demografia") => FormKind::Demographics,
            _ => FormKind::Unknown,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Split an edit field name `nome_{municipality}_{index}`.
///
/// The municipality may contain underscores; the index is whatever
/// follows the last one.
pub fn parse_edit_key(key: &str) -> Option<(&str, usize)> {
    let rest = key.strip_prefix("nome_")?;
    let (municipality, index) = rest.rsplit_once('_')?;
    if municipality.is_empty() {
        return None;
    }
    Some((municipality, index.parse().ok()?))
}

/// Field name for a per-row input, e.g. `telefone_Lages_2`.
pub fn row_field(base: &str, municipality: &str, index: usize) -> String {
    format!("{}_{}_{}", base, municipality, index)
}

/// Field name for one cell of the demographic grid.
pub fn grid_field(category: &str, range: &str) -> String {
    format!("demografia[{}][{}]", category, range)
}
