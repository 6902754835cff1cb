use serde::Deserialize;

/// Fields requested for every bug.
pub const INCLUDE_FIELDS: &str = "id,summary,status";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A bug returned by `Bug.search`.
pub struct Bug {
    pub id: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BugSearchResponse {
    pub bugs: Vec<Bug>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One `fN` / `oN` / `vN` advanced search triple.
pub struct Criterion {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl Criterion {
    pub fn new(field: &str, operator: &str, value: &str) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Scope shared by every external tracker search in one run.
pub struct BugFilter {
    /// Only bugs in this product are considered.
    pub product: String,
    /// External tracker URLs must contain this, e.g. `https://github.com/`.
    pub forge_url: String,
    /// Keep CLOSED bugs in the results.
    pub include_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugQuery {
    pub product: String,
    pub criteria: Vec<Criterion>,
}

impl BugQuery {
    /// Bugs whose external tracker on `filter.forge_url` is exactly `key`.
    pub fn external_tracker(filter: &BugFilter, key: &str) -> Self {
        let mut criteria = vec![
            Criterion::new(
                "external_bugzilla.url",
                "substring",
                &filter.forge_url,
            ),
            Criterion::new("ext_bz_bug_map.ext_bz_bug_id", "equals", key),
        ];

        if !filter.include_closed {
            criteria.push(Criterion::new("bug_status", "notequals", "CLOSED"));
        }

        Self {
            product: filter.product.clone(),
            criteria,
        }
    }

    /// Query string pairs in Bugzilla's `f1/o1/v1` form.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("product".to_string(), self.product.clone()),
            ("include_fields".to_string(), INCLUDE_FIELDS.to_string()),
        ];

        for (i, criterion) in self.criteria.iter().enumerate() {
            let n = i + 1;
            params.push((format!("f{n}"), criterion.field.clone()));
            params.push((format!("o{n}"), criterion.operator.clone()));
            params.push((format!("v{n}"), criterion.value.clone()));
        }

        params
    }
}
