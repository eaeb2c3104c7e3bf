//! Paginated search across backend objects

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{BackendClient, Result};

/// Builder for the backend's search query syntax
#[derive(Clone, Debug, Default)]
pub struct SearchQuery {
    clauses: Vec<String>,
}

impl SearchQuery {
    pub fn resource_type(resource_type: &str) -> Self {
        Self {
            clauses: vec![format!("resource_type:{}", escape(resource_type))],
        }
    }

    /// Require a tag with this scope and value
    pub fn tag(mut self, scope: &str, value: &str) -> Self {
        self.clauses.push(format!("tags.scope:{}", escape(scope)));
        self.clauses.push(format!("tags.tag:{}", escape(value)));
        self
    }

    /// Restrict to objects below `path`
    pub fn under_path(mut self, path: &str) -> Self {
        self.clauses.push(format!("path:{}*", escape(path)));
        self
    }

    pub fn build(&self) -> String {
        self.clauses.join(" AND ")
    }
}

/// Escape characters the query language treats as operators
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '/' | ':' | '+' | '-' | '(' | ')' | '"' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Follow cursors until the last page or until the reported total has been
/// collected, decoding every result as `T`
pub async fn search_all<T: DeserializeOwned>(
    client: &dyn BackendClient,
    query: &SearchQuery,
) -> Result<Vec<T>> {
    let query = query.build();
    let mut results = Vec::new();
    let mut cursor = None;

    loop {
        let page = client.search(&query, cursor.take()).await?;
        let total = page.result_count;
        let page_len = page.results.len();
        for value in page.results {
            results.push(serde_json::from_value(value)?);
        }
        debug!(query = %query, page_len, collected = results.len(), total, "search page");

        match page.cursor {
            Some(next) if !next.is_empty() && page_len > 0 && (results.len() as u64) < total => {
                cursor = Some(next);
            }
            _ => break,
        }
    }

    Ok(results)
}
