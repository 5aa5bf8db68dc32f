//! Request URL construction
//!
//! Query parameters follow the upstream conventions: scalars append
//! directly, array filters repeat as `key[]=value`, and absent optionals
//! are omitted entirely. Paths that name a collection and do not address a
//! single numeric resource get `per_page` defaulted to the upstream
//! maximum, so listings arrive in as few pages as possible.

use url::Url;

use crate::constants::LIST_SEGMENTS;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum ParamValue {
    Scalar(String),
    Many(Vec<String>),
}

/// Ordered set of query parameters for one request.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, ParamValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one scalar parameter.
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.params
            .push((key.to_string(), ParamValue::Scalar(value.to_string())));
        self
    }

    /// Append a scalar when present; `None` adds nothing.
    pub fn set_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Append an array filter, later encoded as repeated `key[]=value`
    /// pairs. An empty iterator adds nothing.
    pub fn set_all(mut self, key: &str, values: impl IntoIterator<Item = impl ToString>) -> Self {
        let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        if !values.is_empty() {
            self.params.push((key.to_string(), ParamValue::Many(values)));
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Build the full request URL for `path` under `base`.
///
/// `default_page_size` is injected as `per_page` for list-style paths that
/// do not already carry one; see [`wants_default_page_size`].
pub fn build_url(base: &str, path: &str, query: &Query, default_page_size: u32) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url =
        Url::parse(&joined).map_err(|e| Error::Url(format!("building {joined}: {e}")))?;

    let add_page_size = wants_default_page_size(path, query);
    if !query.is_empty() || add_page_size {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &query.params {
            match value {
                ParamValue::Scalar(value) => {
                    pairs.append_pair(key, value);
                }
                ParamValue::Many(values) => {
                    let array_key = format!("{key}[]");
                    for value in values {
                        pairs.append_pair(&array_key, value);
                    }
                }
            }
        }
        if add_page_size {
            pairs.append_pair("per_page", &default_page_size.to_string());
        }
    }
    Ok(url)
}

/// Whether `path` is a listing that should default to the maximum page
/// size: it contains a known collection segment, its final segment is not
/// a numeric id, and the caller did not set `per_page` explicitly.
pub fn wants_default_page_size(path: &str, query: &Query) -> bool {
    if query.contains("per_page") {
        return false;
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.last() else {
        return false;
    };
    if last.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    segments
        .iter()
        .any(|segment| LIST_SEGMENTS.contains(segment))
}
