//! Offset pagination over prefix scans.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sidecar_storage::PrefixIterator;

use crate::error::ChainResult;

/// One page of results plus the size of the whole result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items in the requested window.
    pub results: Vec<T>,
    /// Items across all pages.
    pub total: usize,
}

/// Scan direction for list endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Most recent first.
    #[default]
    Desc,
    /// Oldest first.
    Asc,
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desc" => Ok(Order::Desc),
            "asc" => Ok(Order::Asc),
            other => Err(format!("unknown order {other:?}")),
        }
    }
}

/// Count every entry of `iter` and load the ones inside the window.
///
/// Walks the scan once, so `total` and `results` come from the same view.
pub(crate) fn paginate<T, F>(
    iter: PrefixIterator<'_>,
    limit: usize,
    offset: usize,
    mut load: F,
) -> ChainResult<Page<T>>
where
    F: FnMut(&[u8], &[u8]) -> ChainResult<T>,
{
    let mut results = Vec::with_capacity(limit);
    let mut total = 0;
    for item in iter {
        let (key, value) = item?;
        if total >= offset && results.len() < limit {
            results.push(load(&key, &value)?);
        }
        total += 1;
    }
    Ok(Page { results, total })
}
