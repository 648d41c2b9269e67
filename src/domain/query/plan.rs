//! Query plans and pagination windows.

use super::method::{QueryMethod, ResolvedPath};
use super::params::{Binding, Comparison, ParamValue, OFFSET};
use crate::domain::entity::EntityDescriptor;
use crate::domain::links::Links;
use crate::domain::render::{DatasetSplit, Format};
use std::sync::Arc;

/// One bound predicate: the resolved path, its comparator and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub parameter: String,
    pub path: ResolvedPath,
    pub comparison: Comparison,
    pub value: ParamValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

/// What a store needs to answer one list request.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub entity: Arc<EntityDescriptor>,
    pub filters: Vec<Filter>,
    /// Primary-key columns, ascending, in declaration order.
    pub order_by: Vec<String>,
    pub window: Window,
}

impl QueryPlan {
    pub fn for_method(method: &QueryMethod, binding: &Binding) -> Self {
        let filters = binding
            .filters
            .iter()
            .filter_map(|bound| {
                let spec = method.param(&bound.name)?;
                let path = method.path(&bound.name)?;
                Some(Filter {
                    parameter: bound.name.clone(),
                    path: path.clone(),
                    comparison: spec.comparison,
                    value: bound.value.clone(),
                })
            })
            .collect();
        let entity = method.entity.clone();
        let order_by = entity.primary_key().to_vec();
        Self {
            entity,
            filters,
            order_by,
            window: Window {
                offset: binding.offset,
                limit: method.window_size,
            },
        }
    }

    pub fn has_joins(&self) -> bool {
        self.filters.iter().any(|f| !f.path.steps.is_empty())
    }
}

/// `%value%` with `%`, `_` and `\` escaped for `ILIKE ... ESCAPE '\'`.
pub fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Whether another page follows the current window.
pub fn has_next(offset: u64, window: u64, total: u64) -> bool {
    offset.saturating_add(window) < total
}

/// Pagination links of a list response.
///
/// `params` are the request's query pairs in order; `offset` is dropped
/// from the dataset URL and replaced (or appended) in the next-page URL.
pub fn split(
    links: &Links,
    slug: &str,
    format: Format,
    params: &[(String, String)],
    current_url: Option<String>,
    window: Window,
    total: u64,
) -> DatasetSplit {
    let without_offset: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k != OFFSET)
        .cloned()
        .collect();
    let dataset_url = links.method_url(slug, Some(format.suffix()), &without_offset);

    let next_url = if has_next(window.offset, window.limit, total) {
        let next = (window.offset + window.limit).to_string();
        let mut replaced = false;
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
        for (k, v) in params {
            if k != OFFSET {
                pairs.push((k.clone(), v.clone()));
            } else if !replaced {
                pairs.push((k.clone(), next.clone()));
                replaced = true;
            }
        }
        if !replaced {
            pairs.push((OFFSET.to_string(), next));
        }
        Some(links.method_url(slug, Some(format.suffix()), &pairs))
    } else {
        None
    };

    DatasetSplit {
        dataset_url: Some(dataset_url),
        current_url,
        current_offset: window.offset,
        window_size: window.limit,
        next_url,
    }
}
