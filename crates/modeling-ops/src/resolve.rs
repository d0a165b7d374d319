//! Resolution of geometric topology queries to kernel entity ids.

use deckbox_kernel::{KernelId, KernelIntrospect, KernelSolidHandle};
use deckbox_types::{distance_between, TieBreak, TopoKind, TopoQuery};

use crate::types::OpError;

/// Every entity of `kind` in `solid` that satisfies `query`, narrowed to one
/// by the tie-break when there is one. Empty matches are an error so a
/// selection can never silently become a no-op.
pub fn resolve_query(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    kind: TopoKind,
    query: &TopoQuery,
) -> Result<Vec<KernelId>, OpError> {
    let matches: Vec<_> = introspect
        .compute_all_signatures(solid, kind)
        .into_iter()
        .filter(|(_, sig)| query.matches(sig))
        .collect();
    if matches.is_empty() {
        return Err(OpError::NoMatch {
            query: format!("{:?} {:?}", kind, query.filters),
        });
    }

    let picked = match &query.tie_break {
        None => return Ok(matches.into_iter().map(|(id, _)| id).collect()),
        Some(TieBreak::SmallestIndex) => matches.iter().min_by_key(|(id, _)| *id),
        Some(TieBreak::LargestArea) => matches.iter().max_by(|a, b| {
            let area = |s: &deckbox_types::TopoSignature| s.area.unwrap_or(0.0);
            area(&a.1).total_cmp(&area(&b.1)).then(b.0.cmp(&a.0))
        }),
        Some(TieBreak::NearestTo { point }) => matches.iter().min_by(|a, b| {
            let dist = |s: &deckbox_types::TopoSignature| {
                s.centroid
                    .map(|c| distance_between(c, *point))
                    .unwrap_or(f64::INFINITY)
            };
            dist(&a.1).total_cmp(&dist(&b.1)).then(a.0.cmp(&b.0))
        }),
    };
    Ok(picked.map(|(id, _)| vec![*id]).unwrap_or_default())
}

/// Entities matched by a list of selections, plus notes about selections
/// that added nothing new.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub ids: Vec<KernelId>,
    pub warnings: Vec<String>,
}

/// Resolve several queries, keeping first-seen order and dropping duplicates.
/// A query whose matches were all picked by earlier queries is reported in
/// `warnings`.
pub fn resolve_selection(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    kind: TopoKind,
    queries: &[TopoQuery],
) -> Result<Selection, OpError> {
    let mut selection = Selection::default();
    for (index, query) in queries.iter().enumerate() {
        let mut added = 0usize;
        for id in resolve_query(introspect, solid, kind, query)? {
            if !selection.ids.contains(&id) {
                selection.ids.push(id);
                added += 1;
            }
        }
        if added == 0 {
            selection.warnings.push(format!(
                "{kind:?} selection {index} matched only entities already selected"
            ));
        }
    }
    Ok(selection)
}

/// Resolve several queries, keeping first-seen order and dropping duplicates.
pub fn resolve_all(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    kind: TopoKind,
    queries: &[TopoQuery],
) -> Result<Vec<KernelId>, OpError> {
    resolve_selection(introspect, solid, kind, queries).map(|s| s.ids)
}
