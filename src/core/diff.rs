use crate::models::{IdSet, RecordId};
use serde::Serialize;

/// Membership changes needed to turn a baseline into a selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDiff {
    pub to_add: IdSet,
    pub to_remove: IdSet,
}

impl MembershipDiff {
    #[inline]
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }
}

/// Cheap pre-check: differently sized sets can never be equal
#[inline]
pub fn sizes_differ(baseline: &IdSet, selection: &IdSet) -> bool {
    baseline.len() != selection.len()
}

/// Compute `selection − baseline` and `baseline − selection`
///
/// Both inputs are re-normalized element by element, so callers may pass
/// sets that were assembled from mixed sources. Pure; never touches the
/// network.
pub fn compute_diff<'a, B, S>(baseline: B, selection: S) -> MembershipDiff
where
    B: IntoIterator<Item = &'a RecordId>,
    S: IntoIterator<Item = &'a RecordId>,
{
    let baseline: IdSet = baseline.into_iter().map(renormalize).collect();
    let selection: IdSet = selection.into_iter().map(renormalize).collect();

    MembershipDiff {
        to_add: selection.difference(&baseline).cloned().collect(),
        to_remove: baseline.difference(&selection).cloned().collect(),
    }
}

/// Whether two membership sets differ after normalization
pub fn sets_differ(baseline: &IdSet, selection: &IdSet) -> bool {
    let baseline: IdSet = baseline.iter().map(renormalize).collect();
    let selection: IdSet = selection.iter().map(renormalize).collect();
    sizes_differ(&baseline, &selection) || baseline != selection
}

// A `RecordId::Text` built by hand (not through `normalize`) may still hold
// a numeric string.
fn renormalize(id: &RecordId) -> RecordId {
    match id {
        RecordId::Int(_) => id.clone(),
        RecordId::Text(s) => RecordId::normalize(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_all;

    #[test]
    fn test_diff_basic() {
        let baseline = normalize_all([1, 2, 3]);
        let selection = normalize_all([2, 3, 4]);
        let diff = compute_diff(&baseline, &selection);

        assert_eq!(diff.to_add, normalize_all([4]));
        assert_eq!(diff.to_remove, normalize_all([1]));
        assert!(diff.has_changes());
    }

    #[test]
    fn test_diff_identity_is_empty() {
        let baseline = normalize_all([5, 6]);
        let diff = compute_diff(&baseline, &baseline);
        assert_eq!(diff, MembershipDiff::default());
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_diff_renormalizes_raw_text_ids() {
        let baseline: IdSet = [RecordId::Text("7".to_string())].into_iter().collect();
        let selection = normalize_all([7]);
        assert!(!compute_diff(&baseline, &selection).has_changes());
        assert!(!sets_differ(&baseline, &selection));
    }

    #[test]
    fn test_sets_differ_collapses_duplicate_forms() {
        let raw: IdSet = [RecordId::Text("7".to_string()), RecordId::Int(7)].into_iter().collect();
        let canonical = normalize_all([7]);
        assert_eq!(raw.len(), 2);
        assert!(!sets_differ(&raw, &canonical));
        assert!(!compute_diff(&raw, &canonical).has_changes());
    }

    #[test]
    fn test_large_ids_do_not_collide() {
        let baseline = normalize_all(["9007199254740993"]);
        let selection = normalize_all([9007199254740993_i64]);
        assert!(!sets_differ(&baseline, &selection));
        assert!(sets_differ(&baseline, &normalize_all([9007199254740992_i64])));
    }

    #[test]
    fn test_sets_differ_same_size() {
        let a = normalize_all([1, 2]);
        let b = normalize_all([1, 3]);
        assert!(!sizes_differ(&a, &b));
        assert!(sets_differ(&a, &b));
    }

    #[test]
    fn test_add_and_remove_disjoint() {
        let baseline = normalize_all(["a", "b", "1"]);
        let selection = normalize_all(["b", "c", "2"]);
        let diff = compute_diff(&baseline, &selection);
        assert!(diff.to_add.is_disjoint(&diff.to_remove));
    }
}
