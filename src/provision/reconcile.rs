//! Pure set reconciliation between a persisted and a requested namespace set.

use std::collections::HashSet;

/// The minimal set of external changes needed to converge on a new desired
/// namespace set. Recomputed on every mutation, never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NamespaceDelta {
    pub to_add: HashSet<String>,
    pub to_remove: HashSet<String>,
}

impl NamespaceDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute `new − old` and `old − new`. Duplicates in either input collapse;
/// iteration order of the result is unspecified.
pub fn reconcile(old: &[String], new: &[String]) -> NamespaceDelta {
    let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
    let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();

    NamespaceDelta {
        to_add: new_set
            .difference(&old_set)
            .map(|ns| (*ns).to_string())
            .collect(),
        to_remove: old_set
            .difference(&new_set)
            .map(|ns| (*ns).to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespaces(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_sets_yield_empty_delta() {
        let set = namespaces(&["a", "b", "c"]);
        let delta = reconcile(&set, &set);
        assert!(delta.is_empty());
    }

    #[test]
    fn empty_inputs_are_valid() {
        assert!(reconcile(&[], &[]).is_empty());

        let delta = reconcile(&[], &namespaces(&["a", "b"]));
        assert_eq!(delta.to_add, ["a".to_string(), "b".to_string()].into());
        assert!(delta.to_remove.is_empty());

        let delta = reconcile(&namespaces(&["a", "b"]), &[]);
        assert!(delta.to_add.is_empty());
        assert_eq!(delta.to_remove, ["a".to_string(), "b".to_string()].into());
    }

    #[test]
    fn overlapping_sets_produce_disjoint_delta() {
        let delta = reconcile(&namespaces(&["ns1", "ns2"]), &namespaces(&["ns2", "ns3"]));
        assert_eq!(delta.to_add, ["ns3".to_string()].into());
        assert_eq!(delta.to_remove, ["ns1".to_string()].into());
        assert!(delta.to_add.is_disjoint(&delta.to_remove));
    }

    #[test]
    fn duplicates_collapse() {
        let delta = reconcile(
            &namespaces(&["ns1", "ns1", "ns2"]),
            &namespaces(&["ns2", "ns2"]),
        );
        assert_eq!(delta.to_remove, ["ns1".to_string()].into());
        assert!(delta.to_add.is_empty());
    }

    #[test]
    fn delta_sets_are_always_disjoint() {
        // A few representative shapes; disjointness holds by construction.
        let cases = [
            (vec![], vec!["a"]),
            (vec!["a"], vec![]),
            (vec!["a", "b"], vec!["b", "c"]),
            (vec!["x", "y", "z"], vec!["x", "y", "z"]),
        ];
        for (old, new) in cases {
            let old = namespaces(&old);
            let new = namespaces(&new);
            let delta = reconcile(&old, &new);
            assert!(delta.to_add.is_disjoint(&delta.to_remove));
        }
    }
}
