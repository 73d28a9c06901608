// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! Partition refinement over sets of LR(1) states (§4.E, §4.G, §9
//! "Partition refinement"). Several stages of the pipeline produce a list
//! of `(label, value)` transitions whose labels may overlap; before those
//! transitions can drive a deterministic automaton, the labels must be
//! refined into pairwise-disjoint cells, with the values of every
//! contributing transition merged into each cell they cover.

use std::collections::BTreeSet;

use crate::grammar::StateId;

/// Refines `items` into disjoint, non-empty label cells. Whenever two
/// input labels overlap, the overlapping region becomes (part of) its own
/// cell, carrying the `merge` of both contributing values; the
/// non-overlapping remainders keep their original values. The result is
/// stable and deterministic given a deterministic `merge`.
pub fn partition_refine<V: Clone>(
    items: Vec<(BTreeSet<StateId>, V)>,
    merge: impl Fn(V, V) -> V,
) -> Vec<(BTreeSet<StateId>, V)> {
    let mut cells: Vec<(BTreeSet<StateId>, V)> = Vec::new();
    for (label, value) in items {
        if label.is_empty() {
            continue;
        }
        let mut remaining = label;
        let mut next_cells = Vec::with_capacity(cells.len() + 1);
        for (cell_label, cell_value) in cells.drain(..) {
            if remaining.is_empty() {
                next_cells.push((cell_label, cell_value));
                continue;
            }
            let overlap: BTreeSet<StateId> =
                cell_label.intersection(&remaining).copied().collect();
            if overlap.is_empty() {
                next_cells.push((cell_label, cell_value));
                continue;
            }
            let cell_only: BTreeSet<StateId> =
                cell_label.difference(&overlap).copied().collect();
            if !cell_only.is_empty() {
                next_cells.push((cell_only, cell_value.clone()));
            }
            remaining = remaining.difference(&overlap).copied().collect();
            next_cells.push((overlap, merge(cell_value, value.clone())));
        }
        if !remaining.is_empty() {
            next_cells.push((remaining, value));
        }
        cells = next_cells;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::StateId;

    fn set(states: &[u32]) -> BTreeSet<StateId> {
        states.iter().map(|&n| StateId(n)).collect()
    }

    #[test]
    fn disjoint_inputs_pass_through_unchanged() {
        let items = vec![(set(&[0, 1]), "a"), (set(&[2, 3]), "b")];
        let result = partition_refine(items, |a, _| a);
        assert_eq!(result.len(), 2);
        let total: BTreeSet<StateId> = result.iter().flat_map(|(l, _)| l.iter().copied()).collect();
        assert_eq!(total, set(&[0, 1, 2, 3]));
    }

    #[test]
    fn overlapping_inputs_split_and_merge() {
        let items = vec![(set(&[0, 1, 2]), vec!["a"]), (set(&[1, 2, 3]), vec!["b"])];
        let result = partition_refine(items, |mut acc, other| {
            acc.extend(other);
            acc
        });
        // Cells: {0}->["a"], {1,2}->["a","b"], {3}->["b"]
        assert_eq!(result.len(), 3);
        let mut seen_labels: Vec<BTreeSet<StateId>> = result.iter().map(|(l, _)| l.clone()).collect();
        seen_labels.sort();
        assert_eq!(seen_labels, vec![set(&[0]), set(&[1, 2]), set(&[3])]);
        for (label, value) in &result {
            if label == &set(&[1, 2]) {
                assert_eq!(value, &vec!["a", "b"]);
            }
        }
    }

    #[test]
    fn cells_are_pairwise_disjoint() {
        let items = vec![
            (set(&[0, 1, 2, 3]), 1u32),
            (set(&[2, 3, 4]), 2u32),
            (set(&[0, 4]), 3u32),
        ];
        let result = partition_refine(items, |a, b| a + b);
        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                assert!(result[i].0.is_disjoint(&result[j].0));
            }
        }
    }

    #[test]
    fn empty_input_yields_no_cells() {
        let items: Vec<(BTreeSet<StateId>, u32)> = vec![];
        assert!(partition_refine(items, |a, _| a).is_empty());
    }
}
