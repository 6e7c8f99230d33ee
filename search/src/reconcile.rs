//! Result reconciliation: turning service facets into state navigations.
//!
//! All functions are pure. Every one of them keeps `selected` pointing at
//! the same refinements it pointed at before, whatever reordering or
//! truncation happens.

use crate::models::{Facet, Navigation};
use std::collections::BTreeMap;

fn usable(facet: &Facet) -> bool {
    !facet.ignored && !facet.refinements.is_empty()
}

/// Merge available and selected facets into navigations
///
/// Available facets are the baseline. A selected facet is merged into the
/// available one with the same field: matching refinements are marked
/// selected, unmatched ones appended and marked. A selected facet with no
/// available counterpart is added fully selected. Ignored and empty facets
/// are dropped first.
#[must_use]
pub fn combine(available: &[Facet], selected: &[Facet]) -> Vec<Navigation> {
    let mut navigations: Vec<Navigation> = available
        .iter()
        .filter(|facet| usable(facet))
        .map(Navigation::from_facet)
        .collect();

    for facet in selected.iter().filter(|facet| usable(facet)) {
        match navigations.iter_mut().find(|navigation| navigation.field == facet.name) {
            Some(navigation) => {
                for refinement in &facet.refinements {
                    let index = navigation.index_of(refinement).unwrap_or_else(|| {
                        navigation.refinements.push(refinement.clone());
                        navigation.refinements.len() - 1
                    });
                    if !navigation.is_selected(index) {
                        navigation.selected.push(index);
                    }
                }
            },
            None => {
                let mut navigation = Navigation::from_facet(facet);
                navigation.selected = (0..navigation.refinements.len()).collect();
                navigations.push(navigation);
            },
        }
    }

    navigations
}

/// Rebuild `navigation` with its refinements in `order` (old indices)
fn reorder(navigation: &mut Navigation, order: &[usize]) {
    let refinements = order
        .iter()
        .filter_map(|&old| navigation.refinements.get(old).cloned())
        .collect();
    let selected = navigation
        .selected
        .iter()
        .filter_map(|old| order.iter().position(|candidate| candidate == old))
        .collect();
    navigation.refinements = refinements;
    navigation.selected = selected;
}

/// Cap refinements per facet at `max`
///
/// Selected refinements always survive; remaining slots go to the first
/// unselected refinements in original order. Truncated facets get
/// `more = true`.
#[must_use]
pub fn prune(mut navigations: Vec<Navigation>, max: usize) -> Vec<Navigation> {
    for navigation in &mut navigations {
        if navigation.refinements.len() <= max {
            continue;
        }
        let mut slots = max.saturating_sub(navigation.selected.len());
        let order: Vec<usize> = (0..navigation.refinements.len())
            .filter(|&index| {
                if navigation.is_selected(index) {
                    true
                } else if slots > 0 {
                    slots -= 1;
                    true
                } else {
                    false
                }
            })
            .collect();
        reorder(navigation, &order);
        navigation.more = true;
    }
    navigations
}

/// Move configured values of a facet to the front, in pin order
#[must_use]
pub fn pin_refinements(mut navigations: Vec<Navigation>, pins: &BTreeMap<String, Vec<String>>) -> Vec<Navigation> {
    for navigation in &mut navigations {
        let Some(pinned) = pins.get(&navigation.field) else {
            continue;
        };
        let labels: Vec<String> = navigation.refinements.iter().map(|r| r.label()).collect();
        let mut order: Vec<usize> = Vec::with_capacity(labels.len());
        for index in pinned.iter().filter_map(|value| labels.iter().position(|label| label == value)) {
            if !order.contains(&index) {
                order.push(index);
            }
        }
        let rest: Vec<usize> = (0..labels.len()).filter(|index| !order.contains(index)).collect();
        order.extend(rest);
        reorder(navigation, &order);
    }
    navigations
}

/// Order facets by a ranking of field names
///
/// Ranked facets come first in ranking order; unranked ones follow in
/// their original relative order.
#[must_use]
pub fn rank_navigations(mut navigations: Vec<Navigation>, ranking: &[String]) -> Vec<Navigation> {
    navigations.sort_by_key(|navigation| {
        ranking
            .iter()
            .position(|field| *field == navigation.field)
            .unwrap_or(usize::MAX)
    });
    navigations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Refinement;
    use proptest::prelude::*;

    fn facet(name: &str, values: &[&str]) -> Facet {
        Facet {
            name: name.into(),
            display_name: name.into(),
            refinements: values.iter().map(|v| Refinement::value(*v)).collect(),
            ..Facet::default()
        }
    }

    fn navigation(field: &str, values: &[&str], selected: Vec<usize>) -> Navigation {
        Navigation {
            field: field.into(),
            label: field.into(),
            refinements: values.iter().map(|v| Refinement::value(*v)).collect(),
            selected,
            ..Navigation::default()
        }
    }

    fn labels(navigation: &Navigation) -> Vec<String> {
        navigation.refinements.iter().map(Refinement::label).collect()
    }

    #[test]
    fn selected_refinement_is_marked_in_available_facet() {
        let combined = combine(&[facet("color", &["red", "blue"])], &[facet("color", &["red"])]);

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].selected, vec![0]);
        assert_eq!(labels(&combined[0]), vec!["red", "blue"]);
    }

    #[test]
    fn unmatched_selection_is_appended_and_marked() {
        let combined = combine(&[facet("color", &["red"])], &[facet("color", &["green"])]);

        assert_eq!(labels(&combined[0]), vec!["red", "green"]);
        assert_eq!(combined[0].selected, vec![1]);
    }

    #[test]
    fn selected_only_facet_is_synthesized_fully_selected() {
        let combined = combine(&[facet("color", &["red"])], &[facet("size", &["9", "10"])]);

        assert_eq!(combined[1].field, "size");
        assert_eq!(combined[1].selected, vec![0, 1]);
    }

    #[test]
    fn ignored_and_empty_facets_are_dropped() {
        let mut hidden = facet("internal", &["x"]);
        hidden.ignored = true;

        let combined = combine(&[hidden, facet("empty", &[]), facet("color", &["red"])], &[]);

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].field, "color");
    }

    #[test]
    fn range_selection_matches_on_bounds_not_totals() {
        let mut available = facet("price", &[]);
        available.range = true;
        available.refinements = vec![Refinement::range(0.0, 10.0).with_total(5)];
        let mut selected = facet("price", &[]);
        selected.refinements = vec![Refinement::range(0.0, 10.0)];

        let combined = combine(&[available], &[selected]);

        assert_eq!(combined[0].refinements.len(), 1);
        assert_eq!(combined[0].selected, vec![0]);
    }

    #[test]
    fn prune_keeps_selected_and_fills_with_first_unselected() {
        let pruned = prune(vec![navigation("color", &["a", "b", "c", "d", "e"], vec![3])], 3);

        assert_eq!(labels(&pruned[0]), vec!["a", "b", "d"]);
        assert_eq!(pruned[0].selected, vec![2]);
        assert!(pruned[0].more);
    }

    #[test]
    fn prune_leaves_short_facets_alone() {
        let pruned = prune(vec![navigation("color", &["a", "b"], vec![])], 3);

        assert_eq!(labels(&pruned[0]), vec!["a", "b"]);
        assert!(!pruned[0].more);
    }

    #[test]
    fn pins_move_to_front_and_selection_follows() {
        let pins = BTreeMap::from([("brand".to_string(), vec!["Zeta".to_string(), "Beta".to_string()])]);

        let pinned = pin_refinements(vec![navigation("brand", &["Alpha", "Beta", "Zeta"], vec![0])], &pins);

        assert_eq!(labels(&pinned[0]), vec!["Zeta", "Beta", "Alpha"]);
        assert_eq!(pinned[0].selected, vec![2]);
    }

    #[test]
    fn ranking_orders_ranked_fields_first() {
        let ranked = rank_navigations(
            vec![
                navigation("color", &["a"], vec![]),
                navigation("size", &["a"], vec![]),
                navigation("brand", &["a"], vec![]),
                navigation("fit", &["a"], vec![]),
            ],
            &["brand".to_string(), "size".to_string()],
        );

        let fields: Vec<_> = ranked.iter().map(|n| n.field.as_str()).collect();
        assert_eq!(fields, vec!["brand", "size", "color", "fit"]);
    }

    proptest! {
        #[test]
        fn prune_never_loses_a_selection(
            count in 1usize..30,
            picks in proptest::collection::btree_set(0usize..30, 0..5),
            max in 1usize..10,
        ) {
            let values: Vec<String> = (0..count).map(|i| format!("v{i}")).collect();
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            let selected: Vec<usize> = picks.into_iter().filter(|i| *i < count).collect();
            let before = navigation("f", &refs, selected.clone());
            let chosen: Vec<String> = before.selected_refinements().map(Refinement::label).collect();

            let after = prune(vec![before], max).remove(0);

            prop_assert!(after.selected.iter().all(|i| *i < after.refinements.len()));
            prop_assert!(after.refinements.len() <= max.max(selected.len()));
            let kept: Vec<String> = after.selected_refinements().map(Refinement::label).collect();
            prop_assert_eq!(kept, chosen);
        }
    }
}
