// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for tree merging.

use proptest::prelude::*;
use understory_custom::{
    Component, Decision, FlagSet, MemoContainer, MergeConfig, MergeFlag, Tree, Value,
    merge_customizations, reuse_unchanged,
};

fn arb_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(String::from)
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z]{0,3}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn arb_tree() -> impl Strategy<Value = Tree> {
    tree_of(arb_leaf())
}

fn arb_component() -> impl Strategy<Value = Value> {
    (prop::sample::select(vec!["div", "span"]), "[a-z]{1,3}").prop_map(|(tag, class)| {
        Value::from(Component::new(tag).with_defaults(Tree::new().with("className", class)))
    })
}

/// Trees whose leaves may also be components.
fn arb_unit_tree() -> impl Strategy<Value = Tree> {
    tree_of(prop_oneof![3 => arb_leaf(), 2 => arb_component()])
}

fn tree_of(leaf: impl Strategy<Value = Value> + 'static) -> impl Strategy<Value = Tree> {
    let value = leaf.prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec((arb_key(), inner), 0..4)
            .prop_map(|fields| Value::from(build(fields)))
    });
    prop::collection::vec((arb_key(), value), 0..5).prop_map(build)
}

fn arb_flags() -> impl Strategy<Value = FlagSet> {
    prop_oneof![
        Just(FlagSet::default()),
        Just(FlagSet::from_flags([MergeFlag::AvoidAnyMerging])),
        Just(FlagSet::from_flags([MergeFlag::AvoidMergingDifferentComponents])),
    ]
}

fn build(fields: Vec<(String, Value)>) -> Tree {
    fields
        .into_iter()
        .fold(Tree::new(), |tree, (key, value)| tree.with(key, value))
}

/// Rebuilds `tree` so that no nested tree is shared with the input.
fn deep_copy(tree: &Tree) -> Tree {
    tree.iter().fold(Tree::new(), |out, (key, value)| {
        let value = match value {
            Value::Tree(nested) => Value::from(deep_copy(nested)),
            other => other.clone(),
        };
        out.with(key.clone(), value)
    })
}

fn merge(high: &Tree, low: &Tree, memo: &mut MemoContainer) -> Tree {
    merge_customizations(high, low, memo, &MergeConfig::new())
}

/// Replaces components with what they render, so results compare by value.
fn observable(tree: &Tree) -> Tree {
    tree.iter().fold(Tree::new(), |out, (key, value)| {
        let value = match value {
            Value::Tree(nested) => Value::from(observable(nested)),
            Value::Unit(unit) => match unit.as_component() {
                Some(component) => Value::from(
                    Tree::new()
                        .with("primitive", component.primitive().map_or("", |p| p.name()))
                        .with("props", component.merged_props(&Tree::new())),
                ),
                None => value.clone(),
            },
            other => other.clone(),
        };
        out.with(key.clone(), value)
    })
}

/// Places `shared` under both `x` and `y` of `rest`.
fn with_shared(rest: Tree, shared: &Tree) -> Tree {
    rest.with("x", shared.clone()).with("y", shared.clone())
}

proptest! {
    /// Merging a tree with an equal copy of itself changes nothing.
    #[test]
    fn self_merge_is_identity(tree in arb_tree()) {
        let mut memo = MemoContainer::new();
        let merged = merge(&tree, &deep_copy(&tree), &mut memo);
        prop_assert_eq!(merged, tree);
    }

    /// Every key of either side survives, and the higher side wins on scalars.
    #[test]
    fn high_side_wins_and_nothing_is_lost(high in arb_tree(), low in arb_tree()) {
        let mut memo = MemoContainer::new();
        let merged = merge(&high, &low, &mut memo);
        for (key, low_value) in low.iter() {
            let expected = match high.get(key) {
                Some(Value::Tree(_)) if matches!(low_value, Value::Tree(_)) => continue,
                Some(high_value) => high_value,
                None => low_value,
            };
            prop_assert_eq!(merged.get(key), Some(expected));
        }
        for (key, high_value) in high.iter() {
            prop_assert!(merged.contains_key(key), "lost {key}");
            if !low.contains_key(key) {
                prop_assert!(merged.get(key).unwrap().same(high_value));
            }
        }
    }

    /// A warm memo gives the same answers as a cold one.
    #[test]
    fn memo_is_transparent(a in arb_tree(), b in arb_tree(), c in arb_tree()) {
        let mut warm = MemoContainer::new();
        let _ = merge(&a, &b, &mut warm);
        let _ = merge(&b, &c, &mut warm);
        let warm_result = merge(&a, &c, &mut warm);

        let mut cold = MemoContainer::new();
        prop_assert_eq!(warm_result, merge(&a, &c, &mut cold));
    }

    /// Re-resolving to an equal tree hands back the previous object.
    #[test]
    fn reuse_unchanged_returns_previous(tree in arb_tree()) {
        let reused = reuse_unchanged(&tree, &deep_copy(&tree));
        prop_assert!(reused.ptr_eq(&tree));
    }

    /// Shared unit subtrees merge the same with a warm memo under any flags.
    #[test]
    fn memo_is_transparent_for_units(
        shared_high in arb_unit_tree(),
        shared_low in arb_unit_tree(),
        rest_high in arb_unit_tree(),
        rest_low in arb_unit_tree(),
        warm_flags in arb_flags(),
        flags in arb_flags(),
    ) {
        let high = with_shared(rest_high, &shared_high);
        let low = with_shared(rest_low, &shared_low);
        let config = MergeConfig::new().flags(flags);

        let mut warm = MemoContainer::new();
        let _ = merge_customizations(&high, &low, &mut warm, &MergeConfig::new().flags(warm_flags));
        let _ = merge_customizations(&shared_high, &shared_low, &mut warm, &config);
        let warm_result = merge_customizations(&high, &low, &mut warm, &config);

        let cold_result = merge_customizations(&high, &low, &mut MemoContainer::new(), &config);
        prop_assert_eq!(observable(&warm_result), observable(&cold_result));
    }

    /// A decision applies per path even where both paths hold the same objects.
    #[test]
    fn decisions_are_path_local(
        shared_high in arb_unit_tree(),
        shared_low in arb_unit_tree(),
        rest_high in arb_tree(),
        rest_low in arb_tree(),
    ) {
        let high = with_shared(rest_high, &shared_high);
        let low = with_shared(rest_low, &shared_low);
        let decided = MergeConfig::new().decision(|path, _, _| {
            if path.starts_with("x.") {
                Decision::Skip
            } else {
                Decision::Merge
            }
        });

        let mut memo = MemoContainer::new();
        let _ = merge(&high, &low, &mut memo);
        let merged = merge_customizations(&high, &low, &mut memo, &decided);

        let x = merged.get("x").and_then(Value::as_tree).unwrap();
        for (key, value) in shared_high.iter() {
            prop_assert!(x.get(key).unwrap().same(value), "x.{key} was merged");
        }
        let y = merged.get("y").and_then(Value::as_tree).unwrap();
        let undecided = merge(&shared_high, &shared_low, &mut MemoContainer::new());
        prop_assert_eq!(observable(y), observable(&undecided));
    }
}
