use super::*;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;

fn collect_leaves<K: Key, A: NodeAllocator<K>>(set: &CritbitSet<K, A>, r: Ref<K>, out: &mut Vec<K>) {
    if r.is_node() {
        let node = *set.alloc.node(r.node_index());
        collect_leaves(set, node.next[0], out);
        collect_leaves(set, node.next[1], out);
    } else {
        out.push(r.key());
    }
}

fn check_subtree<K: Key, A: NodeAllocator<K>>(
    set: &CritbitSet<K, A>,
    r: Ref<K>,
    parent_crit: Option<u32>,
) -> usize {
    if !r.is_node() {
        let key = r.key();
        assert!(
            key != K::ZERO && !key.low_bit(),
            "leaf must be a nonzero even key"
        );
        return 1;
    }

    let node = *set.alloc.node(r.node_index());
    if let Some(parent) = parent_crit {
        assert!(
            node.crit_bit > parent,
            "crit bits must strictly increase along paths"
        );
    }
    assert!(node.crit_bit < K::BITS - 1, "crit bit out of key range");

    let mut leaves = 0;
    for side in 0..2 {
        let child = node.next[side];
        assert!(!child.is_empty(), "internal nodes must have two children");

        let mut keys = Vec::new();
        collect_leaves(set, child, &mut keys);
        for key in keys {
            assert_eq!(
                key.bit(node.crit_bit) as usize,
                side,
                "branch bit must match child slot"
            );
        }

        leaves += check_subtree(set, child, Some(node.crit_bit));
    }
    leaves
}

fn validate_set<K: Key, A: NodeAllocator<K>>(set: &CritbitSet<K, A>) {
    if set.root.is_empty() {
        assert_eq!(set.len(), 0);
        return;
    }

    let leaves = check_subtree(set, set.root, None);
    assert_eq!(leaves, set.len(), "reachable leaf count must match len");

    let keys: Vec<K> = set.iter().collect();
    assert_eq!(keys.len(), set.len());
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "iteration must be strictly ascending");
    }
}

#[derive(Clone, Copy, Debug)]
enum Op<K> {
    Insert(K),
    Remove(K),
    Contains(K),
}

fn key_strategy_u64() -> impl Strategy<Value = u64> + Clone {
    prop_oneof![
        // Mostly a small universe so removes and duplicate inserts hit.
        4 => (1u64..=512).prop_map(|k| k << 1),
        1 => (1u64..=(u64::MAX >> 1)).prop_map(|k| k << 1),
    ]
}

fn key_strategy_u32() -> impl Strategy<Value = u32> + Clone {
    prop_oneof![
        4 => (1u32..=512).prop_map(|k| k << 1),
        1 => (1u32..=(u32::MAX >> 1)).prop_map(|k| k << 1),
    ]
}

fn ops_strategy<K: Key>(
    key: impl Strategy<Value = K> + Clone,
) -> impl Strategy<Value = Vec<Op<K>>> {
    let op = prop_oneof![
        50 => key.clone().prop_map(Op::Insert),
        25 => key.clone().prop_map(Op::Remove),
        25 => key.prop_map(Op::Contains),
    ];
    prop::collection::vec(op, 0..=2000)
}

fn run_equivalence<K: Key>(ops: Vec<Op<K>>) -> Result<(), TestCaseError> {
    let mut set: CritbitSet<K> = CritbitSet::with_allocator(NodeArena::new());
    let mut reference: BTreeSet<K> = BTreeSet::new();

    for op in ops {
        match op {
            Op::Insert(key) => prop_assert_eq!(set.insert(key), reference.insert(key)),
            Op::Remove(key) => prop_assert_eq!(set.remove(key), reference.remove(&key)),
            Op::Contains(key) => prop_assert_eq!(set.contains(key), reference.contains(&key)),
        }
        prop_assert_eq!(set.len(), reference.len());
    }

    validate_set(&set);
    let got: Vec<K> = set.iter().collect();
    let expected: Vec<K> = reference.iter().copied().collect();
    prop_assert_eq!(got, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_u64(ops in ops_strategy(key_strategy_u64())) {
        run_equivalence(ops)?;
    }

    #[test]
    fn prop_equivalence_u32(ops in ops_strategy(key_strategy_u32())) {
        run_equivalence(ops)?;
    }

    #[test]
    fn prop_sort_dedup(keys in prop::collection::vec(key_strategy_u64(), 0..=512)) {
        let mut keys = keys;
        let mut expected = keys.clone();
        expected.sort_unstable();
        expected.dedup();

        let m = sort_dedup(&mut keys);
        prop_assert_eq!(m, expected.len());
        prop_assert_eq!(&keys[..m], &expected[..]);
    }

    #[test]
    fn prop_first_last(keys in prop::collection::vec(key_strategy_u64(), 1..=64)) {
        let set: CritbitSet<u64> = keys.iter().copied().collect();
        prop_assert_eq!(set.first(), keys.iter().copied().min());
        prop_assert_eq!(set.last(), keys.iter().copied().max());
    }
}

fn for_each_permutation(items: &[u64], mut f: impl FnMut(&[u64])) {
    fn rec(items: &[u64], used: &mut [bool], out: &mut Vec<u64>, f: &mut impl FnMut(&[u64])) {
        if out.len() == items.len() {
            f(out);
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i]);
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = [2u64, 4, 6, 0x10, 0x8000_0000_0000_0000, u64::MAX - 1];
    let mut expected = keys.to_vec();
    expected.sort_unstable();

    for_each_permutation(&keys, |perm| {
        let mut set: CritbitSet<u64> = CritbitSet::new();
        for &key in perm {
            assert!(set.insert(key));
        }
        validate_set(&set);
        assert_eq!(set.iter().collect::<Vec<_>>(), expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = [2u64, 4, 6, 0x10, 0x8000_0000_0000_0000, u64::MAX - 1];
    let mut base: CritbitSet<u64> = CritbitSet::new();
    for &key in &keys {
        assert!(base.insert(key));
    }

    for_each_permutation(&keys, |perm| {
        let mut set = base.clone();
        for &key in perm {
            assert!(set.remove(key));
            validate_set(&set);
        }
        assert!(set.is_empty());
    });
}
