//! Property-based invariant tests for the field tree.
//!
//! Trees are grown from random edit sequences, so every tree here is one the
//! mutator can actually produce. Verified for any such tree:
//!
//! 1. Ids are unique and the arena stays consistent after every edit.
//! 2. A failed edit leaves the tree unchanged.
//! 3. Encoding then decoding preserves the structure (ids aside).
//! 4. Moving a node under itself or a descendant is refused.
//! 5. Up then down restores sibling order.
//! 6. Delete removes the whole subtree and nothing else.
//! 7. Edits to a clone never reach the original, and vice versa.

use std::collections::HashSet;

use form_tree::wire::{self, shape};
use form_tree::{AttrKey, Attributes, FieldId, FieldNode, FieldTree, FormError};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Insert {
        parent: Option<usize>,
        parent_type: bool,
        code: u8,
    },
    Clone(usize),
    Delete(usize),
    Move(usize, usize),
    Up(usize),
    Down(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (proptest::option::of(0usize..64), any::<bool>(), any::<u8>()).prop_map(
            |(parent, parent_type, code)| Step::Insert { parent, parent_type, code }
        ),
        1 => (0usize..64).prop_map(Step::Clone),
        1 => (0usize..64).prop_map(Step::Delete),
        2 => (0usize..64, 0usize..64).prop_map(|(a, b)| Step::Move(a, b)),
        2 => (0usize..64).prop_map(Step::Up),
        2 => (0usize..64).prop_map(Step::Down),
    ]
}

fn steps_strategy() -> impl Strategy<Value = Vec<Step>> {
    proptest::collection::vec(step_strategy(), 0..40)
}

fn ids(tree: &FieldTree) -> Vec<FieldId> {
    tree.depth_first().iter().map(|n| n.id()).collect()
}

/// Node at `index` (wrapped) in depth-first order, or an unknown id
fn pick(tree: &FieldTree, index: usize) -> FieldId {
    let all = ids(tree);
    if all.is_empty() {
        FieldId::new()
    } else {
        all[index % all.len()]
    }
}

fn node(parent_type: bool, code: u8) -> FieldNode {
    let field_type = if parent_type { "header" } else { "text" };
    FieldNode::with_attributes(
        Attributes::new()
            .with(AttrKey::Code, format!("f{code}"))
            .with(AttrKey::FieldType, field_type)
            .with(AttrKey::SortOrder, i64::from(code))
            .with(AttrKey::IsRtl, code % 2 == 0),
    )
}

fn run(tree: &mut FieldTree, step: &Step) -> Result<(), FormError> {
    match *step {
        Step::Insert { parent, parent_type, code } => {
            let parent = parent.map(|i| pick(tree, i));
            tree.insert(parent, node(parent_type, code)).map(|_| ())
        }
        Step::Clone(i) => tree.clone_subtree(pick(tree, i)).map(|_| ()),
        Step::Delete(i) => tree.delete(pick(tree, i)).map(|_| ()),
        Step::Move(a, b) => {
            let (source, target) = (pick(tree, a), pick(tree, b));
            tree.move_to_parent(source, target)
        }
        Step::Up(i) => tree.move_up(pick(tree, i)).map(|_| ()),
        Step::Down(i) => tree.move_down(pick(tree, i)).map(|_| ()),
    }
}

fn build(steps: &[Step]) -> FieldTree {
    let mut tree = FieldTree::new();
    for step in steps {
        let _ = run(&mut tree, step);
    }
    tree
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. Uniqueness, consistency and atomic failure
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ids_unique_and_arena_consistent(steps in steps_strategy()) {
        let mut tree = FieldTree::new();
        for step in &steps {
            let before = tree.clone();
            if run(&mut tree, step).is_err() {
                prop_assert_eq!(&tree, &before, "failed {:?} changed the tree", step);
            }
            prop_assert!(tree.check_integrity(), "inconsistent after {:?}", step);
            let all = ids(&tree);
            let unique: HashSet<_> = all.iter().collect();
            prop_assert_eq!(unique.len(), all.len());
            prop_assert_eq!(all.len(), tree.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn encode_decode_round_trip(steps in steps_strategy()) {
        let tree = build(&steps);
        let decoded = wire::decode(wire::encode(&tree).unwrap()).unwrap();
        prop_assert_eq!(shape(&decoded), shape(&tree));

        let json = wire::to_json(&tree).unwrap();
        let reparsed = wire::from_json(json).unwrap();
        prop_assert_eq!(shape(&reparsed), shape(&tree));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Cycle safety
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn move_into_own_subtree_refused(steps in steps_strategy(), i in 0usize..64, j in 0usize..64) {
        let mut tree = build(&steps);
        prop_assume!(!tree.is_empty());
        let source = pick(&tree, i);
        let subtree = tree.subtree_ids(source);
        let target = subtree[j % subtree.len()];
        let before = tree.clone();
        let refused = matches!(
            tree.move_to_parent(source, target),
            Err(FormError::CycleRejected { .. })
        );
        prop_assert!(refused);
        prop_assert_eq!(tree, before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Swap idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn up_then_down_restores_order(steps in steps_strategy(), i in 0usize..64) {
        let mut tree = build(&steps);
        prop_assume!(!tree.is_empty());
        let id = pick(&tree, i);
        let siblings = tree.siblings_of(id).unwrap().to_vec();
        prop_assume!(siblings.first() != Some(&id));

        prop_assert!(tree.move_up(id).unwrap());
        prop_assert!(tree.move_down(id).unwrap());
        prop_assert_eq!(tree.siblings_of(id).unwrap(), siblings.as_slice());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Delete totality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn delete_removes_exactly_the_subtree(steps in steps_strategy(), i in 0usize..64) {
        let mut tree = build(&steps);
        prop_assume!(!tree.is_empty());
        let id = pick(&tree, i);
        let doomed = tree.subtree_ids(id);
        let survivors: Vec<_> = ids(&tree).into_iter().filter(|n| !doomed.contains(n)).collect();

        prop_assert_eq!(tree.delete(id).unwrap(), doomed.len());
        let remaining = ids(&tree);
        for gone in &doomed {
            prop_assert!(tree.find_by_id(*gone).is_none());
            prop_assert!(!remaining.contains(gone));
        }
        prop_assert_eq!(remaining, survivors);
        prop_assert!(tree.check_integrity());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Clone independence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clone_is_independent(steps in steps_strategy(), i in 0usize..64) {
        let mut tree = build(&steps);
        prop_assume!(!tree.is_empty());
        let original = pick(&tree, i);
        let copy = tree.clone_subtree(original).unwrap();

        let snapshot = |tree: &FieldTree, root: FieldId| {
            tree.subtree_ids(root)
                .into_iter()
                .map(|id| {
                    let n = tree.find_by_id(id).unwrap();
                    (n.attributes.clone(), n.children().len())
                })
                .collect::<Vec<_>>()
        };
        let original_before = snapshot(&tree, original);
        prop_assert_eq!(&snapshot(&tree, copy), &original_before);

        let copied: HashSet<_> = tree.subtree_ids(copy).into_iter().collect();
        prop_assert!(tree.subtree_ids(original).iter().all(|id| !copied.contains(id)));

        // mutate the copy
        for id in tree.subtree_ids(copy) {
            tree.update(id, Attributes::new().with(AttrKey::Code, "changed")).unwrap();
        }
        tree.insert(Some(copy), node(false, 0)).unwrap();
        prop_assert_eq!(&snapshot(&tree, original), &original_before);

        // and the original
        let copy_before = snapshot(&tree, copy);
        tree.update(original, Attributes::new()).unwrap();
        tree.insert(Some(original), node(true, 1)).unwrap();
        prop_assert_eq!(snapshot(&tree, copy), copy_before);
    }
}
