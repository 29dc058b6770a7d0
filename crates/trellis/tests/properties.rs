//! Property tests for identifier and name uniqueness and creator teardown.

mod common;

use std::collections::{BTreeSet, HashSet};

use common::{Panel, log};
use proptest::prelude::*;
use trellis::{RegistryError, Runtime, Uid};

const NAMES: [&str; 4] = ["Win", "Out", "Log", ""];

/// One registry operation. Indices pick among ids handed out so far.
#[derive(Debug, Clone)]
enum Op {
    Create { creator: Option<usize> },
    Destroy { target: usize, keep_parents: bool },
    Alias { target: usize, name: usize },
    UniqueName { target: usize, name: usize },
    Parent { child: usize, parent: Option<usize> },
    DestroyTree { creator: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::option::of(any::<usize>()).prop_map(|creator| Op::Create { creator }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(target, keep_parents)| Op::Destroy { target, keep_parents }),
        2 => (any::<usize>(), 0..NAMES.len()).prop_map(|(target, name)| Op::Alias { target, name }),
        1 => (any::<usize>(), 0..NAMES.len())
            .prop_map(|(target, name)| Op::UniqueName { target, name }),
        2 => (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(child, parent)| Op::Parent { child, parent }),
        1 => any::<usize>().prop_map(|creator| Op::DestroyTree { creator }),
    ]
}

fn pick(issued: &[Uid], index: usize) -> Uid {
    if issued.is_empty() {
        Uid::INVALID
    } else {
        issued[index % issued.len()]
    }
}

fn assert_names_unique(rt: &Runtime) {
    let mut aliases = HashSet::new();
    let mut unique_names = HashSet::new();
    for id in rt.live_ids() {
        let record = rt.lookup(id).unwrap();
        if let Some(alias) = record.alias() {
            assert!(aliases.insert(alias.to_string()), "alias {alias} held twice");
            assert_eq!(rt.lookup_by_alias(alias).unwrap().id(), id);
        }
        if let Some(name) = record.unique_name() {
            assert!(unique_names.insert(name.to_string()), "unique name {name} held twice");
            assert_eq!(rt.lookup_by_unique_name(name).unwrap().id(), id);
        }
    }
}

proptest! {
    /// Property: ids are never reused and names stay unique across live objects.
    #[test]
    fn prop_ids_and_names_unique(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let events = log();
        let mut rt = Runtime::new();
        let mut issued: Vec<Uid> = Vec::new();
        let mut dead: BTreeSet<Uid> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Create { creator } => {
                    let creator = creator.map_or(Uid::INVALID, |i| pick(&issued, i));
                    match rt.create(creator, Panel::new("node", &events)) {
                        Ok(id) => {
                            prop_assert!(issued.last().is_none_or(|&last| id > last));
                            issued.push(id);
                        }
                        Err(err) => {
                            prop_assert_eq!(err, RegistryError::UnknownCreator(creator));
                        }
                    }
                }
                Op::Destroy { target, keep_parents } => {
                    let id = pick(&issued, target);
                    let _ = rt.destroy(id, keep_parents);
                }
                Op::Alias { target, name } => {
                    let _ = rt.set_alias(pick(&issued, target), NAMES[name]);
                }
                Op::UniqueName { target, name } => {
                    let _ = rt.set_unique_name(pick(&issued, target), NAMES[name]);
                }
                Op::Parent { child, parent } => {
                    let parent = parent.map(|i| pick(&issued, i));
                    let _ = rt.set_parent(pick(&issued, child), parent);
                }
                Op::DestroyTree { creator } => {
                    rt.destroy_creator_tree(pick(&issued, creator));
                }
            }

            for &id in &issued {
                if !rt.is_live(id) {
                    dead.insert(id);
                }
            }
            for &id in &dead {
                prop_assert!(rt.lookup(id).is_none());
            }
            assert_names_unique(&rt);
        }
    }

    /// Property: a creator teardown leaves nothing the creator made alive,
    /// whatever the creation and containment order.
    #[test]
    fn prop_creator_tree_leaves_nothing(
        creators in prop::collection::vec(any::<usize>(), 1..40),
        parents in prop::collection::vec(proptest::option::of(any::<usize>()), 1..40),
        victim in any::<usize>(),
    ) {
        let events = log();
        let mut rt = Runtime::new();
        let root = rt.create(Uid::INVALID, Panel::new("root", &events)).unwrap();
        let mut issued = vec![root];
        for creator in creators {
            let creator = pick(&issued, creator);
            issued.push(rt.create(creator, Panel::new("node", &events)).unwrap());
        }
        for (child, parent) in issued.clone().into_iter().zip(parents) {
            let _ = rt.set_parent(child, parent.map(|i| pick(&issued, i)));
        }

        let victim = pick(&issued, victim);
        rt.destroy_creator_tree(victim);

        prop_assert!(!rt.is_live(victim));
        prop_assert!(rt.created_by(victim).is_empty());
        for id in rt.live_ids() {
            prop_assert_ne!(rt.creator_of(id).unwrap(), victim);
        }
    }
}
