//! Structural checks for [`RBTree`].
//!
//! These walk the tree through its public [`NodeRef`] view only, so a bug in
//! the balancing code can't hide itself from them.

use thiserror::Error;

use crate::rbtree::{Color, NodeRef, RBTree};

/// The first red-black property a tree was found to break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation<K> {
    #[error("root was not black")]
    RedRoot,
    /// `child` is `None` when the red "child" is the sentinel.
    #[error("red node {parent:?} has a red child ({child:?})")]
    RedChildOfRed { parent: K, child: Option<K> },
    #[error("there were duplicate keys ({key:?})")]
    DuplicateKey { key: K },
    #[error("keys were not in order: {keys:?}")]
    KeysOutOfOrder { keys: Vec<K> },
    #[error("the number of black nodes was off below {key:?} (left {left}, right {right})")]
    BlackHeightMismatch { key: K, left: usize, right: usize },
    #[error("the nil node became red")]
    RedSentinel,
}

/// Checks `tree` against the red-black invariants, in order:
///
/// 1. the root is black (skipped for an empty tree),
/// 2. no red node has a red child,
/// 3. the in-order key sequence is strictly increasing,
/// 4. every path down to the sentinel crosses the same number of black nodes,
/// 5. the sentinel is still black.
///
/// Stops at the first broken invariant. Never panics and never mutates.
pub fn check<K: Ord + Clone>(tree: &RBTree<K>) -> Result<(), Violation<K>> {
    let root = tree.root();

    if !root.is_nil() && root.color() != Color::Black {
        return Err(Violation::RedRoot);
    }

    check_red_children(root)?;
    check_key_order(root)?;
    black_height(root)?;

    if tree.sentinel().color() != Color::Black {
        return Err(Violation::RedSentinel);
    }

    Ok(())
}

pub fn is_valid<K: Ord + Clone>(tree: &RBTree<K>) -> bool {
    check(tree).is_ok()
}

impl<K: Ord + Clone> RBTree<K> {
    /// Shorthand for [`check`].
    pub fn check(&self) -> Result<(), Violation<K>> {
        check(self)
    }
}

fn check_red_children<K: Clone>(node: NodeRef<'_, K>) -> Result<(), Violation<K>> {
    let Some(key) = node.key() else { return Ok(()) };

    check_red_children(node.left())?;
    if node.color().is_red() {
        for child in [node.left(), node.right()] {
            if child.color().is_red() {
                return Err(Violation::RedChildOfRed {
                    parent: key.clone(),
                    child: child.key().cloned(),
                });
            }
        }
    }
    check_red_children(node.right())
}

fn check_key_order<K: Ord + Clone>(root: NodeRef<'_, K>) -> Result<(), Violation<K>> {
    let keys: Vec<&K> = root.inorder_walk().collect();

    // uniqueness first, over the whole sequence, since an unordered walk can
    // hide equal keys far apart
    let mut sorted = keys.clone();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(Violation::DuplicateKey { key: pair[0].clone() });
    }

    if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(Violation::KeysOutOfOrder {
            keys: keys.into_iter().cloned().collect(),
        });
    }

    Ok(())
}

/// Black nodes from `node` (inclusive) down to a sentinel, where the sentinel
/// counts as one no matter how it is painted.
///
/// Computed bottom-up; fails at the first node whose two subtrees disagree.
fn black_height<K: Clone>(node: NodeRef<'_, K>) -> Result<usize, Violation<K>> {
    let Some(key) = node.key() else { return Ok(1) };

    let left = black_height(node.left())?;
    let right = black_height(node.right())?;
    if left != right {
        return Err(Violation::BlackHeightMismatch { key: key.clone(), left, right });
    }

    Ok(left + usize::from(node.color().is_black()))
}
