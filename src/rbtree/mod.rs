use std::fmt;
use std::marker::PhantomData;

use log::trace;
use thiserror::Error;

mod node;
mod render;
mod walk;

pub use node::{Color, NodeRef};
pub use walk::InorderWalk;

use node::{NodePtr, RBTreeNode, Side};

/// A red-black tree of unique keys.
///
/// Nodes are linked with raw pointers. Absent children (and the root's
/// parent) point at a single sentinel node owned by the tree, so the
/// balancing code can read `.color` and `.parent` of any slot without
/// checking for null.
pub struct RBTree<K> {
    root: NodePtr<K>,
    nil: NodePtr<K>,
    len: usize,
    rotations: usize,
    _owns: PhantomData<Box<RBTreeNode<K>>>,
}

// SAFETY: the tree exclusively owns all of its nodes; no pointer into it is
//         ever shared outside of a borrow of the tree itself.
unsafe impl<K: Send> Send for RBTree<K> {}
unsafe impl<K: Sync> Sync for RBTree<K> {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError<K> {
    #[error("key {0:?} is already in the tree")]
    DuplicateKey(K),
}

/// The three shapes `insert_fixup` can find a red-red violation in.
///
/// Each one exists in two mirrored forms depending on which side of the
/// grandparent the parent hangs from; that side is carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixupCase {
    UncleRed,
    UncleBlackSameSide,
    UncleBlackOppositeSide,
}

impl FixupCase {
    fn classify(uncle: Color, parent_side: Side, node_side: Side) -> Self {
        match (uncle, parent_side == node_side) {
            (Color::Red, _) => Self::UncleRed,
            (Color::Black, true) => Self::UncleBlackSameSide,
            (Color::Black, false) => Self::UncleBlackOppositeSide,
        }
    }
}

impl<K> RBTree<K> {
    pub fn new() -> Self {
        let nil = RBTreeNode::new_sentinel();
        Self {
            root: nil,
            nil,
            len: 0,
            rotations: 0,
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root == self.nil
    }

    /// Total number of rotations performed by insertions so far.
    pub fn rotations(&self) -> usize {
        self.rotations
    }

    /// The root node. This is the sentinel when the tree is empty.
    pub fn root(&self) -> NodeRef<'_, K> {
        // SAFETY: `self` is borrowed for the lifetime of the handle.
        unsafe { NodeRef::new(self.root, self.nil) }
    }

    pub fn sentinel(&self) -> NodeRef<'_, K> {
        // SAFETY: `self` is borrowed for the lifetime of the handle.
        unsafe { NodeRef::new(self.nil, self.nil) }
    }

    /// Number of nodes on the longest root-to-leaf path.
    ///
    /// A subtree with black height `bh` holds at least `2^bh - 1` nodes, and
    /// no path has more red nodes than black ones, so this is at most
    /// `2 * log2(len + 1)`.
    pub fn height(&self) -> usize {
        self.root().height()
    }

    /// Black nodes from the root (exclusive) down to a sentinel (inclusive),
    /// measured along the leftmost path.
    pub fn black_height(&self) -> usize {
        let mut node = self.root();
        let mut count = 0;
        while !node.is_nil() {
            node = node.left();
            if node.color().is_black() {
                count += 1;
            }
        }
        count
    }

    /// All keys in ascending order.
    pub fn inorder_walk(&self) -> InorderWalk<'_, K> {
        self.root().inorder_walk()
    }

    // The accessors below take pointers that came out of this tree. Every
    // such pointer is either the sentinel or a node leaked from a `Box` in
    // `RBTreeNode::new_leaf`, and stays valid until the tree is dropped.

    fn key(&self, node: NodePtr<K>) -> Option<&K> {
        // SAFETY: see above.
        unsafe { (*node.as_ptr()).key.as_ref() }
    }

    fn color(&self, node: NodePtr<K>) -> Color {
        // SAFETY: see above.
        unsafe { (*node.as_ptr()).color }
    }

    fn set_color(&mut self, node: NodePtr<K>, color: Color) {
        debug_assert!(node != self.nil || color == Color::Black, "painted the sentinel red");
        // SAFETY: see above; `&mut self` rules out any live `NodeRef`.
        unsafe { (*node.as_ptr()).color = color }
    }

    fn parent(&self, node: NodePtr<K>) -> NodePtr<K> {
        // SAFETY: see above.
        unsafe { (*node.as_ptr()).parent }
    }

    fn set_parent(&mut self, node: NodePtr<K>, parent: NodePtr<K>) {
        // SAFETY: see above; `&mut self` rules out any live `NodeRef`.
        unsafe { (*node.as_ptr()).parent = parent }
    }

    fn child(&self, node: NodePtr<K>, side: Side) -> NodePtr<K> {
        // SAFETY: see above.
        unsafe { (*node.as_ptr()).child(side) }
    }

    fn set_child(&mut self, node: NodePtr<K>, side: Side, child: NodePtr<K>) {
        // SAFETY: see above; `&mut self` rules out any live `NodeRef`.
        unsafe { *(*node.as_ptr()).child_mut(side) = child }
    }

    /// Which side of its parent `node` is on. `node` must not be the root.
    fn side_of(&self, node: NodePtr<K>) -> Side {
        if self.child(self.parent(node), Side::Left) == node {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Rotates `x` down towards `dir`, promoting its child on the other side.
    ///
    /// ```txt
    ///     X                 Y
    ///    / \               / \
    ///   A   Y     ===>    X   C        (dir = Left)
    ///      / \           / \
    ///     B   C         A   B
    /// ```
    ///
    /// The promoted child must not be the sentinel. The sentinel's parent
    /// link is never written.
    fn rotate(&mut self, x: NodePtr<K>, dir: Side) {
        debug_assert_ne!(x, self.nil);
        let y = self.child(x, dir.opposite());
        debug_assert_ne!(y, self.nil, "rotating without a child to promote");

        let inner = self.child(y, dir);
        self.set_child(x, dir.opposite(), inner);
        if inner != self.nil {
            self.set_parent(inner, x);
        }

        let x_parent = self.parent(x);
        self.set_parent(y, x_parent);
        if x_parent == self.nil {
            self.root = y;
        } else {
            let side = self.side_of(x);
            self.set_child(x_parent, side, y);
        }

        self.set_child(y, dir, x);
        self.set_parent(x, y);

        self.rotations += 1;
        trace!("rotated {dir:?} (rotation #{})", self.rotations);
    }

    /// Links a new red node under `parent` and restores the invariants.
    fn attach(&mut self, key: K, parent: NodePtr<K>, side: Side) {
        let z = RBTreeNode::new_leaf(key, parent, self.nil);
        self.len += 1;

        if parent == self.nil {
            self.root = z;
            self.set_color(z, Color::Black);
            return;
        }

        self.set_child(parent, side, z);
        self.insert_fixup(z);
    }

    /// Walks up from a freshly inserted red node until no red node has a red
    /// parent, then paints the root black.
    fn insert_fixup(&mut self, mut z: NodePtr<K>) {
        // the root's parent is the (black) sentinel, so this also stops at the root
        while self.color(self.parent(z)).is_red() {
            let parent = self.parent(z);
            // a red node is never the root, so the grandparent is a real node
            let grandparent = self.parent(parent);
            let parent_side = self.side_of(parent);
            let uncle = self.child(grandparent, parent_side.opposite());

            let case = FixupCase::classify(self.color(uncle), parent_side, self.side_of(z));
            trace!("fixup: {case:?}, parent on the {parent_side:?}");

            match case {
                FixupCase::UncleRed => {
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    z = grandparent;
                }
                FixupCase::UncleBlackOppositeSide => {
                    // bring z up; the old parent becomes z's child on the outer side
                    self.rotate(parent, parent_side);
                    self.rotate_outer(parent, grandparent, parent_side);
                    break;
                }
                FixupCase::UncleBlackSameSide => {
                    self.rotate_outer(z, grandparent, parent_side);
                    break;
                }
            }
        }

        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// The terminal case: `z` and its parent both hang from the
    /// `parent_side` of their own parents.
    fn rotate_outer(&mut self, z: NodePtr<K>, grandparent: NodePtr<K>, parent_side: Side) {
        let parent = self.parent(z);
        self.set_color(parent, Color::Black);
        self.set_color(grandparent, Color::Red);
        self.rotate(grandparent, parent_side.opposite());
    }
}

impl<K: Ord> RBTree<K> {
    /// Inserts `key` and rebalances.
    ///
    /// `key` should not already be in the tree. If it is, the new node is
    /// placed to the right of the existing one (which `validate::check` then
    /// reports); use [`RBTree::try_insert`] to reject duplicates instead.
    pub fn insert(&mut self, key: K) {
        let (parent, side, _) = self.descend(&key);
        self.attach(key, parent, side);
    }

    /// Like [`RBTree::insert`], but leaves the tree untouched and hands the
    /// key back if an equal key is already present.
    pub fn try_insert(&mut self, key: K) -> Result<(), InsertError<K>> {
        let (parent, side, duplicate) = self.descend(&key);
        if duplicate {
            return Err(InsertError::DuplicateKey(key));
        }
        self.attach(key, parent, side);
        Ok(())
    }

    /// Finds the empty slot `key` belongs in: the last real node on the way
    /// down and which of its children to replace. Equal keys go right.
    fn descend(&self, key: &K) -> (NodePtr<K>, Side, bool) {
        let mut parent = self.nil;
        let mut side = Side::Left;
        let mut duplicate = false;

        let mut x = self.root;
        while let Some(x_key) = self.key(x) {
            parent = x;
            duplicate |= key == x_key;
            side = if key < x_key { Side::Left } else { Side::Right };
            x = self.child(x, side);
        }

        (parent, side, duplicate)
    }
}

impl<K> Default for RBTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for RBTree<K> {
    fn drop(&mut self) {
        let mut pending = vec![self.root];
        while let Some(node) = pending.pop() {
            if node == self.nil {
                continue;
            }
            // SAFETY: every real node was leaked from a box in `new_leaf` and
            //         is reachable from exactly one child slot (or the root).
            let node = unsafe { Box::from_raw(node.as_ptr()) };
            pending.push(node.left);
            pending.push(node.right);
        }

        // SAFETY: the sentinel was leaked from a box in `new_sentinel` and
        //         nothing points at it anymore.
        drop(unsafe { Box::from_raw(self.nil.as_ptr()) });
    }
}

impl<K: Ord> FromIterator<K> for RBTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord> Extend<K> for RBTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, K> IntoIterator for &'a RBTree<K> {
    type Item = &'a K;
    type IntoIter = InorderWalk<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.inorder_walk()
    }
}

impl<K: fmt::Debug> fmt::Debug for RBTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RBTree")
            .field("len", &self.len)
            .field("root", &self.root())
            .field("keys", &self.inorder_walk().collect::<Vec<_>>())
            .finish()
    }
}

// Hooks for corrupting a tree on purpose, so the validator's failure paths
// can be exercised.
#[cfg(test)]
impl<K: Ord> RBTree<K> {
    fn find(&self, key: &K) -> Option<NodePtr<K>> {
        let mut x = self.root;
        while let Some(x_key) = self.key(x) {
            x = match key.cmp(x_key) {
                std::cmp::Ordering::Equal => return Some(x),
                std::cmp::Ordering::Less => self.child(x, Side::Left),
                std::cmp::Ordering::Greater => self.child(x, Side::Right),
            };
        }
        None
    }

    pub(crate) fn force_color(&mut self, key: &K, color: Color) {
        let node = self.find(key).expect("no such key");
        unsafe { (*node.as_ptr()).color = color }
    }

    pub(crate) fn force_sentinel_color(&mut self, color: Color) {
        unsafe { (*self.nil.as_ptr()).color = color }
    }

    pub(crate) fn force_swap_keys(&mut self, a: &K, b: &K) {
        let a = self.find(a).expect("no such key");
        let b = self.find(b).expect("no such key");
        assert_ne!(a, b);
        unsafe { std::mem::swap(&mut (*a.as_ptr()).key, &mut (*b.as_ptr()).key) }
    }
}
