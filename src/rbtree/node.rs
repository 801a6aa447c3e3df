use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::walk::InorderWalk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn is_red(self) -> bool {
        matches!(self, Self::Red)
    }

    pub fn is_black(self) -> bool {
        matches!(self, Self::Black)
    }

    /// Single-letter tag used when rendering a tree.
    pub(crate) fn tag(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Black => 'B',
        }
    }
}

/// Which child slot of its parent a node hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

pub(crate) type NodePtr<K> = NonNull<RBTreeNode<K>>;

/// One node of an `RBTree`, or the tree's sentinel.
///
/// Every link is a real pointer: a missing child or parent points at the
/// sentinel of the owning tree. The sentinel itself has no key, is always
/// black, and its own links point back at itself.
pub(crate) struct RBTreeNode<K> {
    pub(super) color: Color,
    pub(super) key: Option<K>, // None for the sentinel
    pub(super) parent: NodePtr<K>,
    pub(super) left: NodePtr<K>,
    pub(super) right: NodePtr<K>,
}

impl<K> RBTreeNode<K> {
    pub(super) fn new_sentinel() -> NodePtr<K> {
        let ptr = NonNull::from(Box::leak(Box::new(Self {
            color: Color::Black,
            key: None,
            parent: NonNull::dangling(),
            left: NonNull::dangling(),
            right: NonNull::dangling(),
        })));

        // SAFETY: `ptr` was just leaked from a box, nothing else refers to it yet.
        unsafe {
            (*ptr.as_ptr()).parent = ptr;
            (*ptr.as_ptr()).left = ptr;
            (*ptr.as_ptr()).right = ptr;
        }
        ptr
    }

    /// A fresh red node with both children on the sentinel.
    pub(super) fn new_leaf(key: K, parent: NodePtr<K>, nil: NodePtr<K>) -> NodePtr<K> {
        NonNull::from(Box::leak(Box::new(Self {
            color: Color::Red,
            key: Some(key),
            parent,
            left: nil,
            right: nil,
        })))
    }

    pub(super) fn child(&self, side: Side) -> NodePtr<K> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(super) fn child_mut(&mut self, side: Side) -> &mut NodePtr<K> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// A read-only handle to a node (or the sentinel) of a borrowed tree.
///
/// Two handles compare equal when they point at the same node.
pub struct NodeRef<'a, K> {
    ptr: NodePtr<K>,
    nil: NodePtr<K>,
    _tree: PhantomData<&'a RBTreeNode<K>>,
}

impl<K> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for NodeRef<'_, K> {}

impl<K> PartialEq for NodeRef<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<K> Eq for NodeRef<'_, K> {}

impl<'a, K> NodeRef<'a, K> {
    /// SAFETY: `ptr` and `nil` must belong to a tree that stays alive and
    /// unmodified for `'a`.
    pub(super) unsafe fn new(ptr: NodePtr<K>, nil: NodePtr<K>) -> Self {
        Self { ptr, nil, _tree: PhantomData }
    }

    fn node(&self) -> &'a RBTreeNode<K> {
        // SAFETY: the tree outlives 'a and is borrowed immutably for all of it.
        unsafe { &*self.ptr.as_ptr() }
    }

    fn relink(&self, ptr: NodePtr<K>) -> Self {
        // SAFETY: every link of a node points into the same tree.
        unsafe { Self::new(ptr, self.nil) }
    }

    pub fn is_nil(&self) -> bool {
        self.ptr == self.nil
    }

    pub fn color(&self) -> Color {
        self.node().color
    }

    /// The node's key, or `None` for the sentinel.
    pub fn key(&self) -> Option<&'a K> {
        self.node().key.as_ref()
    }

    pub fn left(&self) -> Self {
        self.relink(self.node().left)
    }

    pub fn right(&self) -> Self {
        self.relink(self.node().right)
    }

    pub fn parent(&self) -> Self {
        self.relink(self.node().parent)
    }

    pub fn is_left_child(&self) -> bool {
        !self.is_nil() && self.parent().left() == *self
    }

    /// Number of nodes on the longest path from here down to a leaf.
    pub fn height(&self) -> usize {
        if self.is_nil() {
            0
        } else {
            1 + self.left().height().max(self.right().height())
        }
    }

    /// Keys of this subtree in ascending order.
    pub fn inorder_walk(&self) -> InorderWalk<'a, K> {
        InorderWalk::new(*self)
    }
}

impl<K: fmt::Debug> fmt::Debug for NodeRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => f
                .debug_struct("NodeRef")
                .field("key", key)
                .field("color", &self.color())
                .finish(),
            None => f
                .debug_struct("NodeRef")
                .field("key", &"NIL")
                .field("color", &self.color())
                .finish(),
        }
    }
}
