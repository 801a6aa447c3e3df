use std::iter::FusedIterator;

use super::node::NodeRef;

/// Lazy in-order walk over the keys below a node.
///
/// Holds the chain of nodes whose left subtree is being visited, so it only
/// ever needs `O(height)` memory. Walks are independent of each other: the
/// tree is borrowed immutably, so any number of them can run side by side.
pub struct InorderWalk<'a, K> {
    stack: Vec<NodeRef<'a, K>>,
}

impl<'a, K> InorderWalk<'a, K> {
    pub(crate) fn new(start: NodeRef<'a, K>) -> Self {
        let mut walk = Self { stack: Vec::new() };
        walk.push_left_spine(start);
        walk
    }

    fn push_left_spine(&mut self, mut node: NodeRef<'a, K>) {
        while !node.is_nil() {
            self.stack.push(node);
            node = node.left();
        }
    }
}

impl<K> Clone for InorderWalk<'_, K> {
    fn clone(&self) -> Self {
        Self { stack: self.stack.clone() }
    }
}

impl<'a, K> Iterator for InorderWalk<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right());
        node.key()
    }
}

impl<K> FusedIterator for InorderWalk<'_, K> {}

#[cfg(test)]
mod tests {
    use crate::rbtree::RBTree;

    #[test]
    fn walks_subtrees() {
        let tree: RBTree<i32> = [50, 30, 70, 20, 40, 60, 80].into_iter().collect();
        let root = tree.root();

        assert_eq!(root.inorder_walk().copied().collect::<Vec<_>>(), [20, 30, 40, 50, 60, 70, 80]);
        assert_eq!(root.left().inorder_walk().copied().collect::<Vec<_>>(), [20, 30, 40]);
        assert_eq!(root.right().inorder_walk().copied().collect::<Vec<_>>(), [60, 70, 80]);
        assert_eq!(tree.sentinel().inorder_walk().count(), 0);
    }

    #[test]
    fn restartable() {
        let tree: RBTree<i32> = (0..100).rev().collect();

        let mut first = tree.inorder_walk();
        let halfway: Vec<_> = first.by_ref().take(50).copied().collect();
        let rest = first.clone();

        // a fresh walk does not share a cursor with the half-consumed one
        assert_eq!(tree.inorder_walk().count(), 100);
        assert_eq!(halfway, (0..50).collect::<Vec<_>>());
        assert_eq!(rest.copied().collect::<Vec<_>>(), (50..100).collect::<Vec<_>>());

        assert_eq!(first.by_ref().count(), 50);
        assert_eq!(first.next(), None);
    }
}
