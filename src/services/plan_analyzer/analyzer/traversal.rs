//! Pre-order operator tree traversal
//!
//! Both walkers use an explicit stack so plans with very deep nesting cannot overflow
//! the call stack. Nodes are numbered by their pre-order position, which is how
//! [`super::annotations::NodeKey`] identifies a node.

use crate::services::plan_analyzer::models::PlanNode;

/// Pre-order iterator over a tree, yielding `(preorder_index, node)`
pub struct PreOrder<'a> {
    stack: Vec<&'a PlanNode>,
    next_index: usize,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a PlanNode);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so the first child is popped next
        self.stack.extend(node.children.iter().rev());
        let index = self.next_index;
        self.next_index += 1;
        Some((index, node))
    }
}

/// Walk a tree in pre-order
pub fn preorder(root: &PlanNode) -> PreOrder<'_> {
    PreOrder { stack: vec![root], next_index: 0 }
}

/// Visit every node mutably in pre-order
///
/// The callback finishes with a node before any of its children are visited.
pub fn for_each_preorder_mut<F>(root: &mut PlanNode, mut visit: F)
where
    F: FnMut(usize, &mut PlanNode),
{
    let mut stack: Vec<&mut PlanNode> = vec![root];
    let mut index = 0;
    while let Some(node) = stack.pop() {
        visit(index, &mut *node);
        index += 1;
        stack.extend(node.children.iter_mut().rev());
    }
}
