use std::ops::ControlFlow;
use std::sync::Arc;

use crate::rope::Element;
use crate::rope_builder::RopeBuilder;
use crate::tree::{leaf_len, max_height_for};

/// A node of the rope's binary tree.
///
/// Nodes are never mutated after construction, and a subtree may be shared
/// by any number of ropes.  An empty sequence is never stored as a node, it
/// is represented by the absence of a root instead.
#[derive(Debug, Clone)]
pub(crate) enum Node<T>
where
    T: Element,
{
    /// A contiguous, non-empty run of elements.
    ///
    /// `balanced` is only set on leaves that are exactly `MAX_LEAF_LEN` long.
    Leaf { content: Vec<T>, balanced: bool },
    /// The concatenation of two non-empty subtrees.
    Branch {
        /// Length of `left`, used to route indices.
        weight: usize,
        height: usize,
        /// Set when both children are balanced and of equal height, which
        /// makes this node a perfect tree of full leaves.
        balanced: bool,
        left: Arc<Node<T>>,
        right: Arc<Node<T>>,
    },
}

impl<T> Node<T>
where
    T: Element,
{
    /// Creates a leaf out of `content`, which must not be empty.
    #[inline]
    pub fn leaf(content: Vec<T>, balanced: bool) -> Arc<Self> {
        debug_assert!(!content.is_empty());
        Arc::new(Node::Leaf { content, balanced })
    }

    /// Joins two subtrees under a new node, without checking the result's
    /// height against the balance bound.
    pub fn join(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        let balanced =
            left.is_balanced() && right.is_balanced() && left.height() == right.height();
        Arc::new(Node::Branch {
            weight: left.len(),
            height: 1 + left.height().max(right.height()),
            balanced,
            left,
            right,
        })
    }

    /// Concatenates two optional subtrees.
    ///
    /// An absent operand is the identity.  If the joined tree is taller than
    /// [`max_height_for()`] allows, it is rebuilt with [`Node::rebalance()`].
    pub fn concat(left: Option<Arc<Self>>, right: Option<Arc<Self>>) -> Option<Arc<Self>> {
        match (left, right) {
            (None, right) => right,
            (left, None) => left,
            (Some(left), Some(right)) => {
                let node = Node::join(left, right);
                if node.is_balanced() {
                    return Some(node);
                }

                let len = node.len();
                let bound = max_height_for(len, leaf_len::<T>());
                if node.height() > bound {
                    tracing::trace!(len, height = node.height(), bound, "rope over height bound");
                    Some(Node::rebalance(&node))
                } else {
                    Some(node)
                }
            }
        }
    }

    //-----------------------------------------------------------------------
    // Bookkeeping

    /// Total number of elements under this node.
    ///
    /// Walks the right spine, so runs in O(log N) on a balanced tree.
    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut node = self;
        loop {
            match node {
                Node::Leaf { content, .. } => return len + content.len(),
                Node::Branch { weight, right, .. } => {
                    len += weight;
                    node = right;
                }
            }
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Branch { height, .. } => *height,
        }
    }

    #[inline]
    pub fn is_balanced(&self) -> bool {
        match self {
            Node::Leaf { balanced, .. } | Node::Branch { balanced, .. } => *balanced,
        }
    }

    //-----------------------------------------------------------------------
    // Queries

    /// Returns the element at `index`, or `None` if it is past the end.
    pub fn get(&self, index: usize) -> Option<&T> {
        let mut index = index;
        let mut node = self;
        loop {
            match node {
                Node::Leaf { content, .. } => return content.get(index),
                Node::Branch {
                    weight,
                    left,
                    right,
                    ..
                } => {
                    if index >= *weight {
                        index -= weight;
                        node = right;
                    } else {
                        node = left;
                    }
                }
            }
        }
    }

    //-----------------------------------------------------------------------
    // Structural operations

    /// Splits the tree at `index`, clamping it to the tree's length.
    ///
    /// Every subtree that doesn't contain the split point is shared with the
    /// original tree.
    pub fn split(node: &Arc<Self>, index: usize) -> (Option<Arc<Self>>, Option<Arc<Self>>) {
        match &**node {
            Node::Leaf { content, .. } => {
                let index = index.min(content.len());
                if index == 0 {
                    (None, Some(Arc::clone(node)))
                } else if index == content.len() {
                    (Some(Arc::clone(node)), None)
                } else {
                    (
                        RopeBuilder::new().build_at_once(&content[..index]).root,
                        RopeBuilder::new().build_at_once(&content[index..]).root,
                    )
                }
            }
            Node::Branch {
                weight,
                left,
                right,
                ..
            } => {
                if index >= *weight {
                    let (middle, right) = Node::split(right, index - weight);
                    (Node::concat(Some(Arc::clone(left)), middle), right)
                } else {
                    let (left, middle) = Node::split(left, index);
                    (left, Node::concat(middle, Some(Arc::clone(right))))
                }
            }
        }
    }

    /// Rebuilds the tree so that it respects the balance bound.
    ///
    /// Subtrees that are already balanced are reused as they are, as long as
    /// no loose elements are waiting to be packed in front of them.  All other
    /// leaves get repacked into full leaves.
    pub fn rebalance(node: &Arc<Self>) -> Arc<Self> {
        let mut builder = RopeBuilder::new();
        let mut reused = 0usize;

        Node::visit(node, &mut |node: &Arc<Self>| {
            if !builder.has_pending() && node.is_balanced() {
                builder.push_balanced(Arc::clone(node));
                reused += 1;
                false
            } else {
                if let Node::Leaf { content, .. } = &**node {
                    builder.append(content);
                }
                true
            }
        });

        match builder.finish().root {
            Some(root) => {
                tracing::debug!(
                    len = root.len(),
                    height = root.height(),
                    reused,
                    "rope rebalanced"
                );
                root
            }
            // Nodes are never empty, so there is always something to pack.
            None => Arc::clone(node),
        }
    }

    /// Pre-order walk over the nodes of the tree.  `visitor` returns whether
    /// to descend into the children of the node it was handed.
    fn visit<F>(node: &Arc<Self>, visitor: &mut F)
    where
        F: FnMut(&Arc<Self>) -> bool,
    {
        if visitor(node) {
            if let Node::Branch { left, right, .. } = &**node {
                Node::visit(left, visitor);
                Node::visit(right, visitor);
            }
        }
    }

    //-----------------------------------------------------------------------
    // Chunk walks

    /// Hands every chunk from `offset` onwards to `visitor`, in order.
    ///
    /// The first chunk is truncated to start at `offset`.  Offsets past the
    /// end yield nothing.
    pub fn for_each_chunk<F>(&self, offset: usize, visitor: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&[T]) -> ControlFlow<()>,
    {
        match self {
            Node::Leaf { content, .. } => {
                if offset < content.len() {
                    visitor(&content[offset..])
                } else {
                    ControlFlow::Continue(())
                }
            }
            Node::Branch {
                weight,
                left,
                right,
                ..
            } => {
                if offset >= *weight {
                    right.for_each_chunk(offset - weight, visitor)
                } else {
                    left.for_each_chunk(offset, visitor)?;
                    right.for_each_chunk(0, visitor)
                }
            }
        }
    }

    /// Hands every chunk before `end` to `visitor`, from back to front, with
    /// the elements of each chunk reversed.
    ///
    /// `scratch` holds the reversed chunk and is reused between leaves.
    pub fn for_each_chunk_back<F>(
        &self,
        end: usize,
        scratch: &mut Vec<T>,
        visitor: &mut F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&[T]) -> ControlFlow<()>,
    {
        match self {
            Node::Leaf { content, .. } => {
                let end = end.min(content.len());
                if end == 0 {
                    return ControlFlow::Continue(());
                }
                scratch.clear();
                scratch.extend(content[..end].iter().rev().cloned());
                visitor(scratch.as_slice())
            }
            Node::Branch {
                weight,
                left,
                right,
                ..
            } => {
                if end > *weight {
                    right.for_each_chunk_back(end - weight, scratch, visitor)?;
                    left.for_each_chunk_back(*weight, scratch, visitor)
                } else {
                    left.for_each_chunk_back(end, scratch, visitor)
                }
            }
        }
    }

    //-----------------------------------------------------------------------
    // Debugging

    /// Checks that the cached metadata of every node matches the actual
    /// tree, returning the length of the tree.
    pub fn assert_integrity(&self) -> usize {
        match self {
            Node::Leaf { content, balanced } => {
                assert!(!content.is_empty(), "Leaf node is empty.");
                if *balanced {
                    assert_eq!(
                        content.len(),
                        leaf_len::<T>(),
                        "Balanced leaf is not full."
                    );
                }
                content.len()
            }
            Node::Branch {
                weight,
                height,
                balanced,
                left,
                right,
            } => {
                let left_len = left.assert_integrity();
                let right_len = right.assert_integrity();
                assert_eq!(*weight, left_len, "Branch weight doesn't match left length.");
                assert_eq!(
                    *height,
                    1 + left.height().max(right.height()),
                    "Branch height doesn't match its children."
                );
                assert_eq!(
                    *balanced,
                    left.is_balanced() && right.is_balanced() && left.height() == right.height(),
                    "Branch balanced flag doesn't match its children."
                );
                left_len + right_len
            }
        }
    }
}
