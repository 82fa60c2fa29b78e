//! Iterators over a `Rope`'s data.
//!
//! These are the lazy counterparts of [`Rope::for_each_chunk()`]: instead of
//! handing chunks to a visitor, they hand them out one `next()` at a time,
//! so iteration can be paused, combined with other iterators, or simply
//! dropped to stop early.
//!
//! All iterators can be created starting at any index of the rope, via the
//! `*_at()` methods.  When an iterator is created this way, the first item
//! it yields is the element (or the chunk starting at the element) at that
//! index.  An index past the end creates an iterator that yields nothing.
//!
//! [`Rope::for_each_chunk()`]: crate::Rope::for_each_chunk

use std::sync::Arc;

use crate::rope::Element;
use crate::tree::Node;

//==========================================================

/// An iterator over a `Rope`'s elements.
#[derive(Debug, Clone)]
pub struct Iter<'a, T>
where
    T: Element,
{
    chunks: Chunks<'a, T>,
    cur_chunk: std::slice::Iter<'a, T>,
    remaining_len: usize,
}

impl<'a, T> Iter<'a, T>
where
    T: Element,
{
    pub(crate) fn new(root: Option<&'a Arc<Node<T>>>, at_index: usize) -> Self {
        let total_len = root.map_or(0, |root| root.len());
        Iter {
            chunks: Chunks::new(root, at_index),
            cur_chunk: <&'a [T]>::default().iter(),
            remaining_len: total_len.saturating_sub(at_index),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T>
where
    T: Element,
{
    type Item = &'a T;

    /// Advances the iterator forward and returns the next value.
    ///
    /// Runs in amortized O(1) time and worst-case O(log N) time.
    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(element) = self.cur_chunk.next() {
                self.remaining_len -= 1;
                return Some(element);
            }
            self.cur_chunk = self.chunks.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining_len, Some(self.remaining_len))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> where T: Element {}

impl<'a, T> std::iter::FusedIterator for Iter<'a, T> where T: Element {}

//==========================================================

/// An iterator over a `Rope`'s contiguous chunks.
///
/// Internally, each `Rope` stores its elements in leaves of up to
/// [`MAX_LEAF_LEN`](Element::MAX_LEAF_LEN) elements.  This iterator iterates
/// over those leaves, returning a `&[T]` slice for each one.  It is useful for
/// situations such as:
///
/// - Streaming a rope's data somewhere.
/// - Writing custom iterators over a rope's data.
///
/// All yielded chunks are non-empty, and they are yielded in order.  Only the
/// first chunk may be a partial leaf, when the iterator was created in the
/// middle of one.
#[derive(Debug, Clone)]
pub struct Chunks<'a, T>
where
    T: Element,
{
    // Subtrees still to be visited, the next one on top.
    node_stack: Vec<&'a Node<T>>,
    // Where the next leaf popped from the stack starts.
    start: usize,
}

impl<'a, T> Chunks<'a, T>
where
    T: Element,
{
    pub(crate) fn new(root: Option<&'a Arc<Node<T>>>, at_index: usize) -> Self {
        let mut node_stack = Vec::new();
        let mut start = at_index;

        if let Some(root) = root {
            let mut node: &'a Node<T> = root;
            loop {
                match node {
                    Node::Leaf { .. } => {
                        node_stack.push(node);
                        break;
                    }
                    Node::Branch {
                        weight,
                        left,
                        right,
                        ..
                    } => {
                        if start >= *weight {
                            start -= weight;
                            node = &**right;
                        } else {
                            node_stack.push(&**right);
                            node = &**left;
                        }
                    }
                }
            }
        }

        Chunks { node_stack, start }
    }
}

impl<'a, T> Iterator for Chunks<'a, T>
where
    T: Element,
{
    type Item = &'a [T];

    /// Advances the iterator forward and returns the next value.
    ///
    /// Runs in amortized O(1) time and worst-case O(log N) time.
    fn next(&mut self) -> Option<&'a [T]> {
        while let Some(node) = self.node_stack.pop() {
            match node {
                Node::Leaf { content, .. } => {
                    let start = std::mem::take(&mut self.start);
                    if start < content.len() {
                        return Some(&content[start..]);
                    }
                }
                Node::Branch { left, right, .. } => {
                    self.node_stack.push(&**right);
                    self.node_stack.push(&**left);
                }
            }
        }
        None
    }
}

impl<'a, T> std::iter::FusedIterator for Chunks<'a, T> where T: Element {}
