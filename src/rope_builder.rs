use std::sync::Arc;

use smallvec::SmallVec;

use crate::rope::{Element, Rope};
use crate::tree::{leaf_len, Node, SLOT_COUNT};

/// An efficient incremental `Rope` builder.
///
/// This is used to efficiently build ropes from sequences of element
/// chunks.  It is useful for creating ropes from:
///
/// - ...large inputs, without pre-loading their entire contents into
///   memory.
/// - ...streaming data sources.
///
/// Unlike repeatedly calling [`Rope::concat()`] on the end of a rope,
/// this API runs in time linear to the amount of data fed to it, and the
/// resulting tree is the same no matter how the input was chunked.
///
/// # Example
/// ```
/// # use shared_rope::{Rope, RopeBuilder};
/// #
/// let mut builder = RopeBuilder::<u8>::new();
///
/// builder.append(b"Hello ");
/// builder.append(b"world!\n");
/// builder.append(b"How's ");
/// builder.append(b"it goin");
/// builder.append(b"g?");
///
/// let rope: Rope<u8> = builder.finish();
///
/// assert_eq!(rope, b"Hello world!\nHow's it going?".as_slice());
/// ```
#[derive(Debug, Clone)]
pub struct RopeBuilder<T>
where
    T: Element,
{
    // Perfectly balanced subtrees, in sequence order, of strictly decreasing
    // height.  Pushing works like incrementing a binary counter.
    slots: SmallVec<[Arc<Node<T>>; SLOT_COUNT]>,
    buffer: Vec<T>,
}

impl<T> RopeBuilder<T>
where
    T: Element,
{
    /// Creates a new `RopeBuilder`, ready for input.
    pub fn new() -> Self {
        RopeBuilder {
            slots: SmallVec::new(),
            buffer: Vec::new(),
        }
    }

    /// Appends `chunk` to the end of the in-progress `Rope`.
    ///
    /// Call this method repeatedly to incrementally build up a
    /// `Rope`.  The passed chunk can be as large or small as
    /// desired, but larger chunks are more efficient.
    pub fn append(&mut self, chunk: &[T]) {
        let max_len = leaf_len::<T>();
        let mut chunk = chunk;

        // Top up a partially filled leaf first.
        if !self.buffer.is_empty() {
            let split_index = (max_len - self.buffer.len()).min(chunk.len());
            self.buffer.extend_from_slice(&chunk[..split_index]);
            chunk = &chunk[split_index..];

            if self.buffer.len() == max_len {
                let content = std::mem::take(&mut self.buffer);
                self.push_balanced(Node::leaf(content, true));
            }
        }

        while chunk.len() >= max_len {
            self.push_balanced(Node::leaf(chunk[..max_len].to_vec(), true));
            chunk = &chunk[max_len..];
        }

        self.buffer.extend_from_slice(chunk);
    }

    /// Finishes the build, and returns the `Rope`.
    ///
    /// Note: this method consumes the builder.  If you want to continue
    /// building other ropes with the same prefix, you can clone the builder
    /// before calling `finish()`.
    pub fn finish(self) -> Rope<T> {
        // Whatever is left in the buffer is shorter than a full leaf.
        let mut root = if self.buffer.is_empty() {
            None
        } else {
            Some(Node::leaf(self.buffer, false))
        };

        // Fold from the shortest slot upwards, which is back to front.
        for slot in self.slots.into_iter().rev() {
            root = Node::concat(Some(slot), root);
        }

        Rope { root }
    }

    /// Builds a rope all at once from a single slice.
    ///
    /// This is for internal use only, because the public-facing API has
    /// `Rope::from_slice()`, which actually uses this for its implementation.
    pub(crate) fn build_at_once(mut self, chunk: &[T]) -> Rope<T> {
        self.append(chunk);
        self.finish()
    }

    //-----------------------------------------------------------------

    /// Whether there are loose elements that haven't made a full leaf yet.
    #[inline]
    pub(crate) fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Pushes a balanced subtree into the slots, merging it with equally tall
    /// slots like the carry of a binary counter.
    ///
    /// A subtree taller than the last slot is broken into its children first,
    /// so that the slots keep both their order and their decreasing heights.
    pub(crate) fn push_balanced(&mut self, node: Arc<Node<T>>) {
        debug_assert!(node.is_balanced());
        debug_assert!(self.buffer.is_empty());

        let mut node = node;
        loop {
            let last_height = match self.slots.last() {
                Some(last) => last.height(),
                None => break,
            };

            if last_height > node.height() {
                break;
            } else if last_height == node.height() {
                if let Some(last) = self.slots.pop() {
                    node = Node::join(last, node);
                }
            } else if let Node::Branch { left, right, .. } = &*node {
                let (left, right) = (Arc::clone(left), Arc::clone(right));
                self.push_balanced(left);
                node = right;
            } else {
                unreachable!("a leaf can't be taller than a slot");
            }
        }

        self.slots.push(node);
    }
}

impl<T> Default for RopeBuilder<T>
where
    T: Element,
{
    fn default() -> Self {
        Self::new()
    }
}

//===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Lipsum {
        Lorem,
        Ipsum,
        Dolor(usize),
        Sit,
        Amet,
        Consectur(&'static str),
        Adipiscing(bool),
    }

    impl Element for Lipsum {
        const MAX_LEAF_LEN: usize = 4;
    }

    use self::Lipsum::*;

    /// 70 elements.
    fn lorem_ipsum() -> Vec<Lipsum> {
        (0..70)
            .map(|num| match num % 14 {
                0 | 7 => Lorem,
                1 | 8 => Ipsum,
                2 => Dolor(4),
                3 | 10 => Sit,
                4 | 11 => Amet,
                5 => Consectur("hello"),
                6 => Adipiscing(true),
                9 => Dolor(8),
                12 => Consectur("bye"),
                13 => Adipiscing(false),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn rope_builder_01() {
        let mut builder = RopeBuilder::new();

        for _ in 0..5 {
            builder.append(&[Lorem, Ipsum, Dolor(4), Sit, Amet]);
            builder.append(&[Consectur("hello"), Adipiscing(true)]);
            builder.append(&[Lorem, Ipsum, Dolor(8), Sit, Amet]);
            builder.append(&[Consectur("bye"), Adipiscing(false)]);
        }

        let rope = builder.finish();

        assert_eq!(rope, lorem_ipsum());

        rope.assert_integrity();
    }

    #[test]
    fn rope_builder_default_01() {
        let mut builder = RopeBuilder::default();

        for _ in 0..5 {
            builder.append(&[Lorem, Ipsum, Dolor(4), Sit, Amet]);
            builder.append(&[Consectur("hello"), Adipiscing(true)]);
            builder.append(&[Lorem, Ipsum, Dolor(8), Sit, Amet]);
            builder.append(&[Consectur("bye"), Adipiscing(false)]);
        }

        let rope = builder.finish();

        assert_eq!(rope, lorem_ipsum());

        rope.assert_integrity();
    }

    #[test]
    fn rope_builder_02() {
        // Same tree shape, whatever the chunking.
        let mut builder = RopeBuilder::new();
        for element in lorem_ipsum() {
            builder.append(&[element]);
        }
        let rope = builder.finish();
        let at_once = RopeBuilder::new().build_at_once(&lorem_ipsum());

        assert_eq!(rope, at_once);
        assert_eq!(rope.height(), at_once.height());
        assert_eq!(rope.chunks().count(), at_once.chunks().count());
    }

    #[test]
    fn rope_builder_03() {
        // 64 elements make 16 full leaves, which pack into one perfect tree.
        let rope = RopeBuilder::new().build_at_once(&lorem_ipsum()[..64]);

        assert!(rope.is_balanced());
        assert_eq!(rope.height(), 5);
        assert!(rope.chunks().all(|chunk| chunk.len() == 4));

        rope.assert_integrity();
    }

    #[test]
    fn rope_builder_04() {
        // A remainder shorter than a leaf is never balanced.
        let rope = RopeBuilder::new().build_at_once(&lorem_ipsum()[..3]);

        assert!(!rope.is_balanced());
        assert_eq!(rope.height(), 1);
        assert_eq!(rope.len(), 3);
    }

    #[test]
    fn rope_builder_05() {
        let rope: Rope<Lipsum> = RopeBuilder::new().finish();

        assert!(rope.is_empty());
        assert_eq!(rope.height(), 0);
    }

    #[test]
    fn push_balanced_01() {
        // A tall subtree behind a short slot gets broken up, keeping order.
        let small = RopeBuilder::new().build_at_once(&lorem_ipsum()[..4]);
        let large = RopeBuilder::new().build_at_once(&lorem_ipsum()[4..20]);

        let mut builder = RopeBuilder::new();
        builder.push_balanced(small.root.clone().unwrap());
        builder.push_balanced(large.root.clone().unwrap());
        let rope = builder.finish();

        assert_eq!(rope, &lorem_ipsum()[..20]);
        assert!(rope.height() <= 4);

        rope.assert_integrity();
    }
}
