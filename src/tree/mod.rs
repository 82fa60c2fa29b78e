mod node;

pub(crate) use self::node::Node;

use crate::rope::Element;

/// Maximum number of pending balanced subtrees that construction and
/// rebalancing keep inline before spilling to the heap.
///
/// 32 slots cover sequences of up to roughly `MAX_LEAF_LEN * 2^32` elements.
pub const SLOT_COUNT: usize = 32;

/// The leaf length used for elements of type `T`.
///
/// A configured length of `0` is treated as `1`, since a leaf can never be
/// empty.
#[inline(always)]
pub(crate) fn leaf_len<T: Element>() -> usize {
    T::MAX_LEAF_LEN.max(1)
}

/// The tallest a tree holding `len` elements may grow, given leaves of at most
/// `leaf_len` elements, before a concatenation rebuilds it.
///
/// Computed as `(ceil(log2(len / leaf_len + 1)) + 1) * 1.5`, truncated, so a
/// tree may sit a few levels above a perfect packing before it is rebuilt.
///
/// ```
/// # use shared_rope::max_height_for;
/// assert_eq!(max_height_for(0, 128), 1);
/// assert_eq!(max_height_for(128, 128), 3);
/// assert_eq!(max_height_for(128 * 1024, 128), 18);
/// ```
pub fn max_height_for(len: usize, leaf_len: usize) -> usize {
    let full_leaves = (len / leaf_len.max(1)) as f64;
    (((full_leaves + 1.0).log2().ceil() + 1.0) * 1.5) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_height_for_01() {
        // Anything shorter than one leaf must stay a single leaf.
        assert_eq!(max_height_for(0, 4), 1);
        assert_eq!(max_height_for(3, 4), 1);
    }

    #[test]
    fn max_height_for_02() {
        assert_eq!(max_height_for(4, 4), 3);
        assert_eq!(max_height_for(8, 4), 4);
        assert_eq!(max_height_for(12, 4), 4);
        assert_eq!(max_height_for(16, 4), 6);
    }

    #[test]
    fn max_height_for_03() {
        // A zero leaf length behaves like a leaf length of one.
        assert_eq!(max_height_for(7, 0), max_height_for(7, 1));
    }
}
