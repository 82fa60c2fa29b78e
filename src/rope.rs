use std::fmt::Debug;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::iter::{Chunks, Iter};
use crate::rope_builder::RopeBuilder;
use crate::tree::Node;
use crate::{Error, Result};

/// An element that can be stored in a [`Rope`].
///
/// The only configuration is [`MAX_LEAF_LEN`][Element::MAX_LEAF_LEN], the
/// number of elements packed into each leaf of the tree.  Longer leaves make
/// edits copy more elements, shorter leaves make the tree taller.
///
/// ```
/// use shared_rope::{Element, Rope};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Cell(u32);
///
/// impl Element for Cell {
///     const MAX_LEAF_LEN: usize = 64;
/// }
///
/// let rope = Rope::from_slice(&[Cell(1), Cell(2), Cell(3)]);
/// assert_eq!(rope.index(1), &Cell(2));
/// ```
pub trait Element: Clone {
    /// Maximum number of elements in a leaf.  A value of `0` is treated as
    /// `1`.
    const MAX_LEAF_LEN: usize = 512;
}

macro_rules! impl_element {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const MAX_LEAF_LEN: usize = $len;
            }
        )*
    };
}

impl_element! {
    u8 => 128,
    char => 128,
    u16 => 512,
    u32 => 512,
    u64 => 512,
    usize => 512,
    i8 => 512,
    i16 => 512,
    i32 => 512,
    i64 => 512,
    isize => 512,
    bool => 512,
    String => 512,
    &'static str => 512,
}

impl<T> Element for Rope<T> where T: Element {}

/// An immutable sequence of elements, stored as a balanced binary tree.
///
/// Every edit returns a new `Rope`, sharing all the untouched parts of the
/// tree with the rope it was made from.  The rope it was made from is left
/// as it was.
///
/// # Editing Operations
///
/// Edits are all built out of [`split()`](Rope::split) and
/// [`concat()`](Rope::concat):
///
/// ```
/// # use shared_rope::Rope;
/// #
/// let rope = Rope::<u8>::from("Hello world!");
/// let edited = rope.delete(6, 5).insert(6, b"rope");
///
/// assert_eq!(edited, "Hello rope!");
/// assert_eq!(rope, "Hello world!");
/// ```
///
/// Out of range offsets and lengths are clamped to the rope, so they never
/// fail.  The only fallible operation is [`try_index()`](Rope::try_index).
///
/// # Cloning
///
/// Cloning `Rope`s is extremely cheap, running in `O(1)` time and taking a
/// small constant amount of memory for the new clone, regardless of the
/// sequence's size.  Clones, like all ropes derived from one another, share
/// their nodes, and can be sent freely between threads.
#[derive(Clone)]
pub struct Rope<T>
where
    T: Element,
{
    pub(crate) root: Option<Arc<Node<T>>>,
}

impl<T> Rope<T>
where
    T: Element,
{
    //-----------------------------------------------------------------------
    // Constructors

    /// Creates an empty `Rope`.
    #[inline]
    pub fn new() -> Self {
        Rope { root: None }
    }

    /// Creates a `Rope` from a slice, packing it into full leaves.
    ///
    /// Runs in O(N) time.
    #[inline]
    pub fn from_slice(slice: &[T]) -> Self {
        RopeBuilder::new().build_at_once(slice)
    }

    //-----------------------------------------------------------------------
    // Informational methods

    /// Total number of elements in the `Rope`.
    ///
    /// Runs in O(log N) time.
    #[inline]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.len())
    }

    /// Returns `true` if the `Rope` has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree: `0` when empty, `1` for a single leaf.
    #[inline]
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.height())
    }

    /// Returns `true` if the tree is a perfect tree of full leaves.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.root.as_ref().map_or(false, |root| root.is_balanced())
    }

    //-----------------------------------------------------------------------
    // Fetch methods

    /// Returns the element at `index`.
    ///
    /// Runs in O(log N) time.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds (i.e. `index >= len()`).
    #[inline]
    pub fn index(&self, index: usize) -> &T {
        match self.try_index(index) {
            Ok(element) => element,
            Err(e) => panic!("index(): {}", e),
        }
    }

    //-----------------------------------------------------------------------
    // Edit methods

    /// Returns a `Rope` with the elements of `self` followed by those of
    /// `other`.
    ///
    /// Both ropes are shared, not copied.  If the joined tree grows taller
    /// than [`max_height_for()`](crate::max_height_for) allows, it is
    /// rebalanced.
    #[inline]
    pub fn concat(&self, other: &Self) -> Self {
        Rope {
            root: Node::concat(self.root.clone(), other.root.clone()),
        }
    }

    /// Splits the `Rope` at `index`, returning the elements before and after
    /// it.
    ///
    /// `index` is clamped to `len()`.
    ///
    /// Runs in O(log N) time.
    pub fn split(&self, index: usize) -> (Self, Self) {
        match &self.root {
            Some(root) => {
                let (left, right) = Node::split(root, index);
                (Rope { root: left }, Rope { root: right })
            }
            None => (Rope::new(), Rope::new()),
        }
    }

    /// Returns a `Rope` with `elements` inserted at `index`.
    ///
    /// `index` is clamped to `len()`, so inserting past the end appends.
    ///
    /// Runs in O(M + log N) time, where N is the length of the `Rope` and M
    /// is the length of `elements`.
    pub fn insert(&self, index: usize, elements: &[T]) -> Self {
        let (left, right) = self.split(index);
        left.concat(&Rope::from_slice(elements)).concat(&right)
    }

    /// Returns a `Rope` without the `len` elements starting at `index`.
    ///
    /// Both `index` and `len` are clamped to the rope, so deleting past the
    /// end removes everything from `index` onwards.
    ///
    /// Runs in O(log N) time.
    pub fn delete(&self, index: usize, len: usize) -> Self {
        let (left, rest) = self.split(index);
        let (_, right) = rest.split(len);
        left.concat(&right)
    }

    /// Copies out up to `len` elements, starting at `index`.
    ///
    /// Returns fewer elements if the rope ends first, and none at all if
    /// `index` is out of bounds.
    ///
    /// Runs in O(M + log N) time, where M is the number of elements copied.
    pub fn substring(&self, index: usize, len: usize) -> Vec<T> {
        let mut remaining = len;
        let mut elements = Vec::with_capacity(len.min(self.len().saturating_sub(index)));

        if remaining > 0 {
            self.for_each_chunk(index, |chunk| {
                let take = remaining.min(chunk.len());
                elements.extend_from_slice(&chunk[..take]);
                remaining -= take;
                if remaining == 0 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
        }

        elements
    }

    /// Rebuilds the tree so that it respects the balance bound.
    ///
    /// [`concat()`](Rope::concat) already does this whenever the tree gets
    /// too tall, so this is rarely needed.  Balanced subtrees are shared with
    /// the original tree.
    pub fn rebalance(&self) -> Self {
        Rope {
            root: self.root.as_ref().map(Node::rebalance),
        }
    }

    //-----------------------------------------------------------------------
    // Chunk walks

    /// Calls `visitor` on each chunk from `offset` to the end of the rope, in
    /// order.  The first chunk starts exactly at `offset`.
    ///
    /// Returning [`ControlFlow::Break`] from the visitor stops the walk.
    /// Returns `true` if the walk reached the end of the rope, `false` if it
    /// was stopped.  An `offset` past the end visits nothing.
    ///
    /// ```
    /// # use std::ops::ControlFlow;
    /// # use shared_rope::Rope;
    /// let rope = Rope::<u8>::from("Hello from rope");
    /// let mut out = Vec::new();
    /// let finished = rope.for_each_chunk(6, |chunk| {
    ///     out.extend_from_slice(chunk);
    ///     ControlFlow::Continue(())
    /// });
    ///
    /// assert!(finished);
    /// assert_eq!(out, b"from rope");
    /// ```
    pub fn for_each_chunk<F>(&self, offset: usize, visitor: F) -> bool
    where
        F: FnMut(&[T]) -> ControlFlow<()>,
    {
        let mut visitor = visitor;
        match &self.root {
            Some(root) => root.for_each_chunk(offset, &mut visitor).is_continue(),
            None => true,
        }
    }

    /// Calls `visitor` on each chunk before `offset`, going backwards to the
    /// start of the rope.  The elements of every chunk are handed over in
    /// back to front order.
    ///
    /// Returning [`ControlFlow::Break`] from the visitor stops the walk.
    /// Returns `true` if the walk reached the start of the rope, `false` if
    /// it was stopped.  An `offset` past the end is clamped to `len()`.
    ///
    /// ```
    /// # use std::ops::ControlFlow;
    /// # use shared_rope::Rope;
    /// let rope = Rope::<u8>::from("Hello from rope");
    /// let mut out = Vec::new();
    /// rope.for_each_chunk_back(5, |chunk| {
    ///     out.extend_from_slice(chunk);
    ///     ControlFlow::Continue(())
    /// });
    ///
    /// assert_eq!(out, b"olleH");
    /// ```
    pub fn for_each_chunk_back<F>(&self, offset: usize, visitor: F) -> bool
    where
        F: FnMut(&[T]) -> ControlFlow<()>,
    {
        let mut visitor = visitor;
        match &self.root {
            Some(root) => root
                .for_each_chunk_back(offset, &mut Vec::new(), &mut visitor)
                .is_continue(),
            None => true,
        }
    }

    //-----------------------------------------------------------------------
    // Iterator methods

    /// Creates an iterator over the elements of the `Rope`.
    ///
    /// Runs in O(log N) time.
    #[inline]
    pub fn iter(&self) -> Iter<T> {
        Iter::new(self.root.as_ref(), 0)
    }

    /// Creates an iterator over the elements of the `Rope`, starting at
    /// `index`.  An `index` past the end yields nothing.
    ///
    /// Runs in O(log N) time.
    #[inline]
    pub fn iter_at(&self, index: usize) -> Iter<T> {
        Iter::new(self.root.as_ref(), index)
    }

    /// Creates an iterator over the chunks of the `Rope`.
    ///
    /// Runs in O(log N) time.
    #[inline]
    pub fn chunks(&self) -> Chunks<T> {
        Chunks::new(self.root.as_ref(), 0)
    }

    /// Creates an iterator over the chunks of the `Rope`, with the first
    /// chunk starting exactly at `index`.
    ///
    /// Runs in O(log N) time.
    #[inline]
    pub fn chunks_at(&self, index: usize) -> Chunks<T> {
        Chunks::new(self.root.as_ref(), index)
    }

    //-----------------------------------------------------------------------
    // Conversion methods

    /// Copies the whole `Rope` into a `Vec`.
    ///
    /// Runs in O(N) time.
    pub fn to_vec(&self) -> Vec<T> {
        let mut vec = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            vec.extend_from_slice(chunk);
        }
        vec
    }

    /// Returns true if this rope and `other` point to precisely the same
    /// in-memory data.
    ///
    /// This happens when one of the ropes is a clone of the other, or when
    /// an operation left its input untouched (e.g. concatenating an empty
    /// rope).  Two empty ropes are always instances of each other.
    ///
    /// Note: this is distinct from checking for equality: two ropes can
    /// have the same *contents* (equal) but be stored in different
    /// memory locations (not instances).
    ///
    /// Runs in O(1) time.
    #[inline]
    pub fn is_instance(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(root), Some(other_root)) => Arc::ptr_eq(root, other_root),
            (None, None) => true,
            _ => false,
        }
    }

    //-----------------------------------------------------------------------
    // Debugging

    /// NOT PART OF THE PUBLIC API (hidden from docs for a reason!)
    ///
    /// Debugging tool to make sure that all of the meta-data of the
    /// tree is consistent with the actual data:
    ///
    /// - All leaf nodes are non-empty, and balanced leaves are full.
    /// - Every weight is the length of the left subtree.
    /// - Every height and balanced flag matches the node's children.
    #[doc(hidden)]
    pub fn assert_integrity(&self) {
        if let Some(root) = &self.root {
            root.assert_integrity();
        }
    }
}

/// # Non-Panicking
///
/// The methods in this impl block provide non-panicking versions of
/// `Rope`'s panicking methods.  They return either `Option::None` or
/// `Result::Err()` when their panicking counterparts would have panicked.
impl<T> Rope<T>
where
    T: Element,
{
    /// Non-panicking version of [`index()`](Rope::index).
    #[inline]
    pub fn try_index(&self, index: usize) -> Result<&T> {
        self.get(index)
            .ok_or_else(|| Error::IndexOutOfBounds(index, self.len()))
    }

    /// Non-panicking version of [`index()`](Rope::index).
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.root.as_ref().and_then(|root| root.get(index))
    }
}

impl Rope<u8> {
    /// Decodes the `Rope` as UTF-8, replacing invalid sequences with
    /// `U+FFFD`.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_vec()).into_owned()
    }
}

//==============================================================
// Conversion impls

impl<'a, T> From<&'a [T]> for Rope<T>
where
    T: Element,
{
    #[inline]
    fn from(slice: &'a [T]) -> Self {
        Rope::from_slice(slice)
    }
}

impl<T> From<Vec<T>> for Rope<T>
where
    T: Element,
{
    #[inline]
    fn from(vec: Vec<T>) -> Self {
        Rope::from_slice(&vec)
    }
}

impl<'a> From<&'a str> for Rope<u8> {
    #[inline]
    fn from(text: &'a str) -> Self {
        Rope::from_slice(text.as_bytes())
    }
}

impl<'a> From<&'a str> for Rope<char> {
    #[inline]
    fn from(text: &'a str) -> Self {
        text.chars().collect()
    }
}

impl<T> From<Rope<T>> for Vec<T>
where
    T: Element,
{
    #[inline]
    fn from(rope: Rope<T>) -> Self {
        rope.to_vec()
    }
}

impl<'a, T> From<&'a Rope<T>> for Vec<T>
where
    T: Element,
{
    #[inline]
    fn from(rope: &'a Rope<T>) -> Self {
        rope.to_vec()
    }
}

impl<T> FromIterator<T> for Rope<T>
where
    T: Element,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut builder = RopeBuilder::new();
        for element in iter {
            builder.append(std::slice::from_ref(&element));
        }
        builder.finish()
    }
}

impl<'a, T> IntoIterator for &'a Rope<T>
where
    T: Element,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

//==============================================================
// Other impls

impl<T> std::ops::Index<usize> for Rope<T>
where
    T: Element,
{
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        Rope::index(self, index)
    }
}

impl<T> std::fmt::Debug for Rope<T>
where
    T: Element + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> std::default::Default for Rope<T>
where
    T: Element,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::cmp::Eq for Rope<T> where T: Element + Eq {}

impl<T> std::cmp::PartialEq<Rope<T>> for Rope<T>
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &Rope<T>) -> bool {
        self.is_instance(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<'a, T> std::cmp::PartialEq<&'a [T]> for Rope<T>
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &&'a [T]) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<'a, T> std::cmp::PartialEq<Rope<T>> for &'a [T]
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &Rope<T>) -> bool {
        other == self
    }
}

impl<T> std::cmp::PartialEq<[T]> for Rope<T>
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &[T]) -> bool {
        self == &other
    }
}

impl<T> std::cmp::PartialEq<Vec<T>> for Rope<T>
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &Vec<T>) -> bool {
        self == &other.as_slice()
    }
}

impl<T> std::cmp::PartialEq<Rope<T>> for Vec<T>
where
    T: Element + PartialEq,
{
    #[inline]
    fn eq(&self, other: &Rope<T>) -> bool {
        other == &self.as_slice()
    }
}

impl<'a> std::cmp::PartialEq<&'a str> for Rope<u8> {
    #[inline]
    fn eq(&self, other: &&'a str) -> bool {
        self == &other.as_bytes()
    }
}

impl<'a> std::cmp::PartialEq<&'a str> for Rope<char> {
    #[inline]
    fn eq(&self, other: &&'a str) -> bool {
        self.iter().copied().eq(other.chars())
    }
}

//==============================================================
