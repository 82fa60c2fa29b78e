//! SharedRope is an immutable, structurally shared rope for Rust.
//!
//! A [`Rope<T>`] is a sequence of elements `T` that implement [`Element`],
//! stored in the leaves of a binary tree.  Ropes are never modified: every
//! edit returns a new [`Rope<T>`], which shares all the subtrees the edit
//! didn't touch with the rope it came from.  This makes keeping old versions
//! around (for undo, snapshots, or readers on other threads) nearly free.
//!
//! The library is made up of four main components:
//!
//! - [`Rope<T>`]: the main rope type.
//! - [`iter`]: iterators over [`Rope<T>`] data.
//! - [`RopeBuilder<T>`]: an efficient incremental [`Rope<T>`] builder.
//! - [`CodePoints`]: UTF-8 decoding over byte ropes.
//!
//! # A Basic Example
//!
//! Let's say we want to keep every version of a small text buffer around:
//!
//! ```rust
//! use shared_rope::Rope;
//!
//! let mut history = vec![Rope::<u8>::from("Hello world!")];
//!
//! // Each edit starts from the latest version, and leaves it untouched.
//! let edits: [fn(&Rope<u8>) -> Rope<u8>; 3] = [
//!     |rope| rope.delete(6, 5),
//!     |rope| rope.insert(6, b"rope"),
//!     |rope| rope.insert(rope.len(), b" Bye!"),
//! ];
//! for edit in edits {
//!     let next = edit(&history[history.len() - 1]);
//!     history.push(next);
//! }
//!
//! assert_eq!(history[0], "Hello world!");
//! assert_eq!(history[2], "Hello rope!");
//! assert_eq!(history[3], "Hello rope! Bye!");
//! ```
//!
//! # Balance
//!
//! Concatenation keeps the tree within a height of roughly `1.5 * log2` of
//! its number of leaves (see [`max_height_for()`]).  A concatenation that
//! would go past that bound rebuilds the tree, reusing every subtree that is
//! already a perfect tree of full leaves.  [`Rope::rebalance()`] can also be
//! called directly.
//!
//! # Low-level APIs
//!
//! SharedRope also provides access to some of its low-level APIs, enabling
//! client code to efficiently work with a [`Rope<T>`]'s data and implement new
//! functionality.  The most important of those API's are:
//!
//! - The [`for_each_chunk()`][Rope::for_each_chunk] and
//!   [`for_each_chunk_back()`][Rope::for_each_chunk_back] visitors.
//! - The [`Chunks`](iter::Chunks) iterator.
#![allow(clippy::collapsible_if)]
#![allow(clippy::inline_always)]
#![allow(clippy::needless_return)]
#![allow(clippy::redundant_field_names)]
#![allow(clippy::type_complexity)]

mod code_points;
mod rope;
mod rope_builder;
mod tree;

pub mod iter;

pub use crate::code_points::CodePoints;
pub use crate::rope::{Element, Rope};
pub use crate::rope_builder::RopeBuilder;
pub use crate::tree::{max_height_for, SLOT_COUNT};

//==============================================================
// Error reporting types.

/// SharedRope's result type.
pub type Result<T> = std::result::Result<T, Error>;

/// SharedRope's error type.
#[derive(Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that the passed index was out of bounds.
    ///
    /// Contains the index attempted and the actual length of the
    /// [`Rope<T>`], in that order.
    IndexOutOfBounds(usize, usize),

    /// Indicates that an invalid or truncated UTF-8 sequence was found while
    /// decoding a byte [`Rope<T>`].
    ///
    /// Contains the byte index where the sequence starts.
    MalformedUtf8(usize),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::IndexOutOfBounds(index, len) => {
                write!(
                    f,
                    "Index out of bounds: index {}, Rope length {}",
                    index, len
                )
            }
            Error::MalformedUtf8(byte_index) => {
                write!(f, "Malformed UTF-8 at byte index {}", byte_index)
            }
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Just re-use the debug impl.
        std::fmt::Debug::fmt(self, f)
    }
}
