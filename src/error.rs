//! The [`Error`] type returned by fallible operations in this crate.

use crate::encoding::EncodingError;

/// A specialized [`Result`](std::result::Result) type for cell list operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`EncodedCellList`](crate::EncodedCellList) and its cursors.
///
/// Every error is reported before the list is touched: an operation either completes fully or
/// leaves the list exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A range was declared with its lower bound above its upper bound.
    #[error("invalid qualifier range: min {min} is greater than max {max}")]
    InvalidRange { min: u32, max: u32 },

    /// A qualifier lies outside the range the list was constructed with.
    #[error("qualifier {qualifier} is out of the valid range ({min}, {max})")]
    OutOfRange { qualifier: u32, min: u32, max: u32 },

    /// A positional index is not below the number of cells in the list.
    #[error("index {index} is out of bounds for a list of {len} cells")]
    IndexOutOfRange { index: usize, len: usize },

    /// The first cell was requested from an empty list.
    #[error("no cells present in the list")]
    Empty,

    /// A cursor observed a structural change it did not make itself.
    #[error("list was structurally modified (generation {found}, cursor expected {expected})")]
    ConcurrentModification { expected: u64, found: u64 },

    /// A cursor was handed a list other than the one that created it.
    #[error("cursor belongs to list {expected} but was used with list {found}")]
    ForeignList { expected: u64, found: u64 },

    /// The operation could place a cell at a slot inconsistent with its qualifier.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A cursor `set` was given a cell whose qualifier belongs to a different slot.
    #[error(
        "cell with qualifier {qualifier} belongs at slot {slot} and cannot replace the cell at \
         slot {current}"
    )]
    InvalidArgument {
        qualifier: u32,
        slot: usize,
        current: usize,
    },

    /// A cursor `remove` or `set` was called before `next`/`previous`, or twice in a row.
    #[error("cursor has no current cell")]
    NoCurrentElement,

    /// A cell's qualifier bytes could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
