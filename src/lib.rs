//! Row cells indexed by their encoded column qualifiers.
//!
//! A column-oriented table that encodes its column names as small integers ("qualifiers") can
//! assemble a row from its cells without any hashing or searching: each cell's qualifier
//! determines exactly where it lives. This crate provides that structure:
//!
//! - The [`EncodedCellList<T, S>`] type is an ordered list of cells of type `T`, backed by a
//!   fixed-size store with one slot per possible qualifier. It offers `O(1)` lookup by
//!   qualifier, iteration in ascending qualifier order, and `O(1)` access to the first cell.
//! - The [`Cell`] trait describes where a cell's encoded qualifier lives in its bytes.
//! - The [`QualifierEncodingScheme`] enum decodes qualifier bytes into integers.
//!
//! Qualifier space is divided into a [`ReservedRange`] of system-assigned qualifiers, which
//! every list can hold, and the user-assigned qualifiers starting at the counter start, of
//! which each list holds the [`QualifierRange`] it was declared with:
//!
//! ```
//! use encoded_cells::{EncodedCellList, QualifierEncodingScheme, QualifierRange, ReservedRange};
//!
//! let mut cells = EncodedCellList::with_reserved_range(
//!     QualifierRange::new(1000, 1002).unwrap(),
//!     ReservedRange::new(0, 10).unwrap(),
//!     QualifierEncodingScheme::TwoByte,
//! );
//!
//! // qualifiers are encoded as two big-endian bytes:
//! cells.add(1002u16.to_be_bytes().to_vec()).unwrap();
//! cells.add(3u16.to_be_bytes().to_vec()).unwrap();
//! cells.add(1000u16.to_be_bytes().to_vec()).unwrap();
//!
//! let order: Vec<u16> = cells
//!     .iter()
//!     .map(|cell| u16::from_be_bytes([cell[0], cell[1]]))
//!     .collect();
//! assert_eq!(order, vec![3, 1000, 1002]);
//! assert_eq!(cells.get_by_qualifier(1001).unwrap(), None);
//!
//! // qualifiers outside both ranges are rejected:
//! assert!(cells.add(1003u16.to_be_bytes().to_vec()).is_err());
//! ```
//!
//! Cells are usually structs holding a qualifier alongside other data. The simplest way to make
//! them usable with [`EncodedCellList`] is the [`#[derive(Cell)]`](macro@Cell) macro:
//!
//! ```
//! use encoded_cells::{Cell, EncodedCellList, QualifierEncodingScheme};
//!
//! #[derive(Cell, Debug, PartialEq)]
//! # #[is_doctest_5f0c2e7a_3d1b_4a69_b8e2_91c4d7f06a13]
//! struct KeyValue {
//!     #[qualifier]
//!     qualifier: Vec<u8>,
//!     value: String,
//! }
//!
//! let mut row = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
//! row.add(KeyValue { qualifier: vec![12], value: "Alice".to_string() }).unwrap();
//! assert_eq!(row.get_by_qualifier(12).unwrap().unwrap().value, "Alice");
//! ```

pub mod cell;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod layout;
pub mod list;

#[cfg(test)]
mod proptests;

#[doc(inline)]
pub use cell::Cell;

/// Derive [`Cell`](trait@Cell) for custom cell types.
///
/// The derived implementation uses one field of the struct as the whole qualifier buffer, so
/// that field must implement [`AsRef<[u8]>`](AsRef). A struct with a single field uses that
/// field; otherwise mark the qualifier field with `#[qualifier]`:
///
/// ```
/// use encoded_cells::Cell;
///
/// // Okay:
/// #[derive(Cell)]
/// # #[is_doctest_5f0c2e7a_3d1b_4a69_b8e2_91c4d7f06a13]
/// struct Qualifier(Vec<u8>);
///
/// // Also okay:
/// #[derive(Cell)]
/// # #[is_doctest_5f0c2e7a_3d1b_4a69_b8e2_91c4d7f06a13]
/// struct KeyValue {
///     row: Vec<u8>,
///     #[qualifier]
///     qualifier: [u8; 2],
///     value: u64,
/// }
///
/// let kv = KeyValue { row: b"r1".to_vec(), qualifier: [0, 12], value: 7 };
/// assert_eq!(kv.qualifier(), Some(&[0u8, 12][..]));
/// ```
///
/// Cells whose qualifier is a window into a larger buffer should implement
/// [`Cell`](trait@Cell) by hand, overriding
/// [`qualifier_offset`](trait@Cell#method.qualifier_offset) and
/// [`qualifier_length`](trait@Cell#method.qualifier_length).
#[doc(inline)]
pub use encoded_cells_derive::Cell;

#[doc(inline)]
pub use cursor::{Cursor, ListCursor};

#[doc(inline)]
pub use encoding::{EncodingError, EncodingScheme, QualifierEncodingScheme};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use layout::{QualifierRange, ReservedRange};

#[doc(inline)]
pub use list::EncodedCellList;
