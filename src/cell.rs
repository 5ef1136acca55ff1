//! The [`Cell`] trait, implemented by every element an
//! [`EncodedCellList`](crate::EncodedCellList) can hold.

use std::{rc::Rc, sync::Arc};

/// A value carrying an encoded column qualifier.
///
/// The qualifier is the byte region `qualifier_array()[qualifier_offset()..][..qualifier_length()]`.
/// Cells backed by a shared row buffer can point into that buffer instead of copying their
/// qualifier out:
///
/// ```
/// use encoded_cells::Cell;
///
/// struct KeyValue {
///     buffer: Vec<u8>,
///     qualifier_offset: usize,
///     qualifier_length: usize,
/// }
///
/// impl Cell for KeyValue {
///     fn qualifier_array(&self) -> &[u8] {
///         &self.buffer
///     }
///
///     fn qualifier_offset(&self) -> usize {
///         self.qualifier_offset
///     }
///
///     fn qualifier_length(&self) -> usize {
///         self.qualifier_length
///     }
/// }
///
/// let kv = KeyValue { buffer: vec![b'r', 0x00, 0x0C, b'v'], qualifier_offset: 1, qualifier_length: 2 };
/// assert_eq!(kv.qualifier(), Some(&[0x00, 0x0C][..]));
/// ```
///
/// Byte slices and vectors are cells whose whole contents are the qualifier, and references and
/// smart pointers to cells are cells themselves, so a list can hold shared cells without copying
/// them. Structs can also derive the trait with [`#[derive(Cell)]`](macro@crate::Cell).
pub trait Cell {
    /// The buffer the qualifier lives in.
    fn qualifier_array(&self) -> &[u8];

    /// The start of the qualifier within [`qualifier_array`](Cell::qualifier_array).
    fn qualifier_offset(&self) -> usize {
        0
    }

    /// The length of the qualifier. Defaults to the rest of the buffer after the offset.
    fn qualifier_length(&self) -> usize {
        self.qualifier_array()
            .len()
            .saturating_sub(self.qualifier_offset())
    }

    /// Returns the qualifier bytes, or `None` if the declared region does not fit in the buffer.
    fn qualifier(&self) -> Option<&[u8]> {
        let offset = self.qualifier_offset();
        let end = offset.checked_add(self.qualifier_length())?;
        self.qualifier_array().get(offset..end)
    }
}

impl Cell for [u8] {
    fn qualifier_array(&self) -> &[u8] {
        self
    }
}

impl Cell for Vec<u8> {
    fn qualifier_array(&self) -> &[u8] {
        self
    }
}

macro_rules! impl_cell_forward {
    ($($ptr:ident),*) => {
        $(
            impl<C: Cell + ?Sized> Cell for $ptr<C> {
                #[inline]
                fn qualifier_array(&self) -> &[u8] {
                    (**self).qualifier_array()
                }

                #[inline]
                fn qualifier_offset(&self) -> usize {
                    (**self).qualifier_offset()
                }

                #[inline]
                fn qualifier_length(&self) -> usize {
                    (**self).qualifier_length()
                }
            }
        )*
    };
}

impl_cell_forward!(Box, Rc, Arc);

impl<C: Cell + ?Sized> Cell for &C {
    #[inline]
    fn qualifier_array(&self) -> &[u8] {
        (**self).qualifier_array()
    }

    #[inline]
    fn qualifier_offset(&self) -> usize {
        (**self).qualifier_offset()
    }

    #[inline]
    fn qualifier_length(&self) -> usize {
        (**self).qualifier_length()
    }
}
