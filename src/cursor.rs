//! Fail-fast cursors over an [`EncodedCellList`].
//!
//! A cursor does not borrow the list between calls. Instead every call takes the list as an
//! argument, which lets a cursor remove or replace cells while walking the list:
//!
//! ```
//! use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
//!
//! let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
//! cells.add_all([vec![12u8], vec![13u8], vec![14u8]]).unwrap();
//!
//! let mut cursor = cells.cursor();
//! while let Some(cell) = cursor.next(&cells).unwrap() {
//!     if cell[0] % 2 == 1 {
//!         cursor.remove(&mut cells).unwrap();
//!     }
//! }
//! assert_eq!(cells.to_vec(), vec![vec![12u8], vec![14u8]]);
//! ```
//!
//! A cursor only works with the list that created it; handing it any other list, including a
//! clone, fails with [`Error::ForeignList`]. If its own list is structurally modified by
//! anything other than the cursor, the next call fails with
//! [`Error::ConcurrentModification`]:
//!
//! ```
//! use encoded_cells::{EncodedCellList, Error, QualifierEncodingScheme};
//!
//! let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
//! cells.add(vec![12u8]).unwrap();
//!
//! let mut cursor = cells.cursor();
//! cells.add(vec![13u8]).unwrap();
//! assert!(matches!(cursor.next(&cells), Err(Error::ConcurrentModification { .. })));
//! ```

use crate::{
    cell::Cell,
    encoding::EncodingScheme,
    error::{Error, Result},
    list::EncodedCellList,
};

/// A forward cursor over an [`EncodedCellList`], created by
/// [`EncodedCellList::cursor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    next_slot: Option<usize>,
    last_returned: Option<usize>,
    expected_generation: u64,
    list_id: u64,
}

impl Cursor {
    pub(crate) fn new<T: Cell, S: EncodingScheme>(list: &EncodedCellList<T, S>) -> Self {
        Cursor {
            next_slot: list.next_present(0),
            last_returned: None,
            expected_generation: list.generation(),
            list_id: list.id(),
        }
    }

    /// Returns `true` if a call to [`next`](Cursor::next) would return a cell, as of the
    /// cursor's last call.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next_slot.is_some()
    }

    /// Advances the cursor, returning the next cell in qualifier order, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ForeignList`] if `list` is not the list that created this cursor, and
    /// [`Error::ConcurrentModification`] if the list was structurally modified other than
    /// through this cursor.
    pub fn next<'a, T: Cell, S: EncodingScheme>(
        &mut self,
        list: &'a EncodedCellList<T, S>,
    ) -> Result<Option<&'a T>> {
        self.check(list)?;
        let Some(slot) = self.next_slot else {
            return Ok(None);
        };
        self.next_slot = list.next_present(slot + 1);
        self.last_returned = Some(slot);
        Ok(list.slot(slot))
    }

    /// Removes the cell most recently returned by [`next`](Cursor::next).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCurrentElement`] if `next` has not returned a cell since the last
    /// removal, and the errors of `next`.
    pub fn remove<T: Cell, S: EncodingScheme>(
        &mut self,
        list: &mut EncodedCellList<T, S>,
    ) -> Result<T> {
        self.remove_last(list).map(|(_, cell)| cell)
    }

    pub(crate) fn check<T: Cell, S: EncodingScheme>(
        &self,
        list: &EncodedCellList<T, S>,
    ) -> Result<()> {
        if list.id() != self.list_id {
            return Err(Error::ForeignList {
                expected: self.list_id,
                found: list.id(),
            });
        }
        let found = list.generation();
        if found != self.expected_generation {
            return Err(Error::ConcurrentModification {
                expected: self.expected_generation,
                found,
            });
        }
        Ok(())
    }

    fn remove_last<T: Cell, S: EncodingScheme>(
        &mut self,
        list: &mut EncodedCellList<T, S>,
    ) -> Result<(usize, T)> {
        self.check(list)?;
        let slot = self.last_returned.ok_or(Error::NoCurrentElement)?;
        let removed = list.take(slot).ok_or(Error::NoCurrentElement)?;
        self.last_returned = None;
        self.expected_generation = list.generation();
        Ok((slot, removed))
    }
}

/// A bidirectional cursor over an [`EncodedCellList`], created by
/// [`EncodedCellList::list_cursor`].
///
/// The cursor sits between two cells. [`next_index`](ListCursor::next_index) and
/// [`previous_index`](ListCursor::previous_index) report positions in qualifier order, the same
/// positions [`EncodedCellList::get`] takes. Cells cannot be inserted through the cursor, and
/// [`set`](ListCursor::set) only accepts a replacement with the same qualifier as the cell it
/// replaces.
///
/// ```
/// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
///
/// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
/// cells.add_all([vec![12u8], vec![15u8]]).unwrap();
///
/// let mut cursor = cells.list_cursor();
/// assert_eq!(cursor.next(&cells).unwrap(), Some(&vec![12u8]));
/// assert_eq!(cursor.next(&cells).unwrap(), Some(&vec![15u8]));
/// assert_eq!(cursor.next_index(), 2);
///
/// assert_eq!(cursor.previous(&cells).unwrap(), Some(&vec![15u8]));
/// assert_eq!(cursor.previous_index(), Some(0));
///
/// assert!(cursor.set(&mut cells, vec![16u8]).is_err());
/// assert_eq!(cursor.set(&mut cells, vec![15u8]).unwrap(), vec![15u8]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCursor {
    cursor: Cursor,
    prev_slot: Option<usize>,
    next_index: usize,
}

impl ListCursor {
    pub(crate) fn new<T: Cell, S: EncodingScheme>(list: &EncodedCellList<T, S>) -> Self {
        ListCursor {
            cursor: Cursor::new(list),
            prev_slot: None,
            next_index: 0,
        }
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    #[inline]
    pub fn has_previous(&self) -> bool {
        self.prev_slot.is_some()
    }

    /// Returns the position of the cell a call to [`next`](ListCursor::next) would return.
    #[inline]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Returns the position of the cell a call to [`previous`](ListCursor::previous) would
    /// return, or `None` at the start of the list.
    #[inline]
    pub fn previous_index(&self) -> Option<usize> {
        self.next_index.checked_sub(1)
    }

    /// Moves the cursor forward, returning the cell it passed over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ForeignList`] if `list` is not the list that created this cursor, and
    /// [`Error::ConcurrentModification`] if the list was structurally modified other than
    /// through this cursor.
    pub fn next<'a, T: Cell, S: EncodingScheme>(
        &mut self,
        list: &'a EncodedCellList<T, S>,
    ) -> Result<Option<&'a T>> {
        let cell = self.cursor.next(list)?;
        if cell.is_some() {
            self.prev_slot = self.cursor.last_returned;
            self.next_index += 1;
        }
        Ok(cell)
    }

    /// Moves the cursor backward, returning the cell it passed over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ForeignList`] if `list` is not the list that created this cursor, and
    /// [`Error::ConcurrentModification`] if the list was structurally modified other than
    /// through this cursor.
    pub fn previous<'a, T: Cell, S: EncodingScheme>(
        &mut self,
        list: &'a EncodedCellList<T, S>,
    ) -> Result<Option<&'a T>> {
        self.cursor.check(list)?;
        let Some(slot) = self.prev_slot else {
            return Ok(None);
        };
        self.prev_slot = list.prev_present(slot);
        self.cursor.next_slot = Some(slot);
        self.cursor.last_returned = Some(slot);
        self.next_index -= 1;
        Ok(list.slot(slot))
    }

    /// Removes the cell most recently returned by [`next`](ListCursor::next) or
    /// [`previous`](ListCursor::previous).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCurrentElement`] if neither has returned a cell since the last
    /// removal, and the errors of `next`.
    pub fn remove<T: Cell, S: EncodingScheme>(
        &mut self,
        list: &mut EncodedCellList<T, S>,
    ) -> Result<T> {
        let (slot, removed) = self.cursor.remove_last(list)?;
        if self.cursor.next_slot == Some(slot) {
            // returned by 'previous': the cursor now sits before the following cell
            self.cursor.next_slot = list.next_present(slot + 1);
        } else {
            self.prev_slot = list.prev_present(slot);
            self.next_index -= 1;
        }
        Ok(removed)
    }

    /// Replaces the cell most recently returned by [`next`](ListCursor::next) or
    /// [`previous`](ListCursor::previous), returning the replaced cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `cell`'s qualifier maps to a different slot than
    /// the cell being replaced, [`Error::Encoding`] or [`Error::OutOfRange`] if `cell` cannot
    /// be placed at all, [`Error::NoCurrentElement`] if there is no cell to replace, and
    /// the errors of `next`. The list is unchanged on error.
    pub fn set<T: Cell, S: EncodingScheme>(
        &mut self,
        list: &mut EncodedCellList<T, S>,
        cell: T,
    ) -> Result<T> {
        self.cursor.check(list)?;
        let current = self.cursor.last_returned.ok_or(Error::NoCurrentElement)?;
        let (qualifier, slot) = list.locate(&cell)?;
        if slot != current {
            return Err(Error::InvalidArgument {
                qualifier,
                slot,
                current,
            });
        }
        let replaced = list.put(slot, cell);
        self.cursor.expected_generation = list.generation();
        match replaced {
            Some(replaced) => Ok(replaced),
            None => unreachable!("cursor positioned on vacant slot {slot}"),
        }
    }
}
