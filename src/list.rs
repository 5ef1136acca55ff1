//! The [`EncodedCellList<T, S>`] structure and its iterators.

use std::{
    iter::FusedIterator,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, trace};

use crate::{
    cell::Cell,
    cursor::{Cursor, ListCursor},
    encoding::{EncodingError, EncodingScheme, QualifierEncodingScheme},
    error::{Error, Result},
    layout::{QualifierRange, ReservedRange, SlotMap},
};

/// A list of row cells ordered and indexed by their encoded column qualifiers.
///
/// An `EncodedCellList<T, S>` is built for a fixed qualifier range and
/// [`EncodingScheme`]. Every cell added to it is decoded to find its qualifier, and the
/// qualifier alone decides which slot of a fixed-size store the cell lives in. This gives:
///
/// - `O(1)` lookup by qualifier with [`get_by_qualifier`](EncodedCellList::get_by_qualifier),
///   which is how a row should be assembled from its cells;
/// - iteration in ascending qualifier order over the cells actually present;
/// - `O(1)` access to the cell with the smallest qualifier via
///   [`first`](EncodedCellList::first).
///
/// ```
/// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
///
/// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
/// cells.add(vec![15u8]).unwrap();
/// cells.add(vec![12u8]).unwrap();
/// cells.add(vec![0u8]).unwrap(); // the reserved empty column
///
/// assert_eq!(cells.len(), 3);
/// assert_eq!(cells.get_by_qualifier(12).unwrap(), Some(&vec![12u8]));
/// assert_eq!(cells.get_by_qualifier(13).unwrap(), None);
/// assert_eq!(cells.first().unwrap(), &vec![0u8]);
///
/// let order: Vec<&Vec<u8>> = cells.iter().collect();
/// assert_eq!(order, vec![&vec![0u8], &vec![12], &vec![15]]);
/// ```
///
/// # The Slot Invariant
///
/// A cell can only ever sit in the slot its qualifier maps to (see [`SlotMap`]). For that
/// reason the list deliberately has no positional insertion, positional replacement,
/// positional removal, or sub-list views: any of those could move a cell away from its slot.
/// Adding a cell whose qualifier is already present replaces the existing cell, and in-place
/// replacement through a [`ListCursor`] is only allowed for a cell with the same qualifier.
///
/// # ⚠️ Performance Hazard: Positional Access
///
/// [`get`](EncodedCellList::get) finds the `index`-th cell by scanning the store, so it runs
/// in `O(capacity)` time, and a loop calling it for every index is quadratic. Use
/// [`iter`](EncodedCellList::iter), a [`Cursor`], or
/// [`get_by_qualifier`](EncodedCellList::get_by_qualifier) instead.
///
/// # Iteration and Modification
///
/// [`iter`](EncodedCellList::iter) borrows the list, so the compiler rules out modification
/// while it is alive. [`Cursor`] and [`ListCursor`] do not borrow the list between calls; they
/// remember the list's [`generation`](EncodedCellList::generation) and fail with
/// [`Error::ConcurrentModification`] if the list was structurally changed by anything other
/// than the cursor itself. Every list, including every clone, also carries a process-unique
/// identity, and a cursor handed a list other than the one that created it fails with
/// [`Error::ForeignList`]. These checks detect common misuse; they are not a synchronization
/// mechanism, and the list is not meant to be shared between threads while being modified.
pub struct EncodedCellList<T, S = QualifierEncodingScheme> {
    slots: Box<[Option<T>]>,
    slot_map: SlotMap,
    scheme: S,
    num_present: usize,
    first_present: Option<usize>,
    generation: u64,
    id: u64,
}

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

fn next_list_id() -> u64 {
    NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed)
}

impl<T: Cell, S: EncodingScheme> EncodedCellList<T, S> {
    /// Constructs an empty list accepting qualifiers in `[min, max]` plus the default
    /// [`ReservedRange`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `min > max`.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, Error, QualifierEncodingScheme};
    ///
    /// let cells: EncodedCellList<Vec<u8>> =
    ///     EncodedCellList::new(11, 20, QualifierEncodingScheme::TwoByte).unwrap();
    /// assert!(cells.is_empty());
    ///
    /// let invalid = EncodedCellList::<Vec<u8>>::new(20, 11, QualifierEncodingScheme::TwoByte);
    /// assert_eq!(invalid.unwrap_err(), Error::InvalidRange { min: 20, max: 11 });
    /// ```
    pub fn new(min: u32, max: u32, scheme: S) -> Result<Self> {
        let range = QualifierRange::new(min, max)?;
        Ok(Self::with_reserved_range(
            range,
            ReservedRange::default(),
            scheme,
        ))
    }

    /// Constructs an empty list for `range`, with an explicit reserved range.
    pub fn with_reserved_range(range: QualifierRange, reserved: ReservedRange, scheme: S) -> Self {
        let slot_map = SlotMap::new(range, reserved);
        debug!(
            min = range.min(),
            max = range.max(),
            capacity = slot_map.capacity(),
            offset = slot_map.offset(),
            "allocating encoded cell list"
        );
        EncodedCellList {
            slots: std::iter::repeat_with(|| None)
                .take(slot_map.capacity())
                .collect(),
            slot_map,
            scheme,
            num_present: 0,
            first_present: None,
            generation: 0,
            id: next_list_id(),
        }
    }

    /// Returns the number of cells in the list. Runs in `O(1)` time.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_present
    }

    /// Returns `true` if the list holds no cells. Runs in `O(1)` time.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_present == 0
    }

    /// Returns the number of slots in the backing store, which is fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn qualifier_range(&self) -> QualifierRange {
        self.slot_map.range()
    }

    #[inline]
    pub fn reserved_range(&self) -> ReservedRange {
        self.slot_map.reserved()
    }

    #[inline]
    pub fn encoding_scheme(&self) -> &S {
        &self.scheme
    }

    /// Returns the number of structural changes made to the list so far.
    ///
    /// Adding, removing or replacing a cell and clearing the list each advance the generation.
    /// Cursors use it to detect modifications they did not make.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds a cell at the slot its qualifier maps to, returning the cell it replaced, if any.
    ///
    /// The previous occupant of the slot is replaced unconditionally, whether or not it is
    /// equal to `cell`. The length only grows if the slot was vacant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the cell's qualifier cannot be decoded, and
    /// [`Error::OutOfRange`] if the qualifier is outside the declared range and not reserved.
    /// The list is unchanged on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
    ///
    /// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
    /// assert_eq!(cells.add(vec![12u8]).unwrap(), None);
    /// assert_eq!(cells.add(vec![12u8]).unwrap(), Some(vec![12u8]));
    /// assert_eq!(cells.len(), 1);
    ///
    /// assert!(cells.add(vec![21u8]).is_err());
    /// assert_eq!(cells.len(), 1);
    /// ```
    pub fn add(&mut self, cell: T) -> Result<Option<T>> {
        let (_, slot) = self.locate(&cell)?;
        Ok(self.put(slot, cell))
    }

    /// Adds every cell in `cells`, returning `true` if any cell was added.
    ///
    /// All cells are validated before any of them is stored, so on error the list is
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
    ///
    /// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
    /// assert!(cells.add_all([vec![12u8], vec![14u8]]).unwrap());
    ///
    /// // '99' is out of range, so '13' is not added either:
    /// assert!(cells.add_all([vec![13u8], vec![99u8]]).is_err());
    /// assert_eq!(cells.len(), 2);
    /// ```
    pub fn add_all<I: IntoIterator<Item = T>>(&mut self, cells: I) -> Result<bool> {
        let mut located = Vec::new();
        for cell in cells {
            let (_, slot) = self.locate(&cell)?;
            located.push((slot, cell));
        }
        let changed = !located.is_empty();
        for (slot, cell) in located {
            self.put(slot, cell);
        }
        Ok(changed)
    }

    /// Returns the cell with the given qualifier, or `None` if no such cell is present.
    ///
    /// # Complexity
    ///
    /// Runs in `O(1)` time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the qualifier is outside the declared range and not
    /// reserved.
    pub fn get_by_qualifier(&self, qualifier: u32) -> Result<Option<&T>> {
        let slot = self.slot_map.slot_of(qualifier)?;
        Ok(self.slots[slot].as_ref())
    }

    /// Decodes `qualifier` with the list's encoding scheme and returns the matching cell.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
    ///
    /// let mut cells = EncodedCellList::new(11, 300, QualifierEncodingScheme::TwoByte).unwrap();
    /// cells.add(vec![0x01, 0x2C]).unwrap();
    /// assert_eq!(cells.get_by_qualifier_bytes(&[0x01, 0x2C]).unwrap(), Some(&vec![0x01, 0x2C]));
    /// assert!(cells.get_by_qualifier_bytes(&[0x01]).is_err());
    /// ```
    pub fn get_by_qualifier_bytes(&self, qualifier: &[u8]) -> Result<Option<&T>> {
        let qualifier = self.scheme.decode(qualifier)?;
        self.get_by_qualifier(qualifier)
    }

    /// Returns the cell with the smallest qualifier.
    ///
    /// # Complexity
    ///
    /// Runs in `O(1)` time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if the list is empty.
    pub fn first(&self) -> Result<&T> {
        self.first_present
            .and_then(|slot| self.slots[slot].as_ref())
            .ok_or(Error::Empty)
    }

    /// Returns the `index`-th cell in qualifier order.
    ///
    /// # ⚠️ Complexity
    ///
    /// Runs in `O(capacity)` time. Calling `get` for every index is `O(n²)`; prefer
    /// [`iter`](EncodedCellList::iter).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
    ///
    /// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
    /// cells.add_all([vec![18u8], vec![12u8]]).unwrap();
    /// assert_eq!(cells.get(1).unwrap(), &vec![18u8]);
    /// assert!(cells.get(2).is_err());
    /// ```
    pub fn get(&self, index: usize) -> Result<&T> {
        if index >= self.num_present {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.num_present,
            });
        }
        let first = self.first_present.unwrap_or(0);
        match self.slots[first..].iter().flatten().nth(index) {
            Some(cell) => Ok(cell),
            None => unreachable!(
                "no cell at index {index} even though the list holds {} cells",
                self.num_present
            ),
        }
    }

    /// Removes the first cell equal to `cell`, returning `true` if one was found.
    ///
    /// # Complexity
    ///
    /// Runs in `O(capacity)` time.
    pub fn remove(&mut self, cell: &T) -> bool
    where
        T: PartialEq,
    {
        match self.slot_of_equal(cell) {
            Some(slot) => self.take(slot).is_some(),
            None => false,
        }
    }

    /// Removes every cell equal to one of `cells`, returning `true` if anything was removed.
    pub fn remove_all<'a, I>(&mut self, cells: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: PartialEq + 'a,
    {
        let mut changed = false;
        for cell in cells {
            changed |= self.remove(cell);
        }
        changed
    }

    /// Returns `true` if the list holds a cell equal to `cell`.
    pub fn contains(&self, cell: &T) -> bool
    where
        T: PartialEq,
    {
        self.slot_of_equal(cell).is_some()
    }

    /// Returns `true` if the list holds a cell equal to each of `cells`.
    pub fn contains_all<'a, I>(&self, cells: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: PartialEq + 'a,
    {
        cells.into_iter().all(|cell| self.contains(cell))
    }

    /// Returns the position in qualifier order of the first cell equal to `cell`.
    pub fn index_of(&self, cell: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|present| present == cell)
    }

    /// Returns the position in qualifier order of the last cell equal to `cell`.
    pub fn last_index_of(&self, cell: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().rposition(|present| present == cell)
    }

    /// Keeps only the cells that `other` also holds under the same qualifier.
    ///
    /// A cell is removed if `other` has no cell with its qualifier, if its qualifier is out of
    /// `other`'s range, or if `other`'s cell is not equal to it. Returns `true` if any cell was
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if `other` decodes qualifiers with a different encoding
    /// scheme or uses a different reserved range, since qualifiers of the two lists would not
    /// name the same columns. The list is unchanged on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::{EncodedCellList, QualifierEncodingScheme};
    ///
    /// let mut cells = EncodedCellList::new(11, 20, QualifierEncodingScheme::OneByte).unwrap();
    /// cells.add_all([vec![3u8], vec![12u8], vec![20u8]]).unwrap();
    ///
    /// let mut other = EncodedCellList::new(11, 15, QualifierEncodingScheme::OneByte).unwrap();
    /// other.add(vec![12u8]).unwrap();
    ///
    /// assert!(cells.retain_all(&other).unwrap());
    /// assert_eq!(cells.iter().collect::<Vec<_>>(), vec![&vec![12u8]]);
    /// ```
    pub fn retain_all(&mut self, other: &EncodedCellList<T, S>) -> Result<bool>
    where
        T: PartialEq,
    {
        if self.scheme != other.scheme || self.reserved_range() != other.reserved_range() {
            return Err(Error::Unsupported(
                "retain_all requires a list with the same encoding scheme and reserved range",
            ));
        }
        let mut removed = 0usize;
        let mut cursor = self.first_present;
        while let Some(slot) = cursor {
            let keep = match (self.slot_map.qualifier_of(slot), &self.slots[slot]) {
                (Some(qualifier), Some(cell)) => {
                    matches!(other.get_by_qualifier(qualifier), Ok(Some(theirs)) if theirs == cell)
                }
                _ => false,
            };
            if !keep {
                self.take(slot);
                removed += 1;
            }
            cursor = self.next_present(slot + 1);
        }
        debug!(
            removed,
            remaining = self.num_present,
            "retained cells shared with other list"
        );
        Ok(removed > 0)
    }

    /// Removes every cell, keeping the backing store.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        trace!(removed = self.num_present, "cleared encoded cell list");
        self.num_present = 0;
        self.first_present = None;
        self.bump_generation();
    }

    /// Returns an iterator over the cells in ascending qualifier order.
    ///
    /// # Complexity
    ///
    /// Iterating over all cells takes `O(capacity)` time in the worst case.
    pub fn iter(&self) -> Iter<'_, T> {
        let first = self.first_present.unwrap_or(self.slots.len());
        Iter {
            remaining: self.num_present,
            inner: self.slots[first..].iter(),
        }
    }

    /// Copies the cells, in qualifier order, into a new vector.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Returns a fail-fast forward [`Cursor`] positioned before the first cell.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    /// Returns a fail-fast bidirectional [`ListCursor`] positioned before the first cell.
    pub fn list_cursor(&self) -> ListCursor {
        ListCursor::new(self)
    }

    /// Identifies this list among all lists alive in the process.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Decodes `cell`'s qualifier and finds its slot.
    pub(crate) fn locate(&self, cell: &T) -> Result<(u32, usize)> {
        let bytes = cell
            .qualifier()
            .ok_or_else(|| EncodingError::OutOfBounds {
                offset: cell.qualifier_offset(),
                length: cell.qualifier_length(),
                available: cell.qualifier_array().len(),
            })?;
        let qualifier = self.scheme.decode(bytes)?;
        let slot = self.slot_map.slot_of(qualifier)?;
        Ok((qualifier, slot))
    }

    pub(crate) fn slot(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Returns the first occupied slot at or after `from`.
    pub(crate) fn next_present(&self, from: usize) -> Option<usize> {
        self.slots
            .get(from..)?
            .iter()
            .position(Option::is_some)
            .map(|i| from + i)
    }

    /// Returns the last occupied slot before `before`.
    pub(crate) fn prev_present(&self, before: usize) -> Option<usize> {
        self.slots[..before.min(self.slots.len())]
            .iter()
            .rposition(Option::is_some)
    }

    /// Stores `cell` at `slot`, keeping the count, first-slot cache and generation in step.
    pub(crate) fn put(&mut self, slot: usize, cell: T) -> Option<T> {
        let previous = self.slots[slot].replace(cell);
        if previous.is_none() {
            self.num_present += 1;
        }
        if self.first_present.map_or(true, |first| slot < first) {
            self.first_present = Some(slot);
        }
        self.bump_generation();
        previous
    }

    /// Empties `slot`, keeping the count, first-slot cache and generation in step.
    pub(crate) fn take(&mut self, slot: usize) -> Option<T> {
        let removed = self.slots.get_mut(slot)?.take()?;
        self.num_present -= 1;
        if self.num_present == 0 {
            self.first_present = None;
        } else if self.first_present == Some(slot) {
            self.first_present = self.next_present(slot + 1);
            trace!(
                removed_slot = slot,
                first_slot = ?self.first_present,
                "rescanned for first present cell"
            );
        }
        self.bump_generation();
        Some(removed)
    }

    fn slot_of_equal(&self, cell: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let first = self.first_present?;
        self.slots[first..]
            .iter()
            .position(|present| present.as_ref() == Some(cell))
            .map(|i| first + i)
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<T: Clone, S: Clone> Clone for EncodedCellList<T, S> {
    /// Clones the cells into a new list with its own identity, so cursors of `self` cannot be
    /// used on the clone.
    fn clone(&self) -> Self {
        EncodedCellList {
            slots: self.slots.clone(),
            slot_map: self.slot_map,
            scheme: self.scheme.clone(),
            num_present: self.num_present,
            first_present: self.first_present,
            generation: self.generation,
            id: next_list_id(),
        }
    }
}

impl<T: std::fmt::Debug, S> std::fmt::Debug for EncodedCellList<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.slots.iter().flatten()).finish()
    }
}

impl<T: PartialEq, S> PartialEq for EncodedCellList<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.num_present == other.num_present
            && self
                .slots
                .iter()
                .flatten()
                .eq(other.slots.iter().flatten())
    }
}

impl<T: Eq, S> Eq for EncodedCellList<T, S> {}

macro_rules! impl_iter {
    (
        $(#[$attr:meta])*
        $name:ident { $($generic:tt)* } => $item_ty:ty
        { inner: $inner_ty:ty, }
    ) => {
        $(#[$attr])*
        #[derive(Debug)]
        pub struct $name<$($generic)*> {
            remaining: usize,
            inner: $inner_ty,
        }

        impl<$($generic)*> Iterator for $name<$($generic)*> {
            type Item = $item_ty;

            fn next(&mut self) -> Option<Self::Item> {
                // skip the scan over trailing vacant slots
                if self.remaining == 0 {
                    return None;
                }
                for opt in self.inner.by_ref() {
                    if let Some(cell) = opt {
                        self.remaining -= 1;
                        return Some(cell);
                    }
                }
                None
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                (self.remaining, Some(self.remaining))
            }

            fn count(self) -> usize {
                self.remaining
            }

            fn last(mut self) -> Option<Self::Item> {
                self.next_back()
            }
        }

        impl<$($generic)*> DoubleEndedIterator for $name<$($generic)*> {
            fn next_back(&mut self) -> Option<Self::Item> {
                if self.remaining == 0 {
                    return None;
                }
                while let Some(opt) = self.inner.next_back() {
                    if let Some(cell) = opt {
                        self.remaining -= 1;
                        return Some(cell);
                    }
                }
                None
            }
        }

        impl<$($generic)*> ExactSizeIterator for $name<$($generic)*> {
            fn len(&self) -> usize {
                self.remaining
            }
        }

        impl<$($generic)*> FusedIterator for $name<$($generic)*> {}
    }
}

impl_iter! {
    /// An iterator over the cells of an [`EncodedCellList<T, S>`] in ascending qualifier order.
    ///
    /// This type is returned by [`EncodedCellList::iter`].
    Iter { 'a, T } => &'a T {
        inner: std::slice::Iter<'a, Option<T>>,
    }
}

impl_iter! {
    /// An iterator moving the cells out of an [`EncodedCellList<T, S>`] in ascending qualifier
    /// order.
    IntoIter { T } => T {
        inner: std::vec::IntoIter<Option<T>>,
    }
}

impl<'a, T: Cell, S: EncodingScheme> IntoIterator for &'a EncodedCellList<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> IntoIterator for EncodedCellList<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.num_present,
            inner: self.slots.into_vec().into_iter(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::QualifierEncodingScheme::{OneByte, TwoByte};

    /// A cell with a value, compared on both qualifier and value.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct KeyValue {
        qualifier: Vec<u8>,
        value: &'static str,
    }

    impl Cell for KeyValue {
        fn qualifier_array(&self) -> &[u8] {
            &self.qualifier
        }
    }

    fn kv(qualifier: u16, value: &'static str) -> KeyValue {
        KeyValue {
            qualifier: qualifier.to_be_bytes().to_vec(),
            value,
        }
    }

    fn small_reserved_list(min: u32, max: u32) -> EncodedCellList<KeyValue> {
        EncodedCellList::with_reserved_range(
            QualifierRange::new(min, max).unwrap(),
            ReservedRange::new(0, 10).unwrap(),
            TwoByte,
        )
    }

    fn qualifiers(list: &EncodedCellList<KeyValue>) -> Vec<u16> {
        list.iter()
            .map(|cell| u16::from_be_bytes([cell.qualifier[0], cell.qualifier[1]]))
            .collect()
    }

    #[test]
    fn test_reserved_and_declared_ranges() {
        let mut list = small_reserved_list(1000, 1002);
        list.add(kv(1002, "c")).unwrap();
        list.add(kv(3, "a")).unwrap();
        list.add(kv(1000, "b")).unwrap();

        assert_eq!(qualifiers(&list), vec![3, 1000, 1002]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get_by_qualifier(1001).unwrap(), None);

        assert!(list.remove(&kv(1000, "b")));
        assert_eq!(list.first().unwrap(), &kv(3, "a"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_add_overwrites_without_growing() {
        let mut list = small_reserved_list(1000, 1002);
        assert_eq!(list.add(kv(1001, "old")).unwrap(), None);
        assert_eq!(list.add(kv(1001, "new")).unwrap(), Some(kv(1001, "old")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get_by_qualifier(1001).unwrap(), Some(&kv(1001, "new")));
    }

    #[test]
    fn test_add_out_of_range_leaves_list_unchanged() {
        let mut list = small_reserved_list(1000, 1002);
        list.add(kv(1000, "a")).unwrap();
        let generation = list.generation();

        assert_eq!(
            list.add(kv(1003, "x")),
            Err(Error::OutOfRange {
                qualifier: 1003,
                min: 1000,
                max: 1002
            })
        );
        assert!(list.add(kv(500, "x")).is_err());
        assert_eq!(list.len(), 1);
        assert_eq!(list.generation(), generation);
        assert_eq!(qualifiers(&list), vec![1000]);
    }

    #[test]
    fn test_add_undecodable_cell() {
        let mut list = small_reserved_list(1000, 1002);
        let bad = KeyValue {
            qualifier: vec![1, 2, 3],
            value: "x",
        };
        assert!(matches!(list.add(bad), Err(Error::Encoding(_))));
        assert!(list.is_empty());
    }

    #[test]
    fn test_add_reads_qualifier_window() {
        struct RowCell {
            buffer: Vec<u8>,
            offset: usize,
            length: usize,
        }

        impl Cell for RowCell {
            fn qualifier_array(&self) -> &[u8] {
                &self.buffer
            }

            fn qualifier_offset(&self) -> usize {
                self.offset
            }

            fn qualifier_length(&self) -> usize {
                self.length
            }
        }

        let mut list = EncodedCellList::new(11, 20, TwoByte).unwrap();
        list.add(RowCell {
            buffer: vec![b'r', 0x00, 0x0E, b'v'],
            offset: 1,
            length: 2,
        })
        .unwrap();
        assert!(list.get_by_qualifier(14).unwrap().is_some());

        let past_end = RowCell {
            buffer: vec![b'r', 0x00],
            offset: 1,
            length: 2,
        };
        assert_eq!(
            list.add(past_end).map(|replaced| replaced.is_some()),
            Err(Error::Encoding(EncodingError::OutOfBounds {
                offset: 1,
                length: 2,
                available: 2
            }))
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_get_by_qualifier_out_of_range() {
        let list = small_reserved_list(1000, 1002);
        assert!(list.get_by_qualifier(2000).is_err());
        assert_eq!(list.get_by_qualifier(9).unwrap(), None);
    }

    #[test]
    fn test_first_tracks_minimum() {
        let mut list = small_reserved_list(1000, 1010);
        assert_eq!(list.first(), Err(Error::Empty));

        list.add(kv(1005, "e")).unwrap();
        assert_eq!(list.first().unwrap().value, "e");
        list.add(kv(1001, "b")).unwrap();
        assert_eq!(list.first().unwrap().value, "b");
        list.add(kv(1008, "h")).unwrap();
        assert_eq!(list.first().unwrap().value, "b");

        assert!(list.remove(&kv(1001, "b")));
        assert_eq!(list.first().unwrap().value, "e");
        assert!(list.remove(&kv(1005, "e")));
        assert_eq!(list.first().unwrap().value, "h");
        assert!(list.remove(&kv(1008, "h")));
        assert_eq!(list.first(), Err(Error::Empty));
    }

    #[test]
    fn test_remove_requires_equality() {
        let mut list = small_reserved_list(1000, 1002);
        list.add(kv(1000, "a")).unwrap();
        assert!(!list.remove(&kv(1000, "different value")));
        assert_eq!(list.len(), 1);
        assert!(list.remove(&kv(1000, "a")));
        assert!(!list.remove(&kv(1000, "a")));
        assert!(list.is_empty());
    }

    #[test]
    fn test_positional_get() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1004, "d"), kv(2, "a"), kv(1001, "b")])
            .unwrap();
        assert_eq!(list.get(0).unwrap().value, "a");
        assert_eq!(list.get(1).unwrap().value, "b");
        assert_eq!(list.get(2).unwrap().value, "d");
        assert_eq!(list.get(3), Err(Error::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn test_positional_loop_matches_iteration() {
        // 'get' in a loop is quadratic; it still has to agree with 'iter'
        let mut list = small_reserved_list(1000, 1100);
        for q in (1000..=1100).step_by(7) {
            list.add(kv(q, "v")).unwrap();
        }
        let by_index: Vec<&KeyValue> = (0..list.len()).map(|i| list.get(i).unwrap()).collect();
        let by_iter: Vec<&KeyValue> = list.iter().collect();
        assert_eq!(by_index, by_iter);
    }

    #[test]
    fn test_contains_and_index_of() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1, "x"), kv(1003, "y"), kv(1005, "x")])
            .unwrap();
        assert!(list.contains(&kv(1003, "y")));
        assert!(!list.contains(&kv(1003, "z")));
        assert!(list.contains_all([&kv(1, "x"), &kv(1005, "x")]));
        assert!(!list.contains_all([&kv(1, "x"), &kv(1004, "x")]));
        assert_eq!(list.index_of(&kv(1003, "y")), Some(1));
        assert_eq!(list.last_index_of(&kv(1005, "x")), Some(2));
        assert_eq!(list.index_of(&kv(1004, "y")), None);
    }

    #[test]
    fn test_remove_all() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1000, "a"), kv(1001, "b"), kv(1002, "c")])
            .unwrap();
        assert!(list.remove_all([&kv(1000, "a"), &kv(1002, "c"), &kv(1004, "q")]));
        assert_eq!(qualifiers(&list), vec![1001]);
        assert!(!list.remove_all([&kv(1000, "a")]));
    }

    #[test]
    fn test_retain_all() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([
            kv(4, "reserved"),
            kv(1000, "kept"),
            kv(1002, "changed"),
            kv(1003, "missing"),
            kv(1005, "outside"),
        ])
        .unwrap();

        let mut other = small_reserved_list(1000, 1003);
        other
            .add_all([kv(4, "reserved"), kv(1000, "kept"), kv(1002, "other")])
            .unwrap();

        assert!(list.retain_all(&other).unwrap());
        assert_eq!(qualifiers(&list), vec![4, 1000]);
        assert_eq!(list.first().unwrap().value, "reserved");
        assert!(!list.retain_all(&other).unwrap());
    }

    #[test]
    fn test_retain_all_against_mismatched_list() {
        let mut list = small_reserved_list(1000, 1005);
        list.add(kv(1000, "a")).unwrap();
        let generation = list.generation();

        let other_scheme: EncodedCellList<KeyValue> = EncodedCellList::new(1000, 1005, OneByte).unwrap();
        assert!(matches!(
            list.retain_all(&other_scheme),
            Err(Error::Unsupported(_))
        ));

        let other_reserved: EncodedCellList<KeyValue> =
            EncodedCellList::new(1000, 1005, TwoByte).unwrap();
        assert!(matches!(
            list.retain_all(&other_reserved),
            Err(Error::Unsupported(_))
        ));

        assert_eq!(list.len(), 1);
        assert_eq!(list.generation(), generation);
    }

    #[test]
    fn test_clear() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1000, "a"), kv(1001, "b")]).unwrap();
        let generation = list.generation();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.first(), Err(Error::Empty));
        assert_eq!(list.iter().next(), None);
        assert_eq!(list.generation(), generation + 1);
        list.add(kv(1004, "c")).unwrap();
        assert_eq!(list.first().unwrap().value, "c");
    }

    #[test]
    fn test_iter_both_ends() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1, "a"), kv(1002, "b"), kv(1005, "c")])
            .unwrap();
        let mut it = list.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next_back().unwrap().value, "c");
        assert_eq!(it.next().unwrap().value, "a");
        assert_eq!(it.len(), 1);
        assert_eq!(it.next().unwrap().value, "b");
        assert_eq!(it.next(), None);
        assert_eq!(it.next_back(), None);
        assert_eq!(list.iter().last().unwrap().value, "c");
        assert_eq!(list.iter().count(), 3);
    }

    #[test]
    fn test_into_iter_and_to_vec() {
        let mut list = small_reserved_list(1000, 1005);
        list.add_all([kv(1003, "b"), kv(1001, "a")]).unwrap();
        assert_eq!(list.to_vec(), vec![kv(1001, "a"), kv(1003, "b")]);
        let values: Vec<&str> = list.into_iter().rev().map(|cell| cell.value).collect();
        assert_eq!(values, vec!["b", "a"]);
    }

    #[test]
    fn test_debug_and_eq() {
        let mut a = EncodedCellList::new(11, 20, OneByte).unwrap();
        let mut b = EncodedCellList::new(11, 30, OneByte).unwrap();
        a.add(vec![12u8]).unwrap();
        b.add(vec![12u8]).unwrap();
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "[[12]]");
        b.add(vec![3u8]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_cells_are_not_copied() {
        use std::rc::Rc;

        let cell = Rc::new(vec![15u8]);
        let mut list = EncodedCellList::new(11, 20, OneByte).unwrap();
        list.add(Rc::clone(&cell)).unwrap();
        assert_eq!(Rc::strong_count(&cell), 2);
        assert!(Rc::ptr_eq(list.first().unwrap(), &cell));
        list.clear();
        assert_eq!(Rc::strong_count(&cell), 1);
    }
}
