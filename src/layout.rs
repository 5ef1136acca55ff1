//! Qualifier ranges and the mapping from qualifiers to storage slots.
//!
//! Qualifier space is split in two by a counter-start threshold:
//!
//! - the **reserved range** `[empty_column, counter_start)` holds system-assigned qualifiers and
//!   always has storage, no matter which range a list is declared with;
//! - the **non-reserved range** holds qualifiers at or above the threshold, and only the part
//!   of it inside the declared `[min, max]` gets storage.
//!
//! A [`SlotMap`] lays the reserved range out first, followed by the declared part of the
//! non-reserved range, so slot order always agrees with qualifier order.

use num_traits::ToPrimitive;

use crate::error::{Error, Result};

/// The qualifier reserved for the empty key-value column every row carries.
pub const ENCODED_EMPTY_COLUMN_QUALIFIER: u32 = 0;

/// The first qualifier handed out to user-defined columns.
pub const ENCODED_CQ_COUNTER_INITIAL_VALUE: u32 = 11;

/// The number of qualifiers in the default reserved range.
pub const RESERVED_RANGE_SIZE: u32 =
    ENCODED_CQ_COUNTER_INITIAL_VALUE - ENCODED_EMPTY_COLUMN_QUALIFIER;

/// An inclusive range `[min, max]` of column qualifiers declared for a list.
///
/// ```
/// use encoded_cells::QualifierRange;
///
/// let range = QualifierRange::new(11, 20).unwrap();
/// assert!(range.contains(11));
/// assert!(range.contains(20));
/// assert!(!range.contains(21));
///
/// assert!(QualifierRange::new(20, 11).is_err());
/// ```
///
/// # Serde Support
///
/// When the `serde` Cargo feature is enabled, a `QualifierRange` is serialized as
/// `{"min": .., "max": ..}`. Deserializing a range whose `min` exceeds its `max` fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RangeBounds"))]
pub struct QualifierRange {
    min: u32,
    max: u32,
}

impl QualifierRange {
    /// Constructs the range `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidRange { min, max });
        }
        Ok(QualifierRange { min, max })
    }

    #[inline]
    pub fn min(&self) -> u32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Returns `true` if `min <= qualifier <= max`.
    #[inline]
    pub fn contains(&self, qualifier: u32) -> bool {
        self.min <= qualifier && qualifier <= self.max
    }
}

/// The reserved segment `[empty_column, counter_start)` of qualifier space.
///
/// The default is `[ENCODED_EMPTY_COLUMN_QUALIFIER, ENCODED_CQ_COUNTER_INITIAL_VALUE)`.
/// Tables with a different qualifier allocation policy can declare their own:
///
/// ```
/// use encoded_cells::ReservedRange;
///
/// assert_eq!(ReservedRange::default().size(), 11);
///
/// let reserved = ReservedRange::new(0, 10).unwrap();
/// assert!(reserved.contains(9));
/// assert!(!reserved.contains(10));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ReservedBounds"))]
pub struct ReservedRange {
    empty_column: u32,
    counter_start: u32,
}

impl Default for ReservedRange {
    fn default() -> Self {
        ReservedRange {
            empty_column: ENCODED_EMPTY_COLUMN_QUALIFIER,
            counter_start: ENCODED_CQ_COUNTER_INITIAL_VALUE,
        }
    }
}

impl ReservedRange {
    /// Constructs the reserved range `[empty_column, counter_start)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `empty_column > counter_start`.
    pub fn new(empty_column: u32, counter_start: u32) -> Result<Self> {
        if empty_column > counter_start {
            return Err(Error::InvalidRange {
                min: empty_column,
                max: counter_start,
            });
        }
        Ok(ReservedRange {
            empty_column,
            counter_start,
        })
    }

    #[inline]
    pub fn empty_column(&self) -> u32 {
        self.empty_column
    }

    #[inline]
    pub fn counter_start(&self) -> u32 {
        self.counter_start
    }

    /// Returns the number of reserved qualifiers.
    #[inline]
    pub fn size(&self) -> u32 {
        self.counter_start - self.empty_column
    }

    #[inline]
    pub fn contains(&self, qualifier: u32) -> bool {
        self.empty_column <= qualifier && qualifier < self.counter_start
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RangeBounds {
    min: u32,
    max: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<RangeBounds> for QualifierRange {
    type Error = Error;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        QualifierRange::new(bounds.min, bounds.max)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ReservedBounds {
    empty_column: u32,
    counter_start: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<ReservedBounds> for ReservedRange {
    type Error = Error;

    fn try_from(bounds: ReservedBounds) -> Result<Self> {
        ReservedRange::new(bounds.empty_column, bounds.counter_start)
    }
}

/// A precomputed, strictly monotonic mapping from qualifiers to slots of a fixed-size store.
///
/// Reserved qualifiers map to `qualifier - empty_column`. Declared non-reserved qualifiers map
/// to `qualifier - offset`, where `offset = max(0, min - counter_start) + empty_column`, which
/// places the smallest declared non-reserved qualifier right after the reserved slots.
///
/// ```
/// use encoded_cells::{QualifierRange, ReservedRange, layout::SlotMap};
///
/// let map = SlotMap::new(QualifierRange::new(20, 22).unwrap(), ReservedRange::default());
/// assert_eq!(map.capacity(), 11 + 3);
/// assert_eq!(map.slot_of(3).unwrap(), 3);
/// assert_eq!(map.slot_of(20).unwrap(), 11);
/// assert_eq!(map.slot_of(22).unwrap(), 13);
/// assert!(map.slot_of(15).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotMap {
    range: QualifierRange,
    reserved: ReservedRange,
    offset: u64,
    capacity: usize,
}

impl SlotMap {
    pub fn new(range: QualifierRange, reserved: ReservedRange) -> Self {
        let counter_start = reserved.counter_start();
        let first_non_reserved = range.min().max(counter_start);
        let non_reserved_len = if range.max() < counter_start {
            0
        } else {
            u64::from(range.max() - first_non_reserved) + 1
        };
        let capacity = u64::from(reserved.size()) + non_reserved_len;
        SlotMap {
            range,
            reserved,
            offset: u64::from(first_non_reserved - counter_start)
                + u64::from(reserved.empty_column()),
            capacity: capacity.to_usize().unwrap_or(usize::MAX),
        }
    }

    #[inline]
    pub fn range(&self) -> QualifierRange {
        self.range
    }

    #[inline]
    pub fn reserved(&self) -> ReservedRange {
        self.reserved
    }

    /// The amount subtracted from a non-reserved qualifier to obtain its slot.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The number of slots needed to hold every qualifier this map accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the slot for `qualifier`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `qualifier` lies below the reserved range, or at or
    /// above the counter start but outside the declared range. Reserved qualifiers are always
    /// accepted.
    pub fn slot_of(&self, qualifier: u32) -> Result<usize> {
        let out_of_range = Error::OutOfRange {
            qualifier,
            min: self.range.min(),
            max: self.range.max(),
        };
        if qualifier < self.reserved.empty_column() {
            return Err(out_of_range);
        }
        if qualifier < self.reserved.counter_start() {
            return Ok((qualifier - self.reserved.empty_column()) as usize);
        }
        if !self.range.contains(qualifier) {
            return Err(out_of_range);
        }
        // offset <= counter_start - empty_column + (qualifier - counter_start) <= qualifier
        Ok((u64::from(qualifier) - self.offset) as usize)
    }

    /// Returns the qualifier stored at `slot`, or `None` if `slot` is not below the capacity.
    pub fn qualifier_of(&self, slot: usize) -> Option<u32> {
        if slot >= self.capacity {
            return None;
        }
        let reserved_size = self.reserved.size() as usize;
        if slot < reserved_size {
            return Some(self.reserved.empty_column() + slot as u32);
        }
        (slot as u64 + self.offset).to_u32()
    }
}
