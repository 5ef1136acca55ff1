//! The [`EncodingScheme`] trait and the built-in [`QualifierEncodingScheme`].

use std::fmt::{Debug, Display};

use num_traits::{PrimInt, Unsigned};

/// A pure function recovering a column qualifier from its encoded bytes.
///
/// An `EncodingScheme` is handed to an [`EncodedCellList`](crate::EncodedCellList) when it is
/// constructed and is used to decode the qualifier of every cell added to the list. Decoding
/// must be deterministic and free of side effects: decoding the same bytes twice has to yield
/// the same qualifier, or the list will lose track of where its cells live.
///
/// Most users will want the built-in [`QualifierEncodingScheme`]:
///
/// ```
/// use encoded_cells::{EncodingScheme, QualifierEncodingScheme};
///
/// let scheme = QualifierEncodingScheme::TwoByte;
/// assert_eq!(scheme.decode(&[0x01, 0x02]), Ok(0x0102));
///
/// // a qualifier embedded in a larger buffer:
/// let row = [0xAA, 0xBB, 0x00, 0x0C, 0xCC];
/// assert_eq!(scheme.decode_at(&row, 2, 2), Ok(12));
/// ```
pub trait EncodingScheme: PartialEq + Debug {
    /// Decodes a qualifier occupying the whole of `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<u32, EncodingError>;

    /// Decodes a qualifier occupying `bytes[offset..offset + length]`.
    ///
    /// Returns [`EncodingError::OutOfBounds`] if the region does not fit in `bytes`.
    fn decode_at(&self, bytes: &[u8], offset: usize, length: usize) -> Result<u32, EncodingError> {
        let region = offset
            .checked_add(length)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(EncodingError::OutOfBounds {
                offset,
                length,
                available: bytes.len(),
            })?;
        self.decode(region)
    }
}

/// Errors produced while encoding or decoding qualifier bytes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("column qualifiers are not encoded under {scheme}")]
    NotEncoded { scheme: QualifierEncodingScheme },

    #[error("expected {expected} qualifier bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("qualifier {qualifier} exceeds the maximum {max} representable under {scheme}")]
    QualifierTooLarge {
        qualifier: u32,
        max: u32,
        scheme: QualifierEncodingScheme,
    },

    #[error(
        "qualifier region at offset {offset} with length {length} does not fit in {available} \
         bytes"
    )]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },
}

/// The fixed-width big-endian qualifier encodings used by encoded-column tables.
///
/// | Scheme | Width | Largest qualifier |
/// | ------ | ----- | ----------------- |
/// | `NonEncoded` | - | qualifiers are column names and cannot be decoded |
/// | `OneByte` | 1 | 255 |
/// | `TwoByte` | 2 | 65 535 |
/// | `ThreeByte` | 3 | 16 777 215 |
/// | `FourByte` | 4 | 2 147 483 647 |
///
/// # Serde Support
///
/// When the `serde` Cargo feature is enabled, a `QualifierEncodingScheme` is serialized as a
/// snake-case string, so it can appear in table metadata:
///
/// ```
/// # #[cfg(feature = "serde")]
/// # {
/// use encoded_cells::QualifierEncodingScheme;
///
/// let scheme: QualifierEncodingScheme = serde_json::from_str(r#""two_byte""#).unwrap();
/// assert_eq!(scheme, QualifierEncodingScheme::TwoByte);
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QualifierEncodingScheme {
    NonEncoded,
    OneByte,
    #[default]
    TwoByte,
    ThreeByte,
    FourByte,
}

impl QualifierEncodingScheme {
    /// Every scheme, ordered by its serialized value.
    pub const ALL: [QualifierEncodingScheme; 5] = [
        QualifierEncodingScheme::NonEncoded,
        QualifierEncodingScheme::OneByte,
        QualifierEncodingScheme::TwoByte,
        QualifierEncodingScheme::ThreeByte,
        QualifierEncodingScheme::FourByte,
    ];

    /// Returns the number of bytes in an encoded qualifier, or `None` for
    /// [`NonEncoded`](QualifierEncodingScheme::NonEncoded).
    pub fn width(self) -> Option<usize> {
        match self {
            QualifierEncodingScheme::NonEncoded => None,
            QualifierEncodingScheme::OneByte => Some(1),
            QualifierEncodingScheme::TwoByte => Some(2),
            QualifierEncodingScheme::ThreeByte => Some(3),
            QualifierEncodingScheme::FourByte => Some(4),
        }
    }

    /// Returns the largest qualifier this scheme can encode.
    ///
    /// ```
    /// use encoded_cells::QualifierEncodingScheme;
    ///
    /// assert_eq!(QualifierEncodingScheme::OneByte.max_qualifier(), Some(255));
    /// assert_eq!(QualifierEncodingScheme::FourByte.max_qualifier(), Some(i32::MAX as u32));
    /// assert_eq!(QualifierEncodingScheme::NonEncoded.max_qualifier(), None);
    /// ```
    pub fn max_qualifier(self) -> Option<u32> {
        match self {
            QualifierEncodingScheme::FourByte => Some(i32::MAX as u32),
            other => other.width().map(|width| (1u32 << (8 * width)) - 1),
        }
    }

    /// Returns the single-byte value this scheme is stored as in table metadata.
    pub fn serialized_value(self) -> u8 {
        match self {
            QualifierEncodingScheme::NonEncoded => 0,
            QualifierEncodingScheme::OneByte => 1,
            QualifierEncodingScheme::TwoByte => 2,
            QualifierEncodingScheme::ThreeByte => 3,
            QualifierEncodingScheme::FourByte => 4,
        }
    }

    /// Looks up a scheme by its [`serialized_value`](QualifierEncodingScheme::serialized_value).
    pub fn from_serialized_value(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Encodes `qualifier` as big-endian bytes of this scheme's width.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::NotEncoded`] for
    /// [`NonEncoded`](QualifierEncodingScheme::NonEncoded), and
    /// [`EncodingError::QualifierTooLarge`] if `qualifier` does not fit in the scheme's width.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoded_cells::QualifierEncodingScheme;
    ///
    /// let scheme = QualifierEncodingScheme::ThreeByte;
    /// assert_eq!(scheme.encode(0x010203).unwrap(), vec![0x01, 0x02, 0x03]);
    /// assert!(QualifierEncodingScheme::OneByte.encode(256).is_err());
    /// ```
    pub fn encode(self, qualifier: u32) -> Result<Vec<u8>, EncodingError> {
        let (width, max) = match (self.width(), self.max_qualifier()) {
            (Some(width), Some(max)) => (width, max),
            _ => return Err(EncodingError::NotEncoded { scheme: self }),
        };
        if qualifier > max {
            return Err(EncodingError::QualifierTooLarge {
                qualifier,
                max,
                scheme: self,
            });
        }
        Ok(qualifier.to_be_bytes()[4 - width..].to_vec())
    }
}

impl EncodingScheme for QualifierEncodingScheme {
    fn decode(&self, bytes: &[u8]) -> Result<u32, EncodingError> {
        let width = self
            .width()
            .ok_or(EncodingError::NotEncoded { scheme: *self })?;
        if bytes.len() != width {
            return Err(EncodingError::InvalidLength {
                expected: width,
                found: bytes.len(),
            });
        }
        read_big_endian(bytes).ok_or(EncodingError::InvalidLength {
            expected: width,
            found: bytes.len(),
        })
    }
}

impl Display for QualifierEncodingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QualifierEncodingScheme::NonEncoded => "NON_ENCODED_QUALIFIERS",
            QualifierEncodingScheme::OneByte => "ONE_BYTE_QUALIFIERS",
            QualifierEncodingScheme::TwoByte => "TWO_BYTE_QUALIFIERS",
            QualifierEncodingScheme::ThreeByte => "THREE_BYTE_QUALIFIERS",
            QualifierEncodingScheme::FourByte => "FOUR_BYTE_QUALIFIERS",
        };
        f.write_str(name)
    }
}

/// Reads an unsigned big-endian integer, or `None` if `bytes` is wider than `N`.
fn read_big_endian<N: PrimInt + Unsigned>(bytes: &[u8]) -> Option<N> {
    if bytes.len() > std::mem::size_of::<N>() {
        return None;
    }
    let mut value = N::zero();
    for &byte in bytes {
        // a nonzero value leaves at least one unread byte of room in N
        if !value.is_zero() {
            value = value << 8;
        }
        value = value | <N as num_traits::NumCast>::from(byte)?;
    }
    Some(value)
}
