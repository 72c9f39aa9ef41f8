//! Line-tracking feature records.
//!
//! The line-feature reply packs several kinds of record into one payload.
//! Each record is prefixed by a one-byte tag and a one-byte length; the
//! length counts the record body only, so the walk advances by
//! `2 + length` per record until the payload is exhausted.

use crate::reply::{DecodeError, Record, Records};

// Record tags inside a line-feature payload. The values double as the
// filter/presence bits of [`FeatureSet`].
const TAG_VECTOR: u8 = 0x01;
const TAG_INTERSECTION: u8 = 0x02;
const TAG_BARCODE: u8 = 0x04;

/// Set of line-tracking feature kinds
///
/// Used both to filter a query (which kinds the sensor should report) and
/// as the presence mask of a decoded reply (which kinds actually arrived).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeatureSet(u8);

impl FeatureSet {
    /// No feature kind
    pub const NONE: Self = Self(0);
    /// Tracked line vectors
    pub const VECTORS: Self = Self(TAG_VECTOR);
    /// Line intersections
    pub const INTERSECTIONS: Self = Self(TAG_INTERSECTION);
    /// Barcodes
    pub const BARCODES: Self = Self(TAG_BARCODE);
    /// Every feature kind
    pub const ALL: Self = Self(TAG_VECTOR | TAG_INTERSECTION | TAG_BARCODE);

    /// Raw wire value
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if every kind in `other` is in this set
    pub fn contains(self, other: FeatureSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Add the kinds in `other` to this set
    pub fn insert(&mut self, other: FeatureSet) {
        self.0 |= other.0;
    }
}

impl core::ops::BitOr for FeatureSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Scope of a line-feature query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeatureMode {
    /// Only the feature most relevant for single-line tracking
    Main,
    /// Every detected feature
    All,
}

impl FeatureMode {
    /// Mode byte of the request payload
    pub fn wire_value(self) -> u8 {
        match self {
            FeatureMode::Main => 0,
            FeatureMode::All => 1,
        }
    }
}

/// Behavior flags of the line-tracking algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineModeFlags(u8);

impl LineModeFlags {
    /// Defer branch choice at intersections until told via a turn command
    pub const TURN_DELAYED: Self = Self(0x01);
    /// Disable automatic vector choice; the controller selects by index
    pub const MANUAL_VECTOR_SELECT: Self = Self(0x02);
    /// Track light lines on a dark background
    pub const WHITE_LINE: Self = Self(0x80);

    /// Raw wire value
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for LineModeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A tracked line segment, tail to head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector {
    /// Tail X
    pub x0: u8,
    /// Tail Y
    pub y0: u8,
    /// Head X
    pub x1: u8,
    /// Head Y
    pub y1: u8,
    /// Tracking index assigned by the sensor
    pub index: u8,
    /// Flag bits (intersection present at head, etc.)
    pub flags: u8,
}

impl Record for Vector {
    const SIZE: usize = 6;

    fn read(bytes: &[u8]) -> Self {
        Self {
            x0: bytes[0],
            y0: bytes[1],
            x1: bytes[2],
            y1: bytes[3],
            index: bytes[4],
            flags: bytes[5],
        }
    }
}

/// One line leaving an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntersectionBranch {
    /// Tracking index of the branch line
    pub index: u8,
    /// Branch angle in degrees
    pub angle: i16,
}

/// A point where tracked lines meet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Intersection {
    /// Intersection X
    pub x: u8,
    /// Intersection Y
    pub y: u8,
    branch_count: u8,
    branch_slots: [IntersectionBranch; Self::MAX_BRANCHES],
}

impl Intersection {
    /// Branch slots carried per intersection record
    pub const MAX_BRANCHES: usize = 6;

    /// The lines converging into this intersection
    pub fn branches(&self) -> &[IntersectionBranch] {
        let count = usize::from(self.branch_count).min(Self::MAX_BRANCHES);
        &self.branch_slots[..count]
    }
}

impl Record for Intersection {
    // x, y, branch count, reserved, then MAX_BRANCHES slots of
    // {index, reserved, angle i16}
    const SIZE: usize = 4 + Self::MAX_BRANCHES * 4;

    fn read(bytes: &[u8]) -> Self {
        let mut branch_slots = [IntersectionBranch { index: 0, angle: 0 }; Self::MAX_BRANCHES];
        for (slot, chunk) in branch_slots.iter_mut().zip(bytes[4..].chunks_exact(4)) {
            *slot = IntersectionBranch {
                index: chunk[0],
                angle: i16::from_le_bytes([chunk[2], chunk[3]]),
            };
        }
        Self {
            x: bytes[0],
            y: bytes[1],
            branch_count: bytes[2],
            branch_slots,
        }
    }
}

/// A decoded barcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Barcode {
    /// Barcode X
    pub x: u8,
    /// Barcode Y
    pub y: u8,
    /// Flag bits (filtering constraint met, etc.)
    pub flags: u8,
    /// Numeric value of the barcode (0-15)
    pub code: u8,
}

impl Record for Barcode {
    const SIZE: usize = 4;

    fn read(bytes: &[u8]) -> Self {
        Self {
            x: bytes[0],
            y: bytes[1],
            flags: bytes[2],
            code: bytes[3],
        }
    }
}

/// All line-tracking features decoded from one reply payload
///
/// When the payload carries several records of the same kind, the last one
/// wins; the sensor sends at most one record per kind per frame.
#[derive(Debug, Clone, Copy)]
pub struct LineFeatures<'a> {
    present: FeatureSet,
    vectors: Records<'a, Vector>,
    intersections: Records<'a, Intersection>,
    barcodes: Records<'a, Barcode>,
}

impl<'a> LineFeatures<'a> {
    /// Walk a line-feature reply payload record by record
    ///
    /// Fails on a truncated record header or body and on unrecognized tags;
    /// a partial walk is never returned.
    pub fn parse(payload: &'a [u8]) -> Result<Self, DecodeError> {
        let mut features = Self {
            present: FeatureSet::NONE,
            vectors: Records::new(&[]),
            intersections: Records::new(&[]),
            barcodes: Records::new(&[]),
        };

        let mut cursor = 0;
        while cursor < payload.len() {
            if payload.len() - cursor < 2 {
                return Err(DecodeError::Truncated);
            }
            let tag = payload[cursor];
            let length = usize::from(payload[cursor + 1]);
            let body = payload
                .get(cursor + 2..cursor + 2 + length)
                .ok_or(DecodeError::Truncated)?;

            match tag {
                TAG_VECTOR => {
                    features.vectors = Records::new(body);
                    features.present.insert(FeatureSet::VECTORS);
                }
                TAG_INTERSECTION => {
                    features.intersections = Records::new(body);
                    features.present.insert(FeatureSet::INTERSECTIONS);
                }
                TAG_BARCODE => {
                    features.barcodes = Records::new(body);
                    features.present.insert(FeatureSet::BARCODES);
                }
                other => return Err(DecodeError::UnknownFeature(other)),
            }

            cursor += 2 + length;
        }

        Ok(features)
    }

    /// Which feature kinds the payload carried
    pub fn present(&self) -> FeatureSet {
        self.present
    }

    /// Tracked vectors
    pub fn vectors(&self) -> Records<'a, Vector> {
        self.vectors
    }

    /// Intersections
    pub fn intersections(&self) -> Records<'a, Intersection> {
        self.intersections
    }

    /// Barcodes
    pub fn barcodes(&self) -> Records<'a, Barcode> {
        self.barcodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_and_barcode_walk() {
        let payload = [
            0x01, 6, // vector record, 6 bytes
            10, 50, 40, 2, 1, 0, // tail (10,50) head (40,2) index 1
            0x04, 4, // barcode record, 4 bytes
            33, 44, 1, 9, // at (33,44), code 9
        ];
        let features = LineFeatures::parse(&payload).unwrap();

        assert!(features.present().contains(FeatureSet::VECTORS));
        assert!(features.present().contains(FeatureSet::BARCODES));
        assert!(!features.present().contains(FeatureSet::INTERSECTIONS));

        assert_eq!(features.vectors().len(), 1);
        let vector = features.vectors().get(0).unwrap();
        assert_eq!((vector.x0, vector.y0), (10, 50));
        assert_eq!((vector.x1, vector.y1), (40, 2));
        assert_eq!(vector.index, 1);

        assert_eq!(features.barcodes().len(), 1);
        let barcode = features.barcodes().get(0).unwrap();
        assert_eq!((barcode.x, barcode.y), (33, 44));
        assert_eq!(barcode.code, 9);
    }

    #[test]
    fn test_intersection_branches() {
        let mut payload = [0u8; 2 + Intersection::SIZE];
        payload[0] = 0x02; // intersection tag
        payload[1] = Intersection::SIZE as u8;
        payload[2] = 60; // x
        payload[3] = 20; // y
        payload[4] = 3; // branch count
        // first branch: index 2, angle -90
        payload[6] = 2;
        payload[8..10].copy_from_slice(&(-90i16).to_le_bytes());

        let features = LineFeatures::parse(&payload).unwrap();
        assert_eq!(features.intersections().len(), 1);

        let intersection = features.intersections().get(0).unwrap();
        assert_eq!((intersection.x, intersection.y), (60, 20));
        assert_eq!(intersection.branches().len(), 3);
        assert_eq!(intersection.branches()[0].index, 2);
        assert_eq!(intersection.branches()[0].angle, -90);
    }

    #[test]
    fn test_empty_payload_has_no_features() {
        let features = LineFeatures::parse(&[]).unwrap();
        assert_eq!(features.present(), FeatureSet::NONE);
        assert!(features.vectors().is_empty());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let payload = [0x08, 2, 0, 0];
        assert_eq!(
            LineFeatures::parse(&payload).unwrap_err(),
            DecodeError::UnknownFeature(0x08)
        );
    }

    #[test]
    fn test_truncated_record_body_rejected() {
        // Vector record claims 6 bytes but only 3 follow
        let payload = [0x01, 6, 1, 2, 3];
        assert_eq!(
            LineFeatures::parse(&payload).unwrap_err(),
            DecodeError::Truncated
        );
    }

    #[test]
    fn test_truncated_record_header_rejected() {
        // Lone tag byte with no length
        let payload = [0x01, 6, 1, 2, 3, 4, 5, 6, 0x04];
        assert_eq!(
            LineFeatures::parse(&payload).unwrap_err(),
            DecodeError::Truncated
        );
    }

    #[test]
    fn test_feature_set_operations() {
        let set = FeatureSet::VECTORS | FeatureSet::BARCODES;
        assert_eq!(set.bits(), 0x05);
        assert!(set.contains(FeatureSet::VECTORS));
        assert!(!set.contains(FeatureSet::INTERSECTIONS));
        assert!(FeatureSet::ALL.contains(set));
    }
}
