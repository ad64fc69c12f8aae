use core::fmt;

use crate::id::layout::{FieldLayout, write_bit_layout_debug};

/// A 64-bit Snowflake-style identifier.
///
/// - 1 bit reserved (always zero)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits group ID (deployment group, e.g. a datacenter)
/// - 5 bits node ID (node within the group)
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21          17 16         12 11             0
///              +--------------+----------------+--------------+-------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | group ID (5) | node ID (5) | sequence (12) |
///              +--------------+----------------+--------------+-------------+---------------+
///              |<------------------ MSB ------------- 64 bits ------------- LSB ------------>|
/// ```
///
/// Ordering compares the raw integer, so IDs sort by timestamp first.
///
/// # Example
///
/// ```
/// use seqflake::SequenceId;
///
/// let id = SequenceId::from_components(1000, 3, 7, 42);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.group_id(), 3);
/// assert_eq!(id.node_id(), 7);
/// assert_eq!(id.sequence(), 42);
/// assert_eq!(u64::from(id), (1000 << 22) | (3 << 17) | (7 << 12) | 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceId {
    id: u64,
}

impl SequenceId {
    /// Bitmask for the reserved sign bit (bit 63).
    pub const RESERVED_MASK: u64 = 1 << 63;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for extracting the 5-bit group ID field. Occupies bits 17
    /// through 21.
    pub const GROUP_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 5-bit node ID field. Occupies bits 12
    /// through 16.
    pub const NODE_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 = 22;

    /// Number of bits to shift the group ID to its correct position (bit 17).
    pub const GROUP_ID_SHIFT: u64 = 17;

    /// Number of bits to shift the node ID to its correct position (bit 12).
    pub const NODE_ID_SHIFT: u64 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the four fields into an ID. Each component is masked to its
    /// field width, so out-of-range values never bleed into a neighbour.
    pub const fn from_components(timestamp: u64, group_id: u64, node_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let group_id = (group_id & Self::GROUP_ID_MASK) << Self::GROUP_ID_SHIFT;
        let node_id = (node_id & Self::NODE_ID_MASK) << Self::NODE_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | group_id | node_id | sequence,
        }
    }

    /// Extracts the timestamp (ms since the epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the group ID from the packed ID.
    pub const fn group_id(&self) -> u64 {
        (self.id >> Self::GROUP_ID_SHIFT) & Self::GROUP_ID_MASK
    }

    /// Extracts the node ID from the packed ID.
    pub const fn node_id(&self) -> u64 {
        (self.id >> Self::NODE_ID_SHIFT) & Self::NODE_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the raw integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a raw integer without validation. See [`Self::is_valid`].
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns `true` if the reserved bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id & Self::RESERVED_MASK == 0
    }

    /// Returns the absolute time of this ID in milliseconds since the Unix
    /// epoch, given the epoch the generator packed it against.
    pub const fn unix_millis(&self, epoch: u64) -> u64 {
        self.timestamp() + epoch
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }

    fn fields(&self) -> [FieldLayout; 5] {
        [
            FieldLayout {
                name: "reserved",
                bits: 1,
                value: self.id >> 63,
            },
            FieldLayout {
                name: "timestamp",
                bits: 41,
                value: self.timestamp(),
            },
            FieldLayout {
                name: "group_id",
                bits: 5,
                value: self.group_id(),
            },
            FieldLayout {
                name: "node_id",
                bits: 5,
                value: self.node_id(),
            },
            FieldLayout {
                name: "sequence",
                bits: 12,
                value: self.sequence(),
            },
        ]
    }
}

impl From<SequenceId> for u64 {
    fn from(id: SequenceId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bit_layout_debug(
            f,
            "SequenceId",
            self.id,
            &self.to_padded_string(),
            &self.fields(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_and_bounds() {
        let ts = SequenceId::TIMESTAMP_MASK;
        let group = SequenceId::GROUP_ID_MASK;
        let node = SequenceId::NODE_ID_MASK;
        let seq = SequenceId::SEQUENCE_MASK;

        let id = SequenceId::from_components(ts, group, node, seq);
        println!("ID: {id:?}");
        assert_eq!(id.timestamp(), ts);
        assert_eq!(id.group_id(), group);
        assert_eq!(id.node_id(), node);
        assert_eq!(id.sequence(), seq);
        assert!(id.is_valid());
        assert_eq!(id.to_raw(), u64::MAX >> 1);
    }

    #[test]
    fn layout_matches_shift_formula() {
        let (ts, group, node, seq) = (123_456_789, 17, 9, 2048);
        let id = SequenceId::from_components(ts, group, node, seq);
        assert_eq!(
            id.to_raw(),
            (ts << 22) | (group << 17) | (node << 12) | seq
        );
        assert_eq!(SequenceId::from_raw(id.to_raw()), id);
    }

    #[test]
    fn components_are_masked() {
        let id = SequenceId::from_components(0, 32, 33, 4096);
        assert_eq!(id.group_id(), 0);
        assert_eq!(id.node_id(), 1);
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 0);
    }

    #[test]
    fn reserved_bit_marks_invalid() {
        assert!(!SequenceId::from_raw(1 << 63).is_valid());
        assert!(SequenceId::from_raw(0).is_valid());
    }

    #[test]
    fn ordering_follows_timestamp_then_sequence() {
        let a = SequenceId::from_components(10, 31, 31, 4095);
        let b = SequenceId::from_components(11, 0, 0, 0);
        let c = SequenceId::from_components(11, 0, 0, 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn unix_millis_adds_epoch() {
        let id = SequenceId::from_components(250, 0, 0, 0);
        assert_eq!(id.unix_millis(1_000), 1_250);
    }

    #[test]
    fn display_and_padding() {
        let id = SequenceId::from_raw(4_194_304);
        assert_eq!(id.to_string(), "4194304");
        assert_eq!(id.to_padded_string(), "00000000000004194304");
        let debug = format!("{id:?}");
        assert!(debug.starts_with("SequenceId {"));
        assert!(debug.contains("timestamp (41)"));
        assert!(debug.contains("group_id (5)"));
    }
}
