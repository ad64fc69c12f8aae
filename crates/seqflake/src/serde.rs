use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::id::SequenceId;

/// Serializes as the native `u64`.
impl Serialize for SequenceId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(s)
    }
}

/// Deserializes from the native `u64`, rejecting values with the reserved
/// bit set.
impl<'de> Deserialize<'de> for SequenceId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let id = Self::from_raw(u64::deserialize(d)?);
        if !id.is_valid() {
            return Err(de::Error::custom(format_args!(
                "sequence id {} sets the reserved bit",
                id.to_raw()
            )));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Event {
        id: SequenceId,
    }

    #[test]
    fn serializes_as_native_integer() {
        let event = Event {
            id: SequenceId::from_components(42, 3, 7, 1),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, format!("{{\"id\":{}}}", event.id.to_raw()));

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn reserved_bit_is_rejected() {
        let json = format!("{{\"id\":{}}}", 1u64 << 63);
        let err = serde_json::from_str::<Event>(&json).unwrap_err();
        assert!(err.to_string().contains("reserved bit"));
    }
}
