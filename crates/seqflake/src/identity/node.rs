use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::{debug, warn};

use crate::{
    Error, Result,
    id::SequenceId,
    identity::{NodeIdentitySource, SystemIdentitySource},
};

/// The `(group id, node id)` pair packed into every ID a generator emits.
///
/// Global uniqueness relies entirely on no two live generators sharing an
/// identity. Explicit identities are the only way to guarantee that; derived
/// ones merely make collisions between co-located processes unlikely.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity {
    group_id: u8,
    node_id: u8,
}

impl NodeIdentity {
    /// Largest valid group id.
    pub const MAX_GROUP_ID: u8 = SequenceId::GROUP_ID_MASK as u8;

    /// Largest valid node id.
    pub const MAX_NODE_ID: u8 = SequenceId::NODE_ID_MASK as u8;

    /// Group id used when no usable network interface exists.
    pub const NO_INTERFACE_GROUP_ID: u8 = 1;

    /// Group id used when reading interface metadata fails.
    pub const FAILED_DERIVATION_GROUP_ID: u8 = 0;

    /// Creates an explicit identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if either value is outside `0..=31`.
    ///
    /// # Example
    ///
    /// ```
    /// use seqflake::NodeIdentity;
    ///
    /// let identity = NodeIdentity::new(3, 7).unwrap();
    /// assert_eq!((identity.group_id(), identity.node_id()), (3, 7));
    /// assert!(NodeIdentity::new(32, 0).is_err());
    /// ```
    pub fn new(group_id: u64, node_id: u64) -> Result<Self> {
        match (u8::try_from(group_id), u8::try_from(node_id)) {
            (Ok(group), Ok(node)) if group <= Self::MAX_GROUP_ID && node <= Self::MAX_NODE_ID => {
                Ok(Self {
                    group_id: group,
                    node_id: node,
                })
            }
            _ => Err(Error::InvalidIdentity { group_id, node_id }),
        }
    }

    /// Derives a best-effort identity from local metadata.
    ///
    /// - The group id comes from the last two bytes of the hardware address,
    ///   reduced into `0..=31`. Without a usable interface it is
    ///   [`Self::NO_INTERFACE_GROUP_ID`]; if the metadata cannot be read it is
    ///   [`Self::FAILED_DERIVATION_GROUP_ID`] and the failure is logged.
    /// - The node id is a hash of the group id and the process id, reduced
    ///   into `0..=31`.
    ///
    /// This never fails. It also guarantees nothing beyond a low collision
    /// probability among processes on one host.
    pub fn derive<S: NodeIdentitySource + ?Sized>(source: &S) -> Self {
        let group_id = match source.hardware_address() {
            Ok(Some(mac)) => group_from_hardware_address(&mac),
            Ok(None) => Self::NO_INTERFACE_GROUP_ID,
            Err(e) => {
                warn!(
                    error = %e,
                    group_id = Self::FAILED_DERIVATION_GROUP_ID,
                    "failed to derive group id, using default"
                );
                Self::FAILED_DERIVATION_GROUP_ID
            }
        };
        let node_id = node_from_process(group_id, source.process_id());
        debug!(group_id, node_id, "derived node identity");

        Self { group_id, node_id }
    }

    /// Derives an identity from this host's network interfaces and process id.
    pub fn from_system() -> Self {
        Self::derive(&SystemIdentitySource::default())
    }

    /// The deployment group ("datacenter") id.
    pub const fn group_id(&self) -> u8 {
        self.group_id
    }

    /// The node id within the group.
    pub const fn node_id(&self) -> u8 {
        self.node_id
    }
}

fn group_from_hardware_address(mac: &[u8]) -> u8 {
    let [.., lo, hi] = mac else {
        return NodeIdentity::NO_INTERFACE_GROUP_ID;
    };
    let bits = u16::from_le_bytes([*lo, *hi]) >> 6;
    (bits % (u16::from(NodeIdentity::MAX_GROUP_ID) + 1)) as u8
}

fn node_from_process(group_id: u8, process_id: u32) -> u8 {
    // `DefaultHasher::new` uses fixed keys, so this is stable for a given
    // build of the crate.
    let mut hasher = DefaultHasher::new();
    format!("{group_id}{process_id}").hash(&mut hasher);
    let low_bits = hasher.finish() & 0xffff;
    (low_bits % (u64::from(NodeIdentity::MAX_NODE_ID) + 1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{DerivationError, FallbackIdentitySource};
    use std::{collections::HashSet, io};

    struct FakeSource {
        mac: Option<Vec<u8>>,
        pid: u32,
    }

    impl NodeIdentitySource for FakeSource {
        fn hardware_address(&self) -> core::result::Result<Option<Vec<u8>>, DerivationError> {
            Ok(self.mac.clone())
        }

        fn process_id(&self) -> u32 {
            self.pid
        }
    }

    struct BrokenSource;

    impl NodeIdentitySource for BrokenSource {
        fn hardware_address(&self) -> core::result::Result<Option<Vec<u8>>, DerivationError> {
            Err(DerivationError::ListInterfaces {
                path: "/sys/class/net".into(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        }

        fn process_id(&self) -> u32 {
            4242
        }
    }

    #[test]
    fn explicit_identity_bounds() {
        assert!(NodeIdentity::new(0, 0).is_ok());
        assert!(NodeIdentity::new(31, 31).is_ok());
        assert_eq!(
            NodeIdentity::new(32, 0),
            Err(Error::InvalidIdentity {
                group_id: 32,
                node_id: 0
            })
        );
        assert_eq!(
            NodeIdentity::new(0, 32),
            Err(Error::InvalidIdentity {
                group_id: 0,
                node_id: 32
            })
        );
        assert!(NodeIdentity::new(u64::MAX, 1).is_err());
        assert!(NodeIdentity::new(256 + 3, 1).is_err());
    }

    #[test]
    fn group_id_from_last_two_address_bytes() {
        // 0x0140 >> 6 == 5
        let source = FakeSource {
            mac: Some(vec![0x02, 0x42, 0xac, 0x11, 0x40, 0x01]),
            pid: 1,
        };
        assert_eq!(NodeIdentity::derive(&source).group_id(), 5);

        // 0xffff >> 6 == 1023, 1023 % 32 == 31
        let source = FakeSource {
            mac: Some(vec![0xff, 0xff]),
            pid: 1,
        };
        assert_eq!(NodeIdentity::derive(&source).group_id(), 31);
    }

    #[test]
    fn short_address_falls_back_to_no_interface_group() {
        assert_eq!(
            group_from_hardware_address(&[0xab]),
            NodeIdentity::NO_INTERFACE_GROUP_ID
        );
    }

    #[test]
    fn no_interface_uses_fallback_group() {
        let identity = NodeIdentity::derive(&FallbackIdentitySource::default());
        assert_eq!(identity.group_id(), NodeIdentity::NO_INTERFACE_GROUP_ID);
        assert!(identity.node_id() <= NodeIdentity::MAX_NODE_ID);
    }

    #[test]
    fn derivation_failure_is_absorbed() {
        let identity = NodeIdentity::derive(&BrokenSource);
        assert_eq!(identity.group_id(), NodeIdentity::FAILED_DERIVATION_GROUP_ID);
        assert!(identity.node_id() <= NodeIdentity::MAX_NODE_ID);
    }

    #[test]
    fn node_id_is_deterministic_and_spreads_over_pids() {
        let a = NodeIdentity::derive(&FallbackIdentitySource { process_id: 77 });
        let b = NodeIdentity::derive(&FallbackIdentitySource { process_id: 77 });
        assert_eq!(a, b);

        let node_ids: HashSet<u8> = (0..256)
            .map(|pid| node_from_process(1, pid))
            .inspect(|&id| assert!(id <= NodeIdentity::MAX_NODE_ID))
            .collect();
        assert!(node_ids.len() > 1);
    }

    #[test]
    fn system_derivation_stays_in_range() {
        let identity = NodeIdentity::from_system();
        assert!(identity.group_id() <= NodeIdentity::MAX_GROUP_ID);
        assert!(identity.node_id() <= NodeIdentity::MAX_NODE_ID);
    }
}
