use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Default location of per-interface metadata on Linux.
pub const SYS_CLASS_NET: &str = "/sys/class/net";

/// Failure to read local metadata while deriving a node identity.
///
/// This never reaches callers of [`NodeIdentity::derive`]; it is logged and
/// replaced with a default identity.
///
/// [`NodeIdentity::derive`]: crate::identity::NodeIdentity::derive
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DerivationError {
    /// The interface directory exists but could not be listed.
    #[error("failed to list network interfaces in {path}: {source}")]
    ListInterfaces {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Local metadata used to derive a best-effort [`NodeIdentity`].
///
/// Implementations are platform-dependent. Swap in your own to derive
/// identities from something else (a pod ordinal, a hostname hash) or to test
/// derivation without real network interfaces.
///
/// [`NodeIdentity`]: crate::identity::NodeIdentity
pub trait NodeIdentitySource {
    /// Returns the hardware address of a usable network interface, `Ok(None)`
    /// if there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`DerivationError`] if interface metadata exists but cannot
    /// be read.
    fn hardware_address(&self) -> Result<Option<Vec<u8>>, DerivationError>;

    /// Returns the identifier of the current process.
    fn process_id(&self) -> u32;
}

/// Reads interface addresses from a sysfs-style directory (one subdirectory
/// per interface, each with an `address` file) and the real process id.
///
/// Interfaces are visited in name order. Loopback, all-zero and unparsable
/// addresses are skipped. A missing directory (e.g. on non-Linux platforms)
/// counts as "no usable interface" rather than an error.
#[derive(Clone, Debug)]
pub struct SystemIdentitySource {
    net_root: PathBuf,
}

impl Default for SystemIdentitySource {
    fn default() -> Self {
        Self::with_net_root(SYS_CLASS_NET)
    }
}

impl SystemIdentitySource {
    /// Reads interfaces from `net_root` instead of [`SYS_CLASS_NET`].
    pub fn with_net_root(net_root: impl Into<PathBuf>) -> Self {
        Self {
            net_root: net_root.into(),
        }
    }

    /// The directory interfaces are read from.
    pub fn net_root(&self) -> &Path {
        &self.net_root
    }
}

impl NodeIdentitySource for SystemIdentitySource {
    fn hardware_address(&self) -> Result<Option<Vec<u8>>, DerivationError> {
        let entries = match fs::read_dir(&self.net_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DerivationError::ListInterfaces {
                    path: self.net_root.clone(),
                    source,
                });
            }
        };

        let mut names: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .filter(|name| name != "lo")
            .collect();
        names.sort();

        for name in names {
            // Not every entry exposes an address (bonding masters, tunnels)
            let Ok(raw) = fs::read_to_string(self.net_root.join(&name).join("address")) else {
                continue;
            };
            if let Some(mac) = parse_hardware_address(raw.trim()) {
                if mac.len() >= 2 && mac.iter().any(|&b| b != 0) {
                    return Ok(Some(mac));
                }
            }
        }

        Ok(None)
    }

    fn process_id(&self) -> u32 {
        std::process::id()
    }
}

/// A source with no network metadata and a fixed process id.
///
/// Derivation through this source always lands on the no-interface group id,
/// which makes it a predictable default where interfaces are meaningless
/// (sandboxes, tests).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FallbackIdentitySource {
    pub process_id: u32,
}

impl NodeIdentitySource for FallbackIdentitySource {
    fn hardware_address(&self) -> Result<Option<Vec<u8>>, DerivationError> {
        Ok(None)
    }

    fn process_id(&self) -> u32 {
        self.process_id
    }
}

/// Parses a colon-separated hex address such as `02:42:ac:11:00:02`.
fn parse_hardware_address(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() {
        return None;
    }
    s.split(':')
        .map(|octet| u8::from_str_radix(octet, 16).ok())
        .collect()
}
