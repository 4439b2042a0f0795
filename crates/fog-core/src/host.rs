//! Host identity
//!
//! The server keys hosts by their hardware addresses. Requests that need to
//! identify the host carry every MAC address of the machine as a single
//! `|`-separated list of upper-case, colon-separated octets, e.g.
//! `00:1A:2B:3C:4D:5E|00:1A:2B:3C:4D:5F`.

use sysinfo::Networks;

/// Source of the host's MAC address list
pub trait MacProvider: Send + Sync {
    /// All hardware addresses, `|`-separated (empty if none could be read)
    fn mac_addresses(&self) -> String;
}

/// Reads MAC addresses from the host's network interfaces
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMacProvider;

impl MacProvider for SystemMacProvider {
    fn mac_addresses(&self) -> String {
        let networks = Networks::new_with_refreshed_list();

        let mut interfaces: Vec<_> = networks
            .iter()
            .map(|(name, data)| (name.clone(), data.mac_address()))
            .filter(|(_, mac)| !mac.is_unspecified())
            .collect();
        interfaces.sort_by(|a, b| a.0.cmp(&b.0));

        let mut macs: Vec<String> = Vec::with_capacity(interfaces.len());
        for (_, mac) in interfaces {
            let formatted = format_mac(&mac.0);
            if !macs.contains(&formatted) {
                macs.push(formatted);
            }
        }

        if macs.is_empty() {
            tracing::warn!("Could not get MAC addresses: no interface reported one");
        }
        macs.join("|")
    }
}

/// A fixed MAC list, used for testing and for overriding detection
#[derive(Debug, Clone)]
pub struct FixedMacProvider(String);

impl FixedMacProvider {
    /// Report `macs` verbatim
    pub fn new(macs: impl Into<String>) -> Self {
        Self(macs.into())
    }
}

impl MacProvider for FixedMacProvider {
    fn mac_addresses(&self) -> String {
        self.0.clone()
    }
}

/// Format raw address bytes as upper-case colon-separated hex
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Host name reported to the server on registration
pub fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}
