use std::collections::HashMap;

use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use core::time::Millis;

struct Entry {
    eth_addr: EthernetAddress,
    expires_at: Millis,
}

/// Maintains an expiring set of IPv4 -> ethernet address mappings.
///
/// Lookups never return a mapping at or past its expiry, but expired entries
/// are only removed by `expire(...)`.
pub struct ArpCache {
    entries: HashMap<Ipv4Address, Entry>,
    expiration: Millis,
}

impl ArpCache {
    /// Creates an ARP cache where ethernet address mappings expire after
    /// expiration milliseconds.
    pub fn new(expiration: Millis) -> ArpCache {
        ArpCache {
            entries: HashMap::new(),
            expiration,
        }
    }

    /// Lookup the ethernet address for an IPv4 address.
    pub fn eth_addr_for_ip(&self, ipv4_addr: Ipv4Address, now: Millis) -> Option<EthernetAddress> {
        match self.entries.get(&ipv4_addr) {
            Some(entry) if entry.expires_at > now => Some(entry.eth_addr),
            _ => None,
        }
    }

    /// Create or update the ethernet address mapping for an IPv4 address.
    pub fn set_eth_addr_for_ip(
        &mut self,
        ipv4_addr: Ipv4Address,
        eth_addr: EthernetAddress,
        now: Millis,
    ) {
        self.entries.insert(
            ipv4_addr,
            Entry {
                eth_addr,
                expires_at: now.saturating_add(self.expiration),
            },
        );
    }

    /// Purge Ethernet address entries translations that have expired and
    /// returns how many were removed.
    pub fn expire(&mut self, now: Millis) -> usize {
        let len = self.entries.len();
        self.entries.retain(|ipv4_addr, entry| {
            if entry.expires_at > now {
                true
            } else {
                debug!("ARP mapping {} -> {} expired.", ipv4_addr, entry.eth_addr);
                false
            }
        });
        len - self.entries.len()
    }

    /// Returns the number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
