use std::collections::{
    HashMap,
    VecDeque,
};

use core::repr::{
    Ipv4Address,
    Ipv4Datagram,
};
use core::time::Millis;

struct Pending {
    datagrams: VecDeque<Ipv4Datagram>,
    request_expires_at: Millis,
}

/// Datagrams waiting on the resolution of their next hop's Ethernet address.
///
/// Each unresolved address has at most one ARP request in flight. Entries are
/// removed wholesale, either when the address resolves or when the request
/// times out.
pub struct ArpQueue {
    entries: HashMap<Ipv4Address, Pending>,
    timeout: Millis,
}

impl ArpQueue {
    /// Creates a queue where outstanding ARP requests time out after timeout
    /// milliseconds.
    pub fn new(timeout: Millis) -> ArpQueue {
        ArpQueue {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Queues a datagram behind the resolution of ipv4_addr.
    ///
    /// Returns true if the caller must send a new ARP request, i.e. there is
    /// no request for the address in flight.
    pub fn push(&mut self, ipv4_addr: Ipv4Address, datagram: Ipv4Datagram, now: Millis) -> bool {
        let timeout = self.timeout;
        let pending = self.entries.entry(ipv4_addr).or_insert_with(|| Pending {
            datagrams: VecDeque::new(),
            request_expires_at: now,
        });

        pending.datagrams.push_back(datagram);

        if pending.request_expires_at <= now {
            pending.request_expires_at = now.saturating_add(timeout);
            true
        } else {
            false
        }
    }

    /// Removes and returns the datagrams waiting on ipv4_addr in the order
    /// they were queued.
    pub fn take(&mut self, ipv4_addr: Ipv4Address) -> Option<VecDeque<Ipv4Datagram>> {
        self.entries
            .remove(&ipv4_addr)
            .map(|pending| pending.datagrams)
    }

    /// Drops every entry whose ARP request has timed out and returns how many
    /// addresses were dropped.
    pub fn expire(&mut self, now: Millis) -> usize {
        let len = self.entries.len();
        self.entries.retain(|ipv4_addr, pending| {
            if pending.request_expires_at > now {
                true
            } else {
                debug!(
                    "ARP request for {} timed out, dropping {} datagram(s).",
                    ipv4_addr,
                    pending.datagrams.len()
                );
                false
            }
        });
        len - self.entries.len()
    }

    /// Returns the number of datagrams waiting on ipv4_addr.
    pub fn waiting(&self, ipv4_addr: Ipv4Address) -> usize {
        self.entries
            .get(&ipv4_addr)
            .map(|pending| pending.datagrams.len())
            .unwrap_or(0)
    }

    /// Returns the number of unresolved addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
