//! Translation between IPv4 datagrams and Ethernet frames on a single link.

use std::collections::VecDeque;

use core::arp_cache::ArpCache;
use core::arp_queue::ArpQueue;
use core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4Datagram,
};
use core::time::{
    Clock,
    Millis,
};
use {
    Error,
    Result,
};

/// How long an ARP request may go unanswered before the datagrams waiting on
/// it are dropped.
pub const ARP_REQUEST_TIMEOUT_MS: Millis = 5000;

/// How long a learned IPv4 -> Ethernet mapping stays valid.
pub const ARP_CACHE_TTL_MS: Millis = 30000;

/// An interface connecting an IPv4 host or router to an Ethernet link.
///
/// Outgoing datagrams are framed once the next hop's Ethernet address is
/// known, resolving it via ARP when it isn't. Frames ready to go out on the
/// link are collected with `maybe_send()`. Time only moves via `tick(...)`.
pub struct NetworkInterface {
    ethernet_addr: EthernetAddress,
    ipv4_addr: Ipv4Address,
    clock: Clock,
    arp_cache: ArpCache,
    arp_queue: ArpQueue,
    frames_out: VecDeque<EthernetFrame<Vec<u8>>>,
}

impl NetworkInterface {
    pub fn new(ethernet_addr: EthernetAddress, ipv4_addr: Ipv4Address) -> NetworkInterface {
        info!(
            "Network interface has Ethernet address {} and IPv4 address {}.",
            ethernet_addr, ipv4_addr
        );

        NetworkInterface {
            ethernet_addr,
            ipv4_addr,
            clock: Clock::new(),
            arp_cache: ArpCache::new(ARP_CACHE_TTL_MS),
            arp_queue: ArpQueue::new(ARP_REQUEST_TIMEOUT_MS),
            frames_out: VecDeque::new(),
        }
    }

    pub fn ethernet_addr(&self) -> EthernetAddress {
        self.ethernet_addr
    }

    pub fn ipv4_addr(&self) -> Ipv4Address {
        self.ipv4_addr
    }

    /// Sends a datagram to next_hop, typically a router or the destination
    /// itself if it's on the same link.
    ///
    /// If next_hop's Ethernet address is unknown the datagram is queued and
    /// an ARP request broadcast, unless one is already in flight.
    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Address) {
        let now = self.clock.now();

        if let Some(eth_addr) = self.arp_cache.eth_addr_for_ip(next_hop, now) {
            self.send_ipv4(eth_addr, &datagram);
            return;
        }

        if self.arp_queue.push(next_hop, datagram, now) {
            let arp_repr = Arp {
                op: ArpOp::Request,
                source_hw_addr: self.ethernet_addr,
                source_proto_addr: self.ipv4_addr,
                target_hw_addr: EthernetAddress::BROADCAST,
                target_proto_addr: next_hop,
            };

            debug!("Sending ARP request for {}.", next_hop);
            self.send_arp(&arp_repr, EthernetAddress::BROADCAST);
        } else {
            debug!(
                "Queued datagram behind ARP request for {} ({} waiting).",
                next_hop,
                self.arp_queue.waiting(next_hop)
            );
        }
    }

    /// Receives an Ethernet frame from the link.
    ///
    /// Returns the datagram carried by the frame, if any. ARP traffic is
    /// consumed internally and frames meant for other hosts are ignored.
    pub fn recv_frame<T>(&mut self, eth_frame: &EthernetFrame<T>) -> Option<Ipv4Datagram>
    where
        T: AsRef<[u8]>,
    {
        let dst_addr = eth_frame.dst_addr();
        if dst_addr != self.ethernet_addr && !dst_addr.is_broadcast() {
            debug!("Ignoring Ethernet frame with destination {}.", dst_addr);
            return None;
        }

        match eth_frame.payload_type() {
            eth_types::IPV4 => match Ipv4Datagram::deserialize(eth_frame.payload()) {
                Ok(datagram) => Some(datagram),
                Err(err) => {
                    debug!(
                        "Ipv4Datagram::deserialize(...) failed on frame from {} with {:?}.",
                        eth_frame.src_addr(),
                        err
                    );
                    None
                }
            },
            eth_types::ARP => {
                if let Err(err) = self.recv_arp(eth_frame.payload()) {
                    debug!(
                        "ARP packet from {} not acted upon: {:?}.",
                        eth_frame.src_addr(),
                        err
                    );
                }
                None
            }
            i => {
                debug!("Ignoring Ethernet frame with type {:#06X}.", i);
                None
            }
        }
    }

    /// Advances time by ms_since_last_tick, expiring ARP mappings and timed
    /// out ARP requests.
    pub fn tick(&mut self, ms_since_last_tick: Millis) {
        let now = self.clock.advance(ms_since_last_tick);
        self.arp_cache.expire(now);
        self.arp_queue.expire(now);
    }

    /// Dequeues the oldest frame ready for transmission.
    pub fn maybe_send(&mut self) -> Option<EthernetFrame<Vec<u8>>> {
        self.frames_out.pop_front()
    }

    fn recv_arp(&mut self, arp_buffer: &[u8]) -> Result<()> {
        let arp_repr = Arp::deserialize(arp_buffer)?;
        let now = self.clock.now();

        debug!(
            "Received ARP, adding mapping from {} to {}.",
            arp_repr.source_proto_addr, arp_repr.source_hw_addr
        );
        self.arp_cache
            .set_eth_addr_for_ip(arp_repr.source_proto_addr, arp_repr.source_hw_addr, now);

        match arp_repr.op {
            ArpOp::Request => {
                if arp_repr.target_proto_addr != self.ipv4_addr {
                    return Err(Error::Ignored);
                }

                let arp_reply = Arp {
                    op: ArpOp::Reply,
                    source_hw_addr: self.ethernet_addr,
                    source_proto_addr: self.ipv4_addr,
                    target_hw_addr: arp_repr.source_hw_addr,
                    target_proto_addr: arp_repr.source_proto_addr,
                };

                debug!(
                    "Sending ARP reply to {}/{}.",
                    arp_reply.target_proto_addr, arp_reply.target_hw_addr
                );
                self.send_arp(&arp_reply, arp_reply.target_hw_addr);
            }
            ArpOp::Reply => {
                if let Some(datagrams) = self.arp_queue.take(arp_repr.source_proto_addr) {
                    debug!(
                        "Flushing {} datagram(s) waiting on {}.",
                        datagrams.len(),
                        arp_repr.source_proto_addr
                    );
                    for datagram in datagrams {
                        self.send_ipv4(arp_repr.source_hw_addr, &datagram);
                    }
                }
            }
        }

        Ok(())
    }

    fn send_ipv4(&mut self, dst_addr: EthernetAddress, datagram: &Ipv4Datagram) {
        self.send_frame(
            dst_addr,
            eth_types::IPV4,
            datagram.buffer_len(),
            |payload| datagram.serialize(payload),
        );
    }

    fn send_arp(&mut self, arp_repr: &Arp, dst_addr: EthernetAddress) {
        self.send_frame(dst_addr, eth_types::ARP, arp_repr.buffer_len(), |payload| {
            arp_repr.serialize(payload)
        });
    }

    /// Builds an Ethernet frame and queues it for transmission.
    fn send_frame<F>(&mut self, dst_addr: EthernetAddress, payload_type: u16, payload_len: usize, f: F)
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        let src_addr = self.ethernet_addr;
        let eth_buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload_len)];

        let eth_frame = EthernetFrame::try_new(eth_buffer).and_then(|mut eth_frame| {
            eth_frame.set_dst_addr(dst_addr);
            eth_frame.set_src_addr(src_addr);
            eth_frame.set_payload_type(payload_type);
            f(eth_frame.payload_mut())?;
            Ok(eth_frame)
        });

        match eth_frame {
            Ok(eth_frame) => self.frames_out.push_back(eth_frame),
            Err(err) => warn!(
                "Unable to build Ethernet frame for {} with {} byte payload: {:?}.",
                dst_addr, payload_len, err
            ),
        }
    }
}

/// A network interface which holds on to received datagrams until they're
/// popped with `maybe_receive()`, e.g. by a router.
pub struct AsyncInterface {
    interface: NetworkInterface,
    datagrams_in: VecDeque<Ipv4Datagram>,
}

impl AsyncInterface {
    pub fn new(interface: NetworkInterface) -> AsyncInterface {
        AsyncInterface {
            interface,
            datagrams_in: VecDeque::new(),
        }
    }

    /// Receives an Ethernet frame, holding on to any datagram it carries.
    pub fn recv_frame<T>(&mut self, eth_frame: &EthernetFrame<T>)
    where
        T: AsRef<[u8]>,
    {
        if let Some(datagram) = self.interface.recv_frame(eth_frame) {
            self.datagrams_in.push_back(datagram);
        }
    }

    /// Dequeues the oldest received datagram.
    pub fn maybe_receive(&mut self) -> Option<Ipv4Datagram> {
        self.datagrams_in.pop_front()
    }

    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Address) {
        self.interface.send_datagram(datagram, next_hop)
    }

    pub fn tick(&mut self, ms_since_last_tick: Millis) {
        self.interface.tick(ms_since_last_tick)
    }

    pub fn maybe_send(&mut self) -> Option<EthernetFrame<Vec<u8>>> {
        self.interface.maybe_send()
    }

    pub fn interface(&self) -> &NetworkInterface {
        &self.interface
    }
}

impl From<NetworkInterface> for AsyncInterface {
    fn from(interface: NetworkInterface) -> AsyncInterface {
        AsyncInterface::new(interface)
    }
}
