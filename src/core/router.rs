//! Longest prefix match forwarding of IPv4 datagrams between interfaces.

use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};

use core::interface::AsyncInterface;
use core::repr::{
    Ipv4Address,
    Ipv4Datagram,
};
use core::time::Millis;

/// A forwarding table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    /// Address prefix compared against a datagram's destination. Only the
    /// high prefix_len bits are significant.
    pub prefix: Ipv4Address,
    pub prefix_len: u8,
    /// Next hop router, or None if the network is directly attached.
    pub next_hop: Option<Ipv4Address>,
    /// Index of the interface datagrams are sent out on.
    pub interface: usize,
}

impl Route {
    /// Returns the netmask for a prefix length.
    pub fn mask(prefix_len: u8) -> u32 {
        match prefix_len {
            0 => 0,
            n if n >= 32 => !0,
            n => !0 << (32 - n as u32),
        }
    }

    /// Checks if the high prefix_len bits of an address match the prefix.
    pub fn matches(&self, addr: Ipv4Address) -> bool {
        let mask = Route::mask(self.prefix_len);
        addr.as_u32() & mask == self.prefix.as_u32() & mask
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}/{} => ", self.prefix, self.prefix_len)?;
        match self.next_hop {
            Some(next_hop) => write!(f, "{}", next_hop)?,
            None => write!(f, "(direct)")?,
        };
        write!(f, " on interface {}", self.interface)
    }
}

/// A router with a set of interfaces and a static forwarding table.
///
/// Each call to `route()` drains the datagrams received by every interface
/// and forwards them according to the longest matching route. Among routes
/// with the same prefix length the one added first wins.
pub struct Router {
    interfaces: Vec<AsyncInterface>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Router {
        Router {
            interfaces: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Adds an interface and returns its index.
    pub fn add_interface<I>(&mut self, interface: I) -> usize
    where
        I: Into<AsyncInterface>,
    {
        self.interfaces.push(interface.into());
        self.interfaces.len() - 1
    }

    /// Returns a reference to the interface with the specified index. Causes
    /// a panic if there is no such interface.
    pub fn interface(&mut self, interface: usize) -> &mut AsyncInterface {
        match self.get_interface(interface) {
            Some(interface) => interface,
            None => panic!("Interface {} does not exist.", interface),
        }
    }

    /// Returns a reference to the interface with the specified index, if any.
    pub fn get_interface(&mut self, interface: usize) -> Option<&mut AsyncInterface> {
        self.interfaces.get_mut(interface)
    }

    /// Returns the number of interfaces.
    pub fn interfaces_len(&self) -> usize {
        self.interfaces.len()
    }

    /// Appends a route to the forwarding table.
    ///
    /// Routes are never replaced or removed, and overlapping or duplicate
    /// routes are accepted. A route with a prefix_len above 32 is logged and
    /// ignored.
    pub fn add_route(
        &mut self,
        prefix: Ipv4Address,
        prefix_len: u8,
        next_hop: Option<Ipv4Address>,
        interface: usize,
    ) {
        if prefix_len > 32 {
            warn!("Ignoring route {}/{}, prefix too long.", prefix, prefix_len);
            return;
        }

        let route = Route {
            prefix,
            prefix_len,
            next_hop,
            interface,
        };

        debug!("Adding route {}.", route);
        self.routes.push(route);
    }

    /// Returns the forwarding table in insertion order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the most specific route matching an address.
    pub fn best_route(&self, addr: Ipv4Address) -> Option<&Route> {
        let mut best: Option<&Route> = None;

        for route in self.routes.iter().filter(|route| route.matches(addr)) {
            match best {
                Some(current) if current.prefix_len >= route.prefix_len => {}
                _ => best = Some(route),
            }
        }

        best
    }

    /// Forwards every datagram waiting on any interface.
    pub fn route(&mut self) {
        for i in 0 .. self.interfaces.len() {
            while let Some(datagram) = self.interfaces[i].maybe_receive() {
                self.route_datagram(datagram);
            }
        }
    }

    /// Advances time on every interface.
    pub fn tick(&mut self, ms_since_last_tick: Millis) {
        for interface in self.interfaces.iter_mut() {
            interface.tick(ms_since_last_tick);
        }
    }

    fn route_datagram(&mut self, mut datagram: Ipv4Datagram) {
        let dst_addr = datagram.header.dst_addr;

        if datagram.header.ttl <= 1 {
            debug!(
                "Dropping datagram to {} with TTL {}.",
                dst_addr, datagram.header.ttl
            );
            return;
        }

        let route = match self.best_route(dst_addr) {
            Some(route) => *route,
            None => {
                debug!("Dropping datagram to {}, no route.", dst_addr);
                return;
            }
        };

        datagram.header.ttl -= 1;
        datagram.header.compute_checksum();

        let next_hop = route.next_hop.unwrap_or(dst_addr);

        match self.get_interface(route.interface) {
            Some(interface) => {
                trace!("Forwarding datagram to {} via {}.", dst_addr, route);
                interface.send_datagram(datagram, next_hop);
            }
            None => warn!(
                "Dropping datagram to {}, route {} has no such interface.",
                dst_addr, route
            ),
        }
    }
}
