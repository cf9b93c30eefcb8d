use usrrouter::core::interface::NetworkInterface;
use usrrouter::core::repr::{
    eth_types,
    ipv4_protocols,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4Datagram,
};
use usrrouter::core::router::Router;

use env_logger;

lazy_static! {
    /// Router interface 0, towards the upstream ISP.
    pub static ref UPLINK_ADDR: Ipv4Address = "171.67.76.46".parse().unwrap();
    pub static ref ISP_ADDR: Ipv4Address = "171.67.76.1".parse().unwrap();

    /// Router interface 1, 10.0.0.0/8 directly attached.
    pub static ref ETH0_ADDR: Ipv4Address = "10.0.0.1".parse().unwrap();
    pub static ref APPLESAUCE_ADDR: Ipv4Address = "10.0.0.2".parse().unwrap();

    /// Router interface 2, 172.16.0.0/12 directly attached.
    pub static ref ETH1_ADDR: Ipv4Address = "172.16.0.1".parse().unwrap();
    pub static ref CHERRYPIE_ADDR: Ipv4Address = "172.16.0.2".parse().unwrap();
    pub static ref DM42_ADDR: Ipv4Address = "172.16.0.100".parse().unwrap();

    /// Router interface 3, 192.168.0.0/24 directly attached plus
    /// 143.195.0.0/16 behind a second router.
    pub static ref ETH2_ADDR: Ipv4Address = "192.168.0.1".parse().unwrap();
    pub static ref HS_ROUTER_ADDR: Ipv4Address = "192.168.0.2".parse().unwrap();
}

/// A host attached to one of the router's links.
pub struct Host {
    pub name: &'static str,
    pub interface: NetworkInterface,
    pub gateway: Ipv4Address,
    pub link: usize,
    pub inbox: Vec<Ipv4Datagram>,
}

/// A simulated network. Every router interface is its own link, shared with
/// the hosts attached to it.
pub struct Network {
    pub router: Router,
    pub hosts: Vec<Host>,
    /// Every frame put on a link, in order.
    pub frames: Vec<(usize, EthernetFrame<Vec<u8>>)>,
}

fn eth(i: u8) -> EthernetAddress {
    EthernetAddress::new([0x02, 0, 0, 0, 0, i])
}

impl Network {
    pub fn new() -> Network {
        let _ = env_logger::try_init();

        let mut router = Router::new();
        let uplink = router.add_interface(NetworkInterface::new(eth(100), *UPLINK_ADDR));
        let eth0 = router.add_interface(NetworkInterface::new(eth(101), *ETH0_ADDR));
        let eth1 = router.add_interface(NetworkInterface::new(eth(102), *ETH1_ADDR));
        let eth2 = router.add_interface(NetworkInterface::new(eth(103), *ETH2_ADDR));

        router.add_route("0.0.0.0".parse().unwrap(), 0, Some(*ISP_ADDR), uplink);
        router.add_route("10.0.0.0".parse().unwrap(), 8, None, eth0);
        router.add_route("172.16.0.0".parse().unwrap(), 12, None, eth1);
        router.add_route("192.168.0.0".parse().unwrap(), 24, None, eth2);
        router.add_route("143.195.0.0".parse().unwrap(), 16, Some(*HS_ROUTER_ADDR), eth2);

        let mut network = Network {
            router,
            hosts: Vec::new(),
            frames: Vec::new(),
        };

        network.add_host("isp", 1, *ISP_ADDR, *UPLINK_ADDR, uplink);
        network.add_host("applesauce", 2, *APPLESAUCE_ADDR, *ETH0_ADDR, eth0);
        network.add_host("cherrypie", 3, *CHERRYPIE_ADDR, *ETH1_ADDR, eth1);
        network.add_host("dm42", 4, *DM42_ADDR, *ETH1_ADDR, eth1);
        network.add_host("hs_router", 5, *HS_ROUTER_ADDR, *ETH2_ADDR, eth2);
        network
    }

    fn add_host(
        &mut self,
        name: &'static str,
        i: u8,
        ipv4_addr: Ipv4Address,
        gateway: Ipv4Address,
        link: usize,
    ) {
        self.hosts.push(Host {
            name,
            interface: NetworkInterface::new(eth(i), ipv4_addr),
            gateway,
            link,
            inbox: Vec::new(),
        });
    }

    pub fn host(&mut self, name: &str) -> &mut Host {
        match self.hosts.iter_mut().find(|host| host.name == name) {
            Some(host) => host,
            None => panic!("No host named {}.", name),
        }
    }

    /// Sends a datagram from a host via its gateway.
    pub fn send(&mut self, from: &str, dst_addr: Ipv4Address, ttl: u8, payload: &[u8]) {
        let host = self.host(from);
        let datagram = Ipv4Datagram::new(
            host.interface.ipv4_addr(),
            dst_addr,
            ipv4_protocols::UDP,
            ttl,
            payload.to_vec(),
        ).unwrap();
        let gateway = host.gateway;
        host.interface.send_datagram(datagram, gateway);
    }

    /// Moves frames between hosts and the router until every queue is empty.
    pub fn exchange(&mut self) {
        loop {
            let mut moved = false;

            for i in 0 .. self.hosts.len() {
                while let Some(eth_frame) = self.hosts[i].interface.maybe_send() {
                    moved = true;
                    let link = self.hosts[i].link;
                    self.router.interface(link).recv_frame(&eth_frame);
                    for (j, host) in self.hosts.iter_mut().enumerate() {
                        if j != i && host.link == link {
                            if let Some(datagram) = host.interface.recv_frame(&eth_frame) {
                                host.inbox.push(datagram);
                            }
                        }
                    }
                    self.frames.push((link, eth_frame));
                }
            }

            self.router.route();

            for link in 0 .. self.router.interfaces_len() {
                while let Some(eth_frame) = self.router.interface(link).maybe_send() {
                    moved = true;
                    for host in self.hosts.iter_mut().filter(|host| host.link == link) {
                        if let Some(datagram) = host.interface.recv_frame(&eth_frame) {
                            host.inbox.push(datagram);
                        }
                    }
                    self.frames.push((link, eth_frame));
                }
            }

            if !moved {
                break;
            }
        }
    }

    /// Advances time on the router and every host.
    pub fn tick(&mut self, ms: u64) {
        self.router.tick(ms);
        for host in self.hosts.iter_mut() {
            host.interface.tick(ms);
        }
    }

    /// Returns the targets of the ARP requests seen on a link.
    pub fn arp_requests(&self, link: usize) -> Vec<Ipv4Address> {
        self.frames
            .iter()
            .filter(|&&(l, ref eth_frame)| l == link && eth_frame.payload_type() == eth_types::ARP)
            .filter_map(|&(_, ref eth_frame)| Arp::deserialize(eth_frame.payload()).ok())
            .filter(|arp_repr| arp_repr.op == ArpOp::Request)
            .map(|arp_repr| arp_repr.target_proto_addr)
            .collect()
    }
}
