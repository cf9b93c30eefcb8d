#[macro_use]
extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate lazy_static;
extern crate rand;
extern crate usrrouter;

use clap::{
    App,
    Arg,
};
use rand::Rng;

use usrrouter::core::interface::NetworkInterface;
use usrrouter::core::repr::{
    ipv4_protocols,
    EthernetAddress,
    Ipv4Address,
    Ipv4Datagram,
};
use usrrouter::core::router::Router;

lazy_static! {
    static ref UPLINK: (Ipv4Address, Ipv4Address) =
        ("171.67.76.46".parse().unwrap(), "171.67.76.1".parse().unwrap());

    /// (router address, network, prefix length, host address) per LAN.
    static ref LANS: Vec<(Ipv4Address, Ipv4Address, u8, Ipv4Address)> = vec![
        (
            "10.0.0.1".parse().unwrap(),
            "10.0.0.0".parse().unwrap(),
            8,
            "10.0.0.2".parse().unwrap(),
        ),
        (
            "172.16.0.1".parse().unwrap(),
            "172.16.0.0".parse().unwrap(),
            12,
            "172.16.0.2".parse().unwrap(),
        ),
        (
            "192.168.0.1".parse().unwrap(),
            "192.168.0.0".parse().unwrap(),
            24,
            "192.168.0.2".parse().unwrap(),
        ),
    ];

    static ref INTERNET_HOST: Ipv4Address = "93.184.216.34".parse().unwrap();
}

struct Host {
    interface: NetworkInterface,
    gateway: Ipv4Address,
    link: usize,
}

fn eth(i: usize) -> EthernetAddress {
    EthernetAddress::new([0x02, 0, 0, 0, (i >> 8) as u8, i as u8])
}

/// Shuttles frames between the hosts and the router until all is quiet.
fn exchange(router: &mut Router, hosts: &mut [Host]) {
    loop {
        let mut moved = false;

        for i in 0 .. hosts.len() {
            while let Some(eth_frame) = hosts[i].interface.maybe_send() {
                moved = true;
                router.interface(hosts[i].link).recv_frame(&eth_frame);
            }
        }

        router.route();

        for link in 0 .. router.interfaces_len() {
            while let Some(eth_frame) = router.interface(link).maybe_send() {
                moved = true;
                for host in hosts.iter_mut().filter(|host| host.link == link) {
                    if let Some(datagram) = host.interface.recv_frame(&eth_frame) {
                        println!(
                            "{:>15} <- {:<15} ttl={:<3} id={:#06x} {} byte(s)",
                            host.interface.ipv4_addr().to_string(),
                            datagram.header.src_addr.to_string(),
                            datagram.header.ttl,
                            datagram.header.identification,
                            datagram.payload.len()
                        );
                    }
                }
            }
        }

        if !moved {
            break;
        }
    }
}

/// Forwards random traffic between hosts on three LANs and the internet.
fn main() {
    env_logger::init();

    let matches = App::new("static_router")
        .about("Routes datagrams between simulated hosts.")
        .arg(
            Arg::with_name("count")
                .long("count")
                .takes_value(true)
                .default_value("3")
                .help("Datagrams sent by each host."),
        )
        .arg(
            Arg::with_name("ttl")
                .long("ttl")
                .takes_value(true)
                .default_value("64")
                .help("TTL of each datagram."),
        )
        .arg(
            Arg::with_name("tick")
                .long("tick")
                .takes_value(true)
                .default_value("1000")
                .help("Milliseconds between rounds."),
        )
        .get_matches();

    let count = value_t!(matches, "count", usize).unwrap_or_else(|e| e.exit());
    let ttl = value_t!(matches, "ttl", u8).unwrap_or_else(|e| e.exit());
    let tick = value_t!(matches, "tick", u64).unwrap_or_else(|e| e.exit());

    let mut router = Router::new();
    let mut hosts = Vec::new();

    let (uplink_addr, isp_addr) = *UPLINK;
    let uplink = router.add_interface(NetworkInterface::new(eth(0x100), uplink_addr));
    router.add_route("0.0.0.0".parse().unwrap(), 0, Some(isp_addr), uplink);
    hosts.push(Host {
        interface: NetworkInterface::new(eth(0), isp_addr),
        gateway: uplink_addr,
        link: uplink,
    });

    for (i, &(router_addr, network, prefix_len, host_addr)) in LANS.iter().enumerate() {
        let link = router.add_interface(NetworkInterface::new(eth(0x101 + i), router_addr));
        router.add_route(network, prefix_len, None, link);
        hosts.push(Host {
            interface: NetworkInterface::new(eth(1 + i), host_addr),
            gateway: router_addr,
            link,
        });
    }

    let mut destinations: Vec<_> = LANS.iter().map(|lan| lan.3).collect();
    destinations.push(*INTERNET_HOST);

    let mut rng = rand::thread_rng();

    for round in 0 .. count {
        println!("Round {}:", round);

        for host in hosts.iter_mut() {
            let src_addr = host.interface.ipv4_addr();
            let dst_addr = destinations[rng.gen_range(0, destinations.len())];
            if dst_addr == src_addr {
                continue;
            }

            let payload_len = rng.gen_range(1, 64);
            let payload: Vec<u8> = rng.gen_iter::<u8>().take(payload_len).collect();

            let mut datagram =
                match Ipv4Datagram::new(src_addr, dst_addr, ipv4_protocols::UDP, ttl, payload) {
                    Ok(datagram) => datagram,
                    Err(err) => {
                        println!("{:>15} unable to build datagram: {:?}", src_addr, err);
                        continue;
                    }
                };
            datagram.header.identification = rng.gen();
            datagram.header.compute_checksum();

            let gateway = host.gateway;
            host.interface.send_datagram(datagram, gateway);
        }

        exchange(&mut router, &mut hosts);

        router.tick(tick);
        for host in hosts.iter_mut() {
            host.interface.tick(tick);
        }
    }
}
