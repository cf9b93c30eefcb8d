#[macro_use]
extern crate assert_matches;
extern crate env_logger;
#[macro_use]
extern crate lazy_static;
extern crate usrrouter;

mod context;

use context::*;

#[test]
fn host_to_host_across_router() {
    let mut network = Network::new();
    network.send("applesauce", *CHERRYPIE_ADDR, 64, b"hello");
    network.exchange();

    let inbox = &network.host("cherrypie").inbox;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].header.src_addr, *APPLESAUCE_ADDR);
    assert_eq!(inbox[0].header.dst_addr, *CHERRYPIE_ADDR);
    assert_eq!(inbox[0].header.ttl, 63);
    assert_eq!(inbox[0].payload, b"hello".to_vec());

    assert!(network.host("dm42").inbox.is_empty());
    assert!(network.host("isp").inbox.is_empty());
}

#[test]
fn default_route_to_isp() {
    let mut network = Network::new();
    let dst_addr = "8.8.8.8".parse().unwrap();
    network.send("cherrypie", dst_addr, 64, b"dns?");
    network.exchange();

    let inbox = &network.host("isp").inbox;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].header.dst_addr, dst_addr);
    assert_eq!(inbox[0].header.ttl, 63);

    // The router resolved the ISP, not the final destination.
    assert_eq!(network.arp_requests(0), vec![*ISP_ADDR]);
}

#[test]
fn next_hop_router() {
    let mut network = Network::new();
    let dst_addr = "143.195.10.3".parse().unwrap();
    network.send("isp", dst_addr, 64, b"to hs");
    network.exchange();

    let inbox = &network.host("hs_router").inbox;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].header.dst_addr, dst_addr);
    assert_eq!(network.arp_requests(3), vec![*HS_ROUTER_ADDR]);
}

#[test]
fn reply_travels_back() {
    let mut network = Network::new();
    network.send("applesauce", *DM42_ADDR, 64, b"ping");
    network.exchange();
    assert_eq!(network.host("dm42").inbox.len(), 1);

    network.send("dm42", *APPLESAUCE_ADDR, 64, b"pong");
    network.exchange();

    let inbox = &network.host("applesauce").inbox;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].payload, b"pong".to_vec());

    // Both directions were served from the ARP caches learned on the way in.
    assert_eq!(network.arp_requests(1), vec![*ETH0_ADDR]);
    assert_eq!(network.arp_requests(2), vec![*DM42_ADDR]);
}

#[test]
fn burst_resolves_once_and_keeps_order() {
    let mut network = Network::new();
    for i in 0 .. 5u8 {
        network.send("applesauce", *CHERRYPIE_ADDR, 64, &[i]);
    }
    network.exchange();

    let payloads: Vec<_> = network
        .host("cherrypie")
        .inbox
        .iter()
        .map(|datagram| datagram.payload[0])
        .collect();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4]);
    assert_eq!(network.arp_requests(1), vec![*ETH0_ADDR]);
    assert_eq!(network.arp_requests(2), vec![*CHERRYPIE_ADDR]);
}

#[test]
fn ttl_exhausted_at_router() {
    let mut network = Network::new();
    network.send("applesauce", *CHERRYPIE_ADDR, 1, b"dying");
    network.send("applesauce", *CHERRYPIE_ADDR, 2, b"barely");
    network.exchange();

    let inbox = &network.host("cherrypie").inbox;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].payload, b"barely".to_vec());
    assert_eq!(inbox[0].header.ttl, 1);
}

#[test]
fn unanswered_request_times_out() {
    let mut network = Network::new();
    let nobody = "10.0.0.99".parse().unwrap();

    network.send("cherrypie", nobody, 64, b"anyone?");
    network.exchange();
    network.send("cherrypie", nobody, 64, b"anyone??");
    network.exchange();
    assert_eq!(network.arp_requests(1), vec![nobody]);

    network.tick(5000);
    network.send("cherrypie", nobody, 64, b"hello?");
    network.exchange();
    assert_eq!(network.arp_requests(1), vec![nobody, nobody]);
    assert!(network.host("applesauce").inbox.is_empty());
}

#[test]
fn cache_expires_after_thirty_seconds() {
    let mut network = Network::new();
    network.send("applesauce", *CHERRYPIE_ADDR, 64, b"one");
    network.exchange();

    network.tick(29_999);
    network.send("applesauce", *CHERRYPIE_ADDR, 64, b"two");
    network.exchange();
    assert_eq!(network.arp_requests(2), vec![*CHERRYPIE_ADDR]);

    network.tick(1);
    network.send("applesauce", *CHERRYPIE_ADDR, 64, b"three");
    network.exchange();
    assert_eq!(network.arp_requests(2), vec![*CHERRYPIE_ADDR, *CHERRYPIE_ADDR]);
    assert_eq!(network.host("cherrypie").inbox.len(), 3);
}

#[test]
fn hosts_on_same_link_talk_directly() {
    let mut network = Network::new();
    let datagram = usrrouter::core::repr::Ipv4Datagram::new(
        *CHERRYPIE_ADDR,
        *DM42_ADDR,
        usrrouter::core::repr::ipv4_protocols::UDP,
        usrrouter::core::repr::Ipv4Repr::DEFAULT_TTL,
        b"neighbor".to_vec(),
    ).unwrap();
    network.host("cherrypie").interface.send_datagram(datagram.clone(), *DM42_ADDR);
    network.exchange();

    assert_eq!(network.host("dm42").inbox, vec![datagram]);
    assert_matches!(network.router.interface(2).maybe_receive(), None);

    let router_eth_addr = network.router.interface(2).interface().ethernet_addr();
    assert!(
        network
            .frames
            .iter()
            .all(|&(_, ref eth_frame)| eth_frame.src_addr() != router_eth_addr)
    );
}
