use crate::config::{ForwarderConfig, LinkConfig, QueueConfig};
use crate::ndn::Name;
use crate::net::{Link, LinkId, NetWorld, Network, NodeId, Packet};
use crate::queue::{DropCause, DropTailQueue};
use crate::sim::{SimTime, Simulator};
use crate::trace::TraceRecorder;

fn expected_tx_time_ns(bytes: u32, bandwidth_bps: u64) -> u64 {
    let bits = (bytes as u128).saturating_mul(8);
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bandwidth_bps as u128 - 1))
        / bandwidth_bps as u128;
    nanos.min(u64::MAX as u128) as u64
}

fn pkt(seq: u64, bytes: u32) -> Packet {
    let name = Name::parse("/prefix").expect("name").with_seq(seq);
    Packet::interest(seq, name, seq as u32, SimTime::from_secs(2), bytes, true, SimTime::ZERO)
}

/// a -> b 一条链路（以及反向链路）
fn two_nodes(link: &LinkConfig) -> (NetWorld, LinkId, NodeId) {
    let mut net = Network::new(1, Box::new(TraceRecorder::default()));
    let a = net.add_node("a", &ForwarderConfig::default());
    let b = net.add_node("b", &ForwarderConfig::default());
    net.connect(a, b, link).expect("connect");
    let ab = net.link_between(a, b).expect("a->b");
    (NetWorld::new(net), ab, b)
}

#[test]
fn tx_time_rounds_up_to_whole_nanoseconds() {
    let link = Link::new(
        NodeId(0),
        NodeId(1),
        crate::net::FaceId(0),
        SimTime::ZERO,
        1_500_000,
        Box::new(DropTailQueue::new(1)),
    );
    for bytes in [1u32, 40, 1024, 1500] {
        assert_eq!(link.tx_time(bytes), SimTime(expected_tx_time_ns(bytes, 1_500_000)));
    }
    // 1 byte @ 1.5Mbps = 5333.33ns
    assert_eq!(link.tx_time(1), SimTime(5334));
}

#[test]
fn packets_are_serialized_back_to_back_then_propagate() {
    let cfg = LinkConfig {
        bandwidth_bps: 1_000_000,
        latency: SimTime::from_millis(10),
        queue: QueueConfig::DropTail { capacity: 10 },
    };
    let (mut world, ab, b) = two_nodes(&cfg);
    let mut sim = Simulator::default();

    // 1000B @ 1Mbps = 8ms
    world.net.transmit(ab, pkt(1, 1000), &mut sim);
    world.net.transmit(ab, pkt(2, 1000), &mut sim);
    assert!(world.net.link(ab).expect("link").busy);
    assert_eq!(world.net.link(ab).expect("link").queue.len(), 1);

    let arrivals = |world: &NetWorld| world.net.node(b).expect("b").stats().interests_in;

    sim.run_until(SimTime::from_millis(18).saturating_sub(SimTime(1)), &mut world);
    assert_eq!(arrivals(&world), 0);
    sim.run_until(SimTime::from_millis(18), &mut world);
    assert_eq!(arrivals(&world), 1);
    sim.run_until(SimTime::from_millis(26).saturating_sub(SimTime(1)), &mut world);
    assert_eq!(arrivals(&world), 1);
    sim.run_until(SimTime::from_millis(26), &mut world);
    assert_eq!(arrivals(&world), 2);

    assert!(!world.net.link(ab).expect("link").busy);
    assert_eq!(world.net.stats.transmitted_pkts, 2);
    assert_eq!(world.net.stats.transmitted_bytes, 2000);
}

#[test]
fn full_link_queue_drops_and_reports_overflow() {
    let cfg = LinkConfig {
        bandwidth_bps: 1_000_000,
        latency: SimTime::from_millis(1),
        queue: QueueConfig::DropTail { capacity: 1 },
    };
    let (mut world, ab, _) = two_nodes(&cfg);
    let mut sim = Simulator::default();

    // 第一个包立即开始序列化，第二个排队，第三个溢出
    for seq in 1..=3 {
        world.net.transmit(ab, pkt(seq, 500), &mut sim);
    }
    assert_eq!(world.net.stats.dropped_pkts, 1);

    let rec = world.net.sink_as::<TraceRecorder>().expect("recorder");
    assert_eq!(rec.drops.len(), 1);
    assert_eq!(rec.drops[0].pkt_id, 3);
    assert_eq!(rec.drops[0].link, ab);
    assert_eq!(rec.drops[0].cause, DropCause::Overflow);
    assert_eq!(rec.drops[0].name, "/prefix/3");
}

#[test]
fn connect_rejects_self_loops_and_unknown_nodes() {
    let mut net = Network::default();
    let a = net.add_node("a", &ForwarderConfig::default());
    assert!(net.connect(a, a, &LinkConfig::default()).is_err());
    assert!(net.connect(a, NodeId(9), &LinkConfig::default()).is_err());
    assert!(net.links().is_empty());
    assert_eq!(net.node(a).expect("a").faces().len(), 0);
}
