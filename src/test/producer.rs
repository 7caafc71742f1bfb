use std::any::Any;
use std::collections::BTreeSet;

use crate::app::{App, Producer};
use crate::config::{ConfigError, ForwarderConfig, LinkConfig, ProducerConfig, QueueConfig};
use crate::ndn::Name;
use crate::net::{AppId, Ecn, NetWorld, Network, Packet};
use crate::sim::{SimTime, Simulator};

/// 一次性发出 `count` 个 Interest 并记录收到的 Data
#[derive(Debug)]
struct Collector {
    id: AppId,
    prefix: Name,
    count: u64,
    mark_even: bool,
    got: Vec<(Name, u32, bool)>,
    interests_seen: u64,
}

impl App for Collector {
    fn on_start(&mut self, sim: &mut Simulator, net: &mut Network) {
        for seq in 0..self.count {
            let mut pkt = Packet::interest(
                net.next_packet_id(),
                self.prefix.with_seq(seq),
                seq as u32,
                SimTime::from_secs(2),
                40,
                true,
                sim.now(),
            );
            if self.mark_even && seq % 2 == 0 {
                pkt.mark_ce();
            }
            net.app_send(self.id, pkt, sim);
        }
    }

    fn on_packet(&mut self, pkt: Packet, _sim: &mut Simulator, _net: &mut Network) {
        if pkt.is_interest() {
            self.interests_seen += 1;
            return;
        }
        self.got.push((pkt.name.clone(), pkt.size_bytes, pkt.is_ce()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn run(count: u64, mark_even: bool, prefix: &str) -> (NetWorld, AppId, AppId) {
    let mut net = Network::new(3, Box::new(crate::trace::NullSink));
    let a = net.add_node("a", &ForwarderConfig::default());
    let b = net.add_node("b", &ForwarderConfig::default());
    let link = LinkConfig {
        bandwidth_bps: 10_000_000,
        latency: SimTime::from_millis(1),
        queue: QueueConfig::DropTail { capacity: 1000 },
    };
    net.connect(a, b, &link).expect("connect");
    net.set_default_routes();

    let prefix = Name::parse(prefix).expect("prefix");
    let collector = net
        .install_app(a, |id, _| {
            Ok(Box::new(Collector {
                id,
                prefix,
                count,
                mark_even,
                got: Vec::new(),
                interests_seen: 0,
            }) as Box<dyn App>)
        })
        .expect("collector");
    let producer = net
        .install_producer(b, ProducerConfig::default())
        .expect("producer");

    let mut world = NetWorld::new(net);
    let mut sim = Simulator::default();
    let until = SimTime::from_secs(5);
    world.net.start(&mut sim, until, SimTime::ZERO);
    sim.run_until(until, &mut world);
    (world, collector, producer)
}

fn collected(world: &NetWorld, id: AppId) -> &Collector {
    world
        .net
        .app(id)
        .and_then(|a| a.as_any().downcast_ref::<Collector>())
        .expect("collector")
}

#[test]
fn hundred_requests_get_exactly_hundred_responses() {
    let (world, collector, producer) = run(100, false, "/prefix");
    let c = collected(&world, collector);

    assert_eq!(c.got.len(), 100);
    assert!(c.got.iter().all(|(_, size, _)| *size == 1024));
    let names: BTreeSet<String> = c.got.iter().map(|(n, _, _)| n.to_string()).collect();
    assert_eq!(names.len(), 100, "no duplicate responses");
    assert_eq!(c.interests_seen, 0);

    let p = world.net.producer(producer).expect("producer");
    assert_eq!(p.served(), 100);
    assert_eq!(p.prefix().to_string(), "/prefix");
}

#[test]
fn producer_ignores_names_outside_its_prefix() {
    let (world, collector, producer) = run(10, false, "/other");
    assert!(collected(&world, collector).got.is_empty());
    assert_eq!(world.net.producer(producer).expect("producer").served(), 0);
}

#[test]
fn congestion_mark_on_interest_is_echoed_on_data() {
    let (world, collector, _) = run(10, true, "/prefix");
    let c = collected(&world, collector);
    assert_eq!(c.got.len(), 10);
    for (name, _, ce) in &c.got {
        let seq = name.seq().expect("seq");
        assert_eq!(*ce, seq % 2 == 0, "{name}");
    }
}

#[test]
fn producer_config_is_validated() {
    let err = Producer::new(ProducerConfig {
        payload_size: 0,
        ..ProducerConfig::default()
    })
    .expect_err("zero payload");
    assert!(matches!(err, ConfigError::OutOfRange { param: "payload_size", .. }));

    let err = Producer::new(ProducerConfig {
        prefix: "prefix".into(),
        ..ProducerConfig::default()
    })
    .expect_err("bad prefix");
    assert!(matches!(err, ConfigError::InvalidName { .. }));

    let p = Producer::new(ProducerConfig::default()).expect("producer");
    let data = Packet::data(0, Name::parse("/prefix/1").expect("name"), p.payload_size(), true, SimTime::ZERO);
    assert_eq!(data.ecn, Ecn::Ect0);
}
