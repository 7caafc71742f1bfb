use crate::config::{AredConfig, ConfigError, RedConfig};
use crate::ndn::Name;
use crate::net::Packet;
use crate::queue::{DropCause, Enqueue, PacketQueue, RedQueue, Verdict};
use crate::sim::SimTime;

fn pkt(id: u64, ecn_capable: bool) -> Packet {
    let name = Name::parse("/prefix").expect("name").with_seq(id);
    Packet::interest(id, name, id as u32, SimTime::from_secs(2), 40, ecn_capable, SimTime::ZERO)
}

/// avg 直接等于瞬时队长；前三个包低于 min_th，第四个起进入强制区间
fn instant_cfg() -> RedConfig {
    RedConfig {
        capacity: 100,
        min_th: 2.5,
        max_th: 2.9,
        weight: 1.0,
        max_p: 0.1,
        gentle: false,
        adaptive: false,
        ..RedConfig::default()
    }
}

fn fill(q: &mut RedQueue, n: u64, now: SimTime) {
    for id in 0..n {
        let out = q.enqueue(pkt(id, true), now);
        assert!(!matches!(out, Enqueue::Dropped { .. }), "unexpected drop while filling");
    }
}

#[test]
fn probability_follows_threshold_regions() {
    let q = RedQueue::new(
        RedConfig {
            gentle: false,
            ..RedConfig::default()
        },
        1_500_000,
        1,
    )
    .expect("red");
    assert_eq!(q.probability(4.9), 0.0);
    assert_eq!(q.probability(5.0), 0.0);
    assert!((q.probability(10.0) - 0.05).abs() < 1e-12);
    assert!((q.probability(15.0) - 0.1).abs() < 1e-12);
    assert_eq!(q.probability(15.1), 1.0);

    let gentle = RedQueue::new(RedConfig::default(), 1_500_000, 1).expect("red");
    // max_th..2*max_th 从 max_p 线性增长到 1
    assert!((gentle.probability(22.5) - (0.1 + 0.9 * 0.5)).abs() < 1e-12);
    assert_eq!(gentle.probability(30.0), 1.0);
    assert_eq!(gentle.probability(100.0), 1.0);
}

#[test]
fn constant_avg_mid_range_marks_near_half_max_p() {
    let mut q = RedQueue::new(RedConfig::default(), 1_500_000, 42).expect("red");
    let p_b = q.probability(10.0);
    assert_eq!(p_b, q.max_p() / 2.0);

    let n = 200_000;
    let mut hits = 0u32;
    for _ in 0..n {
        match q.verdict_at(10.0, 1) {
            Verdict::Early => hits += 1,
            Verdict::Admit => {}
            Verdict::Forced => panic!("avg=10 must not be forced"),
        }
    }
    let rate = hits as f64 / n as f64;
    // count 补偿使间隔在 [1, 1/p_b] 上均匀分布：期望率 2*p_b/(1+p_b)
    let expected = 2.0 * p_b / (1.0 + p_b);
    assert!(rate > p_b, "rate={rate}");
    assert!((rate - expected).abs() < 0.005, "rate={rate} expected={expected}");
}

#[test]
fn count_resets_below_min_threshold_and_on_decision() {
    let mut q = RedQueue::new(RedConfig::default(), 1_500_000, 7).expect("red");
    let mut saw_admit = false;
    for _ in 0..1000 {
        let before = q.count();
        match q.verdict_at(10.0, 1) {
            Verdict::Admit => {
                assert_eq!(q.count(), before + 1);
                saw_admit = true;
            }
            Verdict::Early => assert_eq!(q.count(), 0),
            Verdict::Forced => unreachable!(),
        }
    }
    assert!(saw_admit);

    q.verdict_at(10.0, 1);
    q.verdict_at(1.0, 1);
    assert_eq!(q.count(), 0);
}

#[test]
fn empty_queue_is_exempt_only_in_probabilistic_region() {
    let mut q = RedQueue::new(
        RedConfig {
            gentle: false,
            ..RedConfig::default()
        },
        1_500_000,
        3,
    )
    .expect("red");
    for _ in 0..1000 {
        assert_eq!(q.verdict_at(14.0, 0), Verdict::Admit);
    }
    assert_eq!(q.verdict_at(15.5, 0), Verdict::Forced);
}

#[test]
fn arrival_at_drained_queue_is_dropped_when_avg_above_max_th() {
    let mut q = RedQueue::new(
        RedConfig {
            capacity: 100,
            min_th: 1.0,
            max_th: 2.0,
            weight: 0.5,
            gentle: false,
            adaptive: false,
            ..RedConfig::default()
        },
        1_000_000,
        1,
    )
    .expect("red");
    fill(&mut q, 10, SimTime::ZERO);
    while q.dequeue(SimTime::ZERO).is_some() {}
    assert_eq!(q.len(), 0);

    match q.enqueue(pkt(50, false), SimTime::ZERO) {
        Enqueue::Dropped { cause, .. } => assert_eq!(cause, DropCause::Probabilistic),
        other => panic!("expected drop, got {other:?}"),
    }
    assert!(q.avg() > 2.0, "avg={}", q.avg());
    assert_eq!(q.stats().forced_drops, 1);
    assert_eq!(q.len(), 0);
}

#[test]
fn overflow_drops_even_ect_packets() {
    let mut q = RedQueue::new(
        RedConfig {
            capacity: 3,
            ..RedConfig::default()
        },
        1_500_000,
        1,
    )
    .expect("red");
    fill(&mut q, 3, SimTime::ZERO);
    match q.enqueue(pkt(9, true), SimTime::ZERO) {
        Enqueue::Dropped { pkt, cause } => {
            assert_eq!(pkt.id, 9);
            assert_eq!(cause, DropCause::Overflow);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
    assert_eq!(q.stats().overflow_drops, 1);
    assert_eq!(q.len(), 3);
}

#[test]
fn forced_region_marks_ect_and_drops_non_ect() {
    let mut q = RedQueue::new(instant_cfg(), 1_000_000, 1).expect("red");
    fill(&mut q, 3, SimTime::ZERO);

    match q.enqueue(pkt(10, true), SimTime::ZERO) {
        Enqueue::Marked => {}
        other => panic!("expected mark, got {other:?}"),
    }
    match q.enqueue(pkt(11, false), SimTime::ZERO) {
        Enqueue::Dropped { cause, .. } => assert_eq!(cause, DropCause::Probabilistic),
        other => panic!("expected drop, got {other:?}"),
    }
    let st = q.stats();
    assert_eq!(st.marked, 1);
    assert_eq!(st.forced_drops, 1);

    let marked: Vec<bool> = std::iter::from_fn(|| q.dequeue(SimTime::ZERO))
        .map(|p| p.is_ce())
        .collect();
    assert_eq!(marked.len(), 4);
    assert!(marked[3]);
}

#[test]
fn hard_drop_drops_ect_packets_in_forced_region() {
    let mut q = RedQueue::new(
        RedConfig {
            hard_drop: true,
            ..instant_cfg()
        },
        1_000_000,
        1,
    )
    .expect("red");
    fill(&mut q, 3, SimTime::ZERO);
    assert!(matches!(
        q.enqueue(pkt(10, true), SimTime::ZERO),
        Enqueue::Dropped {
            cause: DropCause::Probabilistic,
            ..
        }
    ));
    assert_eq!(q.stats().forced_drops, 1);
    assert_eq!(q.stats().marked, 0);
}

#[test]
fn hard_drop_drops_ect_packets_in_probabilistic_region() {
    let mut q = RedQueue::new(
        RedConfig {
            capacity: 1000,
            min_th: 1.0,
            max_th: 500.0,
            weight: 1.0,
            gentle: false,
            adaptive: false,
            hard_drop: true,
            ..RedConfig::default()
        },
        1_000_000,
        1,
    )
    .expect("red");
    for id in 0..400 {
        let out = q.enqueue(pkt(id, true), SimTime::ZERO);
        assert!(!matches!(out, Enqueue::Marked), "packet {id} was marked");
    }
    let st = q.stats();
    assert_eq!(st.marked, 0);
    assert_eq!(st.forced_drops, 0);
    assert!(st.early_drops > 0);
    assert_eq!(st.enqueued + st.early_drops, 400);
}

#[test]
fn ecn_disabled_drops_instead_of_marking() {
    let mut q = RedQueue::new(
        RedConfig {
            ecn: false,
            ..instant_cfg()
        },
        1_000_000,
        1,
    )
    .expect("red");
    fill(&mut q, 3, SimTime::ZERO);
    assert!(matches!(
        q.enqueue(pkt(10, true), SimTime::ZERO),
        Enqueue::Dropped { .. }
    ));
    assert_eq!(q.stats().marked, 0);
}

#[test]
fn idle_time_decays_average_toward_zero() {
    let cfg = RedConfig {
        weight: 0.5,
        mean_pkt_size: 1000,
        adaptive: false,
        ..RedConfig::default()
    };
    // 8000 bps / (8 * 1000 B) = 每秒 1 个包
    let mut busy = RedQueue::new(cfg.clone(), 8_000, 1).expect("red");
    let mut idle = RedQueue::new(cfg, 8_000, 1).expect("red");
    for q in [&mut busy, &mut idle] {
        fill(q, 4, SimTime::ZERO);
        while q.dequeue(SimTime::ZERO).is_some() {}
        // 空队列上的出队开始空闲计时
        assert!(q.dequeue(SimTime::ZERO).is_none());
    }
    let start = busy.avg();
    assert!((start - 2.125).abs() < 1e-12, "avg={start}");

    busy.enqueue(pkt(100, true), SimTime::ZERO);
    idle.enqueue(pkt(100, true), SimTime::from_secs(10));
    assert!((busy.avg() - start * 0.5).abs() < 1e-12);
    assert!(idle.avg() < 0.01, "avg={}", idle.avg());
}

#[test]
fn ared_raises_max_p_when_avg_stays_above_max_th() {
    let cfg = RedConfig {
        adaptive: true,
        ared: AredConfig::default(),
        ..instant_cfg()
    };
    let mut q = RedQueue::new(cfg, 1_000_000, 1).expect("red");
    fill(&mut q, 10, SimTime::ZERO);
    // 第一个周期里 avg 从 0 起步
    q.adapt(SimTime::from_millis(500));
    assert_eq!(q.max_p(), 0.1);

    q.enqueue(pkt(50, true), SimTime::from_millis(600));
    q.adapt(SimTime::from_millis(1000));
    assert!((q.max_p() - 0.11).abs() < 1e-12, "max_p={}", q.max_p());

    for i in 0..200u64 {
        q.enqueue(pkt(100 + i, true), SimTime::from_secs(2 + i));
        q.adapt(SimTime::from_secs(2 + i));
    }
    assert_eq!(q.max_p(), 0.5);
}

#[test]
fn ared_lowers_max_p_when_avg_stays_below_min_th() {
    let cfg = RedConfig {
        adaptive: true,
        ..RedConfig::default()
    };
    let mut q = RedQueue::new(cfg, 1_500_000, 1).expect("red");
    q.adapt(SimTime::from_millis(500));
    assert!((q.max_p() - 0.09).abs() < 1e-12);

    for i in 0..100u64 {
        q.adapt(SimTime::from_millis(1000 + 500 * i));
    }
    assert_eq!(q.max_p(), 0.01);
}

#[test]
fn non_adaptive_queue_keeps_max_p() {
    let mut q = RedQueue::new(instant_cfg(), 1_000_000, 1).expect("red");
    assert!(q.adapt_interval().is_none());
    q.adapt(SimTime::from_secs(1));
    assert_eq!(q.max_p(), 0.1);
}

#[test]
fn invalid_red_parameters_are_rejected() {
    let cases = [
        (
            RedConfig {
                min_th: 5.0,
                max_th: 5.0,
                ..RedConfig::default()
            },
            "thresholds",
        ),
        (
            RedConfig {
                weight: 0.0,
                ..RedConfig::default()
            },
            "weight",
        ),
        (
            RedConfig {
                max_p: 1.5,
                ..RedConfig::default()
            },
            "max_p",
        ),
        (
            RedConfig {
                capacity: 0,
                ..RedConfig::default()
            },
            "capacity",
        ),
    ];
    for (cfg, what) in cases {
        let err = RedQueue::new(cfg, 1_000_000, 1).expect_err(what);
        match what {
            "thresholds" => assert!(matches!(err, ConfigError::Thresholds { .. })),
            "capacity" => assert_eq!(err, ConfigError::ZeroCapacity),
            param => assert!(
                matches!(err, ConfigError::OutOfRange { param: p, .. } if p == param),
                "{err}"
            ),
        }
    }
}
