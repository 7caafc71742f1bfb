//! 参考场景拓扑
//!
//! ```text
//!            N1
//!            |  10Mbps 1ms
//! N0 ------ N2 ============ N3 ------ N4
//!   10Mbps 0ms  1.5Mbps 100ms  \  10Mbps 2ms
//!               (RED/ARED+ECN)  \
//!                                N5   10Mbps 3ms
//! ```
//!
//! 只有 N2 <-> N3 使用 RED，其余链路为 1000 包的 DropTail。
//! 所有节点安装默认路由，并对 consumer 前缀使用多播策略。

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{
    ConfigError, ConsumerConfig, ForwarderConfig, LinkConfig, ProducerConfig, QueueConfig,
    RedConfig, TraceConfig,
};
use crate::ndn::{Multicast, Name, Strategy};
use crate::net::{AppId, LinkId, NetWorld, Network, NodeId};
use crate::sim::SimTime;
use crate::trace::TraceRecorder;

/// 参考场景选项（可从 JSON 场景文件整体覆盖）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleOpts {
    pub seed: u64,
    /// 仿真结束时刻
    pub until: SimTime,
    pub access_bps: u64,
    pub bottleneck_bps: u64,
    pub bottleneck_latency: SimTime,
    /// 非瓶颈链路的 DropTail 容量（包）
    pub access_queue_pkts: usize,
    pub red: RedConfig,
    pub consumer: ConsumerConfig,
    pub producer: ProducerConfig,
    /// producer 所在节点（0..=5）
    pub producer_node: usize,
    pub forwarder: ForwarderConfig,
    pub trace: TraceConfig,
}

impl Default for SimpleOpts {
    fn default() -> Self {
        Self {
            seed: 1,
            until: SimTime::from_secs(20),
            access_bps: 10_000_000,
            bottleneck_bps: 1_500_000,
            bottleneck_latency: SimTime::from_millis(100),
            access_queue_pkts: 1000,
            red: RedConfig::default(),
            consumer: ConsumerConfig {
                stop: Some(SimTime::from_secs(10)),
                ..ConsumerConfig::default()
            },
            producer: ProducerConfig::default(),
            // 有意不同于 ndn-simple 脚本的 N2：producer 在 N2 时流量不经过 N2 -> N3 瓶颈
            producer_node: 5,
            forwarder: ForwarderConfig::default(),
            trace: TraceConfig::default(),
        }
    }
}

/// 构建后需要的句柄
#[derive(Debug, Clone)]
pub struct SimpleHandles {
    pub nodes: Vec<NodeId>,
    pub consumer: AppId,
    pub producer: AppId,
    /// N2 -> N3 方向的瓶颈链路
    pub bottleneck: LinkId,
    /// N3 -> N2 方向的瓶颈链路
    pub bottleneck_rev: LinkId,
}

/// 构建参考场景（遥测记录到 `TraceRecorder`）
pub fn build_simple(opts: &SimpleOpts) -> Result<(NetWorld, SimpleHandles), ConfigError> {
    let mut net = Network::new(opts.seed, Box::new(TraceRecorder::default()));

    let nodes: Vec<NodeId> = (0..6)
        .map(|i| net.add_node(format!("N{i}"), &opts.forwarder))
        .collect();
    let producer_node = *nodes
        .get(opts.producer_node)
        .ok_or(ConfigError::UnknownNode(NodeId(opts.producer_node)))?;

    let access = |latency_ms: u64| LinkConfig {
        bandwidth_bps: opts.access_bps,
        latency: SimTime::from_millis(latency_ms),
        queue: QueueConfig::DropTail {
            capacity: opts.access_queue_pkts,
        },
    };
    let bottleneck = LinkConfig {
        bandwidth_bps: opts.bottleneck_bps,
        latency: opts.bottleneck_latency,
        queue: QueueConfig::Red(opts.red.clone()),
    };

    net.connect(nodes[0], nodes[2], &access(0))?;
    net.connect(nodes[1], nodes[2], &access(1))?;
    net.connect(nodes[2], nodes[3], &bottleneck)?;
    net.connect(nodes[3], nodes[4], &access(2))?;
    net.connect(nodes[3], nodes[5], &access(3))?;
    net.set_default_routes();

    let prefix = Name::parse(&opts.consumer.prefix)?;
    net.set_strategy_all(&prefix, || Box::new(Multicast) as Box<dyn Strategy>);

    let consumer = net.install_consumer(nodes[0], opts.consumer.clone())?;
    let producer = net.install_producer(producer_node, opts.producer.clone())?;

    let (Some(fwd), Some(rev)) = (
        net.link_between(nodes[2], nodes[3]),
        net.link_between(nodes[3], nodes[2]),
    ) else {
        return Err(ConfigError::UnknownNode(nodes[3]));
    };

    info!(seed = opts.seed, producer = ?producer_node, "参考场景构建完成");
    Ok((
        NetWorld::new(net),
        SimpleHandles {
            nodes,
            consumer,
            producer,
            bottleneck: fwd,
            bottleneck_rev: rev,
        },
    ))
}
