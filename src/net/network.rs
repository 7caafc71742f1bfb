//! 网络拓扑管理
//!
//! 网络持有节点（转发器）、单向链路、应用与遥测观察者；组件之间只通过
//! `NodeId`/`LinkId`/`FaceId`/`AppId` 互相引用。

use std::any::Any;

use super::deliver_packet::{DeliverPacket, DeliverToApp};
use super::id::{AppId, FaceId, LinkId, NodeId};
use super::link::Link;
use super::link_ready::{LinkReady, QueueAdapt, RateSample};
use super::packet::Packet;
use super::stats::Stats;
use crate::app::{App, AppStart, Consumer, Producer};
use crate::config::{ConfigError, ConsumerConfig, ForwarderConfig, LinkConfig, ProducerConfig};
use crate::ndn::{FaceKind, Forwarder, Name, Outgoing, Strategy};
use crate::queue::{Enqueue, build_queue};
use crate::sim::{SimTime, Simulator};
use crate::trace::{DelayEvent, DropEvent, NullSink, PitTimeoutEvent, RateEvent, TraceSink};
use tracing::{debug, info, trace};

/// 应用槽位：应用执行回调时被暂时取出
struct AppSlot {
    node: NodeId,
    face: FaceId,
    app: Option<Box<dyn App>>,
}

/// 网络拓扑
pub struct Network {
    nodes: Vec<Forwarder>,
    links: Vec<Link>,
    apps: Vec<AppSlot>,
    next_pkt_id: u64,
    seed: u64,
    sink: Box<dyn TraceSink>,
    pub stats: Stats,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(0, Box::new(NullSink))
    }
}

/// 把种子与下标混合成彼此独立的子种子（splitmix64）
pub(crate) fn mix_seed(seed: u64, salt: u64) -> u64 {
    let mut z = seed ^ salt.wrapping_mul(0x9E3779B97F4A7C15);
    z = z.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

impl Network {
    /// 创建网络；`seed` 决定所有随机行为，`sink` 接收遥测记录
    pub fn new(seed: u64, sink: Box<dyn TraceSink>) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            apps: Vec::new(),
            next_pkt_id: 0,
            seed,
            sink,
            stats: Stats::default(),
        }
    }

    /// 以具体类型访问遥测观察者
    pub fn sink_as<T: Any>(&self) -> Option<&T> {
        self.sink.as_any().downcast_ref::<T>()
    }

    /// 添加转发节点
    pub fn add_node(&mut self, name: impl Into<String>, cfg: &ForwarderConfig) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Forwarder::new(id, name, cfg));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Forwarder> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Forwarder, ConfigError> {
        self.nodes.get_mut(id.0).ok_or(ConfigError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[Forwarder] {
        &self.nodes
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// 查找 from -> to 的单向链路
    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.links
            .iter()
            .position(|l| l.from == from && l.to == to)
            .map(LinkId)
    }

    /// 连接两个节点：两个方向各建一条链路（各自独立的队列）并在两端各加一个接口。
    /// 返回 (a 上通往 b 的接口, b 上通往 a 的接口)。
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        cfg: &LinkConfig,
    ) -> Result<(FaceId, FaceId), ConfigError> {
        cfg.validate()?;
        if a == b {
            return Err(ConfigError::SelfLoop(a));
        }
        self.node_mut(a)?;
        self.node_mut(b)?;

        let ab = LinkId(self.links.len());
        let ba = LinkId(self.links.len() + 1);
        let face_a = self.node_mut(a)?.add_face(FaceKind::Link(ab));
        let face_b = self.node_mut(b)?.add_face(FaceKind::Link(ba));

        for (id, from, to, to_face) in [(ab, a, b, face_b), (ba, b, a, face_a)] {
            let queue = build_queue(&cfg.queue, cfg.bandwidth_bps, mix_seed(self.seed, id.0 as u64))?;
            self.links.push(Link::new(from, to, to_face, cfg.latency, cfg.bandwidth_bps, queue));
        }
        debug!(?a, ?b, bandwidth_bps = cfg.bandwidth_bps, latency = ?cfg.latency, "连接节点");
        Ok((face_a, face_b))
    }

    /// 添加一条 FIB 路由
    pub fn add_route(
        &mut self,
        node: NodeId,
        prefix: &Name,
        face: FaceId,
        cost: u32,
    ) -> Result<(), ConfigError> {
        self.node_mut(node)?.add_route(prefix.clone(), face, cost)
    }

    /// 在每个节点的每个链路接口上安装 `/` 路由
    pub fn set_default_routes(&mut self) {
        for node in &mut self.nodes {
            let link_faces: Vec<FaceId> = node
                .faces()
                .iter()
                .enumerate()
                .filter(|(_, k)| matches!(k, FaceKind::Link(_)))
                .map(|(i, _)| FaceId(i))
                .collect();
            for face in link_faces {
                // 接口刚从 faces() 中取得，必然存在
                let _ = node.add_route(Name::root(), face, 1);
            }
        }
    }

    /// 为单个节点的某前缀选择策略
    pub fn set_strategy(
        &mut self,
        node: NodeId,
        prefix: &Name,
        strategy: Box<dyn Strategy>,
    ) -> Result<(), ConfigError> {
        self.node_mut(node)?.set_strategy(prefix.clone(), strategy);
        Ok(())
    }

    /// 为所有节点的某前缀选择策略
    pub fn set_strategy_all<F>(&mut self, prefix: &Name, make: F)
    where
        F: Fn() -> Box<dyn Strategy>,
    {
        for node in &mut self.nodes {
            node.set_strategy(prefix.clone(), make());
        }
    }

    /// 在节点上安装任意应用；`build` 收到分配的应用 id 与接口
    pub fn install_app<F>(&mut self, node: NodeId, build: F) -> Result<AppId, ConfigError>
    where
        F: FnOnce(AppId, FaceId) -> Result<Box<dyn App>, ConfigError>,
    {
        let id = AppId(self.apps.len());
        self.node_mut(node)?;
        // 先构造（可能失败），再加接口，避免留下悬空接口
        let face = FaceId(self.nodes[node.0].faces().len());
        let app = build(id, face)?;
        let added = self.node_mut(node)?.add_face(FaceKind::App(id));
        debug_assert_eq!(added, face);
        self.apps.push(AppSlot {
            node,
            face,
            app: Some(app),
        });
        Ok(id)
    }

    /// 安装 consumer
    pub fn install_consumer(
        &mut self,
        node: NodeId,
        cfg: ConsumerConfig,
    ) -> Result<AppId, ConfigError> {
        let seed = self.seed;
        self.install_app(node, |id, _| {
            Ok(Box::new(Consumer::new(id, cfg, seed)?) as Box<dyn App>)
        })
    }

    /// 安装 producer，并在所在节点注册其前缀
    pub fn install_producer(
        &mut self,
        node: NodeId,
        cfg: ProducerConfig,
    ) -> Result<AppId, ConfigError> {
        let producer = Producer::new(cfg)?;
        let prefix = producer.prefix().clone();
        let id = self.install_app(node, |id, _| {
            let mut p = producer;
            p.attach(id);
            Ok(Box::new(p) as Box<dyn App>)
        })?;
        let face = self.apps[id.0].face;
        self.add_route(node, &prefix, face, 0)?;
        Ok(id)
    }

    pub fn app(&self, id: AppId) -> Option<&dyn App> {
        self.apps.get(id.0)?.app.as_deref()
    }

    pub fn consumer(&self, id: AppId) -> Option<&Consumer> {
        self.app(id)?.as_any().downcast_ref::<Consumer>()
    }

    pub fn producer(&self, id: AppId) -> Option<&Producer> {
        self.app(id)?.as_any().downcast_ref::<Producer>()
    }

    /// 启动：调度应用启动、周期性队列自适应与速率采样。周期事件不会越过 `until`。
    #[tracing::instrument(skip(self, sim))]
    pub fn start(&mut self, sim: &mut Simulator, until: SimTime, rate_period: SimTime) {
        info!(nodes = self.nodes.len(), links = self.links.len(), apps = self.apps.len(), "启动网络");
        for (i, slot) in self.apps.iter().enumerate() {
            let at = slot.app.as_ref().map_or(SimTime::ZERO, |a| a.start_time());
            sim.schedule(at, AppStart { app: AppId(i) });
        }
        for (i, link) in self.links.iter().enumerate() {
            if let Some(interval) = link.queue.adapt_interval() {
                let at = sim.now().saturating_add(interval);
                if at <= until {
                    sim.schedule(at, QueueAdapt { link_id: LinkId(i), until });
                }
            }
        }
        if rate_period > SimTime::ZERO {
            let at = sim.now().saturating_add(rate_period);
            if at <= until {
                sim.schedule(at, RateSample { period: rate_period, until });
            }
        }
    }

    /// 分配数据包 id
    pub fn next_packet_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, name = %pkt.name, ?node, ?face))]
    pub fn deliver(&mut self, node: NodeId, face: FaceId, pkt: Packet, sim: &mut Simulator) {
        let Some(fwd) = self.nodes.get_mut(node.0) else {
            debug!("目标节点不存在，丢弃");
            return;
        };
        let out = if pkt.is_interest() {
            fwd.on_interest(face, pkt, sim)
        } else {
            fwd.on_data(face, pkt, sim)
        };
        for Outgoing { face, pkt } in out {
            self.send_on_face(node, face, pkt, sim);
        }
    }

    /// 从节点的某个接口发出
    pub fn send_on_face(&mut self, node: NodeId, face: FaceId, pkt: Packet, sim: &mut Simulator) {
        match self.nodes.get(node.0).and_then(|n| n.face(face)) {
            Some(FaceKind::Link(link_id)) => self.transmit(link_id, pkt, sim),
            Some(FaceKind::App(app)) => {
                sim.schedule(sim.now(), DeliverToApp { app, pkt });
            }
            None => debug!(?node, ?face, "接口不存在，丢弃"),
        }
    }

    /// 把包交给链路：先经过 AQM 入队判定，链路空闲时立即开始序列化
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, ?link_id))]
    pub fn transmit(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let Some(link) = self.links.get_mut(link_id.0) else {
            return;
        };
        match link.queue.enqueue(pkt, now) {
            Enqueue::Queued => trace!(q_len = link.queue.len(), "入队"),
            Enqueue::Marked => {
                self.stats.marked_pkts += 1;
                trace!(q_len = link.queue.len(), "标记后入队");
            }
            Enqueue::Dropped { pkt, cause } => {
                self.stats.dropped_pkts += 1;
                debug!(?cause, "丢包");
                self.sink.on_drop(DropEvent {
                    t_ns: now.0,
                    link: link_id,
                    pkt_id: pkt.id,
                    name: pkt.name.to_string(),
                    cause,
                });
                return;
            }
        }
        if !link.busy {
            self.start_tx(link_id, sim);
        }
    }

    /// 链路空闲时取出队首开始序列化
    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        let Some(pkt) = link.queue.dequeue(now) else {
            link.busy = false;
            return;
        };
        link.busy = true;
        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(link.latency);
        link.sample_pkts += 1;
        link.sample_bytes += pkt.size_bytes as u64;
        self.stats.transmitted_pkts += 1;
        self.stats.transmitted_bytes += pkt.size_bytes as u64;

        trace!(?now, ?tx_time, ?depart, ?arrive, "计算传输时间");

        let (to, face) = (link.to, link.to_face);
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(arrive, DeliverPacket { node: to, face, pkt });
    }

    /// 上一个包序列化完成
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        if let Some(link) = self.links.get_mut(link_id.0) {
            link.busy = false;
            self.start_tx(link_id, sim);
        }
    }

    pub(crate) fn on_queue_adapt(&mut self, link_id: LinkId, sim: &mut Simulator) -> Option<SimTime> {
        let link = self.links.get_mut(link_id.0)?;
        link.queue.adapt(sim.now());
        link.queue.adapt_interval()
    }

    pub(crate) fn sample_rates(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        for (i, link) in self.links.iter_mut().enumerate() {
            let (packets, bytes) = link.take_sample();
            self.sink.on_rate(RateEvent {
                t_ns: now.0,
                link: LinkId(i),
                from: link.from,
                to: link.to,
                packets,
                bytes,
            });
        }
    }

    pub(crate) fn on_pit_expire(
        &mut self,
        node: NodeId,
        name: &Name,
        generation: u64,
        sim: &mut Simulator,
    ) {
        let Some(fwd) = self.nodes.get_mut(node.0) else {
            return;
        };
        if fwd.on_pit_expire(name, generation).is_some() {
            self.stats.pit_timeouts += 1;
            self.sink.on_pit_timeout(PitTimeoutEvent {
                t_ns: sim.now().0,
                node,
                name: name.to_string(),
            });
        }
    }

    /// 应用发包：在当前时刻交给其所在节点的应用接口
    pub fn app_send(&mut self, app: AppId, pkt: Packet, sim: &mut Simulator) {
        let Some(slot) = self.apps.get(app.0) else {
            return;
        };
        sim.schedule(
            sim.now(),
            DeliverPacket {
                node: slot.node,
                face: slot.face,
                pkt,
            },
        );
    }

    pub(crate) fn trace_delay(&mut self, ev: DelayEvent) {
        self.sink.on_delay(ev);
    }

    /// 暂时把应用取出来执行回调，避免 &mut self 与 &mut app 的重叠借用
    pub(crate) fn with_app<F>(&mut self, id: AppId, f: F)
    where
        F: FnOnce(&mut dyn App, &mut Network),
    {
        let Some(mut app) = self.apps.get_mut(id.0).and_then(|s| s.app.take()) else {
            return;
        };
        f(app.as_mut(), self);
        self.apps[id.0].app = Some(app);
    }
}
