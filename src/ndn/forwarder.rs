//! 转发节点
//!
//! Interest：先查内容缓存，再查/建 PIT 条目，最后由策略选择出接口。
//! Data：按名字找 PIT 条目，向所有等待的下游各发一份副本并删除条目；
//! 找不到条目的 Data 视为未请求，直接丢弃。
//!
//! 转发节点不直接访问链路，只返回 `Outgoing` 列表，由 `Network` 负责发送。

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{ConfigError, ForwarderConfig};
use crate::net::{AppId, FaceId, LinkId, NodeId, Packet};
use crate::sim::Simulator;

use super::cs::ContentStore;
use super::fib::Fib;
use super::name::Name;
use super::pit::{Pit, PitEntry};
use super::strategy::{InterestContext, Strategy, StrategyChoice};

/// 接口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    /// 通往邻居的出链路
    Link(LinkId),
    /// 本地应用
    App(AppId),
}

/// 需要从某个接口发出的包
#[derive(Debug)]
pub struct Outgoing {
    pub face: FaceId,
    pub pkt: Packet,
}

/// 转发统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwarderStats {
    pub interests_in: u64,
    pub data_in: u64,
    pub interests_out: u64,
    pub data_out: u64,
    pub cs_hits: u64,
    pub aggregated: u64,
    pub loops: u64,
    pub unsolicited: u64,
    pub satisfied: u64,
    pub expired: u64,
}

#[derive(Debug)]
pub struct Forwarder {
    id: NodeId,
    name: String,
    faces: Vec<FaceKind>,
    fib: Fib,
    pit: Pit,
    cs: ContentStore,
    strategies: StrategyChoice,
    stats: ForwarderStats,
}

impl Forwarder {
    pub fn new(id: NodeId, name: impl Into<String>, cfg: &ForwarderConfig) -> Self {
        Self {
            id,
            name: name.into(),
            faces: Vec::new(),
            fib: Fib::default(),
            pit: Pit::default(),
            cs: ContentStore::new(cfg.cs_capacity),
            strategies: StrategyChoice::default(),
            stats: ForwarderStats::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn face(&self, face: FaceId) -> Option<FaceKind> {
        self.faces.get(face.0).copied()
    }

    /// 所有接口（下标即 FaceId）
    pub fn faces(&self) -> &[FaceKind] {
        &self.faces
    }

    pub(crate) fn add_face(&mut self, kind: FaceKind) -> FaceId {
        self.faces.push(kind);
        FaceId(self.faces.len() - 1)
    }

    pub fn add_route(&mut self, prefix: Name, face: FaceId, cost: u32) -> Result<(), ConfigError> {
        if self.face(face).is_none() {
            return Err(ConfigError::UnknownFace { node: self.id, face });
        }
        self.fib.add_route(prefix, face, cost);
        Ok(())
    }

    pub fn set_strategy(&mut self, prefix: Name, strategy: Box<dyn Strategy>) {
        self.strategies.set(prefix, strategy);
    }

    pub fn strategy_for(&self, name: &Name) -> &dyn Strategy {
        self.strategies.find(name)
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub fn cs(&self) -> &ContentStore {
        &self.cs
    }

    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }

    /// 处理到达的 Interest
    #[tracing::instrument(skip(self, pkt, sim), fields(node = %self.name, name = %pkt.name, ?in_face))]
    pub fn on_interest(&mut self, in_face: FaceId, pkt: Packet, sim: &mut Simulator) -> Vec<Outgoing> {
        self.stats.interests_in += 1;

        if let Some(data) = self.cs.lookup(&pkt.name) {
            self.stats.cs_hits += 1;
            self.stats.data_out += 1;
            debug!("内容缓存命中");
            return vec![Outgoing { face: in_face, pkt: data }];
        }

        let now = sim.now();
        let expiry = now.saturating_add(pkt.lifetime);
        let (entry, created) = self.pit.insert_or_get(&pkt.name);
        if !created && entry.has_nonce(pkt.nonce) {
            self.stats.loops += 1;
            debug!(nonce = pkt.nonce, "重复 nonce，丢弃");
            return Vec::new();
        }
        if !created {
            self.stats.aggregated += 1;
            debug!(waiting = entry.in_records.len(), "聚合到已有 PIT 条目");
        }
        entry.add_in_record(in_face, pkt.nonce);
        let extend = created || expiry > entry.expiry;

        let next_hops = self.fib.lookup(&pkt.name).map(|(_, h)| h).unwrap_or(&[]);
        let strategy = self.strategies.find(&pkt.name);
        let ctx = InterestContext {
            in_face,
            aggregated: !created,
            next_hops,
            entry: &*entry,
        };
        let out_faces = strategy.after_receive_interest(&ctx);
        trace!(strategy = strategy.name(), ?out_faces, candidates = next_hops.len(), "策略决定");
        entry.out_faces.extend(out_faces.iter().copied());

        if extend {
            self.pit.arm_timer(self.id, &pkt.name, expiry, sim);
        }
        if out_faces.is_empty() && created {
            debug!("无可用下一跳，等待条目到期");
        }

        self.stats.interests_out += out_faces.len() as u64;
        out_faces
            .into_iter()
            .map(|face| Outgoing {
                face,
                pkt: pkt.clone(),
            })
            .collect()
    }

    /// 处理到达的 Data
    #[tracing::instrument(skip(self, pkt, sim), fields(node = %self.name, name = %pkt.name, ?in_face))]
    pub fn on_data(&mut self, in_face: FaceId, pkt: Packet, sim: &mut Simulator) -> Vec<Outgoing> {
        self.stats.data_in += 1;

        let Some(entry) = self.pit.satisfy(&pkt.name, sim) else {
            self.stats.unsolicited += 1;
            debug!("未请求的 Data，丢弃");
            return Vec::new();
        };
        self.stats.satisfied += 1;
        self.cs.insert(pkt.clone());

        let out: Vec<Outgoing> = entry
            .waiting_faces()
            .filter(|f| *f != in_face)
            .map(|face| Outgoing {
                face,
                pkt: pkt.clone(),
            })
            .collect();
        self.stats.data_out += out.len() as u64;
        debug!(downstream = out.len(), "PIT 命中，回送 Data");
        out
    }

    /// PIT 到期；过期的定时器返回 None
    pub fn on_pit_expire(&mut self, name: &Name, generation: u64) -> Option<PitEntry> {
        let entry = self.pit.expire(name, generation)?;
        self.stats.expired += 1;
        debug!(node = %self.name, %name, "PIT 条目到期");
        Some(entry)
    }
}
