//! PIT：待响应请求表
//!
//! 每个名字至多一个条目。条目在 Data 命中或到期时删除。到期定时器由调度器
//! 管理：满足时取消，到期事件执行前再以 `generation` 校验一次有效性。

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::trace;

use crate::net::{FaceId, NetWorld, NodeId, net_world};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

use super::name::Name;

/// 下游等待记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InRecord {
    pub face: FaceId,
    pub nonce: u32,
}

#[derive(Debug, Clone)]
pub struct PitEntry {
    pub name: Name,
    pub in_records: Vec<InRecord>,
    /// 已经转发过的上游接口
    pub out_faces: Vec<FaceId>,
    pub expiry: SimTime,
    pub(crate) generation: u64,
    pub(crate) timer: Option<EventId>,
}

impl PitEntry {
    pub fn has_in_face(&self, face: FaceId) -> bool {
        self.in_records.iter().any(|r| r.face == face)
    }

    pub fn has_out_face(&self, face: FaceId) -> bool {
        self.out_faces.contains(&face)
    }

    pub fn has_nonce(&self, nonce: u32) -> bool {
        self.in_records.iter().any(|r| r.nonce == nonce)
    }

    /// 记录一个下游；同一接口再次到达时只更新 nonce
    pub(crate) fn add_in_record(&mut self, face: FaceId, nonce: u32) {
        match self.in_records.iter_mut().find(|r| r.face == face) {
            Some(r) => r.nonce = nonce,
            None => self.in_records.push(InRecord { face, nonce }),
        }
    }

    /// 等待 Data 的下游接口（按到达顺序）
    pub fn waiting_faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.in_records.iter().map(|r| r.face)
    }
}

#[derive(Debug, Default)]
pub struct Pit {
    entries: HashMap<Name, PitEntry>,
    next_generation: u64,
}

impl Pit {
    pub fn get(&self, name: &Name) -> Option<&PitEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 取得或创建条目；返回 (条目, 是否新建)
    pub(crate) fn insert_or_get(&mut self, name: &Name) -> (&mut PitEntry, bool) {
        match self.entries.entry(name.clone()) {
            Entry::Occupied(o) => (o.into_mut(), false),
            Entry::Vacant(v) => {
                let entry = v.insert(PitEntry {
                    name: name.clone(),
                    in_records: Vec::new(),
                    out_faces: Vec::new(),
                    expiry: SimTime::ZERO,
                    generation: 0,
                    timer: None,
                });
                (entry, true)
            }
        }
    }

    /// 把条目的到期时间设为 `expiry`，替换旧定时器
    pub(crate) fn arm_timer(
        &mut self,
        node: NodeId,
        name: &Name,
        expiry: SimTime,
        sim: &mut Simulator,
    ) {
        self.next_generation = self.next_generation.wrapping_add(1);
        let generation = self.next_generation;
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        if let Some(old) = entry.timer.take() {
            sim.cancel(old);
        }
        entry.expiry = expiry;
        entry.generation = generation;
        entry.timer = Some(sim.schedule(
            expiry,
            PitExpire {
                node,
                name: name.clone(),
                generation,
            },
        ));
        trace!(%name, ?expiry, generation, "PIT 定时器");
    }

    /// Data 命中：删除条目并取消其定时器
    pub(crate) fn satisfy(&mut self, name: &Name, sim: &mut Simulator) -> Option<PitEntry> {
        let mut entry = self.entries.remove(name)?;
        if let Some(t) = entry.timer.take() {
            sim.cancel(t);
        }
        Some(entry)
    }

    /// 到期：仅当 generation 与当前条目一致时删除
    pub(crate) fn expire(&mut self, name: &Name, generation: u64) -> Option<PitEntry> {
        match self.entries.get(name) {
            Some(e) if e.generation == generation => self.entries.remove(name),
            _ => None,
        }
    }
}

/// 事件：PIT 条目到期
#[derive(Debug)]
pub struct PitExpire {
    pub node: NodeId,
    pub name: Name,
    pub generation: u64,
}

impl Event for PitExpire {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let PitExpire {
            node,
            name,
            generation,
        } = *self;
        let w: &mut NetWorld = net_world(world);
        w.net.on_pit_expire(node, &name, generation, sim);
    }
}
