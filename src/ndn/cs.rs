//! 内容缓存（LRU）
//!
//! 以精确名字缓存 Data；容量为 0 时完全关闭。

use std::collections::{BTreeMap, HashMap};

use crate::net::Packet;

use super::name::Name;

#[derive(Debug, Default)]
pub struct ContentStore {
    capacity: usize,
    tick: u64,
    /// name -> (最近使用 tick, Data)
    items: HashMap<Name, (u64, Packet)>,
    /// 最近使用 tick -> name，最小者最先淘汰
    lru: BTreeMap<u64, Name>,
}

impl ContentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn touch(&mut self, name: &Name) {
        self.tick += 1;
        if let Some((t, _)) = self.items.get_mut(name) {
            self.lru.remove(t);
            *t = self.tick;
            self.lru.insert(self.tick, name.clone());
        }
    }

    /// 查找并刷新 LRU 位置；返回去掉拥塞标记的副本
    pub fn lookup(&mut self, name: &Name) -> Option<Packet> {
        if !self.items.contains_key(name) {
            return None;
        }
        self.touch(name);
        let mut pkt = self.items.get(name)?.1.clone();
        pkt.clear_ce();
        Some(pkt)
    }

    pub fn insert(&mut self, pkt: Packet) {
        if self.capacity == 0 {
            return;
        }
        let name = pkt.name.clone();
        if let Some(slot) = self.items.get_mut(&name) {
            slot.1 = pkt;
            self.touch(&name);
            return;
        }
        while self.items.len() >= self.capacity {
            let Some((_, victim)) = self.lru.pop_first() else {
                break;
            };
            self.items.remove(&victim);
        }
        self.tick += 1;
        self.lru.insert(self.tick, name.clone());
        self.items.insert(name, (self.tick, pkt));
    }
}
