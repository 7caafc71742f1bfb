//! FIB：名字前缀 -> 下一跳（最长前缀匹配）

use std::collections::HashMap;

use crate::net::FaceId;

use super::name::Name;

/// 下一跳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub face: FaceId,
    pub cost: u32,
}

#[derive(Debug, Default, Clone)]
pub struct Fib {
    entries: HashMap<Name, Vec<NextHop>>,
}

impl Fib {
    /// 添加或更新一条路由；下一跳按 (cost, face) 排序
    pub fn add_route(&mut self, prefix: Name, face: FaceId, cost: u32) {
        let hops = self.entries.entry(prefix).or_default();
        match hops.iter_mut().find(|h| h.face == face) {
            Some(h) => h.cost = cost,
            None => hops.push(NextHop { face, cost }),
        }
        hops.sort_by_key(|h| (h.cost, h.face));
    }

    /// 最长前缀匹配
    pub fn lookup(&self, name: &Name) -> Option<(&Name, &[NextHop])> {
        (0..=name.len()).rev().find_map(|len| {
            self.entries
                .get_key_value(&name.prefix(len))
                .map(|(k, v)| (k, v.as_slice()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
