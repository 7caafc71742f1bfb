//! 转发策略
//!
//! 策略只决定一个 Interest 该从哪些接口转发出去；PIT/FIB 的维护由转发节点负责。
//! 每个节点按名字前缀（最长匹配）选择策略。

use std::collections::HashMap;
use std::fmt;

use crate::net::FaceId;

use super::fib::NextHop;
use super::name::Name;
use super::pit::PitEntry;

/// 策略可见的 Interest 上下文
#[derive(Debug, Clone, Copy)]
pub struct InterestContext<'a> {
    pub in_face: FaceId,
    /// PIT 条目此前已存在（Interest 被聚合）
    pub aggregated: bool,
    pub next_hops: &'a [NextHop],
    pub entry: &'a PitEntry,
}

impl InterestContext<'_> {
    /// 可用的下一跳：不是入接口、不是正在等待的下游、也没有为此条目用过
    pub fn is_eligible(&self, hop: &NextHop) -> bool {
        hop.face != self.in_face
            && !self.entry.has_in_face(hop.face)
            && !self.entry.has_out_face(hop.face)
    }

    pub fn eligible(&self) -> impl Iterator<Item = &NextHop> + '_ {
        self.next_hops.iter().filter(|h| self.is_eligible(h))
    }
}

/// 转发策略能力接口
pub trait Strategy: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// 返回应当转发出去的接口列表（可为空）
    fn after_receive_interest(&self, ctx: &InterestContext<'_>) -> Vec<FaceId>;
}

/// 多播：转发到所有尚未使用的候选接口，即使 Interest 被聚合
#[derive(Debug, Default, Clone, Copy)]
pub struct Multicast;

impl Strategy for Multicast {
    fn name(&self) -> &'static str {
        "multicast"
    }

    fn after_receive_interest(&self, ctx: &InterestContext<'_>) -> Vec<FaceId> {
        ctx.eligible().map(|h| h.face).collect()
    }
}

/// 最佳路由：只用代价最低的可用接口；聚合的 Interest 不再转发
#[derive(Debug, Default, Clone, Copy)]
pub struct BestRoute;

impl Strategy for BestRoute {
    fn name(&self) -> &'static str {
        "best-route"
    }

    fn after_receive_interest(&self, ctx: &InterestContext<'_>) -> Vec<FaceId> {
        if ctx.aggregated {
            return Vec::new();
        }
        // next_hops 已按 cost 排序
        ctx.eligible().map(|h| h.face).take(1).collect()
    }
}

/// 策略选择表：名字前缀 -> 策略（最长前缀匹配），根 `/` 默认为 best-route
#[derive(Debug)]
pub struct StrategyChoice {
    table: HashMap<Name, Box<dyn Strategy>>,
}

impl Default for StrategyChoice {
    fn default() -> Self {
        let mut table: HashMap<Name, Box<dyn Strategy>> = HashMap::new();
        table.insert(Name::root(), Box::new(BestRoute));
        Self { table }
    }
}

impl StrategyChoice {
    pub fn set(&mut self, prefix: Name, strategy: Box<dyn Strategy>) {
        self.table.insert(prefix, strategy);
    }

    pub fn find(&self, name: &Name) -> &dyn Strategy {
        (0..=name.len())
            .rev()
            .find_map(|len| self.table.get(&name.prefix(len)))
            .map(|s| s.as_ref())
            .unwrap_or(&BestRoute)
    }
}
