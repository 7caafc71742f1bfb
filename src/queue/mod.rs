//! 队列策略（Queue disciplines）
//!
//! 提供 DropTail（尾丢弃）与 RED/ARED + ECN 两种策略。队列长度以包为单位。

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, QueueConfig};
use crate::net::Packet;
use crate::sim::SimTime;

mod drop_tail;
mod red;

pub use drop_tail::DropTailQueue;
pub use red::{RedQueue, Verdict};

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropCause {
    /// 队列已满
    Overflow,
    /// AQM 按概率（含 p=1 的强制区间）决定丢弃
    Probabilistic,
}

/// 入队结果
#[derive(Debug)]
pub enum Enqueue {
    /// 未标记入队
    Queued,
    /// 打上 CE 标记后入队
    Marked,
    /// 被丢弃（返还数据包供上报）
    Dropped { pkt: Packet, cause: DropCause },
}

/// 队列统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub marked: u64,
    pub early_drops: u64,
    pub forced_drops: u64,
    pub overflow_drops: u64,
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：由队列策略决定接纳/标记/丢弃
    fn enqueue(&mut self, pkt: Packet, now: SimTime) -> Enqueue;
    /// 出队：按队列策略返回下一个 packet；队列空时链路进入空闲
    fn dequeue(&mut self, now: SimTime) -> Option<Packet>;

    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn stats(&self) -> QueueStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 周期性自适应的间隔；None 表示不需要
    fn adapt_interval(&self) -> Option<SimTime> {
        None
    }

    /// 周期性自适应（与包到达无关）
    fn adapt(&mut self, _now: SimTime) {}

    fn as_any(&self) -> &dyn Any;
}

/// 按配置构造队列；`seed` 只用于需要随机数的策略
pub fn build_queue(
    cfg: &QueueConfig,
    bandwidth_bps: u64,
    seed: u64,
) -> Result<Box<dyn PacketQueue>, ConfigError> {
    cfg.validate()?;
    Ok(match cfg {
        QueueConfig::DropTail { capacity } => Box::new(DropTailQueue::new(*capacity)),
        QueueConfig::Red(red) => Box::new(RedQueue::new(red.clone(), bandwidth_bps, seed)?),
    })
}
