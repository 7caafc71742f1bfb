use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::net::{LinkId, NodeId};
use crate::queue::DropCause;

/// 速率采样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub link: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub packets: u64,
    pub bytes: u64,
}

/// 丢包
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub t_ns: u64,
    pub link: LinkId,
    pub pkt_id: u64,
    pub name: String,
    pub cause: DropCause,
}

/// 一次请求的完成时延
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayEvent {
    pub t_ns: u64,
    pub name: String,
    /// 从最后一次发送算起
    pub last_delay_ns: u64,
    /// 从第一次发送算起（含重传）
    pub full_delay_ns: u64,
    pub retx_count: u32,
}

/// PIT 条目未被满足即到期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitTimeoutEvent {
    pub t_ns: u64,
    pub node: NodeId,
    pub name: String,
}

/// 遥测观察者（对核心而言只写）
pub trait TraceSink {
    fn on_rate(&mut self, ev: RateEvent);
    fn on_drop(&mut self, ev: DropEvent);
    fn on_delay(&mut self, ev: DelayEvent);
    fn on_pit_timeout(&mut self, _ev: PitTimeoutEvent) {}

    fn as_any(&self) -> &dyn Any;
}

/// 丢弃所有记录
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn on_rate(&mut self, _ev: RateEvent) {}
    fn on_drop(&mut self, _ev: DropEvent) {}
    fn on_delay(&mut self, _ev: DelayEvent) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 一个简单的记录收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecorder {
    pub rates: Vec<RateEvent>,
    pub drops: Vec<DropEvent>,
    pub delays: Vec<DelayEvent>,
    pub pit_timeouts: Vec<PitTimeoutEvent>,
}

impl TraceSink for TraceRecorder {
    fn on_rate(&mut self, ev: RateEvent) {
        self.rates.push(ev);
    }

    fn on_drop(&mut self, ev: DropEvent) {
        self.drops.push(ev);
    }

    fn on_delay(&mut self, ev: DelayEvent) {
        self.delays.push(ev);
    }

    fn on_pit_timeout(&mut self, ev: PitTimeoutEvent) {
        self.pit_timeouts.push(ev);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
