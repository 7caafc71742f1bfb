//! 链路类型
//!
//! 定义单向网络链路及其传输时延计算。AQM 决定是否入队，链路决定何时发送。

use super::id::{FaceId, NodeId};
use crate::queue::PacketQueue;
use crate::sim::SimTime;

/// 单向网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    /// 包到达 `to` 时所经的接口
    pub to_face: FaceId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 正在序列化一个包
    pub busy: bool,
    /// 链路上的排队策略
    pub queue: Box<dyn PacketQueue>,
    /// 自上次速率采样以来发送的包数/字节数
    pub(crate) sample_pkts: u64,
    pub(crate) sample_bytes: u64,
}

impl Link {
    /// 创建新链路
    pub fn new(
        from: NodeId,
        to: NodeId,
        to_face: FaceId,
        latency: SimTime,
        bandwidth_bps: u64,
        queue: Box<dyn PacketQueue>,
    ) -> Self {
        Self {
            from,
            to,
            to_face,
            latency,
            bandwidth_bps,
            busy: false,
            queue,
            sample_pkts: 0,
            sample_bytes: 0,
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 取出并清零速率采样计数
    pub(crate) fn take_sample(&mut self) -> (u64, u64) {
        let out = (self.sample_pkts, self.sample_bytes);
        self.sample_pkts = 0;
        self.sample_bytes = 0;
        out
    }
}
