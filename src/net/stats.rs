//! 统计信息
//!
//! 定义网络仿真统计数据结构。

use serde::Serialize;

/// 网络统计信息（链路层）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub transmitted_pkts: u64,
    pub transmitted_bytes: u64,
    pub marked_pkts: u64,
    pub dropped_pkts: u64,
    pub pit_timeouts: u64,
}
