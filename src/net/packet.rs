//! 数据包类型
//!
//! 定义 Interest/Data 数据包及其 ECN 状态。

use serde::{Deserialize, Serialize};

use crate::ndn::Name;
use crate::sim::SimTime;

/// ECN 码点（简化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ecn {
    /// 不支持 ECN
    #[default]
    NotEct,
    /// 支持 ECN，未标记
    Ect0,
    /// 拥塞已标记
    Ce,
}

impl Ecn {
    pub fn is_ect(self) -> bool {
        matches!(self, Ecn::Ect0 | Ecn::Ce)
    }

    pub fn is_ce(self) -> bool {
        matches!(self, Ecn::Ce)
    }
}

/// 数据包种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    /// 请求
    Interest,
    /// 响应
    Data,
}

/// 网络数据包
///
/// 按值在组件间传递；多播转发时复制，副本共享 `id`。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub name: Name,
    pub kind: PacketKind,
    pub size_bytes: u32,
    pub ecn: Ecn,
    /// 仅 Interest 有意义：用于环路检测
    pub nonce: u32,
    /// 仅 Interest 有意义：PIT 条目存活时间
    pub lifetime: SimTime,
    pub created_at: SimTime,
}

impl Packet {
    /// 创建 Interest
    pub fn interest(
        id: u64,
        name: Name,
        nonce: u32,
        lifetime: SimTime,
        size_bytes: u32,
        ecn_capable: bool,
        now: SimTime,
    ) -> Self {
        Self {
            id,
            name,
            kind: PacketKind::Interest,
            size_bytes,
            ecn: if ecn_capable { Ecn::Ect0 } else { Ecn::NotEct },
            nonce,
            lifetime,
            created_at: now,
        }
    }

    /// 创建 Data
    pub fn data(id: u64, name: Name, size_bytes: u32, ecn_capable: bool, now: SimTime) -> Self {
        Self {
            id,
            name,
            kind: PacketKind::Data,
            size_bytes,
            ecn: if ecn_capable { Ecn::Ect0 } else { Ecn::NotEct },
            nonce: 0,
            lifetime: SimTime::ZERO,
            created_at: now,
        }
    }

    pub fn is_interest(&self) -> bool {
        self.kind == PacketKind::Interest
    }

    pub fn is_ect(&self) -> bool {
        self.ecn.is_ect()
    }

    pub fn is_ce(&self) -> bool {
        self.ecn.is_ce()
    }

    /// 打上拥塞标记；对不支持 ECN 的包无效果，返回是否成功。
    pub fn mark_ce(&mut self) -> bool {
        if !self.ecn.is_ect() {
            return false;
        }
        self.ecn = Ecn::Ce;
        true
    }

    /// 清除拥塞标记（保留 ECN 能力）
    pub fn clear_ce(&mut self) {
        if self.ecn.is_ce() {
            self.ecn = Ecn::Ect0;
        }
    }
}
