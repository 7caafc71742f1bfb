//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如链路、数据包、网络拓扑及其调度事件。

// 子模块声明
mod deliver_packet;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod packet;
mod stats;

// 重新导出公共接口
pub use deliver_packet::{DeliverPacket, DeliverToApp};
pub use id::{AppId, FaceId, LinkId, NodeId};
pub use link::Link;
pub use link_ready::{LinkReady, QueueAdapt, RateSample};
pub use net_world::{NetWorld, net_world};
pub use network::Network;
pub(crate) use network::mix_seed;
pub use packet::{Ecn, Packet, PacketKind};
pub use stats::Stats;
