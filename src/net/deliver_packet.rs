//! 数据包交付事件
//!
//! 定义网络模拟中的数据包交付事件（到节点接口 / 到本地应用）。

use super::id::{AppId, FaceId, NodeId};
use super::net_world::net_world;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace};

/// 事件：把一个 packet 从某个接口交给节点处理。
#[derive(Debug)]
pub struct DeliverPacket {
    pub node: NodeId,
    pub face: FaceId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, node = ?self.node))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { node, face, pkt } = *self;

        debug!(
            name = %pkt.name,
            kind = ?pkt.kind,
            size_bytes = pkt.size_bytes,
            ecn = ?pkt.ecn,
            ?face,
            now = ?sim.now(),
            "数据包到达节点"
        );

        let w = net_world(world);
        w.net.deliver(node, face, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}

/// 事件：把一个 packet 交给本地应用。
#[derive(Debug)]
pub struct DeliverToApp {
    pub app: AppId,
    pub pkt: Packet,
}

impl Event for DeliverToApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverToApp { app, pkt } = *self;
        let w = net_world(world);
        w.net.with_app(app, |a, net| a.on_packet(pkt, sim, net));
    }
}
