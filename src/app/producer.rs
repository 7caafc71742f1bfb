//! 无状态 producer：对前缀下的每个 Interest 回复一个固定大小的 Data

use std::any::Any;

use tracing::{debug, info};

use crate::config::{ConfigError, ProducerConfig};
use crate::ndn::Name;
use crate::net::{AppId, Ecn, Network, Packet};
use crate::sim::Simulator;

use super::App;

#[derive(Debug)]
pub struct Producer {
    id: AppId,
    prefix: Name,
    payload_size: u32,
    ecn_capable: bool,
    served: u64,
}

impl Producer {
    pub fn new(cfg: ProducerConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let prefix = Name::parse(&cfg.prefix)?;
        Ok(Self {
            id: AppId(usize::MAX),
            prefix,
            payload_size: cfg.payload_size,
            ecn_capable: cfg.ecn_capable,
            served: 0,
        })
    }

    /// 安装到网络后由 `Network` 分配 id
    pub(crate) fn attach(&mut self, id: AppId) {
        self.id = id;
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    /// 已回复的 Data 数
    pub fn served(&self) -> u64 {
        self.served
    }
}

impl App for Producer {
    fn on_start(&mut self, _sim: &mut Simulator, _net: &mut Network) {
        info!(app = ?self.id, prefix = %self.prefix, payload = self.payload_size, "producer 启动");
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        if !pkt.is_interest() || !self.prefix.is_prefix_of(&pkt.name) {
            debug!(name = %pkt.name, "producer 忽略");
            return;
        }
        let mut data = Packet::data(
            net.next_packet_id(),
            pkt.name,
            self.payload_size,
            self.ecn_capable,
            sim.now(),
        );
        // Interest 路径上的拥塞标记回显给 consumer
        if pkt.ecn == Ecn::Ce {
            data.ecn = Ecn::Ce;
        }
        self.served += 1;
        net.app_send(self.id, data, sim);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
