//! 应用层：拥塞控制 consumer 与无状态 producer
//!
//! 应用挂在节点的应用接口上，通过 `Network::app_send` 发包，
//! 通过 `DeliverToApp` 收包，通过 `AppTimer` 接收自己的定时器。

use std::any::Any;
use std::fmt;

use crate::net::{AppId, Network, Packet, net_world};
use crate::sim::{Event, SimTime, Simulator, World};

mod consumer;
mod cubic;
mod producer;
mod rtt;

pub use consumer::{Consumer, ConsumerStats, WindowSample};
pub use cubic::{CubicParams, CubicWindow};
pub use producer::Producer;
pub use rtt::RttEstimator;

/// 应用接口
pub trait App: fmt::Debug + Send {
    /// 启动时刻
    fn start_time(&self) -> SimTime {
        SimTime::ZERO
    }

    fn on_start(&mut self, _sim: &mut Simulator, _net: &mut Network) {}

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);

    fn on_timer(&mut self, _token: u64, _sim: &mut Simulator, _net: &mut Network) {}

    fn as_any(&self) -> &dyn Any;
}

/// 事件：启动应用
#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppStart { app } = *self;
        net_world(world).net.with_app(app, |a, net| a.on_start(sim, net));
    }
}

/// 事件：应用自己的定时器（token 含义由应用定义）
#[derive(Debug)]
pub struct AppTimer {
    pub app: AppId,
    pub token: u64,
}

impl Event for AppTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppTimer { app, token } = *self;
        net_world(world).net.with_app(app, |a, net| a.on_timer(token, sim, net));
    }
}
