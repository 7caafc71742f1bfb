//! 链路相关的调度事件：出队驱动、队列周期自适应、速率采样

use super::id::LinkId;
use super::net_world::net_world;
use crate::sim::{Event, SimTime, Simulator, World};

/// 事件：链路完成一次序列化发送后，在 depart 时刻触发，尝试发送队列中的下一个 packet。
#[derive(Debug)]
pub struct LinkReady {
    pub link_id: LinkId,
}

impl Event for LinkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let LinkReady { link_id } = *self;
        net_world(world).net.on_link_ready(link_id, sim);
    }
}

/// 事件：队列的周期性自适应（ARED），在 `until` 之后不再续期
#[derive(Debug)]
pub struct QueueAdapt {
    pub link_id: LinkId,
    pub until: SimTime,
}

impl Event for QueueAdapt {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let QueueAdapt { link_id, until } = *self;
        let Some(interval) = net_world(world).net.on_queue_adapt(link_id, sim) else {
            return;
        };
        let next = sim.now().saturating_add(interval);
        if next <= until {
            sim.schedule(next, QueueAdapt { link_id, until });
        }
    }
}

/// 事件：周期性速率采样，在 `until` 之后不再续期
#[derive(Debug)]
pub struct RateSample {
    pub period: SimTime,
    pub until: SimTime,
}

impl Event for RateSample {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let RateSample { period, until } = *self;
        net_world(world).net.sample_rates(sim);
        let next = sim.now().saturating_add(period);
        if next <= until {
            sim.schedule(next, RateSample { period, until });
        }
    }
}
