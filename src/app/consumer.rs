//! 窗口拥塞控制的 consumer
//!
//! 依次请求 `/<prefix>/<seq>`，任意时刻在途请求数不超过 `floor(cwnd)`；
//! 只要窗口允许就立即发下一个（超时的序列号优先重传）。
//!
//! - 带 CE 标记的 Data：每个冷却期（一个 SRTT）最多缩减一次窗口。
//! - 未标记的 Data：慢启动或 CUBIC 增长。
//! - 超时（lifetime 到期仍无 Data）：视为严重拥塞，窗口按 beta 缩减且不超过初始值。
//!
//! 重复或未请求的 Data 被忽略；停止时刻之后忽略一切输入。
//!
//! 窗口被压到 1 以下且没有在途请求时，等一个冷却期后把窗口恢复到 1 再继续发送。

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, ConsumerConfig};
use crate::ndn::Name;
use crate::net::{AppId, Network, Packet, mix_seed};
use crate::sim::{EventId, SimTime, Simulator};
use crate::trace::DelayEvent;

use super::cubic::{CubicParams, CubicWindow};
use super::rtt::RttEstimator;
use super::{App, AppTimer};

/// 恢复定时器的 token；序列号不会用到
const RESUME_TOKEN: u64 = u64::MAX;

/// consumer 计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub sent: u64,
    pub retransmitted: u64,
    pub received: u64,
    pub marked: u64,
    pub timeouts: u64,
    pub reductions: u64,
    pub ignored: u64,
}

/// 窗口采样（用于离线绘图）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSample {
    pub t_ns: u64,
    pub cwnd: f64,
    pub ssthresh: f64,
    pub in_flight: usize,
}

/// 在途请求
#[derive(Debug, Clone, Copy)]
struct Outstanding {
    first_sent: SimTime,
    last_sent: SimTime,
    deadline: SimTime,
    retx: u32,
    timer: EventId,
}

#[derive(Debug)]
pub struct Consumer {
    id: AppId,
    cfg: ConsumerConfig,
    prefix: Name,
    window: CubicWindow,
    rtt: RttEstimator,
    next_seq: u64,
    retx_queue: BTreeSet<u64>,
    /// 重传次数，跨超时保留
    retx_counts: BTreeMap<u64, (SimTime, u32)>,
    pending: BTreeMap<u64, Outstanding>,
    resume: Option<EventId>,
    rng: StdRng,
    started: bool,
    stats: ConsumerStats,
    samples: Vec<WindowSample>,
}

impl Consumer {
    pub fn new(id: AppId, cfg: ConsumerConfig, net_seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let prefix = Name::parse(&cfg.prefix)?;
        let window = CubicWindow::new(CubicParams::from(&cfg));
        let rng = StdRng::seed_from_u64(mix_seed(net_seed ^ cfg.seed, id.0 as u64));
        Ok(Self {
            id,
            cfg,
            prefix,
            window,
            rtt: RttEstimator::default(),
            next_seq: 0,
            retx_queue: BTreeSet::new(),
            retx_counts: BTreeMap::new(),
            pending: BTreeMap::new(),
            resume: None,
            rng,
            started: false,
            stats: ConsumerStats::default(),
            samples: Vec::new(),
        })
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.cfg
    }

    pub fn window(&self) -> &CubicWindow {
        &self.window
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// 已分配的下一个新序列号
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn window_samples(&self) -> &[WindowSample] {
        &self.samples
    }

    fn is_active(&self, now: SimTime) -> bool {
        self.started && self.cfg.stop.is_none_or(|stop| now < stop)
    }

    fn cooling(&self) -> SimTime {
        self.rtt.srtt().unwrap_or(SimTime::ZERO)
    }

    fn record_window(&mut self, now: SimTime) {
        self.samples.push(WindowSample {
            t_ns: now.0,
            cwnd: self.window.cwnd(),
            ssthresh: self.window.ssthresh(),
            in_flight: self.pending.len(),
        });
    }

    fn has_more(&self) -> bool {
        !self.retx_queue.is_empty() || self.cfg.max_seq.is_none_or(|max| self.next_seq < max)
    }

    fn next_to_send(&mut self) -> Option<u64> {
        if let Some(seq) = self.retx_queue.pop_first() {
            return Some(seq);
        }
        if self.cfg.max_seq.is_some_and(|max| self.next_seq >= max) {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Some(seq)
    }

    /// 在窗口允许的范围内尽量发送
    fn send_pending(&mut self, sim: &mut Simulator, net: &mut Network) {
        if !self.is_active(sim.now()) {
            return;
        }
        while self.pending.len() < self.window.allowed() {
            let Some(seq) = self.next_to_send() else {
                break;
            };
            self.send_interest(seq, sim, net);
        }
        if self.pending.is_empty()
            && self.window.allowed() == 0
            && self.resume.is_none()
            && self.has_more()
        {
            let at = sim.now().saturating_add(self.cooling());
            debug!(cwnd = self.window.cwnd(), at = ?at, "窗口不足一个请求，等待恢复");
            self.resume = Some(sim.schedule(at, AppTimer { app: self.id, token: RESUME_TOKEN }));
        }
    }

    fn on_resume(&mut self, sim: &mut Simulator, net: &mut Network) {
        self.resume = None;
        if !self.is_active(sim.now()) || !self.pending.is_empty() {
            return;
        }
        self.window.resume_from_idle();
        self.record_window(sim.now());
        self.send_pending(sim, net);
    }

    fn send_interest(&mut self, seq: u64, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        let name = self.prefix.with_seq(seq);
        let nonce: u32 = self.rng.r#gen();
        let pkt = Packet::interest(
            net.next_packet_id(),
            name,
            nonce,
            self.cfg.lifetime,
            self.cfg.interest_bytes,
            self.cfg.ecn_capable,
            now,
        );
        let deadline = now.saturating_add(self.cfg.lifetime);
        let timer = sim.schedule(deadline, AppTimer { app: self.id, token: seq });

        let (first_sent, retx) = match self.retx_counts.remove(&seq) {
            Some((first, n)) => {
                self.stats.retransmitted += 1;
                (first, n + 1)
            }
            None => (now, 0),
        };
        self.pending.insert(
            seq,
            Outstanding {
                first_sent,
                last_sent: now,
                deadline,
                retx,
                timer,
            },
        );
        self.stats.sent += 1;
        trace!(seq, retx, in_flight = self.pending.len(), cwnd = self.window.cwnd(), "发送 Interest");
        net.app_send(self.id, pkt, sim);
    }
}

impl App for Consumer {
    fn start_time(&self) -> SimTime {
        self.cfg.start
    }

    fn on_start(&mut self, sim: &mut Simulator, net: &mut Network) {
        info!(app = ?self.id, prefix = %self.prefix, "consumer 启动");
        self.started = true;
        self.record_window(sim.now());
        self.send_pending(sim, net);
    }

    #[tracing::instrument(skip(self, pkt, sim, net), fields(app = ?self.id, name = %pkt.name))]
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        if !self.is_active(now) || pkt.is_interest() {
            self.stats.ignored += 1;
            return;
        }
        let Some(seq) = pkt.name.seq().filter(|_| self.prefix.is_prefix_of(&pkt.name)) else {
            self.stats.ignored += 1;
            return;
        };
        let Some(o) = self.pending.remove(&seq) else {
            self.stats.ignored += 1;
            debug!(seq, "重复或未请求的 Data");
            return;
        };
        sim.cancel(o.timer);

        let last_delay = now.saturating_sub(o.last_sent);
        if o.retx == 0 {
            self.rtt.add_sample(last_delay);
        }
        net.trace_delay(DelayEvent {
            t_ns: now.0,
            name: pkt.name.to_string(),
            last_delay_ns: last_delay.0,
            full_delay_ns: now.saturating_sub(o.first_sent).0,
            retx_count: o.retx,
        });
        self.stats.received += 1;

        if pkt.is_ce() && self.cfg.react_to_marks {
            self.stats.marked += 1;
            if self.window.on_congestion_mark(now, self.cooling()) {
                self.stats.reductions += 1;
            }
        } else {
            self.window.on_ack(now);
        }
        self.record_window(now);
        self.send_pending(sim, net);
    }

    fn on_timer(&mut self, seq: u64, sim: &mut Simulator, net: &mut Network) {
        if seq == RESUME_TOKEN {
            self.on_resume(sim, net);
            return;
        }
        let now = sim.now();
        if !self.is_active(now) {
            return;
        }
        // 定时器可能已被新的发送取代
        match self.pending.get(&seq) {
            Some(o) if o.deadline <= now => {}
            _ => return,
        }
        let Some(o) = self.pending.remove(&seq) else {
            return;
        };
        self.stats.timeouts += 1;
        debug!(seq, retx = o.retx, "请求超时");
        if self.cfg.retransmit_on_timeout {
            self.retx_counts.insert(seq, (o.first_sent, o.retx));
            self.retx_queue.insert(seq);
        }
        self.window.on_timeout(now, self.cooling());
        self.stats.reductions += 1;
        self.record_window(now);
        self.send_pending(sim, net);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
