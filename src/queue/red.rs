//! RED / Adaptive RED 队列（支持 ECN）
//!
//! 每个到达的包：
//! 1. 队列已满：无条件丢弃（overflow）。
//! 2. 用 EWMA 更新平均队长 `avg`；若队列此前空闲，先按空闲时长把 `avg` 向 0 衰减。
//! 3. 由 `avg` 计算概率：低于 `min_th` 为 0；`min_th..=max_th` 线性增长到 `max_p`；
//!    高于 `max_th` 为 1（gentle 模式下从 `max_p` 线性增长到 `2*max_th` 处的 1）。
//! 4. 线性区间内用 `count` 补偿：`p = p_b / (1 - count * p_b)`，避免标记扎堆。
//! 5. 命中时：支持 ECN 的包打标记入队，否则丢弃；开启 hard drop 时总是丢弃。
//!
//! 空队列的到达只在线性区间内豁免；强制区间不看瞬时队长。
//!
//! ARED 的 `max_p` 调整由独立的周期事件驱动（见 `adapt`），不依赖包到达。

use std::any::Any;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::config::{ConfigError, RedConfig};
use crate::net::Packet;
use crate::sim::SimTime;

use super::{DropCause, Enqueue, PacketQueue, QueueStats};

/// 单个包的 AQM 判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 直接入队
    Admit,
    /// 概率命中（标记或丢弃）
    Early,
    /// p = 1 的强制区间
    Forced,
}

#[derive(Debug)]
pub struct RedQueue {
    cfg: RedConfig,
    /// 链路每秒可发送的平均包数，用于空闲衰减
    pkts_per_sec: f64,
    q: VecDeque<Packet>,
    avg: f64,
    max_p: f64,
    /// 自上次标记/丢弃以来落在概率区间的包数
    count: u32,
    idle_since: Option<SimTime>,
    /// 本调整周期内观察到的 avg 最小/最大值
    interval_low: f64,
    interval_high: f64,
    rng: StdRng,
    stats: QueueStats,
}

impl RedQueue {
    pub fn new(cfg: RedConfig, bandwidth_bps: u64, seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        if bandwidth_bps == 0 {
            return Err(ConfigError::ZeroBandwidth);
        }
        let pkts_per_sec = bandwidth_bps as f64 / (8.0 * cfg.mean_pkt_size as f64);
        let max_p = cfg.max_p;
        Ok(Self {
            cfg,
            pkts_per_sec,
            q: VecDeque::new(),
            avg: 0.0,
            max_p,
            count: 0,
            idle_since: Some(SimTime::ZERO),
            interval_low: 0.0,
            interval_high: 0.0,
            rng: StdRng::seed_from_u64(seed),
            stats: QueueStats::default(),
        })
    }

    pub fn config(&self) -> &RedConfig {
        &self.cfg
    }

    /// 当前平均队长
    pub fn avg(&self) -> f64 {
        self.avg
    }

    /// 当前（可能已被 ARED 调整过的）最大标记概率
    pub fn max_p(&self) -> f64 {
        self.max_p
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// 由平均队长得到的基础概率（未做 count 补偿）
    pub fn probability(&self, avg: f64) -> f64 {
        let RedConfig {
            min_th,
            max_th,
            gentle,
            ..
        } = self.cfg;
        if avg < min_th {
            0.0
        } else if avg <= max_th {
            self.max_p * (avg - min_th) / (max_th - min_th)
        } else if gentle {
            (self.max_p + (1.0 - self.max_p) * (avg - max_th) / max_th).min(1.0)
        } else {
            1.0
        }
    }

    /// count 补偿后的概率
    fn compensated(p_b: f64, count: u32) -> f64 {
        let k = count as f64 * p_b;
        if k >= 1.0 { 1.0 } else { (p_b / (1.0 - k)).min(1.0) }
    }

    fn update_avg(&mut self, now: SimTime) {
        // 空闲期间按“本可发送的包数” m 做衰减：avg *= (1-w)^m
        let m = match self.idle_since.take() {
            Some(since) => (now.saturating_sub(since).as_secs_f64() * self.pkts_per_sec).floor(),
            None => 0.0,
        };
        let w = self.cfg.weight;
        let queued = self.q.len() as f64;
        self.avg = self.avg * (1.0 - w).powf(m + 1.0) + w * queued;
        self.interval_low = self.interval_low.min(self.avg);
        self.interval_high = self.interval_high.max(self.avg);
        trace!(avg = self.avg, queued, idle_pkts = m, "更新平均队长");
    }

    /// 给定平均队长与当前队长，作出判定并维护 `count`。
    pub(crate) fn verdict_at(&mut self, avg: f64, queued: usize) -> Verdict {
        if avg < self.cfg.min_th {
            self.count = 0;
            return Verdict::Admit;
        }
        let p_b = self.probability(avg);
        if p_b >= 1.0 {
            self.count = 0;
            return Verdict::Forced;
        }
        // 概率区间内，空队列的到达总是接纳
        if queued == 0 {
            self.count = 0;
            return Verdict::Admit;
        }
        let p = Self::compensated(p_b, self.count);
        let u: f64 = self.rng.r#gen();
        if u < p {
            self.count = 0;
            Verdict::Early
        } else {
            self.count = self.count.saturating_add(1);
            Verdict::Admit
        }
    }
}

impl PacketQueue for RedQueue {
    #[tracing::instrument(skip(self, pkt), fields(pkt_id = pkt.id, name = %pkt.name, q_len = self.q.len()))]
    fn enqueue(&mut self, mut pkt: Packet, now: SimTime) -> Enqueue {
        if self.q.len() >= self.cfg.capacity {
            self.stats.overflow_drops += 1;
            debug!("队列已满，丢弃");
            return Enqueue::Dropped {
                pkt,
                cause: DropCause::Overflow,
            };
        }

        self.update_avg(now);
        let verdict = self.verdict_at(self.avg, self.q.len());
        let can_mark = self.cfg.ecn && pkt.is_ect();
        let mark = match verdict {
            Verdict::Admit => false,
            Verdict::Early if can_mark && !self.cfg.hard_drop => true,
            Verdict::Forced if can_mark && !self.cfg.hard_drop => true,
            Verdict::Early => {
                self.stats.early_drops += 1;
                debug!(avg = self.avg, "概率丢弃");
                return Enqueue::Dropped {
                    pkt,
                    cause: DropCause::Probabilistic,
                };
            }
            Verdict::Forced => {
                self.stats.forced_drops += 1;
                debug!(avg = self.avg, "强制丢弃");
                return Enqueue::Dropped {
                    pkt,
                    cause: DropCause::Probabilistic,
                };
            }
        };

        self.stats.enqueued += 1;
        if mark {
            pkt.mark_ce();
            self.stats.marked += 1;
            debug!(avg = self.avg, ?verdict, "ECN 标记");
        }
        self.q.push_back(pkt);
        if mark { Enqueue::Marked } else { Enqueue::Queued }
    }

    fn dequeue(&mut self, now: SimTime) -> Option<Packet> {
        match self.q.pop_front() {
            Some(pkt) => {
                self.stats.dequeued += 1;
                Some(pkt)
            }
            None => {
                if self.idle_since.is_none() {
                    self.idle_since = Some(now);
                }
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn capacity(&self) -> usize {
        self.cfg.capacity
    }

    fn stats(&self) -> QueueStats {
        self.stats
    }

    fn adapt_interval(&self) -> Option<SimTime> {
        self.cfg.adaptive.then_some(self.cfg.ared.interval)
    }

    fn adapt(&mut self, now: SimTime) {
        if !self.cfg.adaptive {
            return;
        }
        let ared = &self.cfg.ared;
        let before = self.max_p;
        if self.interval_low > self.cfg.max_th && self.max_p < ared.top {
            let step = ared.alpha.min(self.max_p / 4.0);
            self.max_p = (self.max_p + step).min(ared.top);
        } else if self.interval_high < self.cfg.min_th && self.max_p > ared.bottom {
            self.max_p = (self.max_p * ared.beta).max(ared.bottom);
        }
        if self.max_p != before {
            debug!(now = ?now, avg = self.avg, before, after = self.max_p, "ARED 调整 max_p");
        }
        self.interval_low = self.avg;
        self.interval_high = self.avg;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
