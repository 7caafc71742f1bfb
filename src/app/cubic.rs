//! CUBIC 风格的请求窗口
//!
//! 窗口以“在途请求数”为单位，取实数。低于 ssthresh 时慢启动（每个未标记 Data +1），
//! 否则按三次函数增长：
//!
//! ```text
//! K = cbrt(W_max * (1 - beta) / C)
//! W(t) = C * (t - K)^3 + W_max
//! cwnd += max(0, W(t) - cwnd) / cwnd
//! ```
//!
//! 其中 t 为距上次缩减的秒数。拥塞标记在一个 RTT 的冷却期内只触发一次缩减；
//! 超时的缩减不弱于标记：`cwnd = max(min(initial, cwnd * beta), min_window)`。

use tracing::debug;

use crate::config::ConsumerConfig;
use crate::sim::SimTime;

/// 快速收敛判定的容差（W_max 需低于上次 W_max 的 99%）
const FAST_CONV_DIFF: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicParams {
    pub initial_window: f64,
    pub min_window: f64,
    pub beta: f64,
    pub c: f64,
    pub fast_convergence: bool,
}

impl From<&ConsumerConfig> for CubicParams {
    fn from(cfg: &ConsumerConfig) -> Self {
        Self {
            initial_window: cfg.initial_window,
            min_window: cfg.min_window,
            beta: cfg.beta,
            c: cfg.cubic_c,
            fast_convergence: cfg.fast_convergence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CubicWindow {
    params: CubicParams,
    cwnd: f64,
    ssthresh: f64,
    /// 拐点（上次缩减前的窗口，可能被快速收敛压低）
    w_max: f64,
    /// 上次缩减前的原始窗口
    last_w_max: f64,
    last_reduction: Option<SimTime>,
}

impl CubicWindow {
    pub fn new(params: CubicParams) -> Self {
        Self {
            params,
            cwnd: params.initial_window,
            ssthresh: f64::INFINITY,
            w_max: 0.0,
            last_w_max: 0.0,
            last_reduction: None,
        }
    }

    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    pub fn w_max(&self) -> f64 {
        self.w_max
    }

    pub fn last_reduction(&self) -> Option<SimTime> {
        self.last_reduction
    }

    /// 允许的在途请求数
    pub fn allowed(&self) -> usize {
        self.cwnd.floor().max(0.0) as usize
    }

    /// 窗口不足一个请求且无在途请求时，冷却期过后恢复到一个请求
    pub fn resume_from_idle(&mut self) {
        if self.cwnd < 1.0 {
            debug!(before = self.cwnd, "窗口不足一个请求，恢复到 1");
            self.cwnd = 1.0;
        }
    }

    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }

    fn in_cooling(&self, now: SimTime, cooling: SimTime) -> bool {
        self.last_reduction
            .is_some_and(|t| now < t.saturating_add(cooling))
    }

    /// 记录新的拐点；若本次缩减发生在窗口回到上一个拐点之前，则进一步压低拐点
    fn record_inflection(&mut self) {
        let p = self.params;
        if p.fast_convergence && self.cwnd < self.last_w_max * (1.0 - FAST_CONV_DIFF) {
            self.last_w_max = self.cwnd;
            self.w_max = self.cwnd * (1.0 + p.beta) / 2.0;
        } else {
            self.last_w_max = self.cwnd;
            self.w_max = self.cwnd;
        }
    }

    /// 未标记的 Data
    pub fn on_ack(&mut self, now: SimTime) {
        if self.in_slow_start() {
            self.cwnd += 1.0;
            return;
        }
        let p = self.params;
        let t = self
            .last_reduction
            .map_or(0.0, |r| now.saturating_sub(r).as_secs_f64());
        let k = (self.w_max * (1.0 - p.beta) / p.c).cbrt();
        let target = p.c * (t - k).powi(3) + self.w_max;
        let inc = (target - self.cwnd).max(0.0);
        self.cwnd += inc / self.cwnd;
    }

    /// 带拥塞标记的 Data；冷却期内忽略。返回是否发生了缩减。
    pub fn on_congestion_mark(&mut self, now: SimTime, cooling: SimTime) -> bool {
        if self.in_cooling(now, cooling) {
            return false;
        }
        let before = self.cwnd;
        self.record_inflection();
        self.ssthresh = (self.cwnd * self.params.beta).max(self.params.min_window);
        self.cwnd = self.ssthresh;
        self.last_reduction = Some(now);
        debug!(before, after = self.cwnd, w_max = self.w_max, "拥塞标记，窗口缩减");
        true
    }

    /// 请求超时：至少按标记的幅度缩减，并且不超过初始窗口，从新的拐点重新增长
    pub fn on_timeout(&mut self, now: SimTime, cooling: SimTime) {
        let before = self.cwnd;
        if !self.in_cooling(now, cooling) {
            self.record_inflection();
            self.ssthresh = (self.cwnd * self.params.beta).max(self.params.min_window);
        }
        self.cwnd = self
            .params
            .initial_window
            .min(self.cwnd * self.params.beta)
            .max(self.params.min_window);
        self.last_reduction = Some(now);
        debug!(before, after = self.cwnd, ssthresh = self.ssthresh, "请求超时，窗口重置");
    }
}
