//! 组件配置
//!
//! 每个组件一个强类型配置结构，构造时校验，运行期间不再修改。
//! 默认值对应参考场景（consumer -> router -> ARED 瓶颈 -> router -> producer）。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::{FaceId, NodeId};
use crate::sim::SimTime;

/// 构造期配置错误：在仿真时间推进之前返回给调用方。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("queue thresholds must satisfy 0 <= min_th < max_th (got min_th={min_th}, max_th={max_th})")]
    Thresholds { min_th: f64, max_th: f64 },
    #[error("queue capacity must be positive")]
    ZeroCapacity,
    #[error("link bandwidth must be positive")]
    ZeroBandwidth,
    #[error("{param} must be in {range} (got {value})")]
    OutOfRange {
        param: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("{0} must be positive")]
    ZeroDuration(&'static str),
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {node:?} has no face {face:?}")]
    UnknownFace { node: NodeId, face: FaceId },
    #[error("a node cannot be connected to itself ({0:?})")]
    SelfLoop(NodeId),
}

fn check_range(
    param: &'static str,
    range: &'static str,
    value: f64,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            param,
            range,
            value,
        })
    }
}

/// ARED 自适应参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AredConfig {
    /// 调整周期
    pub interval: SimTime,
    /// 加性增长上限（实际增量为 min(alpha, max_p/4)）
    pub alpha: f64,
    /// 乘性减小因子
    pub beta: f64,
    /// max_p 上界
    pub top: f64,
    /// max_p 下界
    pub bottom: f64,
}

impl Default for AredConfig {
    fn default() -> Self {
        Self {
            interval: SimTime::from_millis(500),
            alpha: 0.01,
            beta: 0.9,
            top: 0.5,
            bottom: 0.01,
        }
    }
}

impl AredConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == SimTime::ZERO {
            return Err(ConfigError::ZeroDuration("ared interval"));
        }
        check_range("ared alpha", "(0, 1]", self.alpha, self.alpha > 0.0 && self.alpha <= 1.0)?;
        check_range("ared beta", "(0, 1)", self.beta, self.beta > 0.0 && self.beta < 1.0)?;
        check_range(
            "ared bottom",
            "(0, top]",
            self.bottom,
            self.bottom > 0.0 && self.bottom <= self.top,
        )?;
        check_range("ared top", "(0, 1]", self.top, self.top > 0.0 && self.top <= 1.0)
    }
}

/// RED/ARED + ECN 参数（队列长度与阈值均以包为单位）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedConfig {
    pub capacity: usize,
    pub min_th: f64,
    pub max_th: f64,
    /// EWMA 权重
    pub weight: f64,
    /// 初始最大标记概率
    pub max_p: f64,
    pub gentle: bool,
    pub adaptive: bool,
    pub ecn: bool,
    /// 命中时即使可标记也丢弃
    pub hard_drop: bool,
    /// 平均包长（bytes），用于空闲衰减
    pub mean_pkt_size: u32,
    pub ared: AredConfig,
}

impl Default for RedConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            min_th: 5.0,
            max_th: 15.0,
            weight: 0.002,
            max_p: 0.1,
            gentle: true,
            adaptive: true,
            ecn: true,
            hard_drop: false,
            mean_pkt_size: 1000,
            ared: AredConfig::default(),
        }
    }
}

impl RedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(self.min_th >= 0.0 && self.min_th < self.max_th) {
            return Err(ConfigError::Thresholds {
                min_th: self.min_th,
                max_th: self.max_th,
            });
        }
        check_range("weight", "(0, 1]", self.weight, self.weight > 0.0 && self.weight <= 1.0)?;
        check_range("max_p", "(0, 1]", self.max_p, self.max_p > 0.0 && self.max_p <= 1.0)?;
        check_range(
            "mean_pkt_size",
            "[1, inf)",
            self.mean_pkt_size as f64,
            self.mean_pkt_size > 0,
        )?;
        if self.adaptive {
            self.ared.validate()?;
        }
        Ok(())
    }
}

/// 链路队列规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueConfig {
    DropTail { capacity: usize },
    Red(RedConfig),
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig::DropTail { capacity: 20 }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            QueueConfig::DropTail { capacity } if *capacity == 0 => Err(ConfigError::ZeroCapacity),
            QueueConfig::DropTail { .. } => Ok(()),
            QueueConfig::Red(cfg) => cfg.validate(),
        }
    }
}

/// 点到点链路参数（两个方向各自一个队列实例）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub bandwidth_bps: u64,
    pub latency: SimTime,
    pub queue: QueueConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bandwidth_bps: 10_000_000,
            latency: SimTime::from_millis(10),
            queue: QueueConfig::default(),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bandwidth_bps == 0 {
            return Err(ConfigError::ZeroBandwidth);
        }
        self.queue.validate()
    }
}

/// 转发节点参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// 内容缓存容量（Data 个数）；0 表示关闭
    pub cs_capacity: usize,
}

/// 拥塞控制 consumer 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub prefix: String,
    /// Interest 存活时间（同时作为本地超时）
    pub lifetime: SimTime,
    pub initial_window: f64,
    /// 任何缩减都不会低于此值
    pub min_window: f64,
    pub beta: f64,
    pub cubic_c: f64,
    pub fast_convergence: bool,
    pub react_to_marks: bool,
    pub ecn_capable: bool,
    pub retransmit_on_timeout: bool,
    pub interest_bytes: u32,
    /// 发送的序列号数；None 表示不限
    pub max_seq: Option<u64>,
    pub start: SimTime,
    pub stop: Option<SimTime>,
    pub seed: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            prefix: "/prefix".to_string(),
            lifetime: SimTime::from_secs(2),
            initial_window: 1.0,
            min_window: 1.0,
            beta: 0.7,
            cubic_c: 0.4,
            fast_convergence: true,
            react_to_marks: true,
            ecn_capable: true,
            retransmit_on_timeout: true,
            interest_bytes: 40,
            max_seq: None,
            start: SimTime::ZERO,
            stop: None,
            seed: 1,
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifetime == SimTime::ZERO {
            return Err(ConfigError::ZeroDuration("interest lifetime"));
        }
        check_range(
            "initial_window",
            "[1, inf)",
            self.initial_window,
            self.initial_window >= 1.0 && self.initial_window.is_finite(),
        )?;
        check_range(
            "min_window",
            "(0, initial_window]",
            self.min_window,
            self.min_window > 0.0 && self.min_window <= self.initial_window,
        )?;
        check_range("beta", "(0, 1)", self.beta, self.beta > 0.0 && self.beta < 1.0)?;
        check_range(
            "cubic_c",
            "(0, inf)",
            self.cubic_c,
            self.cubic_c > 0.0 && self.cubic_c.is_finite(),
        )?;
        if matches!(self.stop, Some(stop) if stop <= self.start) {
            return Err(ConfigError::ZeroDuration("consumer active period"));
        }
        Ok(())
    }
}

/// producer 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub prefix: String,
    pub payload_size: u32,
    pub ecn_capable: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            prefix: "/prefix".to_string(),
            payload_size: 1024,
            ecn_capable: true,
        }
    }
}

impl ProducerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "payload_size",
            "(0, inf)",
            self.payload_size as f64,
            self.payload_size > 0,
        )
    }
}

/// 遥测参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// 速率采样周期；0 表示关闭
    pub rate_period: SimTime,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            rate_period: SimTime::from_secs(1),
        }
    }
}
