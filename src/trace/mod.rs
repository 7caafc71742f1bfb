//! 遥测记录
//!
//! 核心只通过 `TraceSink` 观察者输出纯记录，格式化/落盘由观察者自行负责：
//! - **速率**：每条链路在采样周期内发送的包数/字节数
//! - **丢包**：链路、包、原因
//! - **时延**：每个 Data 的端到端完成时延
//! - **PIT 超时**（可选）：节点、名字

mod types;

pub use types::{DelayEvent, DropEvent, NullSink, PitTimeoutEvent, RateEvent, TraceRecorder, TraceSink};
