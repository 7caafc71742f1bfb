//! 命名数据转发（NDN）
//!
//! 名字、FIB、PIT、内容缓存、转发策略以及把它们组合起来的转发节点。

mod cs;
mod fib;
mod forwarder;
mod name;
mod pit;
mod strategy;

pub use cs::ContentStore;
pub use fib::{Fib, NextHop};
pub use forwarder::{FaceKind, Forwarder, ForwarderStats, Outgoing};
pub use name::Name;
pub use pit::{InRecord, Pit, PitEntry, PitExpire};
pub use strategy::{BestRoute, InterestContext, Multicast, Strategy, StrategyChoice};
