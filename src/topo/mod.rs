//! 拓扑构建
//!
//! 目前只有参考场景 `simple`：consumer -> router -> ARED 瓶颈 -> router -> producer。

pub mod simple;
