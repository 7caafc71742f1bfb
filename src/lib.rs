pub mod app;
pub mod config;
pub mod ndn;
pub mod net;
pub mod queue;
pub mod sim;
pub mod topo;
pub mod trace;

#[cfg(test)]
mod test;
