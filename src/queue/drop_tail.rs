//! DropTail（尾丢弃）队列
//!
//! 当队列已满时，直接丢弃新到达的 packet。

use std::any::Any;
use std::collections::VecDeque;

use crate::net::Packet;
use crate::sim::SimTime;

use super::{DropCause, Enqueue, PacketQueue, QueueStats};

#[derive(Debug)]
pub struct DropTailQueue {
    capacity: usize,
    q: VecDeque<Packet>,
    stats: QueueStats,
}

impl DropTailQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            q: VecDeque::new(),
            stats: QueueStats::default(),
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet, _now: SimTime) -> Enqueue {
        if self.q.len() >= self.capacity {
            self.stats.overflow_drops += 1;
            return Enqueue::Dropped {
                pkt,
                cause: DropCause::Overflow,
            };
        }
        self.stats.enqueued += 1;
        self.q.push_back(pkt);
        Enqueue::Queued
    }

    fn dequeue(&mut self, _now: SimTime) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.stats.dequeued += 1;
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> QueueStats {
        self.stats
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
