//! RTT 估计（SRTT/RTTVAR，增益 1/8 与 1/4）

use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct RttEstimator {
    srtt: Option<f64>,
    rttvar: f64,
    samples: u64,
}

impl RttEstimator {
    const ALPHA: f64 = 1.0 / 8.0;
    const BETA: f64 = 1.0 / 4.0;

    pub fn add_sample(&mut self, rtt: SimTime) {
        let r = rtt.0 as f64;
        match self.srtt {
            None => {
                self.srtt = Some(r);
                self.rttvar = r / 2.0;
            }
            Some(srtt) => {
                self.rttvar = (1.0 - Self::BETA) * self.rttvar + Self::BETA * (srtt - r).abs();
                self.srtt = Some((1.0 - Self::ALPHA) * srtt + Self::ALPHA * r);
            }
        }
        self.samples += 1;
    }

    /// 平滑 RTT；尚无样本时为 None
    pub fn srtt(&self) -> Option<SimTime> {
        self.srtt.map(|s| SimTime(s.round() as u64))
    }

    pub fn rttvar(&self) -> SimTime {
        SimTime(self.rttvar.round() as u64)
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
