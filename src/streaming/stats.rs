use serde::Serialize;

/// Stream relay statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub rejected_clients: u64,
    pub frames_relayed: u64,
    pub parts_written: u64,
    pub bytes_sent: u64,
    pub skipped_ticks: u64,
    pub write_failures: u64,
}

impl StreamStats {
    pub fn record_part(&mut self, bytes: u64) {
        self.parts_written += 1;
        self.bytes_sent += bytes;
    }

    /// Fraction of streaming ticks that produced a frame
    pub fn efficiency(&self) -> f64 {
        let total = self.frames_relayed + self.skipped_ticks;
        if total > 0 {
            self.frames_relayed as f64 / total as f64
        } else {
            1.0
        }
    }
}
