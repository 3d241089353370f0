use serde::Serialize;

/// Counters for photo capture activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub captures: u64,
    pub cooldown_rejections: u64,
    pub failures: u64,
    pub flushed_frames: u64,
    pub evictions: u64,
}

impl CaptureStats {
    /// Fraction of attempted captures (past the cooldown) that succeeded
    pub fn success_rate(&self) -> f64 {
        let attempts = self.captures + self.failures;
        if attempts > 0 {
            self.captures as f64 / attempts as f64
        } else {
            1.0
        }
    }
}
