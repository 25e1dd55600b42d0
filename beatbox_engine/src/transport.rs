/// Clock math and tempo state shared between the controlling thread and the player
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Ticks per quarter note (one tick = one sixteenth step)
pub const TICKS_PER_BEAT: u32 = 4;

// Keeps the clock finite whatever the tempo factor has compounded to
const MIN_BPM: f64 = 1.0;
const MAX_BPM: f64 = 100_000.0;

/// Wall-clock length of one tick
pub fn tick_duration(base_bpm: f64, factor: f64) -> Duration {
    let bpm = base_bpm * factor;
    let bpm = if bpm.is_finite() { bpm.clamp(MIN_BPM, MAX_BPM) } else { MAX_BPM };
    Duration::from_secs_f64(60.0 / bpm / TICKS_PER_BEAT as f64)
}

/// Tempo factor stored as f64 bits so the player thread can read it every
/// tick without locking.
#[derive(Debug, Clone)]
pub struct SharedTempo(Arc<AtomicU64>);

impl SharedTempo {
    pub fn new(factor: f64) -> Self {
        Self(Arc::new(AtomicU64::new(factor.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, factor: f64) {
        self.0.store(factor.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedTempo {
    fn default() -> Self {
        Self::new(1.0)
    }
}
