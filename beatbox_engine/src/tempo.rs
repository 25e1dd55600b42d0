use beatbox_shared::TempoConfig;

/// Multiplicative tempo on top of a fixed base BPM.
///
/// No clamping: repeated steps compound.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoController {
    base_bpm: f64,
    factor: f64,
    step_up: f64,
    step_down: f64,
}

impl TempoController {
    pub fn new(base_bpm: f64) -> Self {
        Self::from_config(&TempoConfig {
            base_bpm,
            ..Default::default()
        })
    }

    pub fn from_config(config: &TempoConfig) -> Self {
        Self {
            base_bpm: config.base_bpm,
            factor: 1.0,
            step_up: config.step_up,
            step_down: config.step_down,
        }
    }

    pub fn adjust(&mut self, multiplier: f64) {
        self.factor *= multiplier;
    }

    pub fn tempo_up(&mut self) {
        self.adjust(self.step_up);
    }

    pub fn tempo_down(&mut self) {
        self.adjust(self.step_down);
    }

    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn base_bpm(&self) -> f64 {
        self.base_bpm
    }

    pub fn current_bpm(&self) -> f64 {
        self.base_bpm * self.factor
    }
}

impl Default for TempoController {
    fn default() -> Self {
        Self::from_config(&TempoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_three_clicks_up() {
        let mut tempo = TempoController::new(120.0);
        for _ in 0..3 {
            tempo.adjust(1.03);
        }
        assert!(approx_eq!(f64, tempo.current_bpm(), 120.0 * 1.03f64.powi(3), epsilon = 1e-9));
        assert!(approx_eq!(f64, tempo.current_bpm(), 131.127, epsilon = 0.001));
    }

    #[test]
    fn test_steps_and_reset() {
        let mut tempo = TempoController::default();
        tempo.tempo_up();
        tempo.tempo_down();
        assert!(approx_eq!(f64, tempo.factor(), 1.03 * 0.97, epsilon = 1e-12));

        tempo.reset();
        assert_eq!(tempo.factor(), 1.0);
        assert_eq!(tempo.current_bpm(), tempo.base_bpm());
    }

    #[test]
    fn test_no_clamp() {
        let mut tempo = TempoController::new(100.0);
        for _ in 0..100 {
            tempo.tempo_up();
        }
        assert!(tempo.current_bpm() > 1900.0);
    }
}
