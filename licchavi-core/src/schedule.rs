/// Alternating fit / generalization step cadence.
///
/// Two counters start at 0. A step is a fit step iff `c_fit >= c_gen`; a fit
/// step adds `gen_freq` to `c_gen`, a generalization step adds 1 to `c_fit`.
/// With `gen_freq + 1` steps per epoch this yields exactly one fit step
/// followed by `gen_freq` generalization steps in every epoch.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Updates every local model on `fit + gen`.
    Fit,
    /// Updates the consensus model on `gen + reg`.
    Generalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Fit => write!(f, "fit"),
            Phase::Generalize => write!(f, "gen"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepSchedule {
    gen_freq: usize,
    c_fit: usize,
    c_gen: usize,
}

impl StepSchedule {
    pub fn new(gen_freq: usize) -> Self {
        assert!(gen_freq >= 1, "gen_freq must be >= 1");
        StepSchedule { gen_freq, c_fit: 0, c_gen: 0 }
    }

    /// Inner steps per epoch.
    pub fn steps_per_epoch(&self) -> usize {
        self.gen_freq + 1
    }

    /// Decide the phase of the next step and advance the counters.
    pub fn next_phase(&mut self) -> Phase {
        if self.c_fit >= self.c_gen {
            self.c_gen += self.gen_freq;
            Phase::Fit
        } else {
            self.c_fit += 1;
            Phase::Generalize
        }
    }
}

/// Steps executed by an engine over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounts {
    pub fit: usize,
    pub generalization: usize,
}

impl StepCounts {
    pub fn record(&mut self, phase: Phase) {
        match phase {
            Phase::Fit => self.fit += 1,
            Phase::Generalize => self.generalization += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fit + self.generalization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(gen_freq: usize, epochs: usize) -> Vec<Vec<Phase>> {
        let mut schedule = StepSchedule::new(gen_freq);
        (0..epochs)
            .map(|_| (0..schedule.steps_per_epoch()).map(|_| schedule.next_phase()).collect())
            .collect()
    }

    #[test]
    fn test_fit_first_then_gen_freq_generalizations() {
        for gen_freq in 1..6 {
            for epoch in run(gen_freq, 4) {
                assert_eq!(epoch.len(), gen_freq + 1);
                assert_eq!(epoch[0], Phase::Fit);
                assert!(epoch[1..].iter().all(|&p| p == Phase::Generalize));
            }
        }
    }

    #[test]
    fn test_step_totals() {
        let (epochs, gen_freq) = (5, 3);
        let mut counts = StepCounts::default();
        for phase in run(gen_freq, epochs).into_iter().flatten() {
            counts.record(phase);
        }
        assert_eq!(counts.fit, epochs);
        assert_eq!(counts.generalization, epochs * gen_freq);
        assert_eq!(counts.total(), epochs * (gen_freq + 1));
    }

    #[test]
    #[should_panic(expected = "gen_freq must be >= 1")]
    fn test_zero_gen_freq_panics() {
        let _ = StepSchedule::new(0);
    }
}
