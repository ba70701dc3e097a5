// ============================================================
// Layer 5 — Multi-Step Learning Rate Schedule
// ============================================================
// Epoch-wise step decay: the rate is multiplied by `gamma` each
// time the number of completed epochs reaches a milestone.
//
//   milestones {10, 20, 40}, gamma 0.5, initial 1e-4:
//
//   epochs completed   0..=9    10..=19   20..=39   40..
//   learning rate      1e-4     5e-5      2.5e-5    1.25e-5
//
// `step()` is called once at the end of every epoch.

use burn::LearningRate;

#[derive(Debug, Clone)]
pub struct MultiStepLr {
    initial:    LearningRate,
    milestones: Vec<usize>,
    gamma:      f64,
    completed:  usize,
}

impl MultiStepLr {
    pub fn new(initial: LearningRate, mut milestones: Vec<usize>, gamma: f64) -> Self {
        milestones.sort_unstable();
        Self { initial, milestones, gamma, completed: 0 }
    }

    /// Rate for the epoch that is currently running.
    pub fn current(&self) -> LearningRate {
        let passed = self.milestones.iter().filter(|&&m| m <= self.completed).count();
        self.initial * self.gamma.powi(passed as i32)
    }

    /// Mark one more epoch as completed and return the new rate.
    pub fn step(&mut self) -> LearningRate {
        self.completed += 1;
        self.current()
    }

    pub fn epochs_completed(&self) -> usize {
        self.completed
    }
}
