//! Optimizers and learning-rate schedules over a flat parameter vector.

use std::f64::consts::PI;

/// Updates parameters in place from their gradients.
pub trait Optimizer: Send {
    fn step(&mut self, params: &mut [f64], grads: &[f64], learning_rate: f64);
}

/// Per-step learning rate.
pub trait LrSchedule: Send {
    fn learning_rate(&self) -> f64;
    /// Advance by one optimizer step.
    fn step(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerKind {
    #[default]
    AdamW,
    Sgd,
}

impl OptimizerKind {
    /// Fresh optimizer with default hyperparameters.
    pub fn build(&self) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::AdamW => Box::new(AdamW::default()),
            OptimizerKind::Sgd => Box::new(Sgd::default()),
        }
    }
}

/// Learning-rate policy over the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleKind {
    #[default]
    OneCycle,
    Constant,
}

impl ScheduleKind {
    pub fn build(&self, learning_rate: f64, total_steps: usize) -> Box<dyn LrSchedule> {
        match self {
            ScheduleKind::OneCycle => Box::new(OneCycle::new(learning_rate, total_steps)),
            ScheduleKind::Constant => Box::new(Constant(learning_rate)),
        }
    }
}

/// Adam with decoupled weight decay.
#[derive(Debug, Clone)]
pub struct AdamW {
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Default for AdamW {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 1e-3,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &mut [f64], grads: &[f64], learning_rate: f64) {
        if self.m.len() != params.len() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
            self.t = 0;
        }
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (i, (p, &g)) in params.iter_mut().zip(grads).enumerate() {
            *p *= 1.0 - learning_rate * self.weight_decay;
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

/// Stochastic gradient descent with momentum and L2 weight decay.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub momentum: f64,
    pub weight_decay: f64,
    velocity: Vec<f64>,
}

impl Default for Sgd {
    fn default() -> Self {
        Self {
            momentum: 0.9,
            weight_decay: 1e-4,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [f64], grads: &[f64], learning_rate: f64) {
        let first = self.velocity.len() != params.len();
        if first {
            self.velocity = vec![0.0; params.len()];
        }
        for (i, (p, &g)) in params.iter_mut().zip(grads).enumerate() {
            let g = g + self.weight_decay * *p;
            self.velocity[i] = if first {
                g
            } else {
                self.momentum * self.velocity[i] + g
            };
            *p -= learning_rate * self.velocity[i];
        }
    }
}

/// Fixed learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl LrSchedule for Constant {
    fn learning_rate(&self) -> f64 {
        self.0
    }

    fn step(&mut self) {}
}

/// One-cycle policy: cosine warm-up from `max_lr / div_factor` to `max_lr`
/// over the first `pct_start` of the steps, then cosine annealing down to
/// `initial / final_div_factor`.
#[derive(Debug, Clone, PartialEq)]
pub struct OneCycle {
    max_lr: f64,
    total_steps: usize,
    pct_start: f64,
    div_factor: f64,
    final_div_factor: f64,
    step_num: usize,
}

impl OneCycle {
    pub fn new(max_lr: f64, total_steps: usize) -> Self {
        Self {
            max_lr,
            total_steps: total_steps.max(1),
            pct_start: 0.3,
            div_factor: 100.0,
            final_div_factor: 5000.0,
            step_num: 0,
        }
    }

    pub fn with_factors(mut self, pct_start: f64, div_factor: f64, final_div_factor: f64) -> Self {
        self.pct_start = pct_start;
        self.div_factor = div_factor;
        self.final_div_factor = final_div_factor;
        self
    }

    pub fn max_lr(&self) -> f64 {
        self.max_lr
    }

    fn initial_lr(&self) -> f64 {
        self.max_lr / self.div_factor
    }

    fn min_lr(&self) -> f64 {
        self.initial_lr() / self.final_div_factor
    }

    fn lr_at(&self, step: usize) -> f64 {
        let step = step as f64;
        let warmup_end = self.pct_start * self.total_steps as f64 - 1.0;
        let last = self.total_steps as f64 - 1.0;
        if step <= warmup_end {
            cos_anneal(self.initial_lr(), self.max_lr, fraction(step, 0.0, warmup_end))
        } else {
            cos_anneal(self.max_lr, self.min_lr(), fraction(step, warmup_end, last))
        }
    }
}

impl LrSchedule for OneCycle {
    fn learning_rate(&self) -> f64 {
        self.lr_at(self.step_num)
    }

    fn step(&mut self) {
        self.step_num += 1;
    }
}

fn fraction(step: f64, start: f64, end: f64) -> f64 {
    if end <= start {
        1.0
    } else {
        ((step - start) / (end - start)).clamp(0.0, 1.0)
    }
}

fn cos_anneal(start: f64, end: f64, pct: f64) -> f64 {
    end + (start - end) / 2.0 * ((PI * pct).cos() + 1.0)
}
