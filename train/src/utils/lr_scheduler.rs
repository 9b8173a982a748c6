use crate::{common::*, config::LearningRateSchedule};

/// Learning rates below this difference are considered equal.
const LR_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone)]
pub enum LrScheduler {
    Constant {
        lr: R64,
    },
    Plateau {
        lr: f64,
        factor: f64,
        patience: usize,
        threshold: f64,
        min_lr: f64,
        best: Option<f64>,
        num_bad_epochs: usize,
    },
}

impl LrScheduler {
    pub fn new(config: &LearningRateSchedule) -> Result<Self> {
        let scheduler = match *config {
            LearningRateSchedule::Constant { lr } => {
                ensure!(lr > 0.0, "the lr must be positive");
                Self::Constant { lr }
            }
            LearningRateSchedule::Plateau {
                lr,
                factor,
                patience,
                threshold,
                min_lr,
            } => {
                ensure!(lr > 0.0, "the lr must be positive");
                ensure!(
                    factor > 0.0 && factor < 1.0,
                    "the factor must be in range (0.0, 1.0)"
                );
                ensure!(threshold >= 0.0, "the threshold must be non-negative");
                ensure!(
                    min_lr >= 0.0 && min_lr <= lr,
                    "the min_lr must be in range [0.0, lr]"
                );

                Self::Plateau {
                    lr: lr.raw(),
                    factor: factor.raw(),
                    patience,
                    threshold: threshold.raw(),
                    min_lr: min_lr.raw(),
                    best: None,
                    num_bad_epochs: 0,
                }
            }
        };

        Ok(scheduler)
    }

    pub fn lr(&self) -> f64 {
        match *self {
            Self::Constant { lr } => lr.raw(),
            Self::Plateau { lr, .. } => lr,
        }
    }

    /// Feeds the validation loss of a finished epoch and returns the lr for the next one.
    pub fn step(&mut self, val_loss: f64) -> f64 {
        match self {
            Self::Constant { lr } => lr.raw(),
            Self::Plateau {
                lr,
                factor,
                patience,
                threshold,
                min_lr,
                best,
                num_bad_epochs,
            } => {
                if !val_loss.is_finite() {
                    warn!("ignore non-finite validation loss {}", val_loss);
                    return *lr;
                }

                let improved = match *best {
                    Some(best) => val_loss < best * (1.0 - *threshold),
                    None => true,
                };

                if improved {
                    *best = Some(val_loss);
                    *num_bad_epochs = 0;
                } else {
                    *num_bad_epochs += 1;
                }

                if *num_bad_epochs > *patience {
                    let new_lr = (*lr * *factor).max(*min_lr);
                    if *lr - new_lr > LR_EPSILON {
                        info!("reduce lr from {:e} to {:e}", *lr, new_lr);
                        *lr = new_lr;
                    }
                    *num_bad_epochs = 0;
                }

                *lr
            }
        }
    }
}
