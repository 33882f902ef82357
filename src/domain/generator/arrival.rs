use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

use crate::domain::generator::seeded_rng;

/// Source of arrival instants.
pub trait ArrivalGenerator: std::fmt::Debug + Send {
    /// Arrival offsets in `[0, horizon)` of a Poisson process with the given rate,
    /// strictly increasing. The count is whatever the process produces.
    fn generate_arrivals(&mut self, rate: f64, horizon: f64) -> Vec<f64>;
}

/// Poisson process built from exponential inter-arrival gaps.
#[derive(Debug)]
pub struct PoissonArrivalGenerator {
    rng: StdRng,
}

impl PoissonArrivalGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        PoissonArrivalGenerator { rng: seeded_rng(seed) }
    }
}

impl ArrivalGenerator for PoissonArrivalGenerator {
    fn generate_arrivals(&mut self, rate: f64, horizon: f64) -> Vec<f64> {
        if !(rate.is_finite() && rate > 0.0) || horizon <= 0.0 {
            return Vec::new();
        }

        let Ok(gap) = Exp::new(rate) else {
            log::warn!("Invalid arrival rate {}, generating no arrivals.", rate);
            return Vec::new();
        };

        let mut arrivals = Vec::new();
        let mut t = 0.0;
        loop {
            let step: f64 = gap.sample(&mut self.rng);
            if step <= 0.0 {
                // A zero gap would repeat the previous instant.
                continue;
            }

            t += step;
            if t >= horizon {
                break;
            }
            arrivals.push(t);
        }

        arrivals
    }
}
