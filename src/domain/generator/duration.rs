use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::generator::seeded_rng;
use crate::domain::request::request::SurgeryClass;
use crate::domain::simulator::config::SimulationConfig;
use crate::domain::utils::units::SlotSpan;
use crate::error::{Error, Result};

/// Source of base surgery durations.
pub trait DurationGenerator: std::fmt::Debug + Send {
    /// A positive base duration for `class`, in slots.
    fn generate_duration(&mut self, class: SurgeryClass) -> SlotSpan;
}

/// Normal distribution per class, resampled until positive.
#[derive(Debug)]
pub struct TruncatedNormalDurationGenerator {
    rng: StdRng,
    distributions: [Normal<f64>; 3],
    slot_hours: f64,
}

impl TruncatedNormalDurationGenerator {
    pub fn new(means_hours: [f64; 3], std_dev_hours: [f64; 3], slot_hours: f64, seed: Option<u64>) -> Result<Self> {
        if !(slot_hours.is_finite() && slot_hours > 0.0) {
            return Err(Error::InvalidConfig(format!("slot length must be positive, got {} hours", slot_hours)));
        }

        let mut distributions = Vec::with_capacity(3);
        for class in SurgeryClass::ALL {
            let i = class.index();
            if !(means_hours[i].is_finite() && means_hours[i] > 0.0) {
                return Err(Error::InvalidConfig(format!("mean duration of class {} must be positive, got {}", class, means_hours[i])));
            }
            if !(std_dev_hours[i].is_finite() && std_dev_hours[i] > 0.0) {
                return Err(Error::InvalidConfig(format!("duration std dev of class {} must be positive, got {}", class, std_dev_hours[i])));
            }

            let normal = Normal::new(means_hours[i], std_dev_hours[i])
                .map_err(|e| Error::InvalidConfig(format!("duration distribution of class {}: {}", class, e)))?;
            distributions.push(normal);
        }

        let distributions: [Normal<f64>; 3] =
            distributions.try_into().map_err(|_| Error::InvalidConfig("expected one duration distribution per class".to_string()))?;

        Ok(TruncatedNormalDurationGenerator { rng: seeded_rng(seed), distributions, slot_hours })
    }

    pub fn from_config(config: &SimulationConfig, seed: Option<u64>) -> Result<Self> {
        let means = SurgeryClass::ALL.map(|class| config.class(class).mean_duration_hours);
        let std_devs = SurgeryClass::ALL.map(|class| config.class(class).std_dev_hours);
        Self::new(means, std_devs, config.slot_hours, seed)
    }
}

impl DurationGenerator for TruncatedNormalDurationGenerator {
    fn generate_duration(&mut self, class: SurgeryClass) -> SlotSpan {
        let normal = &self.distributions[class.index()];

        loop {
            let hours: f64 = normal.sample(&mut self.rng);
            if hours > 0.0 {
                return hours / self.slot_hours;
            }
        }
    }
}
