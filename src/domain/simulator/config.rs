use crate::api::simulation_dto::{ClassDto, SimulationConfigDto};
use crate::domain::hospital::hospital::HOSPITAL_COUNT;
use crate::domain::queue::admission_queue::BATCH_CAPACITY;
use crate::domain::request::request::SurgeryClass;
use crate::domain::utils::units::{Patience, SlotIndex};
use crate::error::{Error, Result};

/// Arrival and duration parameters of one surgery class, in hours.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassConfig {
    pub arrival_rate_per_hour: f64,
    pub mean_duration_hours: f64,
    pub std_dev_hours: f64,
}

/// Validated simulation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Slot counts to simulate; each entry is an independent run.
    pub horizons: Vec<SlotIndex>,
    pub pass_slot: Patience,
    pub batch_capacity: usize,
    pub slot_hours: f64,
    pub hospital_costs: [u32; HOSPITAL_COUNT],
    pub classes: [ClassConfig; 3],
    pub seed: Option<u64>,
    pub replications: usize,
    pub statistics_file: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizons: vec![200_000],
            pass_slot: 5,
            batch_capacity: BATCH_CAPACITY,
            slot_hours: 8.0,
            hospital_costs: [2, 5, 7],
            classes: [
                ClassConfig { arrival_rate_per_hour: 0.2, mean_duration_hours: 2.0, std_dev_hours: 1.0 },
                ClassConfig { arrival_rate_per_hour: 0.1, mean_duration_hours: 5.0, std_dev_hours: 1.0 },
                ClassConfig { arrival_rate_per_hour: 0.05, mean_duration_hours: 10.0, std_dev_hours: 1.0 },
            ],
            seed: None,
            replications: 1,
            statistics_file: None,
        }
    }
}

impl SimulationConfig {
    pub fn class(&self, class: SurgeryClass) -> &ClassConfig {
        &self.classes[class.index()]
    }

    /// Expected arrivals of `class` per slot.
    pub fn arrival_rate_per_slot(&self, class: SurgeryClass) -> f64 {
        self.class(class).arrival_rate_per_hour * self.slot_hours
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity != BATCH_CAPACITY {
            return Err(Error::InvalidConfig(format!("batch capacity is fixed at {}, got {}", BATCH_CAPACITY, self.batch_capacity)));
        }

        if self.horizons.is_empty() {
            return Err(Error::InvalidConfig("at least one horizon is required".to_string()));
        }

        if !(self.slot_hours.is_finite() && self.slot_hours > 0.0) {
            return Err(Error::InvalidConfig(format!("slot length must be positive, got {} hours", self.slot_hours)));
        }

        if self.replications == 0 {
            return Err(Error::InvalidConfig("replications must be at least 1".to_string()));
        }

        for class in SurgeryClass::ALL {
            let params = self.class(class);

            if !(params.arrival_rate_per_hour.is_finite() && params.arrival_rate_per_hour >= 0.0) {
                return Err(Error::InvalidConfig(format!("arrival rate of class {} must be non-negative, got {}", class, params.arrival_rate_per_hour)));
            }
            if !(params.mean_duration_hours.is_finite() && params.mean_duration_hours > 0.0) {
                return Err(Error::InvalidConfig(format!("mean duration of class {} must be positive, got {}", class, params.mean_duration_hours)));
            }
            if !(params.std_dev_hours.is_finite() && params.std_dev_hours > 0.0) {
                return Err(Error::InvalidConfig(format!("std dev of class {} must be positive, got {}", class, params.std_dev_hours)));
            }
        }

        Ok(())
    }
}

fn merge_class(defaults: &ClassConfig, dto: Option<ClassDto>) -> ClassConfig {
    let dto = dto.unwrap_or_default();
    ClassConfig {
        arrival_rate_per_hour: dto.arrival_rate_per_hour.unwrap_or(defaults.arrival_rate_per_hour),
        mean_duration_hours: dto.mean_duration_hours.unwrap_or(defaults.mean_duration_hours),
        std_dev_hours: dto.std_dev_hours.unwrap_or(defaults.std_dev_hours),
    }
}

impl TryFrom<SimulationConfigDto> for SimulationConfig {
    type Error = Error;

    fn try_from(dto: SimulationConfigDto) -> Result<Self> {
        let defaults = SimulationConfig::default();
        let classes = dto.classes.unwrap_or_default();

        let config = SimulationConfig {
            horizons: dto.horizons.unwrap_or(defaults.horizons),
            pass_slot: dto.pass_slot.unwrap_or(defaults.pass_slot),
            batch_capacity: dto.batch_capacity.unwrap_or(defaults.batch_capacity),
            slot_hours: dto.slot_hours.unwrap_or(defaults.slot_hours),
            hospital_costs: dto.hospital_costs.unwrap_or(defaults.hospital_costs),
            classes: [
                merge_class(&defaults.classes[0], classes.a),
                merge_class(&defaults.classes[1], classes.b),
                merge_class(&defaults.classes[2], classes.c),
            ],
            seed: dto.seed.or(defaults.seed),
            replications: dto.replications.unwrap_or(defaults.replications),
            statistics_file: dto.statistics_file.or(defaults.statistics_file),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parser::parse_json_str;

    #[test]
    fn test_empty_json_gives_defaults() {
        let dto: SimulationConfigDto = parse_json_str("{}").unwrap();
        let config = SimulationConfig::try_from(dto).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_per_slot_rates() {
        let config = SimulationConfig::default();
        assert!((config.arrival_rate_per_slot(SurgeryClass::A) - 1.6).abs() < 1e-9);
        assert!((config.arrival_rate_per_slot(SurgeryClass::B) - 0.8).abs() < 1e-9);
        assert!((config.arrival_rate_per_slot(SurgeryClass::C) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_partial_class_override() {
        let dto: SimulationConfigDto = parse_json_str(r#"{ "passSlot": 2, "classes": { "b": { "meanDurationHours": 6.5 } } }"#).unwrap();
        let config = SimulationConfig::try_from(dto).unwrap();

        assert_eq!(config.pass_slot, 2);
        assert_eq!(config.class(SurgeryClass::B).mean_duration_hours, 6.5);
        assert_eq!(config.class(SurgeryClass::B).arrival_rate_per_hour, 0.1);
    }

    #[test]
    fn test_batch_capacity_is_fixed() {
        let dto: SimulationConfigDto = parse_json_str(r#"{ "batchCapacity": 4 }"#).unwrap();
        assert!(matches!(SimulationConfig::try_from(dto), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: Result<SimulationConfigDto> = parse_json_str(r#"{ "passSlots": 2 }"#);
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }
}
