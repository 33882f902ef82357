use serde::Deserialize;

/// Simulation parameters as read from JSON. Every field is optional; missing
/// fields fall back to `SimulationConfig::default()` during conversion.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulationConfigDto {
    pub horizons: Option<Vec<u64>>,
    pub pass_slot: Option<u32>,
    pub batch_capacity: Option<usize>,
    pub slot_hours: Option<f64>,
    pub hospital_costs: Option<[u32; 3]>,
    pub classes: Option<ClassesDto>,
    pub seed: Option<u64>,
    pub replications: Option<usize>,
    pub statistics_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassesDto {
    #[serde(alias = "A")]
    pub a: Option<ClassDto>,
    #[serde(alias = "B")]
    pub b: Option<ClassDto>,
    #[serde(alias = "C")]
    pub c: Option<ClassDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassDto {
    pub arrival_rate_per_hour: Option<f64>,
    pub mean_duration_hours: Option<f64>,
    pub std_dev_hours: Option<f64>,
}
