use std::path::Path;

use crate::api::simulation_dto::SimulationConfigDto;
use crate::domain::simulator::config::SimulationConfig;
use crate::domain::simulator::replication::{ReplicationResult, run_replications};
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads and validates a JSON simulation config.
pub fn load_config(file_path: &str) -> Result<SimulationConfig> {
    let dto: SimulationConfigDto = parse_json_file(file_path)?;
    log::info!("Config file '{}' parsed successfully.", file_path);

    SimulationConfig::try_from(dto)
}

/// Runs every configured horizon and replication and writes the per-slot
/// series to CSV when `statistics_file` is set.
pub fn run_simulations(config: &SimulationConfig) -> Result<Vec<ReplicationResult>> {
    config.validate()?;

    let total_runs = config.horizons.len() * config.replications;
    let mut results = Vec::with_capacity(total_runs);

    for &horizon in &config.horizons {
        results.extend(run_replications(config, horizon)?);
    }

    if let Some(file) = &config.statistics_file {
        for result in &results {
            let path = statistics_path(file, result, total_runs);
            result.statistics.write_csv_file(&path)?;
        }
    }

    Ok(results)
}

/// With a single run the configured path is used as is; otherwise the run name
/// is inserted before the extension.
fn statistics_path(file: &str, result: &ReplicationResult, total_runs: usize) -> String {
    if total_runs <= 1 {
        return file.to_string();
    }

    let path = Path::new(file);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("statistics");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    let file_name = format!("{}_{}.{}", stem, result.name, extension);

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name).to_string_lossy().into_owned(),
        _ => file_name,
    }
}
