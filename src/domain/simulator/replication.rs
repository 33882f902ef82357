use std::thread;

use crate::domain::simulator::config::SimulationConfig;
use crate::domain::simulator::simulator::Simulation;
use crate::domain::statistics::statistics::SimulationStatistics;
use crate::domain::utils::id::ReplicationName;
use crate::error::Result;

/// Statistics of one finished replication.
#[derive(Debug, Clone)]
pub struct ReplicationResult {
    pub name: ReplicationName,
    pub horizon: u64,
    pub seed: Option<u64>,
    pub statistics: SimulationStatistics,
}

/// Seed of replication `index`. Unseeded configurations stay unseeded.
pub fn replication_seed(config: &SimulationConfig, index: usize) -> Option<u64> {
    config.seed.map(|seed| seed.wrapping_add(index as u64))
}

/// Runs `config.replications` independent simulations of `horizon` slots, one
/// OS thread each. Results come back in replication order.
pub fn run_replications(config: &SimulationConfig, horizon: u64) -> Result<Vec<ReplicationResult>> {
    config.validate()?;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..config.replications)
            .map(|index| {
                let config = config.clone();
                scope.spawn(move || -> Result<ReplicationResult> {
                    let name = ReplicationName::new(format!("{}-slots-replication-{}", horizon, index));
                    let seed = replication_seed(&config, index);

                    let mut simulation = Simulation::from_config(name.clone(), config, seed)?;
                    simulation.run(horizon)?;

                    Ok(ReplicationResult { name, horizon, seed, statistics: simulation.into_statistics() })
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
