#![allow(dead_code)]

use std::collections::VecDeque;

use hospital_da_sim::domain::generator::arrival::ArrivalGenerator;
use hospital_da_sim::domain::generator::duration::DurationGenerator;
use hospital_da_sim::domain::request::request::SurgeryClass;
use hospital_da_sim::domain::simulator::config::SimulationConfig;
use hospital_da_sim::domain::simulator::simulator::Simulation;
use hospital_da_sim::domain::utils::id::ReplicationName;

/// Arrival offsets per slot, one list per class. The simulator asks for
/// classes A, B, C in that order every slot; slots without a script get no arrivals.
#[derive(Debug, Default)]
pub struct ScriptedArrivals {
    calls: usize,
    script: VecDeque<[Vec<f64>; 3]>,
}

impl ScriptedArrivals {
    pub fn new(script: Vec<[Vec<f64>; 3]>) -> Self {
        ScriptedArrivals { calls: 0, script: script.into() }
    }
}

impl ArrivalGenerator for ScriptedArrivals {
    fn generate_arrivals(&mut self, _rate: f64, _horizon: f64) -> Vec<f64> {
        let class = self.calls % 3;
        self.calls += 1;

        let arrivals = self.script.front().map(|slot| slot[class].clone()).unwrap_or_default();
        if class == 2 {
            self.script.pop_front();
        }
        arrivals
    }
}

/// Same base duration every time for a class.
#[derive(Debug)]
pub struct FixedDurations {
    pub base: [f64; 3],
}

impl DurationGenerator for FixedDurations {
    fn generate_duration(&mut self, class: SurgeryClass) -> f64 {
        self.base[class.index()]
    }
}

pub fn config_with_patience(pass_slot: u32) -> SimulationConfig {
    SimulationConfig { pass_slot, horizons: vec![10], ..SimulationConfig::default() }
}

pub fn scripted_simulation(pass_slot: u32, script: Vec<[Vec<f64>; 3]>, base: [f64; 3]) -> Simulation {
    Simulation::new(
        ReplicationName::new("scripted"),
        config_with_patience(pass_slot),
        Box::new(ScriptedArrivals::new(script)),
        Box::new(FixedDurations { base }),
    )
    .unwrap()
}
