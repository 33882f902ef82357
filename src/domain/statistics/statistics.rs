use serde::Serialize;
use std::fs::File;
use std::io::Write;

use crate::domain::utils::units::{Delay, SlotIndex};
use crate::error::Result;

/// One CSV row: the two series the plots are drawn from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StatisticsRow {
    slot: SlotIndex,
    queue_length: usize,
    average_waiting_time: f64,
}

/// Aggregated summary of a finished run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub name: String,
    pub slots: u64,
    pub arrivals: u64,
    pub admitted: u64,
    pub deferrals: u64,
    pub unplaced_routings: u64,
    pub aborted_batches: u64,
    pub final_queue_length: usize,
    pub max_queue_length: usize,
    pub average_waiting_time: f64,
}

/// Per-slot series plus run-wide counters. Reset only by creating a new instance.
#[derive(Debug, Clone, Default)]
pub struct SimulationStatistics {
    queue_lengths: Vec<usize>,
    average_waiting_times: Vec<f64>,
    delays: Vec<Delay>,
    delay_sum: u64,

    pub arrivals: u64,
    pub deferrals: u64,
    pub unplaced_routings: u64,
    pub aborted_batches: u64,
}

impl SimulationStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delay(&mut self, delay: Delay) {
        self.delays.push(delay);
        self.delay_sum += delay;
    }

    /// Appends the queue length and the running average waiting time of the slot that just ended.
    pub fn close_slot(&mut self, queue_length: usize) {
        self.queue_lengths.push(queue_length);
        self.average_waiting_times.push(self.average_waiting_time());
    }

    /// Mean of every delay recorded so far, 0 before the first admission.
    pub fn average_waiting_time(&self) -> f64 {
        if self.delays.is_empty() { 0.0 } else { self.delay_sum as f64 / self.delays.len() as f64 }
    }

    pub fn queue_lengths(&self) -> &[usize] {
        &self.queue_lengths
    }

    pub fn average_waiting_times(&self) -> &[f64] {
        &self.average_waiting_times
    }

    pub fn delays(&self) -> &[Delay] {
        &self.delays
    }

    pub fn admitted(&self) -> u64 {
        self.delays.len() as u64
    }

    pub fn summary(&self, name: &str) -> SimulationSummary {
        SimulationSummary {
            name: name.to_string(),
            slots: self.queue_lengths.len() as u64,
            arrivals: self.arrivals,
            admitted: self.admitted(),
            deferrals: self.deferrals,
            unplaced_routings: self.unplaced_routings,
            aborted_batches: self.aborted_batches,
            final_queue_length: self.queue_lengths.last().copied().unwrap_or(0),
            max_queue_length: self.queue_lengths.iter().copied().max().unwrap_or(0),
            average_waiting_time: self.average_waiting_time(),
        }
    }

    /// Writes `Slot;QueueLength;AverageWaitingTime` rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

        for (slot, (queue_length, average_waiting_time)) in self.queue_lengths.iter().zip(&self.average_waiting_times).enumerate() {
            csv_wtr.serialize(StatisticsRow { slot: slot as SlotIndex, queue_length: *queue_length, average_waiting_time: *average_waiting_time })?;
        }

        csv_wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &str) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)?;
        log::info!("Statistics for {} slots written to '{}'.", self.queue_lengths.len(), path);
        Ok(())
    }
}
