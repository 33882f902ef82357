use crate::domain::generator::arrival::{ArrivalGenerator, PoissonArrivalGenerator};
use crate::domain::generator::duration::{DurationGenerator, TruncatedNormalDurationGenerator};
use crate::domain::hospital::hospital_pool::HospitalPool;
use crate::domain::matching::deferred_acceptance::{Assignment, NegotiationOutcome, negotiate};
use crate::domain::queue::admission_queue::AdmissionQueue;
use crate::domain::request::request::{Request, RequestStatus, SurgeryClass};
use crate::domain::request::request_store::{RequestId, RequestStore};
use crate::domain::simulator::config::SimulationConfig;
use crate::domain::statistics::statistics::SimulationStatistics;
use crate::domain::utils::id::{ReplicationName, RequestName};
use crate::domain::utils::units::{SlotIndex, delay_between};
use crate::error::{Error, Result};

/// Duration-scrambling constant so the duration stream differs from the arrival stream of the same seed.
const DURATION_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// What happened during one slot.
#[derive(Debug, Clone, Default)]
pub struct SlotReport {
    pub slot: SlotIndex,
    pub arrivals: usize,
    pub assignments: Vec<Assignment>,
    /// Requests that passed the slot after losing a first-round contention.
    pub deferred: Vec<RequestId>,
    pub unplaced: usize,
    pub batches: usize,
    pub queue_length: usize,
}

/// One independent simulation: hospitals, queue, requests and statistics.
///
/// Nothing is shared between instances, so replications can run side by side.
#[derive(Debug)]
pub struct Simulation {
    pub name: ReplicationName,
    config: SimulationConfig,
    pool: HospitalPool,
    queue: AdmissionQueue,
    store: RequestStore,
    statistics: SimulationStatistics,
    arrivals: Box<dyn ArrivalGenerator>,
    durations: Box<dyn DurationGenerator>,
    current_slot: SlotIndex,
    next_request_number: u64,
}

impl Simulation {
    pub fn new(name: ReplicationName, config: SimulationConfig, arrivals: Box<dyn ArrivalGenerator>, durations: Box<dyn DurationGenerator>) -> Result<Self> {
        config.validate()?;

        Ok(Simulation {
            name,
            pool: HospitalPool::new(config.hospital_costs),
            config,
            queue: AdmissionQueue::new(),
            store: RequestStore::new(),
            statistics: SimulationStatistics::new(),
            arrivals,
            durations,
            current_slot: 0,
            next_request_number: 0,
        })
    }

    /// Simulation with Poisson arrivals and truncated-normal durations drawn from `seed`.
    pub fn from_config(name: ReplicationName, config: SimulationConfig, seed: Option<u64>) -> Result<Self> {
        let arrivals = Box::new(PoissonArrivalGenerator::new(seed));
        let durations = Box::new(TruncatedNormalDurationGenerator::from_config(&config, seed.map(|s| s ^ DURATION_SEED_SALT))?);
        Self::new(name, config, arrivals, durations)
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn pool(&self) -> &HospitalPool {
        &self.pool
    }

    pub fn statistics(&self) -> &SimulationStatistics {
        &self.statistics
    }

    pub fn into_statistics(self) -> SimulationStatistics {
        self.statistics
    }

    /// Index of the next slot to be simulated.
    pub fn current_slot(&self) -> SlotIndex {
        self.current_slot
    }

    /// Simulates `slots` further slots.
    pub fn run(&mut self, slots: u64) -> Result<()> {
        log::info!("{}: simulating {} slots with pass slot budget {}.", self.name, slots, self.config.pass_slot);

        for _ in 0..slots {
            self.run_slot()?;
        }

        let summary = self.statistics.summary(&self.name.id);
        log::info!(
            "{}: finished after {} slots. Arrivals: {}, admitted: {}, queued: {}, average waiting time: {:.4} slots.",
            self.name,
            summary.slots,
            summary.arrivals,
            summary.admitted,
            summary.final_queue_length,
            summary.average_waiting_time
        );

        Ok(())
    }

    /// Simulates one slot: status promotion, intake, hospital aging, negotiation, statistics.
    pub fn run_slot(&mut self) -> Result<SlotReport> {
        let slot = self.current_slot;
        let mut report = SlotReport { slot, ..Default::default() };

        self.promote_statuses();
        report.arrivals = self.intake(slot)?;
        self.annotate_new_requests();
        self.pool.advance();

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}: slot {}, hospitals available {:?}, queue:\n{}", self.name, slot, self.pool.availability(), self.queue.snapshot(&self.store));
        }

        self.negotiate_slot(slot, &mut report)?;

        if self.queue.len() != self.store.len() {
            return Err(Error::invariant(
                slot,
                0,
                None,
                format!("queue holds {} requests but {} are waiting", self.queue.len(), self.store.len()),
            ));
        }

        report.queue_length = self.queue.len();
        self.statistics.close_slot(report.queue_length);
        self.current_slot += 1;

        log::debug!(
            "{}: slot {} done. Arrivals: {}, admitted: {}, deferred: {}, batches: {}, queue: {}.",
            self.name,
            slot,
            report.arrivals,
            report.assignments.len(),
            report.deferred.len(),
            report.batches,
            report.queue_length
        );

        Ok(report)
    }

    /// Requests that arrived last slot become `Queued`; everything older, including
    /// requests that passed the last slot, becomes `ReadyToProcess`.
    fn promote_statuses(&mut self) {
        for (_, request) in self.store.iter_mut() {
            request.status = match request.status {
                RequestStatus::NewRequest => RequestStatus::Queued,
                RequestStatus::Queued | RequestStatus::ReadyToProcess | RequestStatus::PassSlot => RequestStatus::ReadyToProcess,
            };
        }
    }

    /// Draws this slot's arrivals for every class and admits them into the queue.
    fn intake(&mut self, slot: SlotIndex) -> Result<usize> {
        let mut new_requests = Vec::new();

        for class in SurgeryClass::ALL {
            let rate = self.config.arrival_rate_per_slot(class);

            for offset in self.arrivals.generate_arrivals(rate, 1.0) {
                let base = self.durations.generate_duration(class);
                let name = RequestName::new(format!("{}-{}", class, self.next_request_number));
                self.next_request_number += 1;

                let request = Request::new(name, class, slot as f64 + offset, class.durations_for(base), self.config.pass_slot)?;
                new_requests.push(self.store.add(request));
            }
        }

        let arrivals = new_requests.len();
        self.queue.admit(new_requests, &self.store);
        self.statistics.arrivals += arrivals as u64;

        Ok(arrivals)
    }

    fn annotate_new_requests(&mut self) {
        for (_, request) in self.store.iter_mut() {
            if request.status == RequestStatus::NewRequest {
                request.annotate_preferred_hospital();
            }
        }
    }

    /// Pulls and negotiates batches until one converges or the queue has nothing left to offer.
    fn negotiate_slot(&mut self, slot: SlotIndex, report: &mut SlotReport) -> Result<()> {
        // Every abort parks at least one request for the rest of the slot.
        let max_batches = self.queue.len() + 1;

        loop {
            let batch = self.queue.take_batch(self.config.batch_capacity, &self.store);
            if batch.is_empty() {
                return Ok(());
            }

            report.batches += 1;
            if report.batches > max_batches {
                return Err(Error::invariant(slot, 0, batch.first().copied(), format!("more than {} batches negotiated in one slot", max_batches)));
            }

            match negotiate(slot, &batch, &self.store, &self.pool)? {
                NegotiationOutcome::Converged { assignments, unplaced, rounds } => {
                    self.queue.requeue_back(&unplaced);
                    self.statistics.unplaced_routings += unplaced.len() as u64;
                    report.unplaced += unplaced.len();

                    for assignment in assignments {
                        self.admit(slot, rounds, &assignment)?;
                        report.assignments.push(assignment);
                    }

                    return Ok(());
                }
                NegotiationOutcome::Aborted { contested, deferred, retried } => {
                    log::debug!("{}: slot {}, contention at hospital {}, {} request(s) pass this slot.", self.name, slot, contested, deferred.len());

                    for key in &deferred {
                        if let Some(request) = self.store.get_mut(*key) {
                            request.status = RequestStatus::PassSlot;
                        }
                    }

                    self.queue.requeue_front(&retried);
                    self.queue.requeue_back_with_decrement(&deferred, &mut self.store);

                    self.statistics.deferrals += deferred.len() as u64;
                    self.statistics.aborted_batches += 1;
                    report.deferred.extend(deferred);
                }
            }
        }
    }

    /// Finalizes one assignment: the hospital is occupied and the request leaves the system.
    fn admit(&mut self, slot: SlotIndex, round: u32, assignment: &Assignment) -> Result<()> {
        if !self.pool.occupy(assignment.hospital, assignment.duration) {
            return Err(Error::invariant(slot, round, Some(assignment.request), format!("hospital {} assigned while busy", assignment.hospital)));
        }

        let request = self
            .store
            .remove(assignment.request)
            .ok_or_else(|| Error::invariant(slot, round, Some(assignment.request), "admitted request missing from store"))?;

        let delay = delay_between(request.arrival_time(), slot);
        self.statistics.record_delay(delay);

        log::debug!(
            "{}: slot {}, {} admitted to hospital {} for {:.4} slots after waiting {} slot(s).",
            self.name,
            slot,
            request.name,
            assignment.hospital,
            assignment.duration,
            delay
        );

        Ok(())
    }
}
