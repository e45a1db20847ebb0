use std::{
    sync::{
        atomic::{
            AtomicUsize,
            Ordering
        },
        Arc
    }
};
use tokio::{
    sync::{
        OwnedSemaphorePermit,
        Semaphore
    }
};
use log::{
    trace
};
use crate::{
    error::{
        AppError
    }
};

#[derive(Default)]
struct SlotCounters {
    in_flight: AtomicUsize,
    peak: AtomicUsize
}

/// Bounds the number of simultaneously loading chunks.
///
/// Waiters are served in FIFO order by the underlying semaphore.
#[derive(Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    counters: Arc<SlotCounters>,
    limit: usize
}

impl AdmissionController {
    pub fn new(limit: usize) -> Result<AdmissionController, AppError> {
        if limit < 1 {
            return Err(AppError::InvalidConfig("concurrency limit must be more than 0"));
        }
        Ok(AdmissionController{
            semaphore: Arc::new(Semaphore::new(limit)),
            counters: Arc::new(SlotCounters::default()),
            limit
        })
    }

    /// Waits for a free slot, the slot is returned when the result is dropped
    pub async fn acquire(&self) -> Result<AdmissionSlot, AppError> {
        let permit = self.semaphore
            .clone()
            .acquire_owned()
            .await?;

        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(in_flight, Ordering::SeqCst);
        trace!("Admission slot acquired, in flight: {}/{}", in_flight, self.limit);

        Ok(AdmissionSlot{
            counters: self.counters.clone(),
            _permit: permit
        })
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at once during the controller lifetime
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

pub struct AdmissionSlot {
    counters: Arc<SlotCounters>,
    // Поле освобождается после Drop::drop, поэтому счетчик уменьшается раньше семафора
    _permit: OwnedSemaphorePermit
}

impl AdmissionSlot {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
