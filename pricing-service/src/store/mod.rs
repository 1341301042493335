use std::{collections::HashMap, sync::Arc};

use meter_domain::{ElectricityReading, MeterReadings};
use parking_lot::{Mutex, RwLock};

use crate::{error::PricingError, validation};

type MeterLog = Arc<Mutex<Vec<ElectricityReading>>>;

/// In-memory readings keyed by meter id.
///
/// The outer lock only guards the key set. Each meter's log sits behind its
/// own mutex, so appends for different meters never wait on each other while
/// appends for the same meter serialize.
#[derive(Default)]
pub struct ReadingStore {
    meters: RwLock<HashMap<String, MeterLog>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `batch` and appends its readings to the meter's log.
    ///
    /// Nothing is written unless the whole batch is valid.
    pub fn store(&self, batch: MeterReadings) -> Result<(), PricingError> {
        let (meter_id, readings) = validation::validate_and_record(batch)?;
        let count = readings.len();

        let log = self.log_for(meter_id.as_str());
        log.lock().extend(readings);

        metrics::counter!("readings_stored_total").increment(count as u64);
        tracing::debug!(meter_id = %meter_id, count, "stored meter readings");
        Ok(())
    }

    /// Snapshot of every reading stored for `meter_id`, in append order.
    ///
    /// `None` means the meter never had a successful store.
    pub fn get(&self, meter_id: &str) -> Option<Vec<ElectricityReading>> {
        let log = self.meters.read().get(meter_id).cloned()?;
        let snapshot = log.lock().clone();
        Some(snapshot)
    }

    pub fn meter_count(&self) -> usize {
        self.meters.read().len()
    }

    fn log_for(&self, meter_id: &str) -> MeterLog {
        if let Some(log) = self.meters.read().get(meter_id) {
            return log.clone();
        }

        let mut meters = self.meters.write();
        let log = meters.entry(meter_id.to_string()).or_default().clone();
        metrics::gauge!("reading_store_meters").set(meters.len() as f64);
        log
    }
}
