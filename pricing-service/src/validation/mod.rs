use meter_domain::{ElectricityReading, MeterId, MeterReadings, RawReading};
use rust_decimal::Decimal;

use crate::error::PricingError;

/// Pure validation of a store request.
///
/// Rules:
/// - the meter id must be present and match `smart-meter-<digits>`.
/// - readings must be present and non-empty.
/// - every reading needs both a time and a quantity, and the quantity must be
///   non-negative.
///
/// The meter id is checked before the readings.
pub fn validate_meter_readings(batch: MeterReadings) -> Result<(MeterId, Vec<ElectricityReading>), PricingError> {
    let meter_id: MeterId = match batch.smart_meter_id.as_deref() {
        Some(id) => id.parse()?,
        None => return Err(PricingError::InvalidMeterId("<missing>".to_string())),
    };

    let raw = match batch.electricity_readings {
        Some(raw) if !raw.is_empty() => raw,
        Some(_) => return Err(PricingError::InvalidReadings("no readings supplied".to_string())),
        None => return Err(PricingError::InvalidReadings("readings are missing".to_string())),
    };

    let readings = raw
        .into_iter()
        .enumerate()
        .map(|(idx, r)| validate_reading(idx, r))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((meter_id, readings))
}

fn validate_reading(idx: usize, raw: RawReading) -> Result<ElectricityReading, PricingError> {
    match (raw.time, raw.reading) {
        (Some(time), Some(reading)) if reading < Decimal::ZERO => Err(
            PricingError::InvalidReadings(format!("reading {idx} at {time} has negative quantity {reading}")),
        ),
        (Some(time), Some(reading)) => Ok(ElectricityReading { time, reading }),
        (None, _) => Err(PricingError::InvalidReadings(format!("reading {idx} has no time"))),
        (_, None) => Err(PricingError::InvalidReadings(format!("reading {idx} has no quantity"))),
    }
}

/// Validation that also counts and logs rejections.
pub fn validate_and_record(batch: MeterReadings) -> Result<(MeterId, Vec<ElectricityReading>), PricingError> {
    match validate_meter_readings(batch) {
        Ok(valid) => Ok(valid),
        Err(e) => {
            metrics::counter!("validation_meter_readings_rejected_total").increment(1);
            tracing::warn!(error = %e, "rejected meter readings");
            Err(e)
        }
    }
}
