use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const METER_ID_PREFIX: &str = "smart-meter-";

/// A single accepted consumption measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectricityReading {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub reading: Decimal,
}

/// A reading as submitted by a caller, before validation.
///
/// Both fields stay optional so a missing or `null` value reaches the
/// validator instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time: Option<OffsetDateTime>,
    #[serde(default)]
    pub reading: Option<Decimal>,
}

impl From<ElectricityReading> for RawReading {
    fn from(r: ElectricityReading) -> Self {
        RawReading {
            time: Some(r.time),
            reading: Some(r.reading),
        }
    }
}

/// Batch of readings for one meter, the unit of a store request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReadings {
    #[serde(default)]
    pub smart_meter_id: Option<String>,
    #[serde(default)]
    pub electricity_readings: Option<Vec<RawReading>>,
}

impl MeterReadings {
    pub fn new(meter_id: impl Into<String>, readings: Vec<ElectricityReading>) -> Self {
        MeterReadings {
            smart_meter_id: Some(meter_id.into()),
            electricity_readings: Some(readings.into_iter().map(RawReading::from).collect()),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Smart meter id is not valid {0}")]
pub struct InvalidMeterId(pub String);

/// Identifier of the form `smart-meter-<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MeterId(String);

impl MeterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MeterId {
    type Err = InvalidMeterId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(METER_ID_PREFIX) {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(MeterId(s.to_string()))
            }
            _ => Err(InvalidMeterId(s.to_string())),
        }
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MeterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
