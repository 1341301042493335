use std::{collections::HashMap, fs::File, io::Read, path::PathBuf};

use csv::StringRecord;
use meter_domain::{MeterReadings, RawReading};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::SourceError;

/// CSV file of readings for any number of meters.
///
/// Expected header columns (by name):
/// - meter_id
/// - time (RFC3339 timestamp, may be blank)
/// - reading (decimal, may be blank)
///
/// Blank cells are kept as missing values so the store's validation rejects
/// the affected batch rather than the whole file.
pub struct ReadingsCsvFileSource {
    path: PathBuf,
}

impl ReadingsCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<MeterReadings>, SourceError> {
        let file = File::open(&self.path)
            .map_err(|e| SourceError::Io(format!("failed to open {}: {e}", self.path.display())))?;
        read_meter_readings(file)
    }
}

/// One batch per meter, in order of first appearance; rows keep file order
/// within their batch.
pub fn read_meter_readings<R: Read>(reader: R) -> Result<Vec<MeterReadings>, SourceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| SourceError::Csv(format!("failed to read CSV headers: {e}")))?
        .clone();

    let mut batches: Vec<MeterReadings> = Vec::new();
    let mut index_by_meter: HashMap<String, usize> = HashMap::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| SourceError::Csv(format!("failed to read CSV record: {e}")))?;
        let (meter_id, reading) = match record_to_reading(&record, &headers) {
            Ok(parsed) => parsed,
            Err(e) => {
                metrics::counter!("readings_csv_parse_errors_total").increment(1);
                tracing::warn!(line = line + 2, error = %e, "unparseable CSV reading");
                return Err(e);
            }
        };

        let idx = *index_by_meter.entry(meter_id.clone()).or_insert_with(|| {
            batches.push(MeterReadings {
                smart_meter_id: Some(meter_id),
                electricity_readings: Some(Vec::new()),
            });
            batches.len() - 1
        });

        if let Some(readings) = batches[idx].electricity_readings.as_mut() {
            readings.push(reading);
        }
    }

    Ok(batches)
}

fn parse_optional<T>(s: &str, parse: impl FnOnce(&str) -> Result<T, String>) -> Result<Option<T>, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        parse(trimmed).map(Some)
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<(String, RawReading), SourceError> {
    let get = |name: &str| -> Result<&str, SourceError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| SourceError::Csv(format!("missing column '{name}' in CSV record")))
    };

    let meter_id = get("meter_id")?.trim().to_string();

    let time_str = get("time")?;
    let time = parse_optional(time_str, |s| {
        OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).map_err(|e| e.to_string())
    })
    .map_err(|e| SourceError::Csv(format!("invalid time '{time_str}': {e}")))?;

    let reading_str = get("reading")?;
    let reading = parse_optional(reading_str, |s| s.parse::<Decimal>().map_err(|e| e.to_string()))
        .map_err(|e| SourceError::Csv(format!("invalid reading '{reading_str}': {e}")))?;

    Ok((meter_id, RawReading { time, reading }))
}
