pub mod domain;

pub use domain::{ElectricityReading, InvalidMeterId, MeterId, MeterReadings, PeakTimeMultiplier, PricePlan, RawReading};
