pub mod meter_readings;
pub mod price_plan;

pub use meter_readings::{ElectricityReading, InvalidMeterId, MeterId, MeterReadings, RawReading};
pub use price_plan::{PeakTimeMultiplier, PricePlan};
