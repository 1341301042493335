use std::{collections::BTreeMap, sync::Arc};

use meter_domain::{ElectricityReading, PricePlan};
use rust_decimal::{Decimal, RoundingStrategy};
use time::UtcOffset;

use crate::{error::PricingError, store::ReadingStore};

const NANOS_PER_HOUR: i128 = 3_600_000_000_000;

/// Plan name to average cost per hour.
pub type CostPerPlan = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostSettings {
    /// Decimal places kept in an average cost (round half up).
    pub scale: u32,
    /// Offset in which tariff windows are read.
    pub tariff_offset: UtcOffset,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            scale: 2,
            tariff_offset: UtcOffset::UTC,
        }
    }
}

/// Prices a meter's readings under every configured plan.
#[derive(Clone)]
pub struct CostEngine {
    store: Arc<ReadingStore>,
    plans: Arc<[PricePlan]>,
    settings: CostSettings,
}

impl CostEngine {
    pub fn new(store: Arc<ReadingStore>, plans: Vec<PricePlan>, settings: CostSettings) -> Self {
        Self {
            store,
            plans: plans.into(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.store
    }

    /// Average cost of the meter's readings for each plan.
    ///
    /// All plans are priced against one snapshot of the readings.
    pub fn cost_per_plan(&self, meter_id: &str) -> Result<CostPerPlan, PricingError> {
        let Some(readings) = self.store.get(meter_id) else {
            tracing::error!(meter_id, "cannot compute cost per plan, no readings found");
            metrics::counter!("cost_no_readings_total").increment(1);
            return Err(PricingError::NoReadings(meter_id.to_string()));
        };

        let elapsed = elapsed_nanos(&readings);
        if elapsed == 0 {
            tracing::warn!(meter_id, readings = readings.len(), "readings span zero time");
            return Err(PricingError::ZeroDuration(meter_id.to_string()));
        }

        let costs = self
            .plans
            .iter()
            .map(|plan| {
                let cost = average_cost(&readings, plan, elapsed, &self.settings)
                    .ok_or_else(|| PricingError::CostOverflow { plan: plan.name.clone() })?;
                Ok((plan.name.clone(), cost))
            })
            .collect::<Result<CostPerPlan, PricingError>>()?;

        tracing::debug!(meter_id, readings = readings.len(), plans = costs.len(), "computed cost per plan");
        Ok(costs)
    }
}

/// Sum of `reading * price` with each price looked up at that reading's own time.
pub fn total_cost(readings: &[ElectricityReading], plan: &PricePlan, tariff_offset: UtcOffset) -> Option<Decimal> {
    readings.iter().try_fold(Decimal::ZERO, |acc, r| {
        let price = plan.price_at(r.time.to_offset(tariff_offset))?;
        acc.checked_add(r.reading.checked_mul(price)?)
    })
}

/// Nanoseconds between the earliest and the latest reading, regardless of
/// the order they were stored in. Zero only when every reading shares one
/// timestamp.
pub fn elapsed_nanos(readings: &[ElectricityReading]) -> i128 {
    let min = readings.iter().map(|r| r.time).min();
    let max = readings.iter().map(|r| r.time).max();
    match (min, max) {
        (Some(min), Some(max)) => (max - min).whole_nanoseconds(),
        _ => 0,
    }
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Total cost divided by elapsed hours, rounded half up to `settings.scale`.
///
/// `None` on decimal overflow or when `elapsed_nanos` is not positive.
pub fn average_cost(
    readings: &[ElectricityReading],
    plan: &PricePlan,
    elapsed_nanos: i128,
    settings: &CostSettings,
) -> Option<Decimal> {
    if elapsed_nanos <= 0 {
        return None;
    }
    let total = total_cost(readings, plan, settings.tariff_offset)?;

    // average = total * (NANOS_PER_HOUR / g) / (elapsed_nanos / g)
    let g = gcd(NANOS_PER_HOUR, elapsed_nanos);
    let per_hour = Decimal::try_from_i128_with_scale(NANOS_PER_HOUR / g, 0).ok()?;
    let span = Decimal::try_from_i128_with_scale(elapsed_nanos / g, 0).ok()?;

    // Multiplying first keeps the quotient exact; divide first only when the
    // product does not fit.
    let average = match total.checked_mul(per_hour) {
        Some(scaled) => scaled.checked_div(span)?,
        None => total.checked_div(span)?.checked_mul(per_hour)?,
    };

    let mut rounded = average.round_dp_with_strategy(settings.scale, RoundingStrategy::MidpointAwayFromZero);
    // Pad exact results so every cost carries the same number of places.
    rounded.rescale(settings.scale);
    Some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_domain::{MeterReadings, PeakTimeMultiplier};
    use rust_decimal_macros::dec;
    use time::{
        macros::{datetime, offset},
        Duration, OffsetDateTime,
    };

    const T0: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);

    fn reading(offset_minutes: i64, quantity: Decimal) -> ElectricityReading {
        ElectricityReading {
            time: T0 + Duration::minutes(offset_minutes),
            reading: quantity,
        }
    }

    fn engine_with(readings: Vec<ElectricityReading>, plans: Vec<PricePlan>, settings: CostSettings) -> CostEngine {
        let store = Arc::new(ReadingStore::new());
        store.store(MeterReadings::new("smart-meter-0", readings)).unwrap();
        CostEngine::new(store, plans, settings)
    }

    #[test]
    fn flat_rate_over_one_hour() {
        let engine = engine_with(
            vec![reading(0, dec!(1.0)), reading(60, dec!(1.0))],
            vec![PricePlan::flat("flat", dec!(2.0))],
            CostSettings::default(),
        );

        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert_eq!(costs.get("flat"), Some(&dec!(4.00)));
        assert_eq!(costs["flat"].to_string(), "4.00");
    }

    #[test]
    fn unknown_meter_fails_with_no_readings() {
        let engine = CostEngine::new(Arc::new(ReadingStore::new()), vec![PricePlan::flat("flat", dec!(1))], CostSettings::default());
        assert_eq!(
            engine.cost_per_plan("smart-meter-1"),
            Err(PricingError::NoReadings("smart-meter-1".to_string()))
        );
    }

    #[test]
    fn single_timestamp_fails_with_zero_duration() {
        let engine = engine_with(
            vec![reading(0, dec!(1)), reading(0, dec!(2))],
            vec![PricePlan::flat("flat", dec!(1))],
            CostSettings::default(),
        );
        assert_eq!(
            engine.cost_per_plan("smart-meter-0"),
            Err(PricingError::ZeroDuration("smart-meter-0".to_string()))
        );
    }

    #[test]
    fn elapsed_time_ignores_store_order() {
        let readings = vec![reading(90, dec!(1)), reading(0, dec!(1)), reading(45, dec!(1))];
        assert_eq!(elapsed_nanos(&readings), 90 * 60 * 1_000_000_000);
    }

    #[test]
    fn sub_millisecond_span_is_not_zero() {
        let engine = engine_with(
            vec![
                ElectricityReading { time: T0, reading: dec!(1) },
                ElectricityReading { time: T0 + Duration::microseconds(500), reading: dec!(1) },
            ],
            vec![PricePlan::flat("flat", dec!(1))],
            CostSettings::default(),
        );

        // 2 units over 500µs is 14 400 000 per hour.
        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert_eq!(costs["flat"], dec!(14400000.00));
    }

    #[test]
    fn elapsed_time_keeps_sub_millisecond_fractions() {
        let plan = PricePlan::flat("flat", dec!(1));
        let readings = vec![
            ElectricityReading { time: T0, reading: dec!(0.0001) },
            ElectricityReading { time: T0 + Duration::microseconds(1_999), reading: dec!(0) },
        ];
        let elapsed = elapsed_nanos(&readings);

        assert_eq!(elapsed, 1_999_000);
        // 0.0001 * 3 600 000 000 / 1 999 000 = 180.0900...
        assert_eq!(average_cost(&readings, &plan, elapsed, &CostSettings::default()), Some(dec!(180.09)));
    }

    #[test]
    fn price_is_looked_up_per_reading() {
        // Peak from 01:00, so only the second reading pays double.
        let plan = PricePlan::flat("tou", dec!(1)).with_peak(PeakTimeMultiplier::daily(1, 24, dec!(2)));
        let readings = vec![reading(0, dec!(3)), reading(60, dec!(5))];

        assert_eq!(total_cost(&readings, &plan, UtcOffset::UTC), Some(dec!(13)));
    }

    #[test]
    fn tariff_offset_shifts_the_peak_window() {
        let plan = PricePlan::flat("tou", dec!(1)).with_peak(PeakTimeMultiplier::daily(1, 24, dec!(2)));
        let readings = vec![reading(0, dec!(3)), reading(60, dec!(5))];

        // At +01:00 both readings fall inside the window.
        assert_eq!(total_cost(&readings, &plan, offset!(+1)), Some(dec!(16)));
    }

    #[test]
    fn average_rounds_half_up_at_configured_scale() {
        let plan = PricePlan::flat("flat", dec!(1));
        // 0.125 over one hour.
        let readings = vec![reading(0, dec!(0.0625)), reading(60, dec!(0.0625))];
        let elapsed = elapsed_nanos(&readings);

        let two_places = CostSettings::default();
        assert_eq!(average_cost(&readings, &plan, elapsed, &two_places), Some(dec!(0.13)));

        let four_places = CostSettings { scale: 4, ..CostSettings::default() };
        assert_eq!(average_cost(&readings, &plan, elapsed, &four_places), Some(dec!(0.125)));
    }

    #[test]
    fn fractional_hours_divide_exactly() {
        let plan = PricePlan::flat("flat", dec!(1));
        // total 1.0 over 20 minutes is 3.00 per hour.
        let readings = vec![reading(0, dec!(0.5)), reading(20, dec!(0.5))];
        let elapsed = elapsed_nanos(&readings);

        assert_eq!(average_cost(&readings, &plan, elapsed, &CostSettings::default()), Some(dec!(3.00)));
    }

    #[test]
    fn every_plan_gets_an_entry_even_on_ties() {
        let engine = engine_with(
            vec![reading(0, dec!(1)), reading(60, dec!(1))],
            vec![
                PricePlan::flat("a", dec!(1)),
                PricePlan::flat("b", dec!(1)),
                PricePlan::flat("c", dec!(3)),
            ],
            CostSettings::default(),
        );

        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert_eq!(costs.len(), 3);
        assert_eq!(costs["a"], costs["b"]);
    }

    #[test]
    fn dearer_rates_never_give_a_cheaper_average() {
        let cheap = PricePlan::flat("cheap", dec!(0.5)).with_peak(PeakTimeMultiplier::daily(0, 12, dec!(2)));
        let dear = PricePlan::flat("dear", dec!(1.5)).with_peak(PeakTimeMultiplier::daily(6, 18, dec!(1.2)));
        let readings: Vec<_> = (0..48).map(|i| reading(i * 30, Decimal::from(i % 7) / dec!(3))).collect();

        for r in &readings {
            assert!(dear.price_at(r.time).unwrap() >= cheap.price_at(r.time).unwrap());
        }

        let engine = engine_with(readings, vec![cheap, dear], CostSettings::default());
        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert!(costs["dear"] >= costs["cheap"]);
    }

    #[test]
    fn overflow_is_reported_per_plan() {
        let engine = engine_with(
            vec![reading(0, Decimal::MAX), reading(60, Decimal::MAX)],
            vec![PricePlan::flat("huge", dec!(10))],
            CostSettings::default(),
        );
        assert_eq!(
            engine.cost_per_plan("smart-meter-0"),
            Err(PricingError::CostOverflow { plan: "huge".to_string() })
        );
    }

    #[test]
    fn large_total_with_representable_average() {
        let engine = engine_with(
            vec![reading(0, Decimal::from_i128_with_scale(10_i128.pow(23), 0)), reading(600, dec!(0))],
            vec![PricePlan::flat("flat", dec!(1))],
            CostSettings::default(),
        );

        // 1e23 over 10 hours.
        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert_eq!(costs["flat"], Decimal::from_i128_with_scale(10_i128.pow(22), 0));
    }

    #[test]
    fn large_total_over_an_uneven_span_divides_first() {
        let end = T0 + Duration::hours(1) + Duration::nanoseconds(1);
        let engine = engine_with(
            vec![
                ElectricityReading { time: T0, reading: Decimal::from_i128_with_scale(10_i128.pow(23), 0) },
                ElectricityReading { time: end, reading: dec!(0) },
            ],
            vec![PricePlan::flat("flat", dec!(1))],
            CostSettings::default(),
        );

        // 1e23 * 3.6e12 does not fit, the average just under 1e23 does.
        let costs = engine.cost_per_plan("smart-meter-0").unwrap();
        assert_eq!(costs["flat"], Decimal::from_i128_with_scale(9_999_999_999_997_222_222_222_223, 2));
    }

    #[test]
    fn unrepresentable_peak_price_is_an_overflow() {
        let plan = PricePlan::flat("peaky", Decimal::MAX).with_peak(PeakTimeMultiplier::daily(0, 24, dec!(2)));
        let engine = engine_with(vec![reading(0, dec!(1)), reading(60, dec!(1))], vec![plan], CostSettings::default());

        assert_eq!(
            engine.cost_per_plan("smart-meter-0"),
            Err(PricingError::CostOverflow { plan: "peaky".to_string() })
        );
    }
}
