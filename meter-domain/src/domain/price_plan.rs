use rust_decimal::Decimal;
use time::{OffsetDateTime, Weekday};

/// Scales a plan's unit rate during a window of the week.
///
/// The window covers `from_hour..to_hour` (end exclusive) on each of `days`;
/// an empty `days` list means every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakTimeMultiplier {
    pub days: Vec<Weekday>,
    pub from_hour: u8,
    pub to_hour: u8,
    pub multiplier: Decimal,
}

impl PeakTimeMultiplier {
    pub fn all_day(day: Weekday, multiplier: Decimal) -> Self {
        PeakTimeMultiplier {
            days: vec![day],
            from_hour: 0,
            to_hour: 24,
            multiplier,
        }
    }

    pub fn daily(from_hour: u8, to_hour: u8, multiplier: Decimal) -> Self {
        PeakTimeMultiplier {
            days: Vec::new(),
            from_hour,
            to_hour,
            multiplier,
        }
    }

    pub fn applies_to(&self, at: OffsetDateTime) -> bool {
        let day_matches = self.days.is_empty() || self.days.contains(&at.weekday());
        day_matches && (self.from_hour..self.to_hour).contains(&at.hour())
    }
}

/// A named time-of-use tariff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePlan {
    pub name: String,
    pub energy_supplier: Option<String>,
    pub unit_rate: Decimal,
    pub peak_time_multipliers: Vec<PeakTimeMultiplier>,
}

impl PricePlan {
    pub fn flat(name: impl Into<String>, unit_rate: Decimal) -> Self {
        PricePlan {
            name: name.into(),
            energy_supplier: None,
            unit_rate,
            peak_time_multipliers: Vec::new(),
        }
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.energy_supplier = Some(supplier.into());
        self
    }

    pub fn with_peak(mut self, peak: PeakTimeMultiplier) -> Self {
        self.peak_time_multipliers.push(peak);
        self
    }

    /// Unit price in effect at `at`, read in the offset `at` carries.
    ///
    /// The first matching peak window wins; outside every window the plain
    /// unit rate applies. `None` when the peak price overflows.
    pub fn price_at(&self, at: OffsetDateTime) -> Option<Decimal> {
        match self.peak_time_multipliers.iter().find(|p| p.applies_to(at)) {
            Some(peak) => self.unit_rate.checked_mul(peak.multiplier),
            None => Some(self.unit_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::{datetime, offset};

    #[test]
    fn flat_plan_ignores_time() {
        let plan = PricePlan::flat("flat", dec!(2));
        assert_eq!(plan.price_at(datetime!(2024-01-01 03:00:00 UTC)), Some(dec!(2)));
        assert_eq!(plan.price_at(datetime!(2024-06-15 18:30:00 UTC)), Some(dec!(2)));
    }

    #[test]
    fn weekday_multiplier_applies_on_that_day_only() {
        // 2024-01-01 is a Monday.
        let plan = PricePlan::flat("weekday", dec!(1)).with_peak(PeakTimeMultiplier::all_day(Weekday::Monday, dec!(10)));

        assert_eq!(plan.price_at(datetime!(2024-01-01 12:00:00 UTC)), Some(dec!(10)));
        assert_eq!(plan.price_at(datetime!(2024-01-02 12:00:00 UTC)), Some(dec!(1)));
    }

    #[test]
    fn hour_window_is_end_exclusive() {
        let plan = PricePlan::flat("evening", dec!(0.2)).with_peak(PeakTimeMultiplier::daily(17, 20, dec!(1.5)));

        assert_eq!(plan.price_at(datetime!(2024-01-01 16:59:59 UTC)), Some(dec!(0.2)));
        assert_eq!(plan.price_at(datetime!(2024-01-01 17:00:00 UTC)), Some(dec!(0.30)));
        assert_eq!(plan.price_at(datetime!(2024-01-01 19:59:59 UTC)), Some(dec!(0.30)));
        assert_eq!(plan.price_at(datetime!(2024-01-01 20:00:00 UTC)), Some(dec!(0.2)));
    }

    #[test]
    fn first_matching_window_wins() {
        let plan = PricePlan::flat("layered", dec!(1))
            .with_peak(PeakTimeMultiplier::all_day(Weekday::Saturday, dec!(0.5)))
            .with_peak(PeakTimeMultiplier::daily(0, 24, dec!(3)));

        // 2024-01-06 is a Saturday.
        assert_eq!(plan.price_at(datetime!(2024-01-06 09:00:00 UTC)), Some(dec!(0.5)));
        assert_eq!(plan.price_at(datetime!(2024-01-05 09:00:00 UTC)), Some(dec!(3)));
    }

    #[test]
    fn lookup_uses_the_offset_of_the_timestamp() {
        let plan = PricePlan::flat("evening", dec!(1)).with_peak(PeakTimeMultiplier::daily(17, 20, dec!(2)));
        let at = datetime!(2024-01-01 16:30:00 UTC);

        assert_eq!(plan.price_at(at), Some(dec!(1)));
        assert_eq!(plan.price_at(at.to_offset(offset!(+1))), Some(dec!(2)));
    }

    #[test]
    fn overflowing_peak_price_is_none() {
        let plan = PricePlan::flat("huge", Decimal::MAX).with_peak(PeakTimeMultiplier::daily(0, 12, dec!(2)));

        assert_eq!(plan.price_at(datetime!(2024-01-01 06:00:00 UTC)), None);
        assert_eq!(plan.price_at(datetime!(2024-01-01 18:00:00 UTC)), Some(Decimal::MAX));
    }
}
