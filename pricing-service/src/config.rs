use std::{
    collections::{HashMap, HashSet},
    fs,
};

use anyhow::{bail, Context};
use meter_domain::{PeakTimeMultiplier, PricePlan};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::{UtcOffset, Weekday};

use crate::{accounts::AccountDirectory, costing::CostSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostingConfig {
    pub scale: u32,
    pub tariff_utc_offset_hours: i8,
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            tariff_utc_offset_hours: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<DayOfWeek> for Weekday {
    fn from(d: DayOfWeek) -> Self {
        match d {
            DayOfWeek::Monday => Weekday::Monday,
            DayOfWeek::Tuesday => Weekday::Tuesday,
            DayOfWeek::Wednesday => Weekday::Wednesday,
            DayOfWeek::Thursday => Weekday::Thursday,
            DayOfWeek::Friday => Weekday::Friday,
            DayOfWeek::Saturday => Weekday::Saturday,
            DayOfWeek::Sunday => Weekday::Sunday,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeakTimeConfig {
    #[serde(default)]
    pub days: Vec<DayOfWeek>,
    #[serde(default)]
    pub from_hour: u8,
    #[serde(default = "end_of_day")]
    pub to_hour: u8,
    pub multiplier: Decimal,
}

fn end_of_day() -> u8 {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricePlanConfig {
    pub name: String,
    pub energy_supplier: Option<String>,
    pub unit_rate: Decimal,
    #[serde(default)]
    pub peak_time_multipliers: Vec<PeakTimeConfig>,
}

impl From<&PricePlanConfig> for PricePlan {
    fn from(c: &PricePlanConfig) -> Self {
        PricePlan {
            name: c.name.clone(),
            energy_supplier: c.energy_supplier.clone(),
            unit_rate: c.unit_rate,
            peak_time_multipliers: c
                .peak_time_multipliers
                .iter()
                .map(|p| PeakTimeMultiplier {
                    days: p.days.iter().copied().map(Weekday::from).collect(),
                    from_hour: p.from_hour,
                    to_hour: p.to_hour,
                    multiplier: p.multiplier,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub costing: CostingConfig,
    pub price_plans: Vec<PricePlanConfig>,
    /// Meter id to the id of the plan it is subscribed to.
    #[serde(default)]
    pub accounts: HashMap<String, String>,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("PRICING_CONFIG").unwrap_or_else(|_| "pricing-config.toml".to_string());
        let contents = fs::read_to_string(&path).with_context(|| format!("failed to read config file {path}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config file {path}"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.price_plans.is_empty() {
            bail!("at least one price plan must be configured");
        }

        let mut names = HashSet::new();
        for plan in &self.price_plans {
            if !names.insert(plan.name.as_str()) {
                bail!("duplicate price plan name '{}'", plan.name);
            }
            if plan.unit_rate < Decimal::ZERO {
                bail!("price plan '{}' has a negative unit rate", plan.name);
            }
            for peak in &plan.peak_time_multipliers {
                if peak.from_hour >= peak.to_hour || peak.to_hour > 24 {
                    bail!(
                        "price plan '{}' has an invalid peak window {}..{}",
                        plan.name,
                        peak.from_hour,
                        peak.to_hour
                    );
                }
                if peak.multiplier < Decimal::ZERO {
                    bail!("price plan '{}' has a negative peak multiplier", plan.name);
                }
            }
        }

        for (meter_id, plan_id) in &self.accounts {
            if !names.contains(plan_id.as_str()) {
                bail!("account {meter_id} refers to unknown price plan '{plan_id}'");
            }
        }

        Ok(())
    }

    pub fn price_plans(&self) -> Vec<PricePlan> {
        self.price_plans.iter().map(PricePlan::from).collect()
    }

    pub fn accounts(&self) -> AccountDirectory {
        AccountDirectory::new(self.accounts.clone())
    }

    pub fn cost_settings(&self) -> anyhow::Result<CostSettings> {
        let tariff_offset = UtcOffset::from_hms(self.costing.tariff_utc_offset_hours, 0, 0)
            .map_err(|e| anyhow::anyhow!("invalid costing.tariff_utc_offset_hours: {e}"))?;
        Ok(CostSettings {
            scale: self.costing.scale,
            tariff_offset,
        })
    }
}
