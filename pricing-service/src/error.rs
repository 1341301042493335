#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Smart meter id is not valid {0}")]
    InvalidMeterId(String),
    #[error("Electricity Readings are not valid: {0}")]
    InvalidReadings(String),
    #[error("No readings were found for meter id {0}")]
    NoReadings(String),
    #[error("Cannot display more than {max} plan recommendations")]
    RecommendationLimitExceeded { max: usize },
    #[error("Readings for meter id {0} span no time, average cost is undefined")]
    ZeroDuration(String),
    #[error("Cost for plan {plan} exceeds the representable range")]
    CostOverflow { plan: String },
}

impl From<meter_domain::InvalidMeterId> for PricingError {
    fn from(e: meter_domain::InvalidMeterId) -> Self {
        PricingError::InvalidMeterId(e.0)
    }
}
