use std::collections::HashMap;

/// Which price plan each meter is currently subscribed to.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    plan_by_meter: HashMap<String, String>,
}

impl AccountDirectory {
    pub fn new(plan_by_meter: HashMap<String, String>) -> Self {
        Self { plan_by_meter }
    }

    pub fn plan_for(&self, meter_id: &str) -> Option<&str> {
        self.plan_by_meter.get(meter_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plan_by_meter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan_by_meter.is_empty()
    }
}

impl FromIterator<(String, String)> for AccountDirectory {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
