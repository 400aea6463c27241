use chrono::NaiveDate;
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixType {
    Standard,
    Premium,
    Economy,
    Enterprise,
    Government,
    Custom,
}

impl MatrixType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixType::Standard => "standard",
            MatrixType::Premium => "premium",
            MatrixType::Economy => "economy",
            MatrixType::Enterprise => "enterprise",
            MatrixType::Government => "government",
            MatrixType::Custom => "custom",
        }
    }
}

impl std::str::FromStr for MatrixType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(MatrixType::Standard),
            "premium" => Ok(MatrixType::Premium),
            "economy" => Ok(MatrixType::Economy),
            "enterprise" => Ok(MatrixType::Enterprise),
            "government" => Ok(MatrixType::Government),
            "custom" => Ok(MatrixType::Custom),
            _ => Err(format!("Invalid matrix type: {}", s)),
        }
    }
}

impl fmt::Display for MatrixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[min, max)` project-value range mapped to a discount percentage.
/// A missing `max` means the tier is unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub discount: f64,
}

impl VolumeTier {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value < max)
    }
}

/// Named volume tiers that keep the order they were declared in, since
/// the first matching tier wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeTiers(Vec<(String, VolumeTier)>);

impl VolumeTiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, tier: VolumeTier) {
        self.0.push((name.into(), tier));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VolumeTier)> {
        self.0.iter().map(|(name, tier)| (name.as_str(), tier))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for VolumeTiers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, tier) in &self.0 {
            map.serialize_entry(name, tier)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VolumeTiers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TiersVisitor;

        impl<'de> Visitor<'de> for TiersVisitor {
            type Value = VolumeTiers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tier name to {min, max, discount}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut tiers = VolumeTiers::new();
                while let Some((name, tier)) = access.next_entry::<String, VolumeTier>()? {
                    tiers.push(name, tier);
                }
                Ok(tiers)
            }
        }

        deserializer.deserialize_map(TiersVisitor)
    }
}

/// Pricing configuration: margins, overhead and the multiplier tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostMatrix {
    pub name: String,
    pub matrix_type: MatrixType,
    /// Percent
    pub base_margin: f64,
    /// Percent
    pub administrative_overhead: f64,
    #[serde(default)]
    pub complexity_multipliers: HashMap<String, f64>,
    #[serde(default)]
    pub volume_tiers: VolumeTiers,
    /// Month "1".."12" -> multiplier
    #[serde(default)]
    pub seasonal_adjustments: HashMap<String, f64>,
    #[serde(default)]
    pub location_multipliers: HashMap<String, f64>,
    /// Risk level -> premium percent added to the margin
    #[serde(default)]
    pub risk_premiums: HashMap<String, f64>,
    #[serde(default)]
    pub is_default: bool,
    pub effective_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

impl CostMatrix {
    pub fn complexity_factor(&self, complexity: &str) -> f64 {
        self.complexity_multipliers.get(complexity).copied().unwrap_or(1.0)
    }

    pub fn location_factor(&self, location: &str) -> f64 {
        self.location_multipliers.get(location).copied().unwrap_or(1.0)
    }

    pub fn risk_premium(&self, risk_level: &str) -> f64 {
        self.risk_premiums.get(risk_level).copied().unwrap_or(0.0)
    }

    pub fn seasonal_factor(&self, month: u32) -> f64 {
        self.seasonal_adjustments
            .get(&month.to_string())
            .copied()
            .unwrap_or(1.0)
    }

    /// Discount of the first declared tier containing `project_value`, 0 if none
    pub fn volume_discount(&self, project_value: f64) -> f64 {
        self.volume_tiers
            .iter()
            .find(|(_, tier)| tier.contains(project_value))
            .map_or(0.0, |(_, tier)| tier.discount)
    }

    /// In force on `date`: on or after the effective date and before expiry
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_date && self.expiry_date.map_or(true, |expiry| date < expiry)
    }
}
