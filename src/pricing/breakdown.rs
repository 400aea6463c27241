use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Material,
    Labor,
    Equipment,
    Subcontract,
    Other,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 5] = [
        ResourceCategory::Material,
        ResourceCategory::Labor,
        ResourceCategory::Equipment,
        ResourceCategory::Subcontract,
        ResourceCategory::Other,
    ];

    /// Parse a resource type name, accepting the Spanish labels used in
    /// GEB data as well
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "material" | "materials" | "materiales" => Some(Self::Material),
            "labor" | "labour" | "mano de obra" => Some(Self::Labor),
            "equipment" | "equipo" | "equipos" => Some(Self::Equipment),
            "subcontract" | "subcontrato" | "subcontratos" => Some(Self::Subcontract),
            "other" | "otros" | "transport" | "overhead" => Some(Self::Other),
            _ => None,
        }
    }

    /// Infer a category from a resource code such as `MAT-001` or `MO-12`
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        if code.starts_with("MAT") {
            Self::Material
        } else if code.starts_with("MO") || code.starts_with("LAB") {
            Self::Labor
        } else if code.starts_with("EQ") {
            Self::Equipment
        } else if code.starts_with("SC") || code.starts_with("SUB") {
            Self::Subcontract
        } else {
            Self::Other
        }
    }
}

/// One resource line of a unit-price analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_cost: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Precomputed total; derived from quantity, unit cost and efficiency when absent
    #[serde(default)]
    pub total_cost: Option<f64>,
}

fn default_efficiency() -> f64 {
    1.0
}

impl LineItem {
    pub fn total_cost(&self) -> f64 {
        self.total_cost
            .unwrap_or(self.quantity * self.unit_cost * self.efficiency)
    }

    /// Category from the type field, falling back to the code prefix
    pub fn category(&self) -> ResourceCategory {
        self.resource_type
            .as_deref()
            .and_then(ResourceCategory::from_type_name)
            .unwrap_or_else(|| ResourceCategory::from_code(&self.code))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub cost: f64,
    /// Share of the total direct cost, percent
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material: CategoryTotal,
    pub labor: CategoryTotal,
    pub equipment: CategoryTotal,
    pub subcontract: CategoryTotal,
    pub other: CategoryTotal,
    pub total_direct_cost: f64,
}

impl CostBreakdown {
    pub fn get(&self, category: ResourceCategory) -> &CategoryTotal {
        match category {
            ResourceCategory::Material => &self.material,
            ResourceCategory::Labor => &self.labor,
            ResourceCategory::Equipment => &self.equipment,
            ResourceCategory::Subcontract => &self.subcontract,
            ResourceCategory::Other => &self.other,
        }
    }

    fn get_mut(&mut self, category: ResourceCategory) -> &mut CategoryTotal {
        match category {
            ResourceCategory::Material => &mut self.material,
            ResourceCategory::Labor => &mut self.labor,
            ResourceCategory::Equipment => &mut self.equipment,
            ResourceCategory::Subcontract => &mut self.subcontract,
            ResourceCategory::Other => &mut self.other,
        }
    }
}

/// Sum item costs per resource category. Categories without items stay at zero.
pub fn aggregate(items: &[LineItem]) -> CostBreakdown {
    let mut breakdown = CostBreakdown::default();

    for item in items {
        let cost = item.total_cost();
        breakdown.get_mut(item.category()).cost += cost;
        breakdown.total_direct_cost += cost;
    }

    if breakdown.total_direct_cost > 0.0 {
        let total = breakdown.total_direct_cost;
        for category in ResourceCategory::ALL {
            let entry = breakdown.get_mut(category);
            entry.percentage = entry.cost / total * 100.0;
        }
    }

    breakdown
}
