use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::path::Path;

use super::matrix::{CostMatrix, MatrixType, VolumeTier, VolumeTiers};
use crate::error::AppError;

/// The fixed set of cost matrices a pricing session can choose from
#[derive(Debug, Clone)]
pub struct MatrixCatalog {
    matrices: Vec<CostMatrix>,
}

impl MatrixCatalog {
    pub fn new(matrices: Vec<CostMatrix>) -> Result<Self, AppError> {
        if matrices.is_empty() {
            return Err(AppError::ConfigError(
                "Cost matrix catalog cannot be empty".to_string(),
            ));
        }
        if matrices.iter().filter(|m| m.is_default).count() > 1 {
            return Err(AppError::ConfigError(
                "Only one cost matrix can be marked as default".to_string(),
            ));
        }
        Ok(Self { matrices })
    }

    /// Catalog shipped with the gateway
    pub fn builtin() -> Self {
        Self {
            matrices: vec![standard_2024()],
        }
    }

    /// Load a JSON array of matrices
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let matrices: Vec<CostMatrix> = serde_json::from_str(&content).map_err(|e| {
            AppError::ConfigError(format!("Invalid matrix file {}: {}", path.display(), e))
        })?;
        Self::new(matrices)
    }

    pub fn all(&self) -> &[CostMatrix] {
        &self.matrices
    }

    /// Matrices in force on `date`, in catalog order
    pub fn effective_on(&self, date: NaiveDate) -> impl Iterator<Item = &CostMatrix> {
        self.matrices.iter().filter(move |m| m.is_effective_on(date))
    }

    /// The default matrix in force today, see `default_matrix_on`
    pub fn default_matrix(&self) -> Option<&CostMatrix> {
        self.default_matrix_on(today())
    }

    /// The matrix flagged as default, or the first one, among those in
    /// force on `date`
    pub fn default_matrix_on(&self, date: NaiveDate) -> Option<&CostMatrix> {
        self.effective_on(date)
            .find(|m| m.is_default)
            .or_else(|| self.effective_on(date).next())
    }

    pub fn find(&self, selector: &str) -> Result<&CostMatrix, AppError> {
        self.find_on(selector, today())
    }

    /// Look up by exact name (case-insensitive), then by matrix type.
    /// Matrices not yet effective or already expired on `date` never match.
    pub fn find_on(&self, selector: &str, date: NaiveDate) -> Result<&CostMatrix, AppError> {
        if let Some(matrix) = self
            .effective_on(date)
            .find(|m| m.name.eq_ignore_ascii_case(selector))
        {
            return Ok(matrix);
        }

        selector
            .parse::<MatrixType>()
            .ok()
            .and_then(|kind| self.effective_on(date).find(|m| m.matrix_type == kind))
            .ok_or_else(|| AppError::MatrixNotFound(selector.to_string()))
    }

    pub fn select(&self, selector: Option<&str>) -> Result<&CostMatrix, AppError> {
        self.select_on(selector, today())
    }

    /// `find_on` when a selector is given, the default matrix otherwise
    pub fn select_on(&self, selector: Option<&str>, date: NaiveDate) -> Result<&CostMatrix, AppError> {
        match selector {
            Some(selector) => self.find_on(selector, date),
            None => self
                .default_matrix_on(date)
                .ok_or_else(|| AppError::MatrixNotFound("default".to_string())),
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn table(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn standard_2024() -> CostMatrix {
    let mut volume_tiers = VolumeTiers::new();
    volume_tiers.push("tier1", VolumeTier { min: 0.0, max: Some(50_000.0), discount: 0.0 });
    volume_tiers.push("tier2", VolumeTier { min: 50_000.0, max: Some(200_000.0), discount: 5.0 });
    volume_tiers.push("tier3", VolumeTier { min: 200_000.0, max: Some(500_000.0), discount: 10.0 });
    volume_tiers.push("tier4", VolumeTier { min: 500_000.0, max: None, discount: 15.0 });

    CostMatrix {
        name: "Matriz Estándar 2024".to_string(),
        matrix_type: MatrixType::Standard,
        base_margin: 20.0,
        administrative_overhead: 15.0,
        complexity_multipliers: table(&[
            ("simple", 1.0),
            ("moderate", 1.2),
            ("complex", 1.5),
            ("critical", 2.0),
        ]),
        volume_tiers,
        seasonal_adjustments: table(&[
            ("1", 1.0),
            ("2", 0.95),
            ("3", 0.9),
            ("4", 0.9),
            ("5", 1.0),
            ("6", 1.05),
            ("7", 1.1),
            ("8", 1.1),
            ("9", 1.05),
            ("10", 1.0),
            ("11", 0.95),
            ("12", 1.2),
        ]),
        location_multipliers: table(&[
            ("lima", 1.0),
            ("provincia", 1.15),
            ("selva", 1.30),
            ("sierra", 1.20),
        ]),
        risk_premiums: table(&[
            ("low", 0.0),
            ("medium", 5.0),
            ("high", 15.0),
            ("critical", 25.0),
        ]),
        is_default: true,
        effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        expiry_date: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_builtin_default_is_standard() {
        let catalog = MatrixCatalog::builtin();
        let matrix = catalog.default_matrix().unwrap();
        assert_eq!(matrix.matrix_type, MatrixType::Standard);
        assert_eq!(matrix.volume_tiers.len(), 4);
    }

    #[test]
    fn test_find_by_name_or_type() {
        let catalog = MatrixCatalog::builtin();
        assert!(catalog.find("matriz estándar 2024").is_ok());
        assert!(catalog.find("standard").is_ok());
        assert!(matches!(
            catalog.find("premium"),
            Err(AppError::MatrixNotFound(_))
        ));
    }

    #[test]
    fn test_select_without_selector_uses_default() {
        let catalog = MatrixCatalog::builtin();
        assert_eq!(catalog.select(None).unwrap().name, "Matriz Estándar 2024");
    }

    #[test]
    fn test_expired_matrices_are_not_selectable() {
        let mut expired = standard_2024();
        expired.name = "Matriz 2023".to_string();
        expired.effective_date = date(2023, 1, 1);
        expired.expiry_date = Some(date(2024, 1, 1));
        let mut current = standard_2024();
        current.is_default = false;
        current.matrix_type = MatrixType::Economy;
        expired.is_default = true;
        let catalog = MatrixCatalog::new(vec![expired, current]).unwrap();

        let in_2023 = date(2023, 6, 1);
        assert_eq!(catalog.select_on(None, in_2023).unwrap().name, "Matriz 2023");

        // The flagged default has expired: the first matrix still in force wins
        let in_2024 = date(2024, 6, 1);
        let selected = catalog.select_on(None, in_2024).unwrap();
        assert_eq!(selected.matrix_type, MatrixType::Economy);
        assert!(matches!(
            catalog.find_on("Matriz 2023", in_2024),
            Err(AppError::MatrixNotFound(_))
        ));
        assert!(catalog.find_on("standard", in_2024).is_err());
        assert_eq!(catalog.effective_on(in_2024).count(), 1);
    }

    #[test]
    fn test_nothing_selectable_before_any_effective_date() {
        let catalog = MatrixCatalog::builtin();
        let before = date(2023, 12, 31);
        assert!(catalog.default_matrix_on(before).is_none());
        assert!(matches!(
            catalog.select_on(None, before),
            Err(AppError::MatrixNotFound(_))
        ));
    }

    #[test]
    fn test_catalog_rejects_two_defaults() {
        let matrices = vec![standard_2024(), standard_2024()];
        assert!(MatrixCatalog::new(matrices).is_err());
        assert!(MatrixCatalog::new(vec![]).is_err());
    }

    #[test]
    fn test_builtin_survives_json_round_trip_order() {
        let json = serde_json::to_string(MatrixCatalog::builtin().all()).unwrap();
        let matrices: Vec<CostMatrix> = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = matrices[0].volume_tiers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["tier1", "tier2", "tier3", "tier4"]);
    }
}
