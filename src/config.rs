// src/config.rs - Immutable soil grid and engine configuration

use crate::constants::{
    BALANCE_TOLERANCE_REL, DEFAULT_SOIL_DEPTH_MM, GPLHEAT, MM_PER_M, NHEATGRIDP, NSOILLAYER,
};
use crate::error::{ThermalError, ThermalResult};
use serde::{Deserialize, Serialize};

/// Which model turns soil composition into thermal conductivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductivityModel {
    /// Geometric-mean saturated conductivity with Kersten interpolation.
    #[default]
    Johansen,
    /// Saturation-weighted mix of the texture class end members.
    LinearMix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub conductivity_model: ConductivityModel,
    /// Compare enthalpy stocks around every conduction step.
    pub check_balance: bool,
    /// Allowed balance residual relative to the column's enthalpy stock.
    pub balance_tolerance: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            conductivity_model: ConductivityModel::Johansen,
            check_balance: false,
            balance_tolerance: BALANCE_TOLERANCE_REL,
        }
    }
}

impl ThermalConfig {
    pub fn from_json_str(json: &str) -> ThermalResult<Self> {
        let config: ThermalConfig = serde_json::from_str(json)?;
        if !(config.balance_tolerance.is_finite() && config.balance_tolerance >= 0.0) {
            return Err(ThermalError::InvalidConfig(format!(
                "balance_tolerance must be a non-negative number, got {}",
                config.balance_tolerance
            )));
        }
        Ok(config)
    }

    /// Balance checks run when requested here or when the crate is built
    /// with the `check-balance` feature.
    pub fn balance_enabled(&self) -> bool {
        self.check_balance || cfg!(feature = "check-balance")
    }
}

/// Static layer thicknesses shared by every column on the grid
///
/// Each layer is split into `GPLHEAT` equal elements. Gridpoints sit half an
/// element below the layer top and one element apart, so the element above
/// the first gridpoint of a layer straddles the layer border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; NSOILLAYER]", into = "[f64; NSOILLAYER]")]
pub struct SoilGrid {
    thickness_mm: [f64; NSOILLAYER],
}

impl SoilGrid {
    pub fn new(thickness_mm: [f64; NSOILLAYER]) -> ThermalResult<Self> {
        for (layer, &d) in thickness_mm.iter().enumerate() {
            if !(d.is_finite() && d > 0.0) {
                return Err(ThermalError::InvalidConfig(format!(
                    "layer {layer} thickness must be positive, got {d} mm"
                )));
            }
        }
        Ok(Self { thickness_mm })
    }

    pub fn thickness_mm(&self, layer: usize) -> f64 {
        self.thickness_mm[layer]
    }

    pub fn thickness_m(&self, layer: usize) -> f64 {
        self.thickness_mm[layer] / MM_PER_M
    }

    pub fn thicknesses_mm(&self) -> &[f64; NSOILLAYER] {
        &self.thickness_mm
    }

    pub fn total_depth_mm(&self) -> f64 {
        self.thickness_mm.iter().sum()
    }

    pub fn layer_of(gridpoint: usize) -> usize {
        gridpoint / GPLHEAT
    }

    pub fn gridpoints_of(layer: usize) -> std::ops::Range<usize> {
        layer * GPLHEAT..(layer + 1) * GPLHEAT
    }

    /// Distance from a layer border to the nearest gridpoint of that layer (m).
    pub fn half_element_m(&self, layer: usize) -> f64 {
        self.thickness_m(layer) / (2 * GPLHEAT) as f64
    }

    /// Gridpoint depths below the soil surface (m).
    pub fn gridpoint_depths_m(&self) -> [f64; NHEATGRIDP] {
        let mut nodes = [0.0; NHEATGRIDP];
        let mut border = 0.0;
        for layer in 0..NSOILLAYER {
            let d = self.thickness_m(layer);
            for j in 0..GPLHEAT {
                nodes[layer * GPLHEAT + j] = border + d / (2 * GPLHEAT) as f64 + (d / GPLHEAT as f64) * j as f64;
            }
            border += d;
        }
        nodes
    }

    /// Element lengths `h`: `h[0]` is surface to first gridpoint, `h[j]` the
    /// distance between gridpoints `j-1` and `j` (m).
    pub fn element_lengths_m(&self) -> [f64; NHEATGRIDP] {
        let nodes = self.gridpoint_depths_m();
        let mut h = [0.0; NHEATGRIDP];
        for gp in 0..NHEATGRIDP {
            h[gp] = nodes[gp] - if gp > 0 { nodes[gp - 1] } else { 0.0 };
        }
        h
    }
}

impl Default for SoilGrid {
    fn default() -> Self {
        Self {
            thickness_mm: DEFAULT_SOIL_DEPTH_MM,
        }
    }
}

impl TryFrom<[f64; NSOILLAYER]> for SoilGrid {
    type Error = ThermalError;

    fn try_from(thickness_mm: [f64; NSOILLAYER]) -> ThermalResult<Self> {
        SoilGrid::new(thickness_mm)
    }
}

impl From<SoilGrid> for [f64; NSOILLAYER] {
    fn from(grid: SoilGrid) -> Self {
        grid.thickness_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_grid_element_lengths() {
        let grid = SoilGrid::default();
        let h = grid.element_lengths_m();
        // 200 mm layer, two elements of 0.1 m, first gridpoint at 0.05 m
        assert_abs_diff_eq!(h[0], 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(h[1], 0.1, epsilon = 1e-12);
        // straddles the 200/300 mm border: 0.05 + 0.075
        assert_abs_diff_eq!(h[2], 0.125, epsilon = 1e-12);
        let total: f64 = h.iter().sum();
        let nodes = grid.gridpoint_depths_m();
        assert_abs_diff_eq!(total, nodes[NHEATGRIDP - 1], epsilon = 1e-12);
        assert_abs_diff_eq!(grid.total_depth_mm(), 13000.0);
    }

    #[test]
    fn rejects_non_positive_layers() {
        let mut d = DEFAULT_SOIL_DEPTH_MM;
        d[3] = 0.0;
        assert!(SoilGrid::new(d).is_err());
        d[3] = f64::NAN;
        assert!(SoilGrid::new(d).is_err());
    }

    #[test]
    fn grid_deserialization_validates() {
        let grid: SoilGrid = serde_json::from_str("[100, 100, 100, 100, 100, 100]").unwrap();
        assert_eq!(grid.thickness_mm(5), 100.0);
        assert!(serde_json::from_str::<SoilGrid>("[100, -1, 100, 100, 100, 100]").is_err());
    }

    #[test]
    fn config_from_json() {
        let config = ThermalConfig::from_json_str(r#"{"conductivity_model": "linear_mix"}"#).unwrap();
        assert_eq!(config.conductivity_model, ConductivityModel::LinearMix);
        assert!(!config.check_balance);
        assert!(ThermalConfig::from_json_str(r#"{"balance_tolerance": -1.0}"#).is_err());
        assert!(ThermalConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn gridpoint_ranges() {
        assert_eq!(SoilGrid::layer_of(GPLHEAT), 1);
        assert_eq!(SoilGrid::gridpoints_of(2), 2 * GPLHEAT..3 * GPLHEAT);
    }
}
