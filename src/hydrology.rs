// src/hydrology.rs - Water and ice bookkeeping read by the thermal engine

use crate::config::SoilGrid;
use crate::constants::NSOILLAYER;
use crate::error::{ensure_finite, ensure_non_negative, ThermalError, ThermalResult};
use crate::soil_texture::SoilProfile;
use serde::{Deserialize, Serialize};

/// Per-layer hydrological state owned by the hydrology module.
///
/// The thermal engine reads it every day and writes back the ice partition
/// implied by the freeze fraction of each layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrologyState {
    /// liquid water as a fraction of the water holding capacity
    pub w: [f64; NSOILLAYER],
    /// free (gravitational) liquid water above field capacity (mm)
    pub w_fw: [f64; NSOILLAYER],
    /// ice in the water holding capacity pool (mm)
    pub ice_depth: [f64; NSOILLAYER],
    /// frozen free water (mm)
    pub ice_fw: [f64; NSOILLAYER],
    /// frozen fraction of the water held at wilting point
    pub ice_pwp: [f64; NSOILLAYER],
    /// frozen part of the layer thickness (mm)
    pub freeze_depth: [f64; NSOILLAYER],
}

impl HydrologyState {
    /// Unfrozen soil filled to `w` of its water holding capacity.
    pub fn unfrozen(w: f64) -> Self {
        Self {
            w: [w; NSOILLAYER],
            w_fw: [0.0; NSOILLAYER],
            ice_depth: [0.0; NSOILLAYER],
            ice_fw: [0.0; NSOILLAYER],
            ice_pwp: [0.0; NSOILLAYER],
            freeze_depth: [0.0; NSOILLAYER],
        }
    }

    /// Liquid water of a layer (mm).
    pub fn all_water(&self, grid: &SoilGrid, profile: &SoilProfile, layer: usize) -> f64 {
        self.w[layer] * profile.whcs(grid, layer)
            + profile.wpwps(grid, layer) * (1.0 - self.ice_pwp[layer])
            + self.w_fw[layer]
    }

    /// Ice of a layer (mm).
    pub fn all_ice(&self, grid: &SoilGrid, profile: &SoilProfile, layer: usize) -> f64 {
        self.ice_depth[layer] + profile.wpwps(grid, layer) * self.ice_pwp[layer] + self.ice_fw[layer]
    }

    /// Absolute water plus ice per layer (mm).
    pub fn water_ice_contents(&self, grid: &SoilGrid, profile: &SoilProfile) -> [f64; NSOILLAYER] {
        std::array::from_fn(|l| self.all_water(grid, profile, l) + self.all_ice(grid, profile, l))
    }

    pub fn validate(&self) -> ThermalResult<()> {
        for l in 0..NSOILLAYER {
            ensure_non_negative(self.w[l], Some(l), "water fraction")?;
            ensure_non_negative(self.w_fw[l], Some(l), "free water")?;
            ensure_non_negative(self.ice_depth[l], Some(l), "ice depth")?;
            ensure_non_negative(self.ice_fw[l], Some(l), "free water ice")?;
            ensure_non_negative(self.freeze_depth[l], Some(l), "freeze depth")?;
            ensure_finite(self.ice_pwp[l], Some(l), "wilting point ice fraction")?;
            if !(0.0..=1.0).contains(&self.ice_pwp[l]) {
                return Err(ThermalError::invalid_input(
                    Some(l),
                    format!("wilting point ice fraction {} outside [0, 1]", self.ice_pwp[l]),
                ));
            }
        }
        Ok(())
    }
}
