// src/surface_cover.rs - Snow and litter on top of the soil column
//
// Litter lies on the soil and snow on the litter. Both add their thickness to
// the top element and their thermal resistance in series with it.

use crate::config::SoilGrid;
use crate::constants::{
    DRY_BULK_DENSITY_LITTER, EPSILON, K_LITTER_DRY, K_LITTER_SAT_FROZEN, K_LITTER_SAT_UNFROZEN,
    KERSTEN_MIN_SATURATION, LAMBDA_SNOW, MM_PER_M, NHEATGRIDP, POROSITY_LITTER, SNOWHEIGHT_PER_WATERHEIGHT,
};
use crate::error::{ensure_non_negative, ThermalResult};
use crate::math_utils::lerp;
use crate::thermal_properties::{series_conductivity, Phase, ThermalProperties};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceCover {
    /// snow water equivalent (mm)
    pub snowpack_mm: f64,
    /// above ground litter dry matter (g/m²)
    pub litter_dry_matter_g_m2: f64,
    /// water held in the litter (mm)
    pub litter_moisture_mm: f64,
}

impl SurfaceCover {
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> ThermalResult<()> {
        ensure_non_negative(self.snowpack_mm, None, "snowpack")?;
        ensure_non_negative(self.litter_dry_matter_g_m2, None, "litter dry matter")?;
        ensure_non_negative(self.litter_moisture_mm, None, "litter moisture")
    }

    pub fn snow_depth_m(&self) -> f64 {
        self.snowpack_mm * SNOWHEIGHT_PER_WATERHEIGHT / MM_PER_M
    }

    pub fn litter_depth_m(&self) -> f64 {
        self.litter_dry_matter_g_m2 / 1000.0 / DRY_BULK_DENSITY_LITTER
    }

    pub fn litter_saturation(&self) -> f64 {
        let depth = self.litter_depth_m();
        if self.litter_moisture_mm < EPSILON || depth < EPSILON {
            0.0
        } else {
            (self.litter_moisture_mm / MM_PER_M / (POROSITY_LITTER * depth)).min(1.0)
        }
    }
}

/// Litter conductivity (W/m/K) for organic material (Lawrence and Slater 2008).
/// Water in the litter counts as frozen below 0 °C.
pub fn litter_conductivity(litter_temp: f64, saturation: f64) -> f64 {
    if saturation < EPSILON {
        return K_LITTER_DRY;
    }
    let (k_sat, kersten) = if litter_temp < 0.0 {
        (K_LITTER_SAT_FROZEN, saturation)
    } else {
        let ke = if saturation < KERSTEN_MIN_SATURATION { 0.0 } else { saturation.log10() + 1.0 };
        (K_LITTER_SAT_UNFROZEN, ke)
    };
    (k_sat - K_LITTER_DRY) * kersten + K_LITTER_DRY
}

/// Stretch the top element over snow and litter and put their resistances in
/// series with it, for every conductivity branch that was computed.
pub fn insulate_top_element(
    h: &mut [f64; NHEATGRIDP],
    props: &mut ThermalProperties,
    cover: &SurfaceCover,
    litter_temp: f64,
) {
    let snow = (cover.snow_depth_m(), LAMBDA_SNOW);
    let litter = (
        cover.litter_depth_m(),
        litter_conductivity(litter_temp, cover.litter_saturation()),
    );
    for (depth, k_cover) in [snow, litter] {
        if depth <= 0.0 {
            continue;
        }
        for phase in [Phase::Frozen, Phase::Unfrozen] {
            if let Some(lam) = props.phase_mut(phase).and_then(|p| p.conductivity.as_mut()) {
                lam[0] = series_conductivity(h[0], lam[0], depth, k_cover);
            }
        }
        h[0] += depth;
    }
}

/// Temperatures at the litter and snow midpoints (°C)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverTemperatures {
    pub litter: f64,
    pub snow: f64,
}

/// Linear profile between the top soil gridpoint and the cover surface.
pub fn cover_temperatures(
    grid: &SoilGrid,
    cover: &SurfaceCover,
    top_gridpoint_temp: f64,
    surface_temp: f64,
) -> CoverTemperatures {
    let to_soil_surface = grid.half_element_m(0);
    let litter = cover.litter_depth_m();
    let snow = cover.snow_depth_m();
    let total = to_soil_surface + litter + snow;
    let at = |distance: f64| lerp(top_gridpoint_temp, surface_temp, distance / total);
    CoverTemperatures {
        litter: at(to_soil_surface + litter / 2.0),
        snow: at(total - snow / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConductivityModel;
    use crate::hydrology::HydrologyState;
    use crate::soil_texture::{SoilProfile, TextureClass};
    use crate::thermal_properties::{LayerComposition, UniformTempSign};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn props(sign: UniformTempSign) -> (SoilGrid, ThermalProperties) {
        let grid = SoilGrid::default();
        let profile = SoilProfile::uniform(TextureClass::ClayLoam).unwrap();
        let composition = LayerComposition::current(&grid, &profile, &HydrologyState::unfrozen(0.5));
        let props =
            ThermalProperties::calculate(&grid, &profile, &composition, sign, ConductivityModel::Johansen, true)
                .unwrap();
        (grid, props)
    }

    #[test]
    fn bare_soil_is_unchanged() {
        let (grid, mut props) = props(UniformTempSign::Mixed);
        let before = props.clone();
        let mut h = grid.element_lengths_m();
        insulate_top_element(&mut h, &mut props, &SurfaceCover::bare(), 5.0);
        assert_eq!(props, before);
        assert_eq!(h, grid.element_lengths_m());
    }

    #[test]
    fn snow_adds_series_resistance() {
        let (grid, mut props) = props(UniformTempSign::AllFrozen);
        let mut h = grid.element_lengths_m();
        let h0 = h[0];
        let k0 = props.conductivities(Phase::Frozen).unwrap()[0];
        let cover = SurfaceCover {
            snowpack_mm: 25.0,
            ..SurfaceCover::default()
        };
        insulate_top_element(&mut h, &mut props, &cover, -5.0);

        assert_abs_diff_eq!(h[0], h0 + 0.1, epsilon = 1e-12);
        let k = props.conductivities(Phase::Frozen).unwrap()[0];
        assert_relative_eq!(k, (h0 + 0.1) / (h0 / k0 + 0.1 / LAMBDA_SNOW), max_relative = 1e-12);
        assert!(props.unfrozen.is_none());
    }

    #[test]
    fn litter_conductivity_bounds() {
        assert_eq!(litter_conductivity(5.0, 0.0), K_LITTER_DRY);
        assert_abs_diff_eq!(litter_conductivity(-1.0, 1.0), K_LITTER_SAT_FROZEN, epsilon = 1e-12);
        assert_abs_diff_eq!(litter_conductivity(1.0, 1.0), K_LITTER_SAT_UNFROZEN, epsilon = 1e-12);
        assert_abs_diff_eq!(litter_conductivity(1.0, 0.05), K_LITTER_DRY, epsilon = 1e-12);
    }

    #[test]
    fn litter_saturation_is_capped() {
        let cover = SurfaceCover {
            litter_dry_matter_g_m2: 711.0,
            litter_moisture_mm: 100.0,
            ..SurfaceCover::default()
        };
        assert_abs_diff_eq!(cover.litter_depth_m(), 0.01, epsilon = 1e-12);
        assert_eq!(cover.litter_saturation(), 1.0);
        assert!(SurfaceCover { snowpack_mm: -1.0, ..cover }.validate().is_err());
    }

    #[test]
    fn cover_temperatures_follow_linear_profile() {
        let grid = SoilGrid::default();
        let cover = SurfaceCover {
            snowpack_mm: 2.5,
            litter_dry_matter_g_m2: 1422.0,
            litter_moisture_mm: 0.0,
        };
        // 0.05 m to the soil surface, 0.02 m litter, 0.01 m snow
        let temps = cover_temperatures(&grid, &cover, 0.0, 10.0);
        assert_abs_diff_eq!(temps.litter, 10.0 * 0.06 / 0.08, epsilon = 1e-9);
        assert_abs_diff_eq!(temps.snow, 10.0 * 0.075 / 0.08, epsilon = 1e-9);

        let bare = cover_temperatures(&grid, &SurfaceCover::bare(), -2.0, 4.0);
        assert_abs_diff_eq!(bare.litter, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bare.snow, 4.0, epsilon = 1e-12);
    }
}
