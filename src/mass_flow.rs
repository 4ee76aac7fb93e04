//! Enthalpy carried by water and solids moving in or out of a layer.
//!
//! Untracked shifts are mass changes the hydrology made without telling the
//! thermal engine what they carried; they are assumed to have the specific
//! enthalpy of the resident material so the layer temperature stays put.
//! Tracked shifts (percolation) come with a known water temperature.

use crate::config::SoilGrid;
use crate::constants::{C_ICE, C_MINERAL, C_WATER, C_WATER2ICE, EPSILON, MM_PER_M, NHEATGRIDP, NSOILLAYER};
use crate::error::ThermalResult;
use crate::phase_transition::{enthalpy_phase, gridpoint_temperatures};
use crate::thermal_properties::{LayerComposition, Phase, ThermalProperties};

/// Signed change of absolute content per layer (mm).
#[derive(Debug, Clone, PartialEq)]
pub struct MassChange {
    pub water_ice_mm: [f64; NSOILLAYER],
    pub solid_mm: [f64; NSOILLAYER],
}

impl MassChange {
    pub fn between(snapshot: &LayerComposition, current: &LayerComposition) -> Self {
        Self {
            water_ice_mm: std::array::from_fn(|l| current.water_ice_mm[l] - snapshot.water_ice_mm[l]),
            solid_mm: std::array::from_fn(|l| current.solid_mm[l] - snapshot.solid_mm[l]),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.water_ice_mm.iter().chain(self.solid_mm.iter()).all(|&d| d == 0.0)
    }
}

/// Volumetric enthalpy (J/m³) of water at `temp`, frozen below 0 °C.
pub fn water_volumetric_enthalpy(temp: f64) -> f64 {
    if temp < 0.0 {
        temp * C_ICE
    } else {
        temp * C_WATER + C_WATER2ICE
    }
}

/// Energy (J/m²) carried by `amount_mm` of water with volumetric enthalpy `vol_enthalpy`.
pub fn water_shift_energy(amount_mm: f64, vol_enthalpy: f64) -> f64 {
    amount_mm / MM_PER_M * vol_enthalpy
}

/// Spread an energy amount (J/m²) evenly over the gridpoints of a layer.
pub fn apply_layer_energy(enthalpy: &mut [f64; NHEATGRIDP], grid: &SoilGrid, layer: usize, joules_per_m2: f64) {
    let per_volume = joules_per_m2 / grid.thickness_m(layer);
    for gp in SoilGrid::gridpoints_of(layer) {
        enthalpy[gp] += per_volume;
    }
}

/// Volumetric enthalpy of the water already resident at a gridpoint.
fn resident_water_enthalpy(enthalpy: f64, latent_heat: f64, temp: f64, water_fraction: f64) -> f64 {
    match enthalpy_phase(enthalpy, latent_heat) {
        Some(Phase::Frozen) => temp * C_ICE,
        Some(Phase::Unfrozen) => temp * C_WATER + C_WATER2ICE,
        // on the plateau solids hold no sensible heat, all enthalpy sits in the water
        None if water_fraction < EPSILON => 0.0,
        None => enthalpy / water_fraction,
    }
}

/// Add the enthalpy of untracked mass changes
///
/// `snapshot` is the content the enthalpy vector was last consistent with and
/// `snapshot_props` its heat capacities. Incoming mass takes the resident
/// specific enthalpy, so temperatures and freeze fractions are unchanged once
/// the properties are recomputed for the new content.
pub fn apply_untracked_mass_shifts(
    enthalpy: &mut [f64; NHEATGRIDP],
    grid: &SoilGrid,
    change: &MassChange,
    snapshot: &LayerComposition,
    snapshot_props: &ThermalProperties,
) -> ThermalResult<()> {
    if change.is_zero() {
        return Ok(());
    }
    let temps = gridpoint_temperatures(enthalpy, snapshot_props)?;
    for gp in 0..NHEATGRIDP {
        let l = SoilGrid::layer_of(gp);
        let d = grid.thickness_mm(l);
        let water_fraction = snapshot.water_ice_mm[l] / d;
        let water_energy =
            resident_water_enthalpy(enthalpy[gp], snapshot_props.latent_heat[gp], temps[gp], water_fraction);
        let solid_energy = C_MINERAL * temps[gp];
        enthalpy[gp] += water_energy * change.water_ice_mm[l] / d + solid_energy * change.solid_mm[l] / d;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConductivityModel;
    use crate::hydrology::HydrologyState;
    use crate::phase_transition::{enthalpy_from_temperatures, layer_freeze_fractions, layer_temperatures};
    use crate::soil_texture::{SoilProfile, TextureClass};
    use crate::thermal_properties::UniformTempSign;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn props_for(grid: &SoilGrid, profile: &SoilProfile, composition: &LayerComposition) -> ThermalProperties {
        ThermalProperties::calculate(
            grid,
            profile,
            composition,
            UniformTempSign::Mixed,
            ConductivityModel::Johansen,
            false,
        )
        .unwrap()
    }

    fn setup(temp: f64) -> (SoilGrid, SoilProfile, LayerComposition, [f64; NHEATGRIDP]) {
        let grid = SoilGrid::default();
        let profile = SoilProfile::uniform(TextureClass::SiltLoam).unwrap();
        let composition = LayerComposition::current(&grid, &profile, &HydrologyState::unfrozen(0.5));
        let props = props_for(&grid, &profile, &composition);
        let enthalpy = enthalpy_from_temperatures(&[temp; NHEATGRIDP], &props).unwrap();
        (grid, profile, composition, enthalpy)
    }

    #[test]
    fn untracked_inflow_keeps_temperature() {
        for temp in [-7.0, 5.0, 18.0] {
            let (grid, profile, snapshot, mut enthalpy) = setup(temp);
            let snapshot_props = props_for(&grid, &profile, &snapshot);
            let mut current = snapshot.clone();
            current.water_ice_mm[0] += 15.0;
            current.water_ice_mm[3] -= 40.0;
            current.solid_mm[2] -= 12.0;

            let change = MassChange::between(&snapshot, &current);
            apply_untracked_mass_shifts(&mut enthalpy, &grid, &change, &snapshot, &snapshot_props).unwrap();

            let props = props_for(&grid, &profile, &current);
            let temps = layer_temperatures(&enthalpy, &props).unwrap();
            for l in 0..NSOILLAYER {
                assert_relative_eq!(temps[l], temp, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn untracked_inflow_on_plateau_keeps_freeze_fraction() {
        let (grid, profile, snapshot, _) = setup(0.0);
        let snapshot_props = props_for(&grid, &profile, &snapshot);
        let mut enthalpy: [f64; NHEATGRIDP] = std::array::from_fn(|gp| 0.3 * snapshot_props.latent_heat[gp]);
        let mut current = snapshot.clone();
        current.water_ice_mm[0] += 15.0;

        let change = MassChange::between(&snapshot, &current);
        apply_untracked_mass_shifts(&mut enthalpy, &grid, &change, &snapshot, &snapshot_props).unwrap();

        let props = props_for(&grid, &profile, &current);
        let ff = layer_freeze_fractions(&enthalpy, &props);
        let temps = layer_temperatures(&enthalpy, &props).unwrap();
        for l in 0..NSOILLAYER {
            assert_abs_diff_eq!(ff[l], 0.7, epsilon = 1e-12);
            assert_eq!(temps[l], 0.0);
        }
    }

    #[test]
    fn tracked_inflow_at_resident_temperature_is_a_no_op() {
        let temp = 5.0;
        let (grid, profile, snapshot, mut enthalpy) = setup(temp);
        let energy = water_shift_energy(15.0, water_volumetric_enthalpy(temp));
        apply_layer_energy(&mut enthalpy, &grid, 0, energy);

        let mut current = snapshot.clone();
        current.water_ice_mm[0] += 15.0;
        let props = props_for(&grid, &profile, &current);
        let temps = layer_temperatures(&enthalpy, &props).unwrap();
        assert_relative_eq!(temps[0], temp, max_relative = 1e-9);
    }

    #[test]
    fn tracked_inflow_mixes_by_heat_capacity() {
        let (t_soil, t_water, amount) = (5.0, 10.0, 15.0);
        let (grid, profile, snapshot, mut enthalpy) = setup(t_soil);
        let old_props = props_for(&grid, &profile, &snapshot);
        let c_soil = old_props.heat_capacity(Phase::Unfrozen, 0).unwrap();
        let depth = grid.thickness_mm(0);

        apply_layer_energy(&mut enthalpy, &grid, 0, water_shift_energy(amount, water_volumetric_enthalpy(t_water)));

        let mut current = snapshot.clone();
        current.water_ice_mm[0] += amount;
        let props = props_for(&grid, &profile, &current);
        let temps = layer_temperatures(&enthalpy, &props).unwrap();
        let expected = (t_soil * c_soil * depth + t_water * C_WATER * amount) / (c_soil * depth + C_WATER * amount);
        assert_relative_eq!(temps[0], expected, max_relative = 1e-9);
        assert_relative_eq!(temps[1], t_soil, max_relative = 1e-12);
    }

    #[test]
    fn frozen_water_carries_no_latent_heat() {
        assert_eq!(water_volumetric_enthalpy(-2.0), -2.0 * C_ICE);
        assert_eq!(water_volumetric_enthalpy(0.0), C_WATER2ICE);
    }

    #[test]
    fn zero_change_is_skipped() {
        let (grid, profile, snapshot, mut enthalpy) = setup(3.0);
        let before = enthalpy;
        let change = MassChange::between(&snapshot, &snapshot);
        assert!(change.is_zero());
        let props = props_for(&grid, &profile, &snapshot);
        apply_untracked_mass_shifts(&mut enthalpy, &grid, &change, &snapshot, &props).unwrap();
        assert_eq!(enthalpy, before);
    }
}
