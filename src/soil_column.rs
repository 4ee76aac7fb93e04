/// Soil column state and the daily thermal update
///
/// A `SoilColumn` owns the enthalpy vector of one stand plus the water/solid
/// content the vector was last consistent with. Every day it
/// 1. converts untracked content changes into enthalpy at resident temperature
/// 2. recomputes properties for today's content
/// 3. conducts heat from the blended surface temperature
/// 4. inverts enthalpy to temperatures and freeze fractions and projects the
///    ice partition into the hydrology state
///
/// Nothing is written to the column or the hydrology until the whole day
/// succeeded.

use crate::config::{SoilGrid, ThermalConfig};
use crate::constants::{CLIMBUFSIZE, DAYS_PER_YEAR, EPSILON, NHEATGRIDP, NSOILLAYER};
use crate::error::{ensure_finite, ensure_non_negative, ColumnId, ThermalError, ThermalResult};
use crate::hydrology::HydrologyState;
use crate::mass_flow::{
    apply_layer_energy, apply_untracked_mass_shifts, water_shift_energy, water_volumetric_enthalpy, MassChange,
};
use crate::math_utils::lerp;
use crate::phase_transition::{
    apply_freeze_fractions, enthalpy_from_temperatures, gridpoint_temperatures, layer_freeze_fractions,
    layer_means,
};
use crate::soil_temp_lag::{soil_temperature_lag, ClimateBuffer, SoilLag};
use crate::soil_texture::SoilProfile;
use crate::surface_cover::{cover_temperatures, insulate_top_element, SurfaceCover};
use crate::thermal_conduction::{conduct_heat_for_a_day, enthalpy_stock, ConductionReport};
use crate::thermal_properties::{volumetric_latent_heat, LayerComposition, ThermalProperties, UniformTempSign};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// Surface forcing of one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyForcing {
    /// temperature at the bare soil or snow surface (°C)
    pub bare_surface_temp: f64,
    /// temperature below the litter (°C)
    pub litter_surface_temp: f64,
    /// fraction of the stand covered by litter
    pub litter_cover: f64,
    pub cover: SurfaceCover,
}

impl DailyForcing {
    pub fn bare(temp: f64) -> Self {
        Self {
            bare_surface_temp: temp,
            litter_surface_temp: temp,
            litter_cover: 0.0,
            cover: SurfaceCover::bare(),
        }
    }

    pub fn surface_temperature(&self) -> f64 {
        lerp(self.bare_surface_temp, self.litter_surface_temp, self.litter_cover)
    }

    pub fn validate(&self) -> ThermalResult<()> {
        ensure_finite(self.bare_surface_temp, None, "bare surface temperature")?;
        ensure_finite(self.litter_surface_temp, None, "litter surface temperature")?;
        ensure_finite(self.litter_cover, None, "litter cover")?;
        if !(0.0..=1.0).contains(&self.litter_cover) {
            return Err(ThermalError::invalid_input(
                None,
                format!("litter cover {} outside [0, 1]", self.litter_cover),
            ));
        }
        self.cover.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub sign: UniformTempSign,
    pub conduction: ConductionReport,
    /// blended boundary temperature (°C)
    pub surface_temp: f64,
    /// stock change minus surface heat (J/m²), when balance checks are on
    pub balance_residual: Option<f64>,
}

/// Persisted part of a column: enough to continue the enthalpy evolution
/// exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCheckpoint {
    pub enthalpy: [f64; NHEATGRIDP],
    pub previous_total_water: [f64; NSOILLAYER],
    pub previous_solid: [f64; NSOILLAYER],
    pub litter_temperature: f64,
}

impl ColumnCheckpoint {
    pub fn to_json(&self) -> ThermalResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> ThermalResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilColumn {
    id: ColumnId,
    enthalpy: [f64; NHEATGRIDP],
    snapshot: LayerComposition,
    temperature: [f64; NSOILLAYER],
    mean_annual_temperature: [f64; NSOILLAYER],
    freeze_fraction: [f64; NSOILLAYER],
    litter_temperature: f64,
    snow_temperature: f64,
    maxthaw_depth_mm: f64,
    mean_maxthaw_mm: f64,
}

impl SoilColumn {
    /// Seed a column from layer temperatures
    ///
    /// Water below 0 °C starts frozen, at or above 0 °C thawed. The implied
    /// ice partition is written into `hydrology`.
    pub fn from_layer_temperatures(
        id: ColumnId,
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        temps: &[f64; NSOILLAYER],
    ) -> ThermalResult<Self> {
        Self::seed(grid, profile, hydrology, temps)
            .map(|mut column| {
                column.id = id;
                column
            })
            .map_err(|e| e.with_column(id))
    }

    pub fn from_uniform_temperature(
        id: ColumnId,
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        temp: f64,
    ) -> ThermalResult<Self> {
        Self::from_layer_temperatures(id, grid, profile, hydrology, &[temp; NSOILLAYER])
    }

    /// Seed a uniform profile at the lagged soil temperature of the climate buffer.
    pub fn from_lagged_temperature(
        id: ColumnId,
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        lag: &SoilLag,
        buffer: &ClimateBuffer,
    ) -> ThermalResult<Self> {
        let temp = soil_temperature_lag(lag, buffer, hydrology.w[0]);
        debug!("{id}: seeding at lagged temperature {temp:.2} C");
        Self::from_uniform_temperature(id, grid, profile, hydrology, temp)
    }

    fn seed(
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        temps: &[f64; NSOILLAYER],
    ) -> ThermalResult<Self> {
        hydrology.validate()?;
        for (l, &t) in temps.iter().enumerate() {
            ensure_finite(t, Some(l), "initial temperature")?;
        }
        let composition = LayerComposition::current(grid, profile, hydrology);
        let props = ThermalProperties::calculate(
            grid,
            profile,
            &composition,
            UniformTempSign::Mixed,
            Default::default(),
            false,
        )?;
        let gp_temps: [f64; NHEATGRIDP] = std::array::from_fn(|gp| temps[SoilGrid::layer_of(gp)]);
        let enthalpy = enthalpy_from_temperatures(&gp_temps, &props)?;
        let freeze_fraction = layer_freeze_fractions(&enthalpy, &props);
        apply_freeze_fractions(hydrology, grid, profile, &freeze_fraction);

        Ok(Self {
            id: ColumnId::default(),
            enthalpy,
            snapshot: composition,
            temperature: *temps,
            mean_annual_temperature: *temps,
            freeze_fraction,
            litter_temperature: temps[0],
            snow_temperature: temps[0],
            maxthaw_depth_mm: 0.0,
            mean_maxthaw_mm: 0.0,
        })
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn enthalpy(&self) -> &[f64; NHEATGRIDP] {
        &self.enthalpy
    }

    /// Layer temperatures after the last day (°C).
    pub fn temperatures(&self) -> &[f64; NSOILLAYER] {
        &self.temperature
    }

    pub fn mean_annual_temperatures(&self) -> &[f64; NSOILLAYER] {
        &self.mean_annual_temperature
    }

    pub fn freeze_fractions(&self) -> &[f64; NSOILLAYER] {
        &self.freeze_fraction
    }

    pub fn litter_temperature(&self) -> f64 {
        self.litter_temperature
    }

    pub fn snow_temperature(&self) -> f64 {
        self.snow_temperature
    }

    /// Deepest thaw of the current year (mm).
    pub fn maxthaw_depth_mm(&self) -> f64 {
        self.maxthaw_depth_mm
    }

    pub fn mean_maxthaw_mm(&self) -> f64 {
        self.mean_maxthaw_mm
    }

    pub fn previous_total_water(&self) -> &[f64; NSOILLAYER] {
        &self.snapshot.water_ice_mm
    }

    pub fn previous_solid(&self) -> &[f64; NSOILLAYER] {
        &self.snapshot.solid_mm
    }

    /// Advance the column by one day
    ///
    /// On error neither the column nor `hydrology` has changed.
    pub fn update_day(
        &mut self,
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        forcing: &DailyForcing,
        config: &ThermalConfig,
    ) -> ThermalResult<DayReport> {
        self.advance_day(grid, profile, hydrology, forcing, config)
            .map_err(|e| e.with_column(self.id))
    }

    fn advance_day(
        &mut self,
        grid: &SoilGrid,
        profile: &SoilProfile,
        hydrology: &mut HydrologyState,
        forcing: &DailyForcing,
        config: &ThermalConfig,
    ) -> ThermalResult<DayReport> {
        hydrology.validate()?;
        forcing.validate()?;
        let current = LayerComposition::current(grid, profile, hydrology);
        current.validate()?;

        let mut enthalpy = self.enthalpy;
        let change = MassChange::between(&self.snapshot, &current);
        if !change.is_zero() {
            let snapshot_props = ThermalProperties::calculate(
                grid,
                profile,
                &self.snapshot,
                UniformTempSign::Mixed,
                config.conductivity_model,
                false,
            )?;
            apply_untracked_mass_shifts(&mut enthalpy, grid, &change, &self.snapshot, &snapshot_props)?;
            debug!("{}: untracked water change {:?} mm", self.id, change.water_ice_mm);
        }

        let surface_temp = forcing.surface_temperature();
        let sign = UniformTempSign::detect(&enthalpy, &volumetric_latent_heat(grid, &current), surface_temp);
        let mut props =
            ThermalProperties::calculate(grid, profile, &current, sign, config.conductivity_model, true)?;
        let mut h = grid.element_lengths_m();
        insulate_top_element(&mut h, &mut props, &forcing.cover, self.litter_temperature);

        let stock_before = enthalpy_stock(&enthalpy, &h);
        let conduction = conduct_heat_for_a_day(sign, &mut enthalpy, &h, surface_temp, &props)?;
        trace!("{}: {:?} day, surface at {surface_temp:.2} C", self.id, sign);

        let balance_residual = if config.balance_enabled() {
            let residual = enthalpy_stock(&enthalpy, &h) - stock_before - conduction.surface_heat;
            let scale = stock_before.abs().max(conduction.surface_heat.abs()).max(1.0);
            if residual.abs() > config.balance_tolerance * scale {
                warn!(
                    "{}: energy balance off by {residual:.3e} J/m2 ({:?} scheme, stock {stock_before:.3e})",
                    self.id, conduction.scheme
                );
            }
            Some(residual)
        } else {
            None
        };

        let gp_temps = gridpoint_temperatures(&enthalpy, &props)?;
        let temperature = layer_means(&gp_temps);
        let freeze_fraction = layer_freeze_fractions(&enthalpy, &props);
        let cover_temps = cover_temperatures(grid, &forcing.cover, gp_temps[0], surface_temp);
        let mut projected = hydrology.clone();
        apply_freeze_fractions(&mut projected, grid, profile, &freeze_fraction);
        let thaw_depth = thaw_depth_mm(grid, &projected);

        self.enthalpy = enthalpy;
        self.snapshot = current;
        for l in 0..NSOILLAYER {
            self.mean_annual_temperature[l] += (temperature[l] - self.mean_annual_temperature[l]) / DAYS_PER_YEAR;
        }
        self.temperature = temperature;
        self.freeze_fraction = freeze_fraction;
        self.litter_temperature = cover_temps.litter;
        self.snow_temperature = cover_temps.snow;
        self.maxthaw_depth_mm = self.maxthaw_depth_mm.max(thaw_depth);
        *hydrology = projected;

        Ok(DayReport {
            sign,
            conduction,
            surface_temp,
            balance_residual,
        })
    }

    /// Percolating water entering `layer` at `water_temp`
    ///
    /// The hydrology has to add the same amount to the layer before the next
    /// `update_day`, which then sees no untracked change for it.
    pub fn apply_percolation(
        &mut self,
        grid: &SoilGrid,
        layer: usize,
        amount_mm: f64,
        water_temp: f64,
    ) -> ThermalResult<()> {
        ensure_finite(water_temp, Some(layer), "percolation temperature")
            .map_err(|e| e.with_column(self.id))?;
        let energy = water_shift_energy(amount_mm, water_volumetric_enthalpy(water_temp));
        self.apply_percolation_energy(grid, layer, energy, amount_mm)
    }

    /// Like `apply_percolation` for callers that already know the energy (J/m²).
    pub fn apply_percolation_energy(
        &mut self,
        grid: &SoilGrid,
        layer: usize,
        joules_per_m2: f64,
        amount_mm: f64,
    ) -> ThermalResult<()> {
        let check = || -> ThermalResult<()> {
            if layer >= NSOILLAYER {
                return Err(ThermalError::invalid_input(Some(layer), "no such layer"));
            }
            ensure_non_negative(amount_mm, Some(layer), "percolation amount")?;
            ensure_finite(joules_per_m2, Some(layer), "percolation energy")
        };
        check().map_err(|e| e.with_column(self.id))?;

        apply_layer_energy(&mut self.enthalpy, grid, layer, joules_per_m2);
        self.snapshot.water_ice_mm[layer] += amount_mm;
        Ok(())
    }

    /// Fold this year's maximum thaw depth into the running mean and start a new year.
    pub fn update_annual(&mut self) {
        self.mean_maxthaw_mm += (self.maxthaw_depth_mm - self.mean_maxthaw_mm) / CLIMBUFSIZE;
        debug!(
            "{}: max thaw {:.0} mm, mean {:.0} mm",
            self.id, self.maxthaw_depth_mm, self.mean_maxthaw_mm
        );
        self.maxthaw_depth_mm = 0.0;
    }

    pub fn checkpoint(&self) -> ColumnCheckpoint {
        ColumnCheckpoint {
            enthalpy: self.enthalpy,
            previous_total_water: self.snapshot.water_ice_mm,
            previous_solid: self.snapshot.solid_mm,
            litter_temperature: self.litter_temperature,
        }
    }

    /// Replace the enthalpy state with a checkpoint; temperatures and freeze
    /// fractions are derived again from the checkpointed content.
    pub fn restore_checkpoint(
        &mut self,
        grid: &SoilGrid,
        profile: &SoilProfile,
        checkpoint: &ColumnCheckpoint,
    ) -> ThermalResult<()> {
        let restore = || -> ThermalResult<([f64; NSOILLAYER], [f64; NSOILLAYER], LayerComposition)> {
            for (gp, &e) in checkpoint.enthalpy.iter().enumerate() {
                ensure_finite(e, Some(SoilGrid::layer_of(gp)), "checkpoint enthalpy")?;
            }
            ensure_finite(checkpoint.litter_temperature, None, "checkpoint litter temperature")?;
            let snapshot = LayerComposition {
                water_ice_mm: checkpoint.previous_total_water,
                solid_mm: checkpoint.previous_solid,
            };
            let props = ThermalProperties::calculate(
                grid,
                profile,
                &snapshot,
                UniformTempSign::Mixed,
                Default::default(),
                false,
            )?;
            let temps = layer_means(&gridpoint_temperatures(&checkpoint.enthalpy, &props)?);
            Ok((temps, layer_freeze_fractions(&checkpoint.enthalpy, &props), snapshot))
        };
        let (temps, freeze_fraction, snapshot) = restore().map_err(|e| e.with_column(self.id))?;

        self.enthalpy = checkpoint.enthalpy;
        self.snapshot = snapshot;
        self.temperature = temps;
        self.freeze_fraction = freeze_fraction;
        self.litter_temperature = checkpoint.litter_temperature;
        debug!("{}: restored checkpoint", self.id);
        Ok(())
    }
}

/// Depth (mm) down to the frozen part of the first layer holding ice.
fn thaw_depth_mm(grid: &SoilGrid, hydrology: &HydrologyState) -> f64 {
    let mut depth = 0.0;
    for l in 0..NSOILLAYER {
        if hydrology.freeze_depth[l] > EPSILON {
            return depth + grid.thickness_mm(l) - hydrology.freeze_depth[l];
        }
        depth += grid.thickness_mm(l);
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil_texture::TextureClass;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use more_asserts::{assert_gt, assert_lt};

    fn loam_column(temp: f64) -> (SoilGrid, SoilProfile, HydrologyState, SoilColumn) {
        let grid = SoilGrid::default();
        let profile = SoilProfile::uniform(TextureClass::Loam).unwrap();
        let mut hydro = HydrologyState::unfrozen(0.5);
        let column =
            SoilColumn::from_uniform_temperature(ColumnId::new(1, 0), &grid, &profile, &mut hydro, temp).unwrap();
        (grid, profile, hydro, column)
    }

    #[test]
    fn steady_day_is_a_no_op() {
        for temp in [-6.0, 0.0, 9.0] {
            let (grid, profile, mut hydro, mut column) = loam_column(temp);
            let before = *column.enthalpy();
            column
                .update_day(&grid, &profile, &mut hydro, &DailyForcing::bare(temp), &ThermalConfig::default())
                .unwrap();
            for gp in 0..NHEATGRIDP {
                assert_relative_eq!(column.enthalpy()[gp], before[gp], max_relative = 1e-12, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn seeding_freezes_cold_layers() {
        let grid = SoilGrid::default();
        let profile = SoilProfile::uniform(TextureClass::Loam).unwrap();
        let mut hydro = HydrologyState::unfrozen(0.5);
        let temps = [-2.0, -1.0, 0.0, 1.0, 2.0, 3.0];
        let column = SoilColumn::from_layer_temperatures(ColumnId::new(0, 0), &grid, &profile, &mut hydro, &temps)
            .unwrap();
        assert_eq!(column.freeze_fractions(), &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(hydro.freeze_depth[0], grid.thickness_mm(0));
        assert_eq!(hydro.ice_pwp[1], 1.0);
        assert_eq!(hydro.ice_depth[3], 0.0);
        assert_eq!(column.temperatures(), &temps);
        assert_eq!(column.litter_temperature(), -2.0);
    }

    #[test]
    fn percolation_mixes_by_heat_capacity() {
        let (grid, profile, mut hydro, mut column) = loam_column(5.0);
        let composition = LayerComposition::current(&grid, &profile, &hydro);
        let props = ThermalProperties::calculate(
            &grid,
            &profile,
            &composition,
            UniformTempSign::Mixed,
            Default::default(),
            false,
        )
        .unwrap();
        let c_soil = props.heat_capacity(crate::thermal_properties::Phase::Unfrozen, 0).unwrap();
        let depth = grid.thickness_mm(0);

        column.apply_percolation(&grid, 0, 15.0, 10.0).unwrap();
        hydro.w_fw[0] += 15.0;
        assert_relative_eq!(column.previous_total_water()[0], composition.water_ice_mm[0] + 15.0);

        // surface held at the expected mix so only the inflow moves layer 0
        let expected = (5.0 * c_soil * depth + 10.0 * crate::constants::C_WATER * 15.0)
            / (c_soil * depth + crate::constants::C_WATER * 15.0);
        let after = LayerComposition::current(&grid, &profile, &hydro);
        let props = ThermalProperties::calculate(&grid, &profile, &after, UniformTempSign::Mixed, Default::default(), false)
            .unwrap();
        let temps = layer_means(&gridpoint_temperatures(column.enthalpy(), &props).unwrap());
        assert_relative_eq!(temps[0], expected, max_relative = 1e-9);
        assert_relative_eq!(temps[1], 5.0, max_relative = 1e-12);
    }

    #[test]
    fn invalid_forcing_leaves_state_untouched() {
        let (grid, profile, mut hydro, mut column) = loam_column(3.0);
        let before = column.clone();
        let hydro_before = hydro.clone();
        let config = ThermalConfig::default();

        let mut forcing = DailyForcing::bare(f64::NAN);
        let err = column.update_day(&grid, &profile, &mut hydro, &forcing, &config).unwrap_err();
        assert!(err.to_string().contains("cell 1 stand 0"));
        forcing = DailyForcing::bare(3.0);
        forcing.litter_cover = 1.5;
        assert!(column.update_day(&grid, &profile, &mut hydro, &forcing, &config).is_err());

        let mut bad_hydro = hydro.clone();
        bad_hydro.w_fw[2] = -1.0;
        let err = column
            .update_day(&grid, &profile, &mut bad_hydro, &DailyForcing::bare(3.0), &config)
            .unwrap_err();
        assert!(matches!(err, ThermalError::InvalidInput { layer: Some(2), .. }));

        assert_eq!(column, before);
        assert_eq!(hydro, hydro_before);
    }

    #[test]
    fn winter_freezes_top_layers_into_hydrology() {
        let (grid, profile, mut hydro, mut column) = loam_column(2.0);
        let config = ThermalConfig::default();
        let water_before = hydro.water_ice_contents(&grid, &profile);
        for _ in 0..90 {
            column
                .update_day(&grid, &profile, &mut hydro, &DailyForcing::bare(-10.0), &config)
                .unwrap();
        }
        assert_gt!(column.freeze_fractions()[0], 0.99);
        assert_lt!(column.temperatures()[0], 0.0);
        assert_gt!(hydro.ice_depth[0], 0.0);
        assert_eq!(column.freeze_fractions()[NSOILLAYER - 1], 0.0);
        let water_after = hydro.water_ice_contents(&grid, &profile);
        for l in 0..NSOILLAYER {
            assert_relative_eq!(water_after[l], water_before[l], max_relative = 1e-9);
        }
        assert_lt!(column.maxthaw_depth_mm(), grid.total_depth_mm());
    }

    #[test]
    fn balance_residual_is_reported_when_enabled() {
        let (grid, profile, mut hydro, mut column) = loam_column(-1.0);
        let config = ThermalConfig {
            check_balance: true,
            ..ThermalConfig::default()
        };
        let report = column
            .update_day(&grid, &profile, &mut hydro, &DailyForcing::bare(6.0), &config)
            .unwrap();
        assert_eq!(report.sign, UniformTempSign::Mixed);
        let residual = report.balance_residual.unwrap();
        let stock = enthalpy_stock(column.enthalpy(), &grid.element_lengths_m()).abs();
        assert_lt!(residual.abs(), 1e-9 * stock.max(1.0));
    }

    #[test]
    fn annual_thaw_depth_mean() {
        let (_, _, _, mut column) = loam_column(5.0);
        column.maxthaw_depth_mm = 2000.0;
        column.update_annual();
        assert_abs_diff_eq!(column.mean_maxthaw_mm(), 100.0);
        assert_eq!(column.maxthaw_depth_mm(), 0.0);
    }

    #[test]
    fn thaw_depth_stops_at_first_frozen_layer() {
        let grid = SoilGrid::default();
        let mut hydro = HydrologyState::unfrozen(0.5);
        assert_eq!(thaw_depth_mm(&grid, &hydro), grid.total_depth_mm());
        hydro.freeze_depth[2] = 100.0;
        assert_abs_diff_eq!(thaw_depth_mm(&grid, &hydro), 200.0 + 300.0 + 400.0);
    }

    #[test]
    fn checkpoint_resumes_bit_for_bit() {
        let (grid, profile, mut hydro, mut column) = loam_column(1.0);
        let config = ThermalConfig::default();
        let forcing = |day: usize| DailyForcing::bare(8.0 * ((day as f64) / 20.0).sin() - 2.0);
        for day in 0..30 {
            column.update_day(&grid, &profile, &mut hydro, &forcing(day), &config).unwrap();
        }

        let json = column.checkpoint().to_json().unwrap();
        let mut resumed_hydro = hydro.clone();
        let (_, _, _, mut resumed) = loam_column(20.0);
        resumed.restore_checkpoint(&grid, &profile, &ColumnCheckpoint::from_json(&json).unwrap()).unwrap();
        assert_eq!(resumed.enthalpy(), column.enthalpy());
        assert_eq!(resumed.temperatures(), column.temperatures());

        for day in 30..60 {
            column.update_day(&grid, &profile, &mut hydro, &forcing(day), &config).unwrap();
            resumed.update_day(&grid, &profile, &mut resumed_hydro, &forcing(day), &config).unwrap();
            assert_eq!(resumed.enthalpy(), column.enthalpy());
        }
    }

    #[test]
    fn percolation_rejects_bad_layer() {
        let (grid, _, _, mut column) = loam_column(1.0);
        let before = column.clone();
        assert!(column.apply_percolation(&grid, NSOILLAYER, 5.0, 3.0).is_err());
        assert!(column.apply_percolation(&grid, 0, -5.0, 3.0).is_err());
        assert!(column.apply_percolation(&grid, 0, 5.0, f64::NAN).is_err());
        assert_eq!(column, before);
    }
}
