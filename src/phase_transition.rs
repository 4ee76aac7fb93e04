//! Enthalpy inversion: temperature and freeze fraction from the enthalpy
//! vector, and projection of freeze fractions into the hydrology pools.
//!
//! Enthalpy is offset so that 0 is fully frozen at the melting point and the
//! latent heat value is fully thawed at the melting point.

use crate::config::SoilGrid;
use crate::constants::{EPSILON, GPLHEAT, NHEATGRIDP, NSOILLAYER};
use crate::error::ThermalResult;
use crate::hydrology::HydrologyState;
use crate::math_utils::mean;
use crate::soil_texture::SoilProfile;
use crate::thermal_properties::{Phase, ThermalProperties};

/// Which side of the melting plateau an enthalpy value is on.
pub fn enthalpy_phase(enthalpy: f64, latent_heat: f64) -> Option<Phase> {
    if enthalpy <= 0.0 {
        Some(Phase::Frozen)
    } else if enthalpy >= latent_heat {
        Some(Phase::Unfrozen)
    } else {
        None
    }
}

/// Temperature (°C) of one gridpoint. A vanishing heat capacity yields 0.
pub fn enthalpy_to_temperature(enthalpy: f64, latent_heat: f64, c_frozen: f64, c_unfrozen: f64) -> f64 {
    if enthalpy >= latent_heat {
        safe_div(enthalpy - latent_heat, c_unfrozen)
    } else if enthalpy <= 0.0 {
        safe_div(enthalpy, c_frozen)
    } else {
        0.0
    }
}

/// Frozen fraction of the water at one gridpoint, in [0, 1].
pub fn enthalpy_to_freeze_fraction(enthalpy: f64, latent_heat: f64) -> f64 {
    if enthalpy <= 0.0 {
        1.0
    } else if enthalpy >= latent_heat {
        0.0
    } else {
        1.0 - enthalpy / latent_heat
    }
}

/// Enthalpy of a gridpoint at `temp`; below 0 °C the water is frozen,
/// otherwise fully thawed.
pub fn temperature_to_enthalpy(temp: f64, latent_heat: f64, c_frozen: f64, c_unfrozen: f64) -> f64 {
    if temp < 0.0 {
        temp * c_frozen
    } else {
        temp * c_unfrozen + latent_heat
    }
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON { 0.0 } else { numerator / denominator }
}

/// Temperature of every gridpoint. Only the phase branch a gridpoint
/// actually sits in is read from `props`.
pub fn gridpoint_temperatures(
    enthalpy: &[f64; NHEATGRIDP],
    props: &ThermalProperties,
) -> ThermalResult<[f64; NHEATGRIDP]> {
    let mut temps = [0.0; NHEATGRIDP];
    for gp in 0..NHEATGRIDP {
        let latent = props.latent_heat[gp];
        temps[gp] = match enthalpy_phase(enthalpy[gp], latent) {
            Some(Phase::Frozen) => safe_div(enthalpy[gp], props.heat_capacity(Phase::Frozen, gp)?),
            Some(Phase::Unfrozen) => safe_div(enthalpy[gp] - latent, props.heat_capacity(Phase::Unfrozen, gp)?),
            None => 0.0,
        };
    }
    Ok(temps)
}

pub fn gridpoint_freeze_fractions(enthalpy: &[f64; NHEATGRIDP], props: &ThermalProperties) -> [f64; NHEATGRIDP] {
    std::array::from_fn(|gp| enthalpy_to_freeze_fraction(enthalpy[gp], props.latent_heat[gp]))
}

/// Mean of the gridpoint values within each layer.
pub fn layer_means(values: &[f64; NHEATGRIDP]) -> [f64; NSOILLAYER] {
    std::array::from_fn(|l| mean(&values[l * GPLHEAT..(l + 1) * GPLHEAT]))
}

pub fn layer_temperatures(enthalpy: &[f64; NHEATGRIDP], props: &ThermalProperties) -> ThermalResult<[f64; NSOILLAYER]> {
    Ok(layer_means(&gridpoint_temperatures(enthalpy, props)?))
}

pub fn layer_freeze_fractions(enthalpy: &[f64; NHEATGRIDP], props: &ThermalProperties) -> [f64; NSOILLAYER] {
    layer_means(&gridpoint_freeze_fractions(enthalpy, props))
}

/// Enthalpy vector for given gridpoint temperatures.
pub fn enthalpy_from_temperatures(
    temps: &[f64; NHEATGRIDP],
    props: &ThermalProperties,
) -> ThermalResult<[f64; NHEATGRIDP]> {
    let mut enthalpy = [0.0; NHEATGRIDP];
    for gp in 0..NHEATGRIDP {
        let latent = props.latent_heat[gp];
        enthalpy[gp] = if temps[gp] < 0.0 {
            temps[gp] * props.heat_capacity(Phase::Frozen, gp)?
        } else {
            temps[gp] * props.heat_capacity(Phase::Unfrozen, gp)? + latent
        };
    }
    Ok(enthalpy)
}

/// Distribute layer freeze fractions over the hydrology pools
///
/// Capillary water, wilting point water and free water freeze by the same
/// fraction; each pool keeps its total. Layers without water holding
/// capacity keep their capillary values.
pub fn apply_freeze_fractions(
    hydrology: &mut HydrologyState,
    grid: &SoilGrid,
    profile: &SoilProfile,
    freeze_fraction: &[f64; NSOILLAYER],
) {
    for l in 0..NSOILLAYER {
        let ff = freeze_fraction[l].clamp(0.0, 1.0);
        let whcs = profile.whcs(grid, l);
        if whcs >= EPSILON {
            let capillary = hydrology.w[l] * whcs + hydrology.ice_depth[l];
            hydrology.ice_depth[l] = ff * capillary;
            hydrology.w[l] = (1.0 - ff) * capillary / whcs;
        }
        hydrology.ice_pwp[l] = ff;
        let free = hydrology.w_fw[l] + hydrology.ice_fw[l];
        hydrology.ice_fw[l] = ff * free;
        hydrology.w_fw[l] = (1.0 - ff) * free;
        hydrology.freeze_depth[l] = ff * grid.thickness_mm(l);
    }
}
