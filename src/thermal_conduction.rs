/// Heat conduction integrator for one soil column
///
/// Advances the enthalpy vector through one day of diffusion with a Dirichlet
/// surface temperature and a zero-flux bottom:
/// - profiles that stay on one side of 0 °C use a backward Euler step in
///   temperature, solved as a tridiagonal system
/// - profiles with a phase change anywhere use an explicit enthalpy scheme
///   with Kirchhoff-transformed fluxes and a substep size small enough to keep
///   every update monotone
///
/// Both schemes use the same lumped finite element widths, so the change of
/// `enthalpy_stock` over a day equals the reported surface heat.

use crate::constants::{DIVERGENCE_TOLERANCE_K, EPSILON, GPLHEAT, MAX_CONDUCTION_SUBSTEPS, NHEATGRIDP, SECONDS_PER_DAY};
use crate::error::{ensure_finite, ThermalError, ThermalResult};
use crate::math_utils::solve_tridiagonal;
use crate::phase_transition::gridpoint_temperatures;
use crate::thermal_properties::{Phase, ThermalProperties, UniformTempSign};
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductionScheme {
    ImplicitTemperature,
    ExplicitEnthalpy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductionReport {
    pub scheme: ConductionScheme,
    pub substeps: usize,
    /// heat that entered through the surface during the day (J/m²)
    pub surface_heat: f64,
}

/// Width of soil each gridpoint represents (m): half of each adjacent element,
/// only the upper half element for the bottom gridpoint.
pub fn lumped_widths(h: &[f64; NHEATGRIDP]) -> [f64; NHEATGRIDP] {
    std::array::from_fn(|j| {
        let below = if j + 1 < NHEATGRIDP { h[j + 1] } else { 0.0 };
        (h[j] + below) / 2.0
    })
}

/// Column enthalpy (J/m²) as seen by the conduction schemes.
pub fn enthalpy_stock(enthalpy: &[f64; NHEATGRIDP], h: &[f64; NHEATGRIDP]) -> f64 {
    lumped_widths(h).iter().zip(enthalpy.iter()).map(|(w, e)| w * e).sum()
}

/// Run one day of heat conduction
///
/// `h` holds the element lengths (m), already stretched for snow and litter,
/// and `props` must carry conductivities for every branch `sign` allows.
pub fn conduct_heat_for_a_day(
    sign: UniformTempSign,
    enthalpy: &mut [f64; NHEATGRIDP],
    h: &[f64; NHEATGRIDP],
    top_temp: f64,
    props: &ThermalProperties,
) -> ThermalResult<ConductionReport> {
    ensure_finite(top_temp, None, "surface temperature")?;
    for (gp, &len) in h.iter().enumerate() {
        if !(len.is_finite() && len > 0.0) {
            return Err(ThermalError::invalid_input(
                Some(gp / GPLHEAT),
                format!("element {gp} has length {len} m"),
            ));
        }
    }
    let before = gridpoint_temperatures(enthalpy, props)?;

    let report = match sign {
        UniformTempSign::AllThawed => implicit_temperature_step(Phase::Unfrozen, enthalpy, h, top_temp, props)?,
        UniformTempSign::AllFrozen => implicit_temperature_step(Phase::Frozen, enthalpy, h, top_temp, props)?,
        UniformTempSign::Mixed => explicit_enthalpy_steps(enthalpy, h, top_temp, props)?,
    };
    trace!(
        "conduction {:?}: {} substeps, surface heat {:.3e} J/m2",
        report.scheme,
        report.substeps,
        report.surface_heat
    );

    check_maximum_principle(&before, enthalpy, props, top_temp)?;
    Ok(report)
}

fn positive_capacities(capacity: &[f64; NHEATGRIDP]) -> ThermalResult<()> {
    match capacity.iter().position(|&c| !(c > EPSILON)) {
        Some(gp) => Err(ThermalError::invalid_input(
            Some(gp / GPLHEAT),
            format!("gridpoint {gp} has no heat capacity"),
        )),
        None => Ok(()),
    }
}

/// Backward Euler rather than Crank–Nicolson: one daily step on thin top
/// elements would make Crank–Nicolson oscillate.
fn implicit_temperature_step(
    phase: Phase,
    enthalpy: &mut [f64; NHEATGRIDP],
    h: &[f64; NHEATGRIDP],
    top_temp: f64,
    props: &ThermalProperties,
) -> ThermalResult<ConductionReport> {
    let capacity = &props.phase(phase)?.heat_capacity;
    let lam = props.conductivities(phase)?;
    positive_capacities(capacity)?;
    let offset: [f64; NHEATGRIDP] = match phase {
        Phase::Frozen => [0.0; NHEATGRIDP],
        Phase::Unfrozen => props.latent_heat,
    };
    let widths = lumped_widths(h);
    let dt = SECONDS_PER_DAY;

    let mut sub = [0.0; NHEATGRIDP];
    let mut main = [0.0; NHEATGRIDP];
    let mut sup = [0.0; NHEATGRIDP];
    let mut rhs = [0.0; NHEATGRIDP];
    for j in 0..NHEATGRIDP {
        let scale = dt / (capacity[j] * widths[j]);
        sub[j] = -scale * lam[j] / h[j];
        sup[j] = if j + 1 < NHEATGRIDP { -scale * lam[j + 1] / h[j + 1] } else { 0.0 };
        main[j] = 1.0 - sub[j] - sup[j];
        rhs[j] = (enthalpy[j] - offset[j]) / capacity[j];
    }
    rhs[0] -= sub[0] * top_temp;

    let temps = solve_tridiagonal(&sub, &main, &sup, &rhs)
        .ok_or_else(|| ThermalError::divergence(0, f64::NAN, top_temp, top_temp))?;
    for j in 0..NHEATGRIDP {
        enthalpy[j] = temps[j] * capacity[j] + offset[j];
    }

    Ok(ConductionReport {
        scheme: ConductionScheme::ImplicitTemperature,
        substeps: 1,
        surface_heat: dt * lam[0] / h[0] * (top_temp - temps[0]),
    })
}

fn explicit_enthalpy_steps(
    enthalpy: &mut [f64; NHEATGRIDP],
    h: &[f64; NHEATGRIDP],
    top_temp: f64,
    props: &ThermalProperties,
) -> ThermalResult<ConductionReport> {
    let frozen = props.phase(Phase::Frozen)?;
    let unfrozen = props.phase(Phase::Unfrozen)?;
    positive_capacities(&frozen.heat_capacity)?;
    positive_capacities(&unfrozen.heat_capacity)?;
    let lam_frozen = props.conductivities(Phase::Frozen)?;
    let lam_unfrozen = props.conductivities(Phase::Unfrozen)?;
    let latent = &props.latent_heat;

    // conductivity per element length
    let k_frozen: [f64; NHEATGRIDP] = std::array::from_fn(|j| lam_frozen[j] / h[j]);
    let k_unfrozen: [f64; NHEATGRIDP] = std::array::from_fn(|j| lam_unfrozen[j] / h[j]);
    let inv_width: [f64; NHEATGRIDP] = lumped_widths(h).map(|w| 1.0 / w);

    let mut dt_inv: f64 = 0.0;
    for j in 0..NHEATGRIDP {
        let below = |k: &[f64; NHEATGRIDP]| if j + 1 < NHEATGRIDP { k[j + 1] } else { 0.0 };
        let rate_frozen = (k_frozen[j] + below(&k_frozen)) / frozen.heat_capacity[j];
        let rate_unfrozen = (k_unfrozen[j] + below(&k_unfrozen)) / unfrozen.heat_capacity[j];
        dt_inv = dt_inv.max(rate_frozen.max(rate_unfrozen) * inv_width[j]);
    }
    if !dt_inv.is_finite() {
        return Err(ThermalError::divergence(0, dt_inv, 0.0, 0.0));
    }
    let steps = SECONDS_PER_DAY * dt_inv;
    if steps >= MAX_CONDUCTION_SUBSTEPS as f64 {
        return Err(ThermalError::InvalidConfig(format!(
            "heat grid needs {steps:.0} conduction substeps per day, at most {MAX_CONDUCTION_SUBSTEPS} are allowed"
        )));
    }
    let substeps = steps as usize + 1;
    let dt = SECONDS_PER_DAY / substeps as f64;

    // temp[0] is the surface, temp[j + 1] gridpoint j
    let mut temp = [0.0; NHEATGRIDP + 1];
    let mut flux = [0.0; NHEATGRIDP + 1];
    temp[0] = top_temp;
    let mut surface_heat = 0.0;

    for _ in 0..substeps {
        for j in 0..NHEATGRIDP {
            temp[j + 1] = if enthalpy[j] < 0.0 {
                enthalpy[j] / frozen.heat_capacity[j]
            } else if enthalpy[j] > latent[j] {
                (enthalpy[j] - latent[j]) / unfrozen.heat_capacity[j]
            } else {
                0.0
            };
        }
        for j in 0..NHEATGRIDP {
            let kirchhoff = |t: f64| t * if t < 0.0 { k_frozen[j] } else { k_unfrozen[j] };
            flux[j] = kirchhoff(temp[j]) - kirchhoff(temp[j + 1]);
        }
        for j in 0..NHEATGRIDP {
            enthalpy[j] += dt * (flux[j] - flux[j + 1]) * inv_width[j];
        }
        surface_heat += dt * flux[0];
    }

    Ok(ConductionReport {
        scheme: ConductionScheme::ExplicitEnthalpy,
        substeps,
        surface_heat,
    })
}

/// Diffusion cannot create new extremes: every temperature after the step
/// must lie between the coldest and warmest of the old profile and the surface.
pub(crate) fn check_maximum_principle(
    before: &[f64; NHEATGRIDP],
    enthalpy: &[f64; NHEATGRIDP],
    props: &ThermalProperties,
    top_temp: f64,
) -> ThermalResult<()> {
    let lower = before.iter().copied().fold(top_temp, f64::min);
    let upper = before.iter().copied().fold(top_temp, f64::max);
    let tolerance = DIVERGENCE_TOLERANCE_K + 1.0e-9 * lower.abs().max(upper.abs());

    if let Some(gp) = enthalpy.iter().position(|e| !e.is_finite()) {
        return Err(ThermalError::divergence(gp, enthalpy[gp], lower, upper));
    }
    let after = gridpoint_temperatures(enthalpy, props)?;
    for (gp, &t) in after.iter().enumerate() {
        if !t.is_finite() || t < lower - tolerance || t > upper + tolerance {
            return Err(ThermalError::divergence(gp, t, lower, upper));
        }
    }
    Ok(())
}
