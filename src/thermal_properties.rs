/// Thermal property calculator
///
/// Derives per-gridpoint heat capacities, conductivities and latent heat from
/// the water/ice and solid content of each layer. Conductivities are indexed
/// by element: entry `j` belongs to the element ending at gridpoint `j`, so
/// the first element of every layer straddles the border to the layer above
/// and gets the series combination of both half elements.

use crate::config::{ConductivityModel, SoilGrid};
use crate::constants::{
    C_ICE, C_MINERAL, C_WATER, C_WATER2ICE, EPSILON, GPLHEAT, K_ICE_LOG, K_SOLID_LOG,
    K_WATER_LOG, KERSTEN_MIN_SATURATION, NHEATGRIDP, NSOILLAYER,
};
use crate::error::{ensure_non_negative, ThermalError, ThermalResult};
use crate::hydrology::HydrologyState;
use crate::soil_texture::{LayerTexture, SoilProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Frozen,
    Unfrozen,
}

/// Whether the whole profile and its surface forcing share one temperature sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniformTempSign {
    AllFrozen,
    AllThawed,
    Mixed,
}

impl UniformTempSign {
    /// Compare the band of every gridpoint (frozen, plateau, thawed) with the
    /// sign of the surface temperature. A surface at exactly 0 °C is mixed.
    pub fn detect(enthalpy: &[f64; NHEATGRIDP], latent_heat: &[f64; NHEATGRIDP], top_temp: f64) -> Self {
        let top_sign = band(top_temp, 0.0, 0.0);
        if enthalpy
            .iter()
            .zip(latent_heat.iter())
            .any(|(&h, &l)| band(h, 0.0, l) != top_sign)
        {
            return UniformTempSign::Mixed;
        }
        match top_sign {
            -1 => UniformTempSign::AllFrozen,
            1 => UniformTempSign::AllThawed,
            _ => UniformTempSign::Mixed,
        }
    }

    /// Whether properties of `phase` can be needed for this profile.
    pub fn includes(self, phase: Phase) -> bool {
        !matches!(
            (self, phase),
            (UniformTempSign::AllFrozen, Phase::Unfrozen) | (UniformTempSign::AllThawed, Phase::Frozen)
        )
    }
}

fn band(value: f64, lower: f64, upper: f64) -> i8 {
    if value < lower {
        -1
    } else if value > upper {
        1
    } else {
        0
    }
}

/// Absolute water+ice and solid content of every layer (mm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerComposition {
    pub water_ice_mm: [f64; NSOILLAYER],
    pub solid_mm: [f64; NSOILLAYER],
}

impl LayerComposition {
    pub fn current(grid: &SoilGrid, profile: &SoilProfile, hydrology: &HydrologyState) -> Self {
        Self {
            water_ice_mm: hydrology.water_ice_contents(grid, profile),
            solid_mm: profile.solid_contents(grid),
        }
    }

    pub fn validate(&self) -> ThermalResult<()> {
        for l in 0..NSOILLAYER {
            ensure_non_negative(self.water_ice_mm[l], Some(l), "water+ice content")?;
            ensure_non_negative(self.solid_mm[l], Some(l), "solid content")?;
        }
        Ok(())
    }
}

/// Latent heat capacity per gridpoint (J/m³), proportional to water+ice.
pub fn volumetric_latent_heat(grid: &SoilGrid, composition: &LayerComposition) -> [f64; NHEATGRIDP] {
    std::array::from_fn(|gp| {
        let layer = SoilGrid::layer_of(gp);
        composition.water_ice_mm[layer] / grid.thickness_mm(layer) * C_WATER2ICE
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseProperties {
    /// J/m³/K per gridpoint
    pub heat_capacity: [f64; NHEATGRIDP],
    /// W/m/K per element; `None` when conductivities were not requested
    pub conductivity: Option<[f64; NHEATGRIDP]>,
}

/// Transient per-gridpoint thermal properties for one solver invocation
///
/// A phase branch is `None` when the uniform sign check ruled it out.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalProperties {
    pub frozen: Option<PhaseProperties>,
    pub unfrozen: Option<PhaseProperties>,
    pub latent_heat: [f64; NHEATGRIDP],
}

impl ThermalProperties {
    pub fn calculate(
        grid: &SoilGrid,
        profile: &SoilProfile,
        composition: &LayerComposition,
        sign: UniformTempSign,
        model: ConductivityModel,
        with_conductivity: bool,
    ) -> ThermalResult<Self> {
        composition.validate()?;

        let branch = |phase: Phase| -> Option<PhaseProperties> {
            if !sign.includes(phase) {
                return None;
            }
            let phase_capacity = match phase {
                Phase::Frozen => C_ICE,
                Phase::Unfrozen => C_WATER,
            };
            let heat_capacity = std::array::from_fn(|gp| {
                let l = SoilGrid::layer_of(gp);
                (C_MINERAL * composition.solid_mm[l] + phase_capacity * composition.water_ice_mm[l])
                    / grid.thickness_mm(l)
            });
            let conductivity = with_conductivity
                .then(|| element_conductivities(grid, profile, composition, model, phase));
            Some(PhaseProperties {
                heat_capacity,
                conductivity,
            })
        };

        Ok(Self {
            frozen: branch(Phase::Frozen),
            unfrozen: branch(Phase::Unfrozen),
            latent_heat: volumetric_latent_heat(grid, composition),
        })
    }

    pub fn phase(&self, phase: Phase) -> ThermalResult<&PhaseProperties> {
        match phase {
            Phase::Frozen => self.frozen.as_ref(),
            Phase::Unfrozen => self.unfrozen.as_ref(),
        }
        .ok_or(ThermalError::SkippedPhaseBranch { phase })
    }

    pub fn phase_mut(&mut self, phase: Phase) -> Option<&mut PhaseProperties> {
        match phase {
            Phase::Frozen => self.frozen.as_mut(),
            Phase::Unfrozen => self.unfrozen.as_mut(),
        }
    }

    pub fn heat_capacity(&self, phase: Phase, gridpoint: usize) -> ThermalResult<f64> {
        Ok(self.phase(phase)?.heat_capacity[gridpoint])
    }

    pub fn conductivities(&self, phase: Phase) -> ThermalResult<&[f64; NHEATGRIDP]> {
        self.phase(phase)?
            .conductivity
            .as_ref()
            .ok_or(ThermalError::SkippedPhaseBranch { phase })
    }
}

/// Layer conductivity (W/m/K) for one phase.
pub fn layer_conductivity(
    texture: &LayerTexture,
    water_ice_mm: f64,
    wsats_mm: f64,
    model: ConductivityModel,
    phase: Phase,
) -> f64 {
    let sat = if wsats_mm < EPSILON { 0.0 } else { water_ice_mm / wsats_mm };
    let k_dry = texture.k_dry;
    match model {
        ConductivityModel::Johansen => {
            let por = texture.wsat;
            let solid_part = K_SOLID_LOG * (1.0 - por);
            let (k_sat, kersten) = match phase {
                Phase::Frozen => (10f64.powf(solid_part + K_ICE_LOG * por), sat),
                Phase::Unfrozen => {
                    let ke = if sat < KERSTEN_MIN_SATURATION { 0.0 } else { sat.log10() + 1.0 };
                    (10f64.powf(solid_part + K_WATER_LOG * por), ke)
                }
            };
            (k_sat - k_dry) * kersten + k_dry
        }
        ConductivityModel::LinearMix => {
            let k_sat = match phase {
                Phase::Frozen => texture.k_sat_frozen,
                Phase::Unfrozen => texture.k_sat_unfrozen,
            };
            k_dry + (k_sat - k_dry) * sat
        }
    }
}

/// Conductivity of two media in series from their lengths and conductivities.
///
/// A zero-length part is ignored; a part that does not conduct blocks the flow.
pub fn series_conductivity(len_a: f64, k_a: f64, len_b: f64, k_b: f64) -> f64 {
    let total = len_a + len_b;
    if total <= 0.0 || (len_a > 0.0 && k_a <= 0.0) || (len_b > 0.0 && k_b <= 0.0) {
        return 0.0;
    }
    let resistance_a = if len_a > 0.0 { len_a / k_a } else { 0.0 };
    let resistance_b = if len_b > 0.0 { len_b / k_b } else { 0.0 };
    total / (resistance_a + resistance_b)
}

fn element_conductivities(
    grid: &SoilGrid,
    profile: &SoilProfile,
    composition: &LayerComposition,
    model: ConductivityModel,
    phase: Phase,
) -> [f64; NHEATGRIDP] {
    let mut lam = [0.0; NHEATGRIDP];
    let mut prev_len = 0.0;
    let mut prev_k = 0.0;
    for layer in 0..NSOILLAYER {
        let k = layer_conductivity(
            profile.layer(layer),
            composition.water_ice_mm[layer],
            profile.wsats(grid, layer),
            model,
            phase,
        );
        let cur_len = grid.half_element_m(layer);
        for j in 0..GPLHEAT {
            lam[layer * GPLHEAT + j] = if j == 0 {
                series_conductivity(prev_len, prev_k, cur_len, k)
            } else {
                k
            };
        }
        prev_len = cur_len;
        prev_k = k;
    }
    lam
}
