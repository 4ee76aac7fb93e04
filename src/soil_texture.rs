// src/soil_texture.rs - Soil texture classes and static per-layer parameters

use crate::config::SoilGrid;
use crate::constants::{MINERAL_DENSITY_KG_M3, NSOILLAYER};
use crate::error::{ThermalError, ThermalResult};
use crate::math_utils::lerp;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureClass {
    Clay,
    SiltyClay,
    SandyClay,
    ClayLoam,
    SiltyClayLoam,
    SandyClayLoam,
    Loam,
    SiltLoam,
    SandyLoam,
    Silt,
    LoamySand,
    Sand,
    Rock,
    Ice,
}

impl TextureClass {
    pub const ALL: [TextureClass; 14] = [
        TextureClass::Clay,
        TextureClass::SiltyClay,
        TextureClass::SandyClay,
        TextureClass::ClayLoam,
        TextureClass::SiltyClayLoam,
        TextureClass::SandyClayLoam,
        TextureClass::Loam,
        TextureClass::SiltLoam,
        TextureClass::SandyLoam,
        TextureClass::Silt,
        TextureClass::LoamySand,
        TextureClass::Sand,
        TextureClass::Rock,
        TextureClass::Ice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureClass::Clay => "clay",
            TextureClass::SiltyClay => "silty_clay",
            TextureClass::SandyClay => "sandy_clay",
            TextureClass::ClayLoam => "clay_loam",
            TextureClass::SiltyClayLoam => "silty_clay_loam",
            TextureClass::SandyClayLoam => "sandy_clay_loam",
            TextureClass::Loam => "loam",
            TextureClass::SiltLoam => "silt_loam",
            TextureClass::SandyLoam => "sandy_loam",
            TextureClass::Silt => "silt",
            TextureClass::LoamySand => "loamy_sand",
            TextureClass::Sand => "sand",
            TextureClass::Rock => "rock",
            TextureClass::Ice => "ice",
        }
    }

    pub fn params(self) -> ThermalResult<&'static TextureParams> {
        let table = TEXTURE_TABLE.as_ref().map_err(|e| ThermalError::InvalidConfig(e.clone()))?;
        table
            .get(&self)
            .ok_or_else(|| ThermalError::InvalidConfig(format!("no parameters for texture {}", self.as_str())))
    }
}

impl FromStr for TextureClass {
    type Err = ThermalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextureClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| ThermalError::InvalidConfig(format!("unknown texture class {s:?}")))
    }
}

/// Tabulated hydraulic and thermal parameters of a texture class
///
/// Water contents are volume fractions, diffusivities in mm²/s and
/// conductivities in W/m/K (Cosby 1984; Lawrence and Slater 2008).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureParams {
    pub class: TextureClass,
    pub name: String,
    pub w_pwp: f64,
    pub w_fc: f64,
    pub w_sat: f64,
    pub tdiff_0: f64,
    pub tdiff_15: f64,
    pub tdiff_100: f64,
    pub cond_pwp: f64,
    pub cond_100: f64,
    pub cond_100_ice: f64,
}

impl TextureParams {
    /// Thermal diffusivity (mm²/s) for a relative water content of the
    /// water holding capacity, interpolated between the 0, 15 and 100% values.
    pub fn thermal_diffusivity(&self, w: f64) -> f64 {
        let w = w.clamp(0.0, 1.0);
        if w < 0.15 {
            lerp(self.tdiff_0, self.tdiff_15, w / 0.15)
        } else {
            lerp(self.tdiff_15, self.tdiff_100, (w - 0.15) / 0.85)
        }
    }
}

static TEXTURE_TABLE: Lazy<Result<HashMap<TextureClass, TextureParams>, String>> = Lazy::new(|| {
    let json_str = include_str!("soil_textures.json");
    let rows: Vec<TextureParams> =
        serde_json::from_str(json_str).map_err(|e| format!("failed to parse soil_textures.json: {e}"))?;
    Ok(rows.into_iter().map(|row| (row.class, row)).collect())
});

/// Dry soil conductivity from porosity via bulk density (Johansen 1977).
pub fn dry_conductivity(porosity: f64) -> f64 {
    let bulk_density = MINERAL_DENSITY_KG_M3 * (1.0 - porosity);
    (0.135 * bulk_density + 64.7) / (MINERAL_DENSITY_KG_M3 - 0.947 * bulk_density)
}

/// Static thermal and hydraulic description of one soil layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerTexture {
    pub class: TextureClass,
    /// water content at wilting point (fraction of volume)
    pub wpwp: f64,
    /// water holding capacity between wilting point and field capacity
    pub whc: f64,
    /// porosity
    pub wsat: f64,
    pub k_dry: f64,
    pub k_sat_unfrozen: f64,
    pub k_sat_frozen: f64,
}

impl LayerTexture {
    pub fn from_class(class: TextureClass) -> ThermalResult<Self> {
        let p = class.params()?;
        Ok(Self {
            class,
            wpwp: p.w_pwp,
            whc: p.w_fc - p.w_pwp,
            wsat: p.w_sat,
            k_dry: dry_conductivity(p.w_sat),
            k_sat_unfrozen: p.cond_100,
            k_sat_frozen: p.cond_100_ice,
        })
    }

    fn validate(&self, layer: usize) -> ThermalResult<()> {
        for (what, v) in [("wpwp", self.wpwp), ("whc", self.whc), ("wsat", self.wsat)] {
            if !(v.is_finite() && (0.0..=1.0).contains(&v)) {
                return Err(ThermalError::invalid_input(Some(layer), format!("{what} must lie in [0, 1], got {v}")));
            }
        }
        for (what, v) in [
            ("k_dry", self.k_dry),
            ("k_sat_unfrozen", self.k_sat_unfrozen),
            ("k_sat_frozen", self.k_sat_frozen),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ThermalError::invalid_input(Some(layer), format!("{what} must be non-negative, got {v}")));
            }
        }
        Ok(())
    }
}

/// Per-layer texture of one soil column, immutable after initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    layers: [LayerTexture; NSOILLAYER],
}

impl SoilProfile {
    pub fn new(layers: [LayerTexture; NSOILLAYER]) -> ThermalResult<Self> {
        for (layer, texture) in layers.iter().enumerate() {
            texture.validate(layer)?;
        }
        Ok(Self { layers })
    }

    pub fn uniform(class: TextureClass) -> ThermalResult<Self> {
        let texture = LayerTexture::from_class(class)?;
        Self::new([texture; NSOILLAYER])
    }

    pub fn layer(&self, layer: usize) -> &LayerTexture {
        &self.layers[layer]
    }

    pub fn top_class(&self) -> TextureClass {
        self.layers[0].class
    }

    /// Water holding capacity of a layer (mm).
    pub fn whcs(&self, grid: &SoilGrid, layer: usize) -> f64 {
        self.layers[layer].whc * grid.thickness_mm(layer)
    }

    /// Water at wilting point (mm).
    pub fn wpwps(&self, grid: &SoilGrid, layer: usize) -> f64 {
        self.layers[layer].wpwp * grid.thickness_mm(layer)
    }

    /// Pore volume (mm).
    pub fn wsats(&self, grid: &SoilGrid, layer: usize) -> f64 {
        self.layers[layer].wsat * grid.thickness_mm(layer)
    }

    /// Absolute solid content (mm), everything that is not pore space.
    pub fn solid_contents(&self, grid: &SoilGrid) -> [f64; NSOILLAYER] {
        std::array::from_fn(|l| grid.thickness_mm(l) - self.wsats(grid, l))
    }
}
