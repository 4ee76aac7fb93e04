use std::f64::consts::PI;

// Grid layout
pub const NSOILLAYER: usize = 6;
pub const GPLHEAT: usize = 2; // gridpoints per soil layer
pub const NHEATGRIDP: usize = NSOILLAYER * GPLHEAT;
pub const DEFAULT_SOIL_DEPTH_MM: [f64; NSOILLAYER] = [200.0, 300.0, 500.0, 1000.0, 1000.0, 10000.0];

pub const MM_PER_M: f64 = 1000.0;
pub const EPSILON: f64 = 1.0e-7;

// Volumetric heat capacities (J/m³/K)
pub const C_WATER: f64 = 4.2e6;
pub const C_ICE: f64 = 2.1e6;
pub const C_MINERAL: f64 = 1.9259e6;
/// Volumetric latent heat of fusion of water (J/m³)
pub const C_WATER2ICE: f64 = 0.3e9;

// Saturated end-member conductivities (W/m/K) for the Johansen model
pub const K_SOLID: f64 = 8.0;
pub const K_ICE: f64 = 2.2;
pub const K_WATER: f64 = 0.57;
pub const K_SOLID_LOG: f64 = 0.90308998699;
pub const K_ICE_LOG: f64 = 0.34242268082;
pub const K_WATER_LOG: f64 = -0.24412514432;
/// Below this saturation the unfrozen Kersten number is zero
pub const KERSTEN_MIN_SATURATION: f64 = 0.1;

// Dry conductivity pedotransfer (Johansen 1977)
pub const MINERAL_DENSITY_KG_M3: f64 = 2700.0;

// Snow and litter cover
pub const LAMBDA_SNOW: f64 = 0.2; // W/m/K
pub const SNOWHEIGHT_PER_WATERHEIGHT: f64 = 4.0;
pub const DRY_BULK_DENSITY_LITTER: f64 = 71.1; // kg/m³
pub const POROSITY_LITTER: f64 = 0.952;
pub const K_LITTER_DRY: f64 = 0.05;
pub const K_LITTER_SAT_FROZEN: f64 = 2.106374;
pub const K_LITTER_SAT_UNFROZEN: f64 = 0.554636;

// Time
pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const DAYS_PER_YEAR: f64 = 365.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

// Lagged soil temperature
pub const NDAYS: usize = 31; // length of the daily climate buffer
pub const LAG_CONV: f64 = DAYS_PER_YEAR / (2.0 * PI); // phase lag (rad) to days
pub const LAG_DEPTH_M: f64 = 0.25;
pub const CLIMBUFSIZE: f64 = 20.0; // years in the running thaw depth mean

// Solver diagnostics
pub const DIVERGENCE_TOLERANCE_K: f64 = 1.0e-6;
pub const BALANCE_TOLERANCE_REL: f64 = 1.0e-9;
/// upper bound on explicit conduction substeps per day; finer grids are rejected
pub const MAX_CONDUCTION_SUBSTEPS: usize = 100_000;
