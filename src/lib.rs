pub mod config;
pub mod constants;
pub mod error;
pub mod hydrology;
pub mod mass_flow;
pub mod math_utils;
pub mod phase_transition;
pub mod sim;
pub mod sim_op;
pub mod soil_column;
pub mod soil_temp_lag;
pub mod soil_texture;
pub mod surface_cover;
pub mod thermal_conduction;
pub mod thermal_properties;

pub use config::{ConductivityModel, SoilGrid, ThermalConfig};
pub use error::{ColumnId, ThermalError, ThermalResult};
pub use soil_column::{ColumnCheckpoint, DailyForcing, DayReport, SoilColumn};
