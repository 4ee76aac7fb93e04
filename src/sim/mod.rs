pub mod simulation;

pub use simulation::{ColumnStatus, OpTiming, SimColumn, SimProps, Simulation};
