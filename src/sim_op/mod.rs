// Operators hooked into the daily soil simulation
pub mod annual_thaw_op;
pub mod forcing_op;
pub mod temperature_reporting_op;

pub use annual_thaw_op::AnnualThawOp;
pub use forcing_op::ForcingOp;
pub use temperature_reporting_op::TemperatureReportingOp;

use crate::sim::simulation::Simulation;

pub trait SimOp: Send {
    /// The name of this operator (for identification and timing)
    fn name(&self) -> &str;

    /// Called once before the first day
    fn init_sim(&mut self, _sim: &mut Simulation) {}

    /// Called every day before the columns are stepped
    fn update_sim(&mut self, _sim: &mut Simulation) {}

    /// Called once after the last day
    fn after_sim(&mut self, _sim: &mut Simulation) {}
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}
