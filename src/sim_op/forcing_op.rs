/// Daily surface forcing for every active column
///
/// Wraps a closure of (day, column) so tests and drivers can plug in anything
/// from a constant to a noisy seasonal cycle.

use crate::error::ColumnId;
use crate::sim::simulation::Simulation;
use crate::sim_op::SimOp;
use crate::soil_column::DailyForcing;

type ForcingFn = dyn FnMut(i32, ColumnId) -> DailyForcing + Send;

pub struct ForcingOp {
    forcing: Box<ForcingFn>,
}

impl ForcingOp {
    pub fn new<F>(forcing: F) -> Self
    where
        F: FnMut(i32, ColumnId) -> DailyForcing + Send + 'static,
    {
        Self {
            forcing: Box::new(forcing),
        }
    }

    /// Bare soil following `mean + amplitude·sin(2π·day/365)`.
    pub fn seasonal(mean: f64, amplitude: f64) -> Self {
        Self::new(move |day, _| {
            let phase = 2.0 * std::f64::consts::PI * day as f64 / crate::constants::DAYS_PER_YEAR;
            DailyForcing::bare(mean + amplitude * phase.sin())
        })
    }
}

impl SimOp for ForcingOp {
    fn name(&self) -> &str {
        "Forcing"
    }

    fn update_sim(&mut self, sim: &mut Simulation) {
        let day = sim.day;
        for (id, entry) in sim.columns.iter_mut() {
            if entry.is_active() {
                entry.forcing = (self.forcing)(day, *id);
            }
        }
    }
}
