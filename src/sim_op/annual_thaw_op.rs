/// Closes the thaw depth year of every column every 365 days

use crate::constants::DAYS_PER_YEAR;
use crate::sim::simulation::Simulation;
use crate::sim_op::SimOp;
use log::debug;

pub struct AnnualThawOp {
    years_closed: u32,
}

impl AnnualThawOp {
    pub fn new() -> Self {
        Self { years_closed: 0 }
    }

    pub fn years_closed(&self) -> u32 {
        self.years_closed
    }

    fn close_year(&mut self, sim: &mut Simulation) {
        for entry in sim.columns.values_mut().filter(|entry| entry.is_active()) {
            entry.column.update_annual();
        }
        self.years_closed += 1;
        debug!("closed thaw year {} at day {}", self.years_closed, sim.day);
    }
}

impl Default for AnnualThawOp {
    fn default() -> Self {
        Self::new()
    }
}

fn is_year_end(days_done: i32) -> bool {
    days_done > 0 && days_done % DAYS_PER_YEAR as i32 == 0
}

impl SimOp for AnnualThawOp {
    fn name(&self) -> &str {
        "AnnualThaw"
    }

    // ops run before the day is stepped, so `day - 1` days are done
    fn update_sim(&mut self, sim: &mut Simulation) {
        if is_year_end(sim.day - 1) {
            self.close_year(sim);
        }
    }

    fn after_sim(&mut self, sim: &mut Simulation) {
        if is_year_end(sim.day) {
            self.close_year(sim);
        }
    }
}
