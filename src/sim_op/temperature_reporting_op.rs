/// Temperature reporting operation
/// Logs top layer and column temperature statistics every N% of the run

use crate::sim::simulation::Simulation;
use crate::sim_op::SimOp;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureStats {
    pub mean_top: f64,
    pub min: f64,
    pub max: f64,
    pub frozen_top_columns: usize,
    pub columns: usize,
}

pub struct TemperatureReportingOp {
    pub report_frequency_percent: f64,
    last_reported_day: i32,
}

impl TemperatureReportingOp {
    pub fn new() -> Self {
        Self::with_frequency(10.0)
    }

    pub fn with_frequency(report_frequency_percent: f64) -> Self {
        Self {
            report_frequency_percent,
            last_reported_day: -1,
        }
    }

    fn milestone(&self, day: i32, sim_days: i32) -> i32 {
        ((day as f64 / sim_days as f64) * 100.0 / self.report_frequency_percent).floor() as i32
    }

    fn should_report(&self, day: i32, sim_days: i32) -> bool {
        if sim_days <= 0 || self.report_frequency_percent <= 0.0 {
            return false;
        }
        let last = if self.last_reported_day < 0 { -1 } else { self.milestone(self.last_reported_day, sim_days) };
        self.milestone(day, sim_days) > last
    }

    /// Statistics over the active columns, `None` when there are none.
    pub fn statistics(sim: &Simulation) -> Option<TemperatureStats> {
        let mut stats = TemperatureStats {
            mean_top: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            frozen_top_columns: 0,
            columns: 0,
        };
        for entry in sim.columns.values().filter(|entry| entry.is_active()) {
            let temps = entry.column.temperatures();
            stats.mean_top += temps[0];
            for &t in temps {
                stats.min = stats.min.min(t);
                stats.max = stats.max.max(t);
            }
            if entry.column.freeze_fractions()[0] > 0.5 {
                stats.frozen_top_columns += 1;
            }
            stats.columns += 1;
        }
        if stats.columns == 0 {
            return None;
        }
        stats.mean_top /= stats.columns as f64;
        Some(stats)
    }

    fn log_statistics(label: &str, sim: &Simulation) {
        match Self::statistics(sim) {
            Some(stats) => info!(
                "{label}: top layer {:.2} C, range {:.2} to {:.2} C, {} of {} columns frozen at the top",
                stats.mean_top, stats.min, stats.max, stats.frozen_top_columns, stats.columns
            ),
            None => info!("{label}: no active columns"),
        }
    }
}

impl Default for TemperatureReportingOp {
    fn default() -> Self {
        Self::new()
    }
}

impl SimOp for TemperatureReportingOp {
    fn name(&self) -> &str {
        "TemperatureReporting"
    }

    fn init_sim(&mut self, sim: &mut Simulation) {
        info!(
            "temperature reporting every {:.1}% of {} days",
            self.report_frequency_percent, sim.sim_days
        );
        Self::log_statistics("initial", sim);
    }

    fn update_sim(&mut self, sim: &mut Simulation) {
        if !self.should_report(sim.day, sim.sim_days) {
            return;
        }
        let progress = (sim.day as f64 / sim.sim_days as f64) * 100.0;
        Self::log_statistics(&format!("day {} of {} ({}%)", sim.day, sim.sim_days, progress.round() as i64), sim);
        self.last_reported_day = sim.day;
    }

    fn after_sim(&mut self, sim: &mut Simulation) {
        Self::log_statistics("final", sim);
        info!("{} failed columns", sim.failed_columns().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_milestone() {
        let mut op = TemperatureReportingOp::with_frequency(25.0);
        let mut reported = vec![];
        for day in 1..=100 {
            if op.should_report(day, 100) {
                reported.push(day);
                op.last_reported_day = day;
            }
        }
        assert_eq!(reported, vec![1, 25, 50, 75, 100]);
        assert!(!TemperatureReportingOp::with_frequency(0.0).should_report(5, 100));
    }
}
