use crate::config::{SoilGrid, ThermalConfig};
use crate::error::{ColumnId, ThermalError, ThermalResult};
use crate::hydrology::HydrologyState;
use crate::sim_op::{SimOp, SimOpHandle};
use crate::soil_column::{DailyForcing, DayReport, SoilColumn};
use crate::soil_texture::SoilProfile;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OpTiming {
    pub op_name: String,
    pub init_time: Duration,
    pub total_update_time: Duration,
    pub update_call_count: u32,
    pub after_time: Duration,
}

impl OpTiming {
    pub fn new(op_name: String) -> Self {
        Self {
            op_name,
            init_time: Duration::ZERO,
            total_update_time: Duration::ZERO,
            update_call_count: 0,
            after_time: Duration::ZERO,
        }
    }

    pub fn avg_update_time(&self) -> Duration {
        if self.update_call_count > 0 {
            self.total_update_time / self.update_call_count
        } else {
            Duration::ZERO
        }
    }

    pub fn total_time(&self) -> Duration {
        self.init_time + self.total_update_time + self.after_time
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStatus {
    Active,
    /// stepping stopped after this error; the column keeps its last good state
    Failed(String),
}

/// One stand: its thermal column plus the inputs the engine reads each day.
#[derive(Debug, Clone)]
pub struct SimColumn {
    pub column: SoilColumn,
    pub profile: SoilProfile,
    pub hydrology: HydrologyState,
    pub forcing: DailyForcing,
    pub status: ColumnStatus,
    pub last_report: Option<DayReport>,
}

impl SimColumn {
    pub fn is_active(&self) -> bool {
        self.status == ColumnStatus::Active
    }
}

pub struct Simulation {
    pub name: String,
    pub grid: SoilGrid,
    pub config: ThermalConfig,
    pub ops: Vec<Box<dyn SimOp>>,
    pub columns: BTreeMap<ColumnId, SimColumn>,
    pub day: i32,
    pub sim_days: i32,
    pub op_timings: Vec<OpTiming>,
}

pub struct SimProps {
    pub name: &'static str,
    pub grid: SoilGrid,
    pub config: ThermalConfig,
    pub ops: Vec<SimOpHandle>,
    pub sim_days: i32,
}

impl Simulation {
    pub fn new(props: SimProps) -> Simulation {
        let ops: Vec<Box<dyn SimOp>> = props.ops.into_iter().map(|handle| handle.op).collect();
        let op_timings = ops.iter().map(|op| OpTiming::new(op.name().to_string())).collect();
        Simulation {
            name: props.name.to_string(),
            grid: props.grid,
            config: props.config,
            ops,
            columns: BTreeMap::new(),
            day: -1,
            sim_days: props.sim_days,
            op_timings,
        }
    }

    /// Seed a column at a uniform temperature and register it.
    pub fn add_column(
        &mut self,
        id: ColumnId,
        profile: SoilProfile,
        mut hydrology: HydrologyState,
        initial_temp: f64,
    ) -> ThermalResult<()> {
        if self.columns.contains_key(&id) {
            return Err(ThermalError::InvalidConfig(format!("{id} is already part of the simulation")));
        }
        let column = SoilColumn::from_uniform_temperature(id, &self.grid, &profile, &mut hydrology, initial_temp)?;
        self.columns.insert(
            id,
            SimColumn {
                column,
                profile,
                hydrology,
                forcing: DailyForcing::bare(initial_temp),
                status: ColumnStatus::Active,
                last_report: None,
            },
        );
        Ok(())
    }

    pub fn column(&self, id: ColumnId) -> Option<&SimColumn> {
        self.columns.get(&id)
    }

    pub fn failed_columns(&self) -> Vec<ColumnId> {
        self.columns
            .iter()
            .filter(|(_, entry)| !entry.is_active())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Step every active column by one day in parallel
    ///
    /// A failing column is marked failed and skipped from then on; the other
    /// columns are unaffected. Returns the errors of this day.
    pub fn step_day(&mut self) -> Vec<(ColumnId, ThermalError)> {
        let grid = &self.grid;
        let config = &self.config;
        let failures: Vec<(ColumnId, ThermalError)> = self
            .columns
            .par_iter_mut()
            .filter(|(_, entry)| entry.is_active())
            .filter_map(|(id, entry)| {
                let SimColumn {
                    column,
                    profile,
                    hydrology,
                    forcing,
                    ..
                } = entry;
                match column.update_day(grid, profile, hydrology, forcing, config) {
                    Ok(report) => {
                        entry.last_report = Some(report);
                        None
                    }
                    Err(err) => {
                        entry.status = ColumnStatus::Failed(err.to_string());
                        Some((*id, err))
                    }
                }
            })
            .collect();

        for (id, err) in &failures {
            let kind = if err.is_solver_defect() { "solver defect" } else { "invalid input" };
            warn!("{} day {}: {id} stopped ({kind}): {err}", self.name, self.day);
        }
        failures
    }

    pub fn run(&mut self) -> ThermalResult<()> {
        if self.day > -1 {
            return Err(ThermalError::InvalidConfig(format!("simulation {} already ran", self.name)));
        }
        self.day = 0;
        self.simulate_init();
        while self.day < self.sim_days {
            self.day += 1;
            self.simulate_step();
            self.step_day();
        }
        self.simulate_end();
        self.log_timing_report();
        Ok(())
    }

    fn simulate_init(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.init_sim(self);
            self.op_timings[i].init_time = start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_end(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.after_sim(self);
            self.op_timings[i].after_time = start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_step(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.update_sim(self);
            self.op_timings[i].total_update_time += start.elapsed();
            self.op_timings[i].update_call_count += 1;
        }
        self.ops = ops;
    }

    pub fn log_timing_report(&self) {
        let total: Duration = self.op_timings.iter().map(OpTiming::total_time).sum();
        info!("{}: {} days, {} columns, {} failed", self.name, self.sim_days, self.columns.len(), self.failed_columns().len());
        for timing in &self.op_timings {
            let share = if total.as_nanos() > 0 {
                timing.total_time().as_nanos() as f64 / total.as_nanos() as f64 * 100.0
            } else {
                0.0
            };
            info!(
                "  {:<22} total {:>8.2?} avg/day {:>8.2?} init {:>8.2?} after {:>8.2?} share {:>5.1}%",
                timing.op_name,
                timing.total_time(),
                timing.avg_update_time(),
                timing.init_time,
                timing.after_time,
                share
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_op::{AnnualThawOp, ForcingOp, TemperatureReportingOp};
    use crate::soil_texture::TextureClass;
    use more_asserts::{assert_gt, assert_lt};

    fn props(ops: Vec<SimOpHandle>, sim_days: i32) -> SimProps {
        SimProps {
            name: "test",
            grid: SoilGrid::default(),
            config: ThermalConfig::default(),
            ops,
            sim_days,
        }
    }

    fn add(sim: &mut Simulation, cell: usize, class: TextureClass, temp: f64) {
        sim.add_column(
            ColumnId::new(cell, 0),
            SoilProfile::uniform(class).unwrap(),
            HydrologyState::unfrozen(0.5),
            temp,
        )
        .unwrap();
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let mut sim = Simulation::new(props(vec![], 1));
        add(&mut sim, 0, TextureClass::Loam, 1.0);
        let again = sim.add_column(
            ColumnId::new(0, 0),
            SoilProfile::uniform(TextureClass::Sand).unwrap(),
            HydrologyState::unfrozen(0.2),
            1.0,
        );
        assert!(again.is_err());
        assert_eq!(sim.columns.len(), 1);
    }

    #[test]
    fn failing_column_does_not_touch_siblings() {
        let mut sim = Simulation::new(props(vec![], 1));
        add(&mut sim, 0, TextureClass::Loam, 4.0);
        add(&mut sim, 1, TextureClass::Loam, 4.0);
        for entry in sim.columns.values_mut() {
            entry.forcing = DailyForcing::bare(-5.0);
        }
        let broken = ColumnId::new(1, 0);
        if let Some(entry) = sim.columns.get_mut(&broken) {
            entry.hydrology.w[3] = -0.5;
        }
        let before = sim.columns[&broken].column.clone();

        let failures = sim.step_day();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, broken);
        assert_eq!(sim.failed_columns(), vec![broken]);
        assert_eq!(sim.columns[&broken].column, before);

        let healthy = &sim.columns[&ColumnId::new(0, 0)];
        assert!(healthy.last_report.is_some());
        assert_lt!(healthy.column.temperatures()[0], 4.0);

        // failed columns are skipped afterwards
        assert!(sim.step_day().is_empty());
    }

    #[test]
    fn seasonal_run_thaws_and_freezes() {
        let ops = vec![
            SimOpHandle::new(Box::new(ForcingOp::seasonal(-2.0, 15.0))),
            SimOpHandle::new(Box::new(TemperatureReportingOp::new())),
            SimOpHandle::new(Box::new(AnnualThawOp::new())),
        ];
        let mut sim = Simulation::new(props(ops, 2 * 365));
        add(&mut sim, 0, TextureClass::SiltLoam, -2.0);
        add(&mut sim, 1, TextureClass::Sand, -2.0);
        sim.run().unwrap();

        assert!(sim.failed_columns().is_empty());
        for entry in sim.columns.values() {
            // the last year closed, its thaw depth went into the mean
            assert_eq!(entry.column.maxthaw_depth_mm(), 0.0);
            assert_gt!(entry.column.mean_maxthaw_mm(), 0.0);
            assert_lt!(entry.column.mean_maxthaw_mm(), sim.grid.total_depth_mm());
        }
        assert_eq!(sim.op_timings.len(), 3);
        assert_eq!(sim.op_timings[0].update_call_count, 2 * 365);
        assert!(sim.run().is_err());
    }
}
