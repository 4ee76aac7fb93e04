/// Soil thermal demo
/// Runs a handful of texture columns through three noisy seasonal years and
/// prints the final temperature profiles, frozen layers in blue.
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soil_thermal_rust::constants::{DAYS_PER_YEAR, NSOILLAYER};
use soil_thermal_rust::error::ColumnId;
use soil_thermal_rust::hydrology::HydrologyState;
use soil_thermal_rust::sim::{SimProps, Simulation};
use soil_thermal_rust::sim_op::{AnnualThawOp, ForcingOp, SimOpHandle, TemperatureReportingOp};
use soil_thermal_rust::soil_column::DailyForcing;
use soil_thermal_rust::soil_texture::{SoilProfile, TextureClass};
use soil_thermal_rust::surface_cover::SurfaceCover;
use soil_thermal_rust::{SoilGrid, ThermalConfig, ThermalResult};
use std::f64::consts::PI;

const YEARS: i32 = 3;
const MEAN_AIR_TEMP: f64 = -1.5;
const AMPLITUDE: f64 = 16.0;

/// Seasonal cycle with daily noise; snow builds up while it is below zero.
fn weather(seed: u64) -> impl FnMut(i32, ColumnId) -> DailyForcing + Send {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut snowpack = 0.0_f64;
    let mut last_day = -1;
    let mut today = DailyForcing::bare(MEAN_AIR_TEMP);
    move |day, _| {
        if day != last_day {
            let season = (2.0 * PI * (day as f64 - 100.0) / DAYS_PER_YEAR).sin();
            let temp = MEAN_AIR_TEMP + AMPLITUDE * season + rng.random_range(-4.0..4.0);
            snowpack = if temp < 0.0 { snowpack + 1.5 } else { (snowpack - 4.0 * temp).max(0.0) };
            today = DailyForcing {
                bare_surface_temp: temp,
                litter_surface_temp: temp * 0.8,
                litter_cover: 0.6,
                cover: SurfaceCover {
                    snowpack_mm: snowpack,
                    litter_dry_matter_g_m2: 400.0,
                    litter_moisture_mm: 2.0,
                },
            };
            last_day = day;
        }
        today
    }
}

fn run() -> ThermalResult<()> {
    let mut sim = Simulation::new(SimProps {
        name: "SoilThermalDemo",
        grid: SoilGrid::default(),
        config: ThermalConfig::default(),
        ops: vec![
            SimOpHandle::new(Box::new(ForcingOp::new(weather(42)))),
            SimOpHandle::new(Box::new(TemperatureReportingOp::with_frequency(20.0))),
            SimOpHandle::new(Box::new(AnnualThawOp::new())),
        ],
        sim_days: YEARS * DAYS_PER_YEAR as i32,
    });

    let classes = [
        TextureClass::Clay,
        TextureClass::Loam,
        TextureClass::SiltLoam,
        TextureClass::Sand,
        TextureClass::Rock,
    ];
    for (cell, class) in classes.into_iter().enumerate() {
        sim.add_column(
            ColumnId::new(cell, 0),
            SoilProfile::uniform(class)?,
            HydrologyState::unfrozen(0.6),
            MEAN_AIR_TEMP,
        )?;
    }

    sim.run()?;

    println!();
    println!("{}", "final layer temperatures (°C)".bold());
    print!("{:<12}", "texture");
    for l in 0..NSOILLAYER {
        print!("{:>9}", format!("L{l}"));
    }
    println!("{:>14}", "thaw mean mm");
    for entry in sim.columns.values() {
        print!("{:<12}", entry.profile.top_class().as_str());
        for l in 0..NSOILLAYER {
            let cell = format!("{:>9.2}", entry.column.temperatures()[l]);
            if entry.column.freeze_fractions()[l] > 0.5 {
                print!("{}", cell.blue());
            } else {
                print!("{}", cell.yellow());
            }
        }
        println!("{:>14.0}", entry.column.mean_maxthaw_mm());
    }
    for id in sim.failed_columns() {
        println!("{}", format!("{id} failed").red());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("{}", format!("soil thermal demo failed: {err}").red());
        std::process::exit(1);
    }
}
