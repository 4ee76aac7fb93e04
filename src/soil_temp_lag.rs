// src/soil_temp_lag.rs - Lagged soil temperature from recent air temperatures
//
// A damped, phase shifted echo of the air temperature at a fixed depth. It does
// not touch the enthalpy state and is used where a cheap estimate is enough,
// e.g. to seed a new column.

use crate::constants::{
    DAYS_PER_YEAR, EPSILON, LAG_CONV, LAG_DEPTH_M, MONTHS_PER_YEAR, NDAYS, SECONDS_PER_DAY,
};
use crate::error::{ensure_finite, ensure_non_negative, ThermalResult};
use crate::math_utils::linreg;
use crate::soil_texture::TextureClass;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Rolling window of daily air temperatures plus a slowly adapting annual mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateBuffer {
    temps: VecDeque<f64>,
    atemp_mean: f64,
    month_sum: f64,
    month_days: u32,
}

impl ClimateBuffer {
    /// A buffer that has seen `temp` every day so far.
    pub fn new(temp: f64) -> ThermalResult<Self> {
        ensure_finite(temp, None, "initial air temperature")?;
        Ok(Self {
            temps: std::iter::repeat_n(temp, NDAYS).collect(),
            atemp_mean: temp,
            month_sum: 0.0,
            month_days: 0,
        })
    }

    pub fn push_daily(&mut self, temp: f64) -> ThermalResult<()> {
        ensure_finite(temp, None, "daily air temperature")?;
        if self.temps.len() == NDAYS {
            self.temps.pop_front();
        }
        self.temps.push_back(temp);
        self.month_sum += temp;
        self.month_days += 1;
        Ok(())
    }

    /// Fold the finished month into the annual mean with weight 1/12.
    pub fn end_month(&mut self) {
        if self.month_days == 0 {
            return;
        }
        let month_mean = self.month_sum / self.month_days as f64;
        self.atemp_mean += (month_mean - self.atemp_mean) / MONTHS_PER_YEAR;
        self.month_sum = 0.0;
        self.month_days = 0;
    }

    pub fn atemp_mean(&self) -> f64 {
        self.atemp_mean
    }

    pub fn last(&self) -> f64 {
        self.temps.back().copied().unwrap_or(self.atemp_mean)
    }

    pub fn temps(&self) -> Vec<f64> {
        self.temps.iter().copied().collect()
    }
}

/// Phase lag (rad) and amplitude damping of the annual temperature wave at
/// `LAG_DEPTH_M`, refitted once a year from the mean top layer water content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLag {
    class: TextureClass,
    alag: f64,
    amp: f64,
    w_sum: f64,
    months: u32,
}

impl SoilLag {
    pub fn new(class: TextureClass, top_layer_w: f64) -> ThermalResult<Self> {
        let mut lag = Self {
            class,
            alag: 0.0,
            amp: 1.0,
            w_sum: 0.0,
            months: 0,
        };
        lag.fit(top_layer_w)?;
        Ok(lag)
    }

    fn fit(&mut self, w: f64) -> ThermalResult<()> {
        ensure_non_negative(w, Some(0), "top layer water fraction")?;
        let tdiff = self.class.params()?.thermal_diffusivity(w) * 1.0e-6;
        let period_s = DAYS_PER_YEAR * SECONDS_PER_DAY;
        self.alag = if tdiff > 0.0 { LAG_DEPTH_M / (tdiff * period_s / PI).sqrt() } else { 0.0 };
        self.amp = (-self.alag).exp();
        Ok(())
    }

    pub fn add_month(&mut self, top_layer_w: f64) -> ThermalResult<()> {
        ensure_non_negative(top_layer_w, Some(0), "top layer water fraction")?;
        self.w_sum += top_layer_w;
        self.months += 1;
        Ok(())
    }

    /// Refit from the mean water content of the months seen this year.
    pub fn end_year(&mut self) -> ThermalResult<()> {
        if self.months == 0 {
            return Ok(());
        }
        let meanw1 = self.w_sum / self.months as f64;
        self.fit(meanw1)?;
        debug!("soil lag refit for {}: w={meanw1:.3} alag={:.4} amp={:.4}", self.class.as_str(), self.alag, self.amp);
        self.w_sum = 0.0;
        self.months = 0;
        Ok(())
    }

    pub fn alag(&self) -> f64 {
        self.alag
    }

    pub fn amp(&self) -> f64 {
        self.amp
    }
}

/// Estimated soil temperature (°C)
///
/// Extrapolates the linear trend of the buffer back by the lag, then damps
/// the deviation from the annual mean. A dry top layer follows the air.
pub fn soil_temperature_lag(lag: &SoilLag, buffer: &ClimateBuffer, top_layer_w: f64) -> f64 {
    if top_layer_w < EPSILON {
        return buffer.last();
    }
    let (a, b) = linreg(&buffer.temps());
    let temp_lag = a + b * ((NDAYS - 1) as f64 - lag.alag * LAG_CONV);
    buffer.atemp_mean + lag.amp * (temp_lag - buffer.atemp_mean)
}
