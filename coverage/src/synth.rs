use std::{fmt, ops::RangeInclusive, str::FromStr};

use common::{
    config::{aggregate::DEFAULT_METRIC_KIND, synth::*},
    random::{seeded_rng, DeriveRandomSeed},
    time::Epoch,
};
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

use crate::{
    errors::{Error, Result},
    series::TimeSeries,
    table::{Observation, Table},
};

/// Where in the campaign coverage growth happens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Slow start, most growth in the middle to late range
    #[default]
    Sigmoid,
    /// Front-loaded growth
    Early,
    /// Back-loaded growth
    Late,
    /// Linear growth
    Flat,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Sigmoid, Shape::Early, Shape::Late, Shape::Flat];

    /// Cumulative growth weight at position `x` in `[0, 1]`.
    pub fn weight(self, x: f64) -> f64 {
        match self {
            Shape::Sigmoid => 1. / (1. + (-SIGMOID_STEEPNESS * (x - SIGMOID_CENTER)).exp()),
            Shape::Early => (x + EARLY_OFFSET).sqrt(),
            Shape::Late => x * x,
            Shape::Flat => x,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sigmoid => "sigmoid",
            Shape::Early => "early",
            Shape::Late => "late",
            Shape::Flat => "flat",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Shape::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "unknown shape {s:?} (expected sigmoid, early, late or flat)"
                ))
            })
    }
}

/// Fabricates plausible, non-decreasing coverage curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSynthesizer {
    shape: Shape,
    spike_rate: f64,
    noise_scale: f64,
}

impl SeriesSynthesizer {
    pub fn new(shape: Shape, spike_rate: f64, noise_scale: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&spike_rate) {
            return Err(Error::invalid_argument(format!(
                "spike rate {spike_rate} not in [0, 1]"
            )));
        }
        if !noise_scale.is_finite() || noise_scale < 0. {
            return Err(Error::invalid_argument(format!(
                "noise scale {noise_scale} must be a non-negative number"
            )));
        }

        Ok(Self {
            shape,
            spike_rate,
            noise_scale,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn spike_rate(&self) -> f64 {
        self.spike_rate
    }

    pub fn noise_scale(&self) -> f64 {
        self.noise_scale
    }

    /// Range of the per step noise factor, narrowing towards `1.0` as the
    /// noise scale goes to zero.
    pub fn noise_range(&self) -> RangeInclusive<f64> {
        let low = (1. - NOISE_LOWER_SLOPE * self.noise_scale).max(NOISE_FLOOR);
        let high = 1. + NOISE_UPPER_SLOPE * self.noise_scale;
        low..=high
    }

    /// Generate `num_points` values ending exactly at `total_end`.
    pub fn generate(&self, num_points: usize, total_end: f64, seed: u64) -> Result<Vec<f64>> {
        self.generate_with(&mut seeded_rng(seed), num_points, total_end)
    }

    pub fn generate_with<R: Rng>(
        &self,
        rng: &mut R,
        num_points: usize,
        total_end: f64,
    ) -> Result<Vec<f64>> {
        if num_points < 1 {
            return Err(Error::invalid_argument("series needs at least one point"));
        }
        if !total_end.is_finite() || total_end < 0. {
            return Err(Error::invalid_argument(format!(
                "series end value {total_end} must be a non-negative number"
            )));
        }

        let mut increments = self.base_increments(num_points);
        self.perturb(rng, &mut increments)?;

        Ok(accumulate(increments, total_end))
    }

    fn base_increments(&self, num_points: usize) -> Vec<f64> {
        let mut last_weight = 0.;

        (0..num_points)
            .map(|i| {
                let x = if num_points > 1 {
                    i as f64 / (num_points - 1) as f64
                } else {
                    1.
                };

                let weight = self.shape.weight(x);
                let increment = (weight - last_weight).max(MIN_WEIGHT_INCREMENT);
                last_weight = weight;
                increment
            })
            .collect()
    }

    fn perturb<R: Rng>(&self, rng: &mut R, increments: &mut [f64]) -> Result<()> {
        let log_normal = LogNormal::new(LOG_NORMAL_MEAN, LOG_NORMAL_SIGMA)
            .map_err(|err| Error::invalid_argument(format!("log-normal distribution: {err}")))?;
        let noise = self.noise_range();

        for increment in increments {
            // heavy-tailed variability
            *increment *= log_normal.sample(rng);

            // occasional spikes
            if rng.gen::<f64>() < self.spike_rate {
                *increment *= rng.gen_range(SPIKE_FACTOR);
            }

            // small noise factor
            *increment *= rng.gen_range(noise.clone());

            *increment = (*increment).max(MIN_INCREMENT);
        }

        Ok(())
    }
}

/// Scale increments to sum up to `total_end` and build the cumulative values.
fn accumulate(mut increments: Vec<f64>, total_end: f64) -> Vec<f64> {
    let sum: f64 = increments.iter().sum();
    if sum > 0. {
        let scale = total_end / sum;
        for increment in &mut increments {
            *increment *= scale;
        }
    }

    let mut acc = 0.;
    let mut values: Vec<f64> = increments
        .into_iter()
        .map(|increment| {
            acc += increment;
            acc
        })
        .collect();

    // rounding residual goes to the last point only
    if let Some(last) = values.last_mut() {
        *last = total_end;
    }

    // earlier values must not overshoot the corrected end
    let mut ceiling = total_end;
    for value in values.iter_mut().rev() {
        *value = (*value).min(ceiling);
        ceiling = *value;
    }

    values
}

/// Generate a synthetic coverage curve with a call-local seeded generator.
pub fn generate(
    num_points: usize,
    total_end: f64,
    shape: Shape,
    spike_rate: f64,
    noise_scale: f64,
    seed: u64,
) -> Result<Vec<f64>> {
    SeriesSynthesizer::new(shape, spike_rate, noise_scale)?.generate(num_points, total_end, seed)
}

/// Final coverage and growth profile of one synthetic tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolProfile {
    pub tool: String,
    pub total_end: f64,
    pub shape: Shape,
    /// Multiplier on the campaign spike rate
    pub spike_factor: f64,
}

impl ToolProfile {
    pub fn new<S: Into<String>>(tool: S, total_end: f64, shape: Shape) -> Self {
        Self {
            tool: tool.into(),
            total_end,
            shape,
            spike_factor: 1.,
        }
    }

    /// AFLNet, ChatAFL and XPGFuzz with diverse growth shapes.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("aflnet", 2200., Shape::Sigmoid),
            Self::new("chatafl", 2334., Shape::Late),
            Self::new("xpgfuzz", 3950., Shape::Early),
        ]
    }
}

/// `NAME=END[:SHAPE[:SPIKE_FACTOR]]`, e.g. `aflnet=2200:sigmoid`
impl FromStr for ToolProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (tool, params) = s.split_once('=').ok_or_else(|| {
            Error::invalid_argument(format!("tool profile {s:?} is not NAME=END[:SHAPE[:SPIKE]]"))
        })?;

        let tool = tool.trim();
        if tool.is_empty() {
            return Err(Error::invalid_argument(format!(
                "tool profile {s:?} has an empty name"
            )));
        }

        let mut params = params.split(':');
        let parse_float = |name: &str, value: Option<&str>| -> Result<Option<f64>> {
            value
                .map(|value| {
                    value.trim().parse::<f64>().map_err(|err| {
                        Error::invalid_argument(format!("tool profile {s:?}: {name}: {err}"))
                    })
                })
                .transpose()
        };

        let total_end = parse_float("end", params.next())?
            .ok_or_else(|| Error::invalid_argument(format!("tool profile {s:?} has no end")))?;
        let shape = params.next().map(str::parse::<Shape>).transpose()?.unwrap_or_default();
        let spike_factor = parse_float("spike factor", params.next())?.unwrap_or(1.);

        if let Some(rest) = params.next() {
            return Err(Error::invalid_argument(format!(
                "tool profile {s:?} has trailing field {rest:?}"
            )));
        }

        Ok(Self {
            tool: tool.to_owned(),
            total_end,
            shape,
            spike_factor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedRun {
    pub tool: String,
    pub run: u32,
    pub series: TimeSeries,
}

/// A synthetic fuzzing campaign for one subject.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub subject: String,
    pub start: Epoch,
    /// seconds
    pub duration: Epoch,
    /// seconds between samples
    pub step: Epoch,
    pub runs: u32,
    pub seed: u64,
    pub spike_rate: f64,
    pub noise_scale: f64,
    pub tools: Vec<ToolProfile>,
}

impl Campaign {
    pub fn num_points(&self) -> Result<usize> {
        if self.step == 0 {
            return Err(Error::invalid_argument("sample step must be at least 1 second"));
        }

        Ok((self.duration / self.step) as usize + 1)
    }

    pub fn synthesize(&self) -> Result<Vec<SynthesizedRun>> {
        if self.runs == 0 {
            return Err(Error::invalid_argument("campaign needs at least one run"));
        }

        let num_points = self.num_points()?;
        let mut runs = Vec::with_capacity(self.tools.len() * self.runs as usize);

        for profile in &self.tools {
            let synthesizer = SeriesSynthesizer::new(
                profile.shape,
                self.spike_rate * profile.spike_factor,
                self.noise_scale,
            )?;

            for run in 1..=self.runs {
                let seed = self.seed.derive(&(profile.tool.as_str(), run));
                let values = synthesizer.generate(num_points, profile.total_end, seed)?;
                let series = TimeSeries::from_values(self.start, self.step, &values)?;
                log::debug!(
                    "synthesized {} run {} ({}, {} points, seed {:#x})",
                    profile.tool,
                    run,
                    profile.shape,
                    series.len(),
                    seed
                );

                runs.push(SynthesizedRun {
                    tool: profile.tool.clone(),
                    run,
                    series,
                });
            }
        }

        Ok(runs)
    }

    /// Long-form table with one `b_abs` series per tool and run.
    pub fn to_table(&self) -> Result<Table> {
        Ok(self.table_from(&self.synthesize()?))
    }

    /// Long-form table of already synthesized runs of this campaign.
    pub fn table_from(&self, runs: &[SynthesizedRun]) -> Table {
        let mut table = Table::default();

        for synthesized in runs {
            for (timestamp, value) in synthesized.series.points() {
                table.push(Observation {
                    timestamp: *timestamp,
                    subject: self.subject.clone(),
                    tool: synthesized.tool.clone(),
                    run: synthesized.run,
                    metric_kind: DEFAULT_METRIC_KIND.to_owned(),
                    value: *value,
                });
            }
        }

        table
    }
}
