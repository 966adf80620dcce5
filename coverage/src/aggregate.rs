use std::{collections::BTreeMap, fmt};

use average::{Estimate, Variance};
use common::{config::aggregate::DEFAULT_METRIC_KIND, time::{offset_seconds, Epoch}};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    errors::{Error, Result},
    table::{Observation, Table},
};

/// Mean coverage of one tool at one offset (minutes since start).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatePoint {
    pub subject: String,
    pub tool: String,
    pub metric_kind: String,
    pub offset: u32,
    pub mean_value: f64,
    /// runs contributing to the mean
    pub runs: usize,
    /// population standard deviation across the contributing runs
    pub std_dev: f64,
}

/// Reference point of the sampling windows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WindowOrigin {
    /// each run's own first timestamp
    #[default]
    RunStart,
    /// earliest first timestamp across all runs of a tool
    EarliestRun,
}

/// Soft missing-data conditions, the aggregation continues with what it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// no observation for (subject, tool, metric kind), tool skipped
    ToolMissing { tool: String },
    /// an expected run has no observations at all
    RunMissing { tool: String, run: u32 },
    /// a run has no observation at or before the window end
    WindowEmpty { tool: String, run: u32, offset: u32 },
    /// no run contributed a value, mean is reported as 0.0
    OffsetEmpty { tool: String, offset: u32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ToolMissing { tool } => write!(f, "no data for tool {tool:?}"),
            Diagnostic::RunMissing { tool, run } => {
                write!(f, "no data for tool {tool:?} run {run}, skipping run")
            }
            Diagnostic::WindowEmpty { tool, run, offset } => write!(
                f,
                "tool {tool:?} run {run} has no data within {offset} min, skipping run"
            ),
            Diagnostic::OffsetEmpty { tool, offset } => {
                write!(f, "tool {tool:?} has no run with data within {offset} min")
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregation {
    /// tool (lower case) => points ordered by offset, in the requested tool order
    pub series: IndexMap<String, Vec<AggregatePoint>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Aggregation {
    fn diagnostic(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Step-sampled mean of the last observed value per run.
#[derive(Debug, Clone)]
pub struct WindowedAggregator {
    cutoff: u32,
    step: u32,
    metric_kind: String,
    runs: Option<u32>,
    origin: WindowOrigin,
}

type Run<'a> = Vec<&'a Observation>;

impl WindowedAggregator {
    /// `cutoff` and `step` are minutes.
    pub fn new(cutoff: u32, step: u32) -> Result<Self> {
        if cutoff < 1 {
            return Err(Error::invalid_argument("cutoff must be at least 1 minute"));
        }
        if step < 1 {
            return Err(Error::invalid_argument("step must be at least 1 minute"));
        }

        Ok(Self {
            cutoff,
            step,
            metric_kind: DEFAULT_METRIC_KIND.to_owned(),
            runs: None,
            origin: WindowOrigin::default(),
        })
    }

    pub fn with_metric_kind<S: Into<String>>(mut self, metric_kind: S) -> Self {
        self.metric_kind = metric_kind.into();
        self
    }

    /// Expect runs `1..=runs`, other run numbers are ignored.
    pub fn with_runs(mut self, runs: Option<u32>) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_origin(mut self, origin: WindowOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn metric_kind(&self) -> &str {
        &self.metric_kind
    }

    /// `step, 2 * step, ...` up to and including the cutoff.
    pub fn offsets(&self) -> impl Iterator<Item = u32> {
        (self.step..=self.cutoff).step_by(self.step as usize)
    }

    pub fn aggregate<S: AsRef<str>>(&self, table: &Table, subject: &str, tools: &[S]) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for tool in tools {
            let tool = tool.as_ref().to_lowercase();
            if aggregation.series.contains_key(&tool) {
                log::debug!("tool {:?} requested twice", tool);
                continue;
            }

            let runs = self.runs(table, subject, &tool);
            if runs.is_empty() {
                aggregation.diagnostic(Diagnostic::ToolMissing { tool });
                continue;
            }

            let points = self.aggregate_tool(&mut aggregation, subject, &tool, runs);
            aggregation.series.insert(tool, points);
        }

        aggregation
    }

    /// Observations per run, sorted by timestamp.
    fn runs<'a>(&self, table: &'a Table, subject: &str, tool: &str) -> BTreeMap<u32, Run<'a>> {
        let mut runs: BTreeMap<u32, Run> = BTreeMap::new();

        for observation in table.observations().iter().filter(|observation| {
            observation.subject == subject
                && observation.metric_kind == self.metric_kind
                && observation.tool.to_lowercase() == tool
        }) {
            runs.entry(observation.run).or_default().push(observation);
        }

        if let Some(expected) = self.runs {
            runs.retain(|run, _| (1..=expected).contains(run));
        }

        for observations in runs.values_mut() {
            // stable: the later row wins on equal timestamps
            observations.sort_by_key(|observation| observation.timestamp);
        }

        runs
    }

    fn aggregate_tool(
        &self,
        aggregation: &mut Aggregation,
        subject: &str,
        tool: &str,
        runs: BTreeMap<u32, Run>,
    ) -> Vec<AggregatePoint> {
        if let Some(expected) = self.runs {
            for run in (1..=expected).filter(|run| !runs.contains_key(run)) {
                aggregation.diagnostic(Diagnostic::RunMissing {
                    tool: tool.to_owned(),
                    run,
                });
            }
        }

        let earliest = runs
            .values()
            .filter_map(|observations| observations.first())
            .map(|observation| observation.timestamp)
            .min();

        let point = |offset, mean_value, run_count, std_dev| AggregatePoint {
            subject: subject.to_owned(),
            tool: tool.to_owned(),
            metric_kind: self.metric_kind.clone(),
            offset,
            mean_value,
            runs: run_count,
            std_dev,
        };

        let mut points = vec![point(0, 0., 0, 0.)];

        for offset in self.offsets() {
            let mut values = Variance::new();

            for (run, observations) in &runs {
                let start = match self.origin {
                    WindowOrigin::RunStart => observations.first().map(|o| o.timestamp),
                    WindowOrigin::EarliestRun => earliest,
                };

                // window ends past the epoch range still cover the whole run
                let end = start.map(|start| start.saturating_add(offset_seconds(offset)));

                match end.and_then(|end| last_value(observations, end)) {
                    Some(value) => values.add(value),
                    None => aggregation.diagnostic(Diagnostic::WindowEmpty {
                        tool: tool.to_owned(),
                        run: *run,
                        offset,
                    }),
                }
            }

            if values.is_empty() {
                aggregation.diagnostic(Diagnostic::OffsetEmpty {
                    tool: tool.to_owned(),
                    offset,
                });
                points.push(point(offset, 0., 0, 0.));
            } else {
                let std_dev = values.population_variance().max(0.).sqrt();
                points.push(point(offset, values.mean(), values.len() as usize, std_dev));
            }
        }

        log::debug!(
            "aggregated {} runs of {:?} on {:?} into {} points",
            runs.len(),
            tool,
            subject,
            points.len()
        );

        points
    }
}

/// Value of the latest observation at or before `end`.
fn last_value(observations: &[&Observation], end: Epoch) -> Option<f64> {
    let idx = observations.partition_point(|observation| observation.timestamp <= end);
    idx.checked_sub(1).map(|idx| observations[idx].value)
}

/// Aggregate `tools` of `subject` with default options.
pub fn aggregate<S: AsRef<str>>(
    table: &Table,
    subject: &str,
    tools: &[S],
    cutoff: u32,
    step: u32,
    metric_kind: &str,
) -> Result<Aggregation> {
    Ok(WindowedAggregator::new(cutoff, step)?
        .with_metric_kind(metric_kind)
        .aggregate(table, subject, tools))
}
