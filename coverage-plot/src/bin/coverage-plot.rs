use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use common::{
    config::aggregate::DEFAULT_METRIC_KIND,
    error::LogError,
    fs::{file_stem, find_files, writer},
    log::{init_log, LOG_INFO},
};
use coverage::{Table, WindowOrigin, WindowedAggregator};
use coverage_plot::{
    chart::{render_svg, Panel},
    plot::PlotWriter,
    style::PlotStyle,
    title_case,
};

const CSV_POSTFIXES: [&str; 2] = [".csv", ".csv.zst"];

#[derive(Parser, Debug)]
#[command(name = "coverage-plot", rename_all = "kebab-case")]
pub struct Arguments {
    #[arg(long, default_value = LOG_INFO)]
    pub log_config: PathBuf,

    /// Coverage CSV files or directories containing them
    #[arg(short = 'i', long = "csv-files", num_args = 1.., required = true)]
    pub csv_files: Vec<PathBuf>,

    /// Subjects, one per CSV file [default: file names]
    #[arg(short = 'p', long = "puts", num_args = 1..)]
    pub subjects: Vec<String>,

    /// Tools (fuzzers) to compare
    #[arg(short = 'f', long = "fuzzers", num_args = 1.., required = true)]
    pub tools: Vec<String>,

    /// Cut-off time in minutes
    #[arg(short = 'c', long = "cut-off")]
    pub cutoff: u32,

    /// Time step in minutes
    #[arg(short = 's', long)]
    pub step: u32,

    /// Expected runs 1..=N [default: all runs in the data]
    #[arg(short = 'r', long)]
    pub runs: Option<u32>,

    /// Coverage type
    #[arg(long, default_value = DEFAULT_METRIC_KIND)]
    pub metric_kind: String,

    /// Start of the sampling windows
    #[arg(long, value_enum, default_value_t = Origin::RunStart)]
    pub origin: Origin,

    /// Shade one standard deviation around the mean
    #[arg(long)]
    pub band: bool,

    /// Plot style (YAML)
    #[arg(long)]
    pub style: Option<PathBuf>,

    /// Title of a single panel [default: subject]
    #[arg(long)]
    pub title: Option<String>,

    /// Output SVG
    #[arg(short = 'o', long = "out-file")]
    pub output: PathBuf,

    /// Also write the aggregated curves as JSON plot data
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Origin {
    /// Each run's first timestamp
    RunStart,
    /// Earliest first timestamp of all runs
    EarliestRun,
}

impl From<Origin> for WindowOrigin {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::RunStart => WindowOrigin::RunStart,
            Origin::EarliestRun => WindowOrigin::EarliestRun,
        }
    }
}

fn main() -> Result<()> {
    let opt = Arguments::parse();

    init_log(&opt.log_config)?;
    log::trace!("Args: {:#?}", opt);

    plot(opt).map_err(|e| {
        log::error!("{:?}", e);
        e
    })
}

fn plot(opt: Arguments) -> Result<()> {
    let aggregator = WindowedAggregator::new(opt.cutoff, opt.step)?
        .with_metric_kind(opt.metric_kind.as_str())
        .with_runs(opt.runs)
        .with_origin(opt.origin.into());

    let style = opt
        .style
        .as_deref()
        .map(PlotStyle::load_from)
        .transpose()?
        .unwrap_or_default();

    let inputs = inputs(&opt.csv_files, &opt.subjects)?;
    let single = inputs.len() == 1;

    let mut panels = Vec::with_capacity(inputs.len());
    let mut data = vec![];
    for (path, subject) in inputs {
        log::info!("Loading coverage table {:?} ...", path);
        let table = match Table::load_from(&path).log_error() {
            Some(table) => table,
            None => continue,
        };

        let aggregation = aggregator.aggregate(&table, &subject, &opt.tools);
        if aggregation.series.is_empty() {
            log::warn!("no tool has data for subject {:?} in {:?}", subject, path);
        }

        let title = match (&opt.title, single) {
            (Some(title), true) => title.clone(),
            _ => title_case(&subject),
        };
        panels.push(Panel::from_aggregation(title, &aggregation, &style));
        data.push((subject, aggregation));
    }

    if panels.is_empty() {
        bail!("no coverage table could be loaded");
    }

    render_svg(&opt.output, &panels, &style, opt.band)?;
    log::info!("Saved plot to {:?}", opt.output);

    if let Some(path) = &opt.data {
        let mut output = writer(path)?;
        let mut plot_writer = PlotWriter::new(&mut output)?;
        for (subject, aggregation) in &data {
            for (tool, points) in &aggregation.series {
                plot_writer.plot_aggregate(&format!("{subject}/{tool}"), points)?;
            }
        }
        plot_writer.finish()?;

        output.flush().context("Failed to flush JSON output")?;
        log::info!("Saved plot data to {:?}", path);
    }

    Ok(())
}

/// CSV files paired with their subject.
fn inputs(paths: &[PathBuf], subjects: &[String]) -> Result<Vec<(PathBuf, String)>> {
    let mut files = vec![];
    for path in paths {
        if path.is_dir() {
            let found = csv_files(path)?;
            if found.is_empty() {
                log::warn!("no CSV files in {:?}", path);
            }
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }

    if subjects.is_empty() {
        files
            .into_iter()
            .map(|path| {
                let subject = file_stem(&path)
                    .with_context(|| format!("Failed to derive subject from {path:?}"))?;
                Ok((path, subject))
            })
            .collect()
    } else if subjects.len() == files.len() {
        Ok(files.into_iter().zip(subjects.iter().cloned()).collect())
    } else {
        bail!(
            "{} subjects given for {} CSV files",
            subjects.len(),
            files.len()
        );
    }
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = find_files(dir, None, None)
        .with_context(|| format!("Failed to list CSV files in {dir:?}"))?;
    files.retain(|path| {
        let name = path.to_string_lossy();
        CSV_POSTFIXES.iter().any(|postfix| name.ends_with(postfix))
    });
    Ok(files)
}
