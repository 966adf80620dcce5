use std::{io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use common::{
    config::{plot::RAW_SERIES_MIN_DIFF, synth::*},
    fs::writer,
    log::{init_log, LOG_INFO},
    time::{epoch, Epoch},
};
use coverage::{Campaign, ToolProfile};
use coverage_plot::{
    chart::{render_svg, Panel},
    plot::PlotWriter,
    style::PlotStyle,
    title_case,
};

#[derive(Parser, Debug)]
#[command(name = "coverage-generate", rename_all = "kebab-case")]
pub struct Arguments {
    #[arg(long, default_value = LOG_INFO)]
    pub log_config: PathBuf,

    /// Subject (target program) name
    #[arg(long)]
    pub subject: String,

    /// Epoch seconds of the first point [default: now]
    #[arg(long)]
    pub start: Option<Epoch>,

    /// Campaign duration in hours
    #[arg(long = "duration-h", default_value_t = DEFAULT_DURATION_HOURS)]
    pub duration_hours: f64,

    /// Seconds between two samples
    #[arg(long = "step-s", default_value_t = DEFAULT_STEP_SECONDS)]
    pub step_seconds: u64,

    /// Runs per tool
    #[arg(long, default_value_t = 1)]
    pub runs: u32,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Chance for a coverage spike per sample
    #[arg(long, default_value_t = DEFAULT_SPIKE_RATE)]
    pub spike_rate: f64,

    /// Noise scale (0 disables the noise factor)
    #[arg(long, default_value_t = DEFAULT_NOISE_SCALE)]
    pub noise_scale: f64,

    /// Tool profile NAME=END[:SHAPE[:SPIKE_FACTOR]], e.g. aflnet=2200:sigmoid
    /// [default: aflnet=2200:sigmoid chatafl=2334:late xpgfuzz=3950:early]
    #[arg(long = "tool", value_name = "PROFILE")]
    pub tools: Vec<ToolProfile>,

    /// Output CSV (.zst for compression)
    #[arg(long)]
    pub out: PathBuf,

    /// Render the generated series into an SVG
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Plot style (YAML)
    #[arg(long, requires = "plot")]
    pub style: Option<PathBuf>,

    /// Also write the generated series as JSON plot data
    #[arg(long)]
    pub data: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opt = Arguments::parse();

    init_log(&opt.log_config)?;
    log::trace!("Args: {:#?}", opt);

    generate(opt).map_err(|e| {
        log::error!("{:?}", e);
        e
    })
}

fn generate(opt: Arguments) -> Result<()> {
    if !opt.duration_hours.is_finite() || opt.duration_hours < 0. {
        bail!("duration {} h must be a non-negative number", opt.duration_hours);
    }

    let start = match opt.start {
        Some(start) => start,
        None => epoch()?,
    };

    let campaign = Campaign {
        subject: opt.subject,
        start,
        duration: (opt.duration_hours * 3600.) as Epoch,
        step: opt.step_seconds,
        runs: opt.runs,
        seed: opt.seed,
        spike_rate: opt.spike_rate,
        noise_scale: opt.noise_scale,
        tools: if opt.tools.is_empty() {
            ToolProfile::defaults()
        } else {
            opt.tools
        },
    };
    log::debug!("campaign = {:#?}", campaign);

    let runs = campaign
        .synthesize()
        .context("Failed to synthesize campaign")?;
    let table = campaign.table_from(&runs);

    table.save_to(&opt.out)?;
    log::info!("Wrote {} rows to {:?}", table.len(), opt.out);

    if let Some(path) = opt.plot {
        let style = opt
            .style
            .as_deref()
            .map(PlotStyle::load_from)
            .transpose()?
            .unwrap_or_default();

        let panel = Panel::from_runs(title_case(&campaign.subject), &runs, &style);
        render_svg(&path, &[panel], &style, false)?;
        log::info!("Saved plot to {:?}", path);
    }

    if let Some(path) = &opt.data {
        let mut output = writer(path)?;
        let mut plot_writer = PlotWriter::new(&mut output)?;
        for run in &runs {
            plot_writer.plot(
                &format!("{}/{}/{}", campaign.subject, run.tool, run.run),
                &run.series.to_minutes(RAW_SERIES_MIN_DIFF),
            )?;
        }
        plot_writer.finish()?;

        output.flush().context("Failed to flush JSON output")?;
        log::info!("Saved plot data to {:?}", path);
    }

    Ok(())
}
