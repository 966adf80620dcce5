use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use common::{
    config::aggregate::DEFAULT_METRIC_KIND,
    log::{init_log, LOG_INFO},
};
use coverage::Table;

#[derive(Parser, Debug)]
#[command(name = "coverage-filter", rename_all = "kebab-case")]
pub struct Arguments {
    #[arg(long, default_value = LOG_INFO)]
    pub log_config: PathBuf,

    /// Coverage type to keep
    #[arg(long, default_value = DEFAULT_METRIC_KIND)]
    pub metric_kind: String,

    /// Output CSV [default: overwrite input]
    #[arg(long)]
    pub output: Option<PathBuf>,

    pub input: PathBuf,
}

fn main() -> Result<()> {
    let opt = Arguments::parse();

    init_log(&opt.log_config)?;
    log::trace!("Args: {:#?}", opt);

    log::info!("Loading coverage table {:?} ...", opt.input);
    let mut table = Table::load_from(&opt.input)?;

    let removed = table.retain_metric_kind(&opt.metric_kind);
    log::info!(
        "Kept {} {:?} rows, removed {} rows",
        table.len(),
        opt.metric_kind,
        removed
    );
    if table.is_empty() {
        log::warn!("no {:?} rows in {:?}", opt.metric_kind, opt.input);
    }

    let output = opt.output.as_ref().unwrap_or(&opt.input);
    table.save_to(output)?;
    log::info!("Wrote {:?}", output);

    Ok(())
}
