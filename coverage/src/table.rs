use std::{
    io::{Read, Write},
    path::Path,
};

use anyhow::Context;
use common::{
    config::table::{HEADER, VALUE_PRECISION},
    fs, FxHashSet,
    time::Epoch,
};
use serde::Deserialize;

use crate::errors::{ErrorKind, Result};

/// One row of a long-form coverage table.
///
/// Column names follow ProFuzzBench (`time,subject,fuzzer,run,cov_type,cov`),
/// the descriptive names are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "time", alias = "timestamp")]
    pub timestamp: Epoch,
    pub subject: String,
    #[serde(rename = "fuzzer", alias = "tool")]
    pub tool: String,
    pub run: u32,
    #[serde(rename = "cov_type", alias = "metric_kind")]
    pub metric_kind: String,
    #[serde(rename = "cov", alias = "value")]
    pub value: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    observations: Vec<Observation>,
}

impl Table {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Subjects in order of first appearance.
    pub fn subjects(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.observations
            .iter()
            .map(|observation| observation.subject.as_str())
            .filter(|subject| seen.insert(*subject))
            .collect()
    }

    /// Keep only rows of `metric_kind`, returns the number of removed rows.
    pub fn retain_metric_kind(&mut self, metric_kind: &str) -> usize {
        let len = self.observations.len();
        self.observations
            .retain(|observation| observation.metric_kind == metric_kind);
        len - self.observations.len()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut observations = vec![];
        for record in reader.records() {
            let record = record?;
            let observation: Observation = record.deserialize(Some(&headers))?;

            if observation.run == 0 {
                let line = record.position().map(|pos| pos.line()).unwrap_or(0);
                return Err(ErrorKind::InvalidRow {
                    line,
                    message: "run numbers start at 1".into(),
                }
                .into());
            }

            observations.push(observation);
        }

        Ok(Self { observations })
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(HEADER)?;

        for observation in &self.observations {
            let timestamp = observation.timestamp.to_string();
            let run = observation.run.to_string();
            let value = format!("{:.*}", VALUE_PRECISION, observation.value);

            writer.write_record([
                timestamp.as_str(),
                observation.subject.as_str(),
                observation.tool.as_str(),
                run.as_str(),
                observation.metric_kind.as_str(),
                value.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load a CSV table, `.zst` files are decompressed on the fly.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        Self::from_reader(fs::reader(path)?)
            .with_context(|| format!("Failed to load coverage table {path:?}"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let mut output = fs::writer(path)?;
        self.write_to(&mut output)
            .with_context(|| format!("Failed to write coverage table {path:?}"))?;
        output
            .flush()
            .with_context(|| format!("Failed to flush coverage table {path:?}"))
    }
}

impl FromIterator<Observation> for Table {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<Observation> for Table {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        self.observations.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    const PROFUZZBENCH: &str = "\
time,subject,fuzzer,run,cov_type,cov
1697040000,kamailio,aflnet,1,b_abs,1500
1697040000,kamailio,aflnet,1,l_per, 12.5
1697040060,kamailio,aflnet,1,b_abs,1532.0
1697040000,kamailio,chatafl,2,b_abs,1610
";

    #[test]
    fn reads_profuzzbench_columns() -> Result<()> {
        let table = Table::from_reader(PROFUZZBENCH.as_bytes())?;

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.observations()[1],
            Observation {
                timestamp: 1_697_040_000,
                subject: "kamailio".into(),
                tool: "aflnet".into(),
                run: 1,
                metric_kind: "l_per".into(),
                value: 12.5,
            }
        );
        assert_eq!(table.subjects(), vec!["kamailio"]);
        Ok(())
    }

    #[test]
    fn reads_descriptive_columns() -> Result<()> {
        let csv = "timestamp,subject,tool,run,metric_kind,value\n60,dnsmasq,xpgfuzz,3,b_abs,7\n";
        let table = Table::from_reader(csv.as_bytes())?;

        assert_eq!(table.observations()[0].tool, "xpgfuzz");
        assert_eq!(table.observations()[0].run, 3);
        assert_eq!(table.observations()[0].value, 7.);
        Ok(())
    }

    #[test]
    fn rejects_run_zero_and_garbage() {
        let csv = "time,subject,fuzzer,run,cov_type,cov\n0,a,b,0,b_abs,1\n";
        let err = Table::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRow { line: 2, .. }));

        let csv = "time,subject,fuzzer,run,cov_type,cov\nsoon,a,b,1,b_abs,1\n";
        let err = Table::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Csv(_)));
    }

    #[test]
    fn filter_metric_kind() -> Result<()> {
        let mut table = Table::from_reader(PROFUZZBENCH.as_bytes())?;

        assert_eq!(table.retain_metric_kind("b_abs"), 1);
        assert_eq!(table.len(), 3);
        Ok(())
    }

    #[test]
    fn writes_one_decimal() -> Result<()> {
        let table: Table = [Observation {
            timestamp: 30,
            subject: "bftpd".into(),
            tool: "aflnet".into(),
            run: 1,
            metric_kind: "b_abs".into(),
            value: 1234.5678,
        }]
        .into_iter()
        .collect();

        let mut output = vec![];
        table.write_to(&mut output)?;
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "time,subject,fuzzer,run,cov_type,cov\n30,bftpd,aflnet,1,b_abs,1234.6\n"
        );
        Ok(())
    }

    #[test]
    fn zstd_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kamailio.csv.zst");

        let mut table = Table::from_reader(PROFUZZBENCH.as_bytes())?;
        table.retain_metric_kind("b_abs");
        table.save_to(&path)?;

        assert_eq!(Table::load_from(&path)?, table);
        Ok(())
    }
}
