use std::io::Write;

use anyhow::{Context, Result};
use coverage::AggregatePoint;
use serde::Serialize;

#[derive(Serialize)]
struct RawPoint<'a, X, Y> {
    x: &'a X,
    y: &'a Y,
}

/// Streams plot data as a JSON object of named point arrays.
pub struct PlotWriter<'a, W: Write> {
    first: bool,
    output: &'a mut W,
}

impl<'a, W: Write> PlotWriter<'a, W> {
    pub fn new(output: &'a mut W) -> Result<Self> {
        writeln!(output, "{{")?;

        Ok(Self {
            first: true,
            output,
        })
    }

    fn series<T: Serialize, I: IntoIterator<Item = T>>(&mut self, name: &str, points: I) -> Result<()> {
        if self.first {
            self.first = false;
        } else {
            writeln!(self.output, ",")?;
        }

        serde_json::to_writer(&mut *self.output, name).context("Failed to encode series name")?;
        write!(self.output, ": [")?;

        for (idx, point) in points.into_iter().enumerate() {
            if idx > 0 {
                write!(self.output, ", ")?;
            }
            serde_json::to_writer(&mut *self.output, &point)
                .with_context(|| format!("Failed to encode point of {name:?}"))?;
        }

        write!(self.output, "]")?;
        Ok(())
    }

    /// Plain `{x, y}` points, e.g. a raw synthesized series.
    pub fn plot<X: Serialize, Y: Serialize>(&mut self, name: &str, data: &[(X, Y)]) -> Result<()> {
        self.series(name, data.iter().map(|(x, y)| RawPoint { x, y }))
    }

    /// Aggregated points with offset, mean, spread and contributing run count.
    pub fn plot_aggregate(&mut self, name: &str, points: &[AggregatePoint]) -> Result<()> {
        self.series(name, points)
    }

    pub fn finish(self) -> Result<()> {
        // finish JSON file
        writeln!(self.output)?;
        write!(self.output, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn point(offset: u32, mean_value: f64, runs: usize) -> AggregatePoint {
        AggregatePoint {
            subject: "bftpd".into(),
            tool: "aflnet".into(),
            metric_kind: "b_abs".into(),
            offset,
            mean_value,
            runs,
            std_dev: 0.,
        }
    }

    #[test]
    fn writes_named_arrays() -> Result<()> {
        let mut output = vec![];
        let mut writer = PlotWriter::new(&mut output)?;
        writer.plot("raw/aflnet", &[(0.0, 0.0), (0.5, 1.5)])?;
        writer.plot_aggregate("bftpd/aflnet", &[point(10, 12.5, 2)])?;
        writer.finish()?;

        assert_eq!(
            String::from_utf8(output)?,
            "{\n\
             \"raw/aflnet\": [{\"x\":0.0,\"y\":0.0}, {\"x\":0.5,\"y\":1.5}],\n\
             \"bftpd/aflnet\": [{\"subject\":\"bftpd\",\"tool\":\"aflnet\",\"metric_kind\":\"b_abs\",\
             \"offset\":10,\"mean_value\":12.5,\"runs\":2,\"std_dev\":0.0}]\n\
             }"
        );
        Ok(())
    }

    #[test]
    fn escapes_names() -> Result<()> {
        let mut output = vec![];
        let mut writer = PlotWriter::new(&mut output)?;
        writer.plot::<f64, f64>("a\"b\\c\n", &[])?;
        writer.finish()?;

        assert_eq!(String::from_utf8(output)?, "{\n\"a\\\"b\\\\c\\n\": []\n}");
        Ok(())
    }

    #[test]
    fn output_is_valid_json() -> Result<()> {
        let mut output = vec![];
        let mut writer = PlotWriter::new(&mut output)?;
        writer.plot("kamailio/aflnet/1", &[(0.0, 0.0), (1.0, 2.0)])?;
        writer.plot_aggregate("kamailio/aflnet", &[point(0, 0., 0), point(1, 2., 1)])?;
        writer.finish()?;

        let json: serde_json::Value = serde_json::from_slice(&output)?;
        assert_eq!(json["kamailio/aflnet"][1]["runs"], 1);
        assert_eq!(json["kamailio/aflnet/1"][1]["y"], 2.0);
        Ok(())
    }
}
