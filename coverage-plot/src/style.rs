use std::{collections::BTreeMap, ops::Range, path::Path};

use anyhow::{bail, Context, Result};
use common::{config::plot::*, fs::bufreader};
use plotters::style::{RGBColor, BLACK};
use serde::Deserialize;

/// Figure styling, optionally loaded from a YAML file.
///
/// ```yaml
/// labels:
///   snpsfuzzer: SNPSFuzzer
/// palette: ["#4C72B0", "#C44E52"]
/// y_label: Paths covered
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotStyle {
    /// tool name => legend label
    pub labels: BTreeMap<String, String>,
    /// `#RRGGBB` colors, assigned to tools in order
    pub palette: Vec<String>,
    pub x_label: String,
    pub y_label: String,
    pub panel_width: u32,
    pub panel_height: u32,
    pub columns: usize,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|(tool, label)| (tool.to_string(), label.to_string()))
                .collect(),
            palette: DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect(),
            x_label: DEFAULT_X_LABEL.into(),
            y_label: DEFAULT_Y_LABEL.into(),
            panel_width: PANEL_WIDTH,
            panel_height: PANEL_HEIGHT,
            columns: PANEL_COLUMNS,
        }
    }
}

impl PlotStyle {
    pub fn load_from(path: &Path) -> Result<Self> {
        let style: Self = serde_yaml::from_reader(bufreader(path)?)
            .with_context(|| format!("Failed to parse plot style {path:?}"))?;
        style
            .validate()
            .with_context(|| format!("Invalid plot style {path:?}"))?;

        Ok(style)
    }

    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            bail!("palette is empty");
        }
        for color in &self.palette {
            parse_color(color)?;
        }
        if self.columns == 0 {
            bail!("columns must be at least 1");
        }
        if self.panel_width == 0 || self.panel_height == 0 {
            bail!("panel size must not be zero");
        }

        Ok(())
    }

    /// Legend label for a tool, the tool name itself when none is configured.
    pub fn label<'a>(&'a self, tool: &'a str) -> &'a str {
        self.labels
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tool))
            .map(|(_, label)| label.as_str())
            .unwrap_or(tool)
    }

    pub fn color(&self, index: usize) -> RGBColor {
        if self.palette.is_empty() {
            return BLACK;
        }

        parse_color(&self.palette[index % self.palette.len()]).unwrap_or(BLACK)
    }
}

/// `#RRGGBB` => color
pub fn parse_color(color: &str) -> Result<RGBColor> {
    let hex = color
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6 && hex.is_ascii())
        .with_context(|| format!("color {color:?} is not #RRGGBB"))?;

    let channel = |range: Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .with_context(|| format!("color {color:?} is not #RRGGBB"))
    };

    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn default_labels() {
        let style = PlotStyle::default();

        assert_eq!(style.label("aflnet"), "AFLNet");
        assert_eq!(style.label("XPGFuzz"), "XPGFUZZ");
        assert_eq!(style.label("snpsfuzzer"), "snpsfuzzer");
        assert!(style.validate().is_ok());
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#4C72B0").unwrap(), RGBColor(0x4c, 0x72, 0xb0));
        assert!(parse_color("4C72B0").is_err());
        assert!(parse_color("#4C72B").is_err());
        assert!(parse_color("#GGGGGG").is_err());

        let style = PlotStyle::default();
        assert_eq!(style.color(0), style.color(DEFAULT_PALETTE.len()));
    }

    #[test]
    fn yaml_overrides_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "labels:\n  snpsfuzzer: SNPSFuzzer\npalette: [\"#000000\", \"#ffffff\"]\ncolumns: 3"
        )?;

        let style = PlotStyle::load_from(file.path())?;
        assert_eq!(style.label("snpsfuzzer"), "SNPSFuzzer");
        assert_eq!(style.label("aflnet"), "aflnet");
        assert_eq!(style.color(1), RGBColor(0xff, 0xff, 0xff));
        assert_eq!(style.columns, 3);
        assert_eq!(style.y_label, DEFAULT_Y_LABEL);
        Ok(())
    }

    #[test]
    fn rejects_bad_style() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "palette: [\"blue\"]")?;
        assert!(PlotStyle::load_from(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "colour: red")?;
        assert!(PlotStyle::load_from(file.path()).is_err());
        Ok(())
    }
}
