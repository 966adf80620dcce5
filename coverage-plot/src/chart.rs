use std::{fmt, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use common::config::plot::{BAND_OPACITY, LINE_WIDTH, RAW_SERIES_MIN_DIFF, Y_MARGIN};
use coverage::{synth::SynthesizedRun, Aggregation};
use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::style::PlotStyle;

const LETTER_HEIGHT: i32 = 30;
const LEGEND_LINE: i32 = 20;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// minutes
    pub x: f64,
    pub y: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub points: Vec<CurvePoint>,
}

impl Curve {
    fn has_spread(&self) -> bool {
        self.points.iter().any(|point| point.spread > 0.)
    }
}

/// One subplot: a title and one curve per tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub curves: Vec<Curve>,
}

impl Panel {
    pub fn from_aggregation(title: String, aggregation: &Aggregation, style: &PlotStyle) -> Self {
        let curves = aggregation
            .series
            .iter()
            .map(|(tool, points)| Curve {
                label: style.label(tool).to_owned(),
                points: points
                    .iter()
                    .map(|point| CurvePoint {
                        x: point.offset as f64,
                        y: point.mean_value,
                        spread: point.std_dev,
                    })
                    .collect(),
            })
            .collect();

        Self { title, curves }
    }

    /// Raw synthesized series, one curve per tool and run.
    pub fn from_runs(title: String, runs: &[SynthesizedRun], style: &PlotStyle) -> Self {
        let multiple_runs = runs.iter().any(|run| run.run > 1);

        let curves = runs
            .iter()
            .map(|run| {
                let label = style.label(&run.tool);
                Curve {
                    label: if multiple_runs {
                        format!("{label} #{}", run.run)
                    } else {
                        label.to_owned()
                    },
                    points: run
                        .series
                        .to_minutes(RAW_SERIES_MIN_DIFF)
                        .into_iter()
                        .map(|(x, y)| CurvePoint { x, y, spread: 0. })
                        .collect(),
                }
            })
            .collect();

        Self { title, curves }
    }

    fn points(&self) -> impl Iterator<Item = &CurvePoint> {
        self.curves.iter().flat_map(|curve| curve.points.iter())
    }

    fn x_max(&self) -> f64 {
        self.points().map(|point| point.x).fold(0., f64::max)
    }

    fn y_max(&self, band: bool) -> f64 {
        self.points()
            .map(|point| if band { point.y + point.spread } else { point.y })
            .fold(0., f64::max)
    }
}

fn draw_error<E: fmt::Debug>(err: E) -> anyhow::Error {
    anyhow!("Failed to draw chart: {:?}", err)
}

/// Render panels into an SVG, two per row with `(a)`, `(b)`, ... captions
/// when there is more than one.
pub fn render_svg(path: &Path, panels: &[Panel], style: &PlotStyle, band: bool) -> Result<()> {
    if panels.is_empty() {
        bail!("no panels to draw");
    }

    let columns = if panels.len() > 1 {
        style.columns.clamp(1, panels.len())
    } else {
        1
    };
    let rows = (panels.len() + columns - 1) / columns;
    let size = (
        style.panel_width * columns as u32,
        style.panel_height * rows as u32,
    );
    log::debug!("chart {:?}: {} x {} panels, {:?} px", path, rows, columns, size);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let areas = root.split_evenly((rows, columns));
    for (idx, (panel, area)) in panels.iter().zip(areas.iter()).enumerate() {
        if panels.len() > 1 {
            let (_, height) = area.dim_in_pixel();
            let (plot_area, letter_area) = area.split_vertically(height as i32 - LETTER_HEIGHT);
            draw_panel(&plot_area, panel, style, band)?;
            draw_letter(&letter_area, idx)?;
        } else {
            draw_panel(area, panel, style, band)?;
        }
    }

    root.present()
        .map_err(draw_error)
        .with_context(|| format!("Failed to write chart {path:?}"))
}

fn draw_panel(area: &Area, panel: &Panel, style: &PlotStyle, band: bool) -> Result<()> {
    // empty panels still get axes
    let x_max = panel.x_max().max(1.);
    let y_max = (panel.y_max(band) * Y_MARGIN).max(1.);

    let mut chart = ChartBuilder::on(area)
        .caption(
            &panel.title,
            ("sans-serif", 22).into_font().style(FontStyle::Bold),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .draw()
        .map_err(draw_error)?;

    for (idx, curve) in panel.curves.iter().enumerate() {
        let color = style.color(idx);

        if band && curve.has_spread() {
            let upper = curve
                .points
                .iter()
                .map(|point| (point.x, point.y + point.spread));
            let lower = curve
                .points
                .iter()
                .rev()
                .map(|point| (point.x, (point.y - point.spread).max(0.)));

            chart
                .draw_series(std::iter::once(Polygon::new(
                    upper.chain(lower).collect::<Vec<_>>(),
                    color.mix(BAND_OPACITY).filled(),
                )))
                .map_err(draw_error)?;
        }

        chart
            .draw_series(LineSeries::new(
                curve.points.iter().map(|point| (point.x, point.y)),
                color.stroke_width(LINE_WIDTH),
            ))
            .map_err(draw_error)?
            .label(curve.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + LEGEND_LINE, y)], color.stroke_width(LINE_WIDTH))
            });
    }

    if !panel.curves.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_error)?;
    }

    Ok(())
}

fn draw_letter(area: &Area, idx: usize) -> Result<()> {
    let letter = char::from(b'a' + (idx % 26) as u8);
    let (width, height) = area.dim_in_pixel();
    let text = TextStyle::from(("sans-serif", 18).into_font()).pos(Pos::new(HPos::Center, VPos::Center));

    area.draw_text(
        &format!("({letter})"),
        &text,
        (width as i32 / 2, height as i32 / 2),
    )
    .map_err(draw_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage::{Observation, Table, WindowedAggregator};
    use pretty_assertions::assert_eq;

    fn aggregation() -> Aggregation {
        let table: Table = [(1, 0, 5.), (1, 60, 10.), (2, 0, 7.), (2, 60, 20.)]
            .into_iter()
            .map(|(run, timestamp, value)| Observation {
                timestamp,
                subject: "tinydtls".into(),
                tool: "aflnet".into(),
                run,
                metric_kind: "b_abs".into(),
                value,
            })
            .collect();

        WindowedAggregator::new(1, 1)
            .unwrap()
            .aggregate(&table, "tinydtls", &["aflnet", "chatafl"])
    }

    #[test]
    fn panel_from_aggregation() {
        let panel = Panel::from_aggregation("Tinydtls".into(), &aggregation(), &PlotStyle::default());

        assert_eq!(panel.curves.len(), 1);
        assert_eq!(panel.curves[0].label, "AFLNet");
        assert_eq!(
            panel.curves[0].points,
            vec![
                CurvePoint { x: 0., y: 0., spread: 0. },
                CurvePoint { x: 1., y: 15., spread: 5. },
            ]
        );
        assert_eq!(panel.x_max(), 1.);
        assert_eq!(panel.y_max(false), 15.);
        assert_eq!(panel.y_max(true), 20.);
    }

    #[test]
    fn renders_svg_grid() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coverage.svg");
        let style = PlotStyle::default();

        let panels: Vec<_> = ["Tinydtls", "Dnsmasq", "Bftpd"]
            .into_iter()
            .map(|title| Panel::from_aggregation(title.into(), &aggregation(), &style))
            .collect();
        render_svg(&path, &panels, &style, true)?;

        let svg = std::fs::read_to_string(&path)?;
        assert!(svg.contains("<svg"));
        for text in ["Tinydtls", "Bftpd", "AFLNet", "(a)", "(c)"] {
            assert!(svg.contains(text), "missing {text}");
        }
        Ok(())
    }

    #[test]
    fn renders_empty_panel() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.svg");
        let panel = Panel {
            title: "Lightftp".into(),
            curves: vec![],
        };

        render_svg(&path, &[panel], &PlotStyle::default(), false)?;
        assert!(path.is_file());

        assert!(render_svg(&path, &[], &PlotStyle::default(), false).is_err());
        Ok(())
    }
}
