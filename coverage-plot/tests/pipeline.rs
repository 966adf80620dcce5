use std::fs;

use coverage::{aggregate, Campaign, Table, ToolProfile, WindowOrigin, WindowedAggregator};
use coverage_plot::{
    chart::{render_svg, Panel},
    plot::PlotWriter,
    style::PlotStyle,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn campaign() -> Campaign {
    Campaign {
        subject: "kamailio".into(),
        start: 1_700_000_000,
        duration: 2 * 3600,
        step: 30,
        runs: 3,
        seed: 123,
        spike_rate: 0.006,
        noise_scale: 0.6,
        tools: ToolProfile::defaults(),
    }
}

#[test]
fn generate_aggregate_render() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("kamailio.csv.zst");
    let svg = dir.path().join("kamailio.svg");

    let campaign = campaign();
    campaign.to_table().unwrap().save_to(&csv).unwrap();

    let table = Table::load_from(&csv).unwrap();
    assert_eq!(table.subjects(), vec!["kamailio"]);

    let aggregation = aggregate(
        &table,
        "kamailio",
        &["AFLNet", "ChatAFL", "XPGfuzz"],
        120,
        10,
        "b_abs",
    )
    .unwrap();
    assert!(aggregation.diagnostics.is_empty());
    assert_eq!(
        aggregation.series.keys().collect::<Vec<_>>(),
        vec!["aflnet", "chatafl", "xpgfuzz"]
    );

    for (profile, points) in campaign.tools.iter().zip(aggregation.series.values()) {
        let offsets: Vec<_> = points.iter().map(|point| point.offset).collect();
        assert_eq!(offsets, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120]);
        assert!(points.iter().all(|point| point.runs == 3));
        assert!(points
            .windows(2)
            .all(|pair| pair[0].mean_value <= pair[1].mean_value));

        // every run ends exactly at the profile's final coverage (written at one decimal)
        let last = points.last().unwrap();
        assert!((last.mean_value - profile.total_end).abs() < 0.1);
    }

    let style = PlotStyle::default();
    let panel = Panel::from_aggregation("Kamailio".into(), &aggregation, &style);
    render_svg(&svg, &[panel.clone(), panel], &style, true).unwrap();
    assert!(fs::read_to_string(&svg).unwrap().contains("Kamailio"));
}

#[test]
fn missing_runs_are_reported() {
    let mut campaign = campaign();
    campaign.runs = 2;
    let table = campaign.to_table().unwrap();

    let aggregation = WindowedAggregator::new(60, 30)
        .unwrap()
        .with_runs(Some(3))
        .with_origin(WindowOrigin::EarliestRun)
        .aggregate(&table, "kamailio", &["aflnet", "libfuzzer"]);

    assert_eq!(aggregation.series.len(), 1);
    assert!(aggregation.series["aflnet"].iter().all(|point| point.runs == 2));
    assert_eq!(
        aggregation
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec![
            "no data for tool \"aflnet\" run 3, skipping run".to_owned(),
            "no data for tool \"libfuzzer\"".to_owned(),
        ]
    );
}

#[test]
fn raw_series_json() {
    let campaign = campaign();
    let runs = campaign.synthesize().unwrap();
    assert_eq!(campaign.table_from(&runs), campaign.to_table().unwrap());

    let mut output = vec![];
    let mut writer = PlotWriter::new(&mut output).unwrap();
    for run in &runs {
        writer
            .plot(
                &format!("{}/{}/{}", campaign.subject, run.tool, run.run),
                &run.series.to_minutes(60),
            )
            .unwrap();
    }
    writer.finish().unwrap();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let points = json["kamailio/chatafl/2"].as_array().unwrap();
    assert_eq!(points[0]["x"], 0.0);
    assert_eq!(points.last().unwrap()["x"], 120.0);
    assert_eq!(points.last().unwrap()["y"], 2334.0);
}

#[test]
fn plot_data_json() {
    let table = campaign().to_table().unwrap();
    let aggregation = aggregate(&table, "kamailio", &["aflnet"], 20, 10, "b_abs").unwrap();

    let mut output = vec![];
    let mut writer = PlotWriter::new(&mut output).unwrap();
    for (tool, points) in &aggregation.series {
        writer.plot_aggregate(&format!("kamailio/{tool}"), points).unwrap();
    }
    writer.finish().unwrap();

    let json = String::from_utf8(output).unwrap();
    assert!(json.starts_with("{\n\"kamailio/aflnet\": ["));
    // offset 0 carries no runs
    assert_eq!(json.matches("\"runs\":3,").count(), 2);
}
