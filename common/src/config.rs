pub mod synth {
    use std::ops::RangeInclusive;

    // sigmoid shape: logistic curve centered in the campaign
    pub const SIGMOID_CENTER: f64 = 0.5;
    pub const SIGMOID_STEEPNESS: f64 = 8.;

    // keeps sqrt() away from a zero first increment
    pub const EARLY_OFFSET: f64 = 1e-6;

    // first-difference floor of the shape weights
    pub const MIN_WEIGHT_INCREMENT: f64 = 1e-6;
    // floor after perturbation
    pub const MIN_INCREMENT: f64 = 1e-7;

    // heavy-tailed per step variability (log scale)
    pub const LOG_NORMAL_MEAN: f64 = 0.;
    pub const LOG_NORMAL_SIGMA: f64 = 0.5;

    // occasional coverage jumps
    pub const SPIKE_FACTOR: RangeInclusive<f64> = 3.0..=8.0;

    // noise factor range: [max(FLOOR, 1 - LOWER * scale), 1 + UPPER * scale]
    pub const NOISE_FLOOR: f64 = 0.4;
    pub const NOISE_LOWER_SLOPE: f64 = 0.3;
    pub const NOISE_UPPER_SLOPE: f64 = 0.6;

    pub const DEFAULT_SEED: u64 = 123;
    pub const DEFAULT_SPIKE_RATE: f64 = 0.006;
    pub const DEFAULT_NOISE_SCALE: f64 = 0.6;
    pub const DEFAULT_DURATION_HOURS: f64 = 24.;
    pub const DEFAULT_STEP_SECONDS: u64 = 30;
}

pub mod aggregate {
    // branch coverage (absolute) as reported by ProFuzzBench
    pub const DEFAULT_METRIC_KIND: &str = "b_abs";

    // offsets are minutes, timestamps seconds
    pub const SECONDS_PER_OFFSET: u64 = 60;
}

pub mod table {
    // ProFuzzBench column names
    pub const HEADER: [&str; 6] = ["time", "subject", "fuzzer", "run", "cov_type", "cov"];
    pub const VALUE_PRECISION: usize = 1;
}

pub mod plot {
    pub const PANEL_WIDTH: u32 = 600;
    pub const PANEL_HEIGHT: u32 = 400;
    pub const PANEL_COLUMNS: usize = 2;

    // headroom above the highest curve
    pub const Y_MARGIN: f64 = 1.05;

    // thin raw series to one point per minute at most
    pub const RAW_SERIES_MIN_DIFF: u64 = 60;

    pub const BAND_OPACITY: f64 = 0.15;
    pub const LINE_WIDTH: u32 = 2;

    pub const DEFAULT_PALETTE: [&str; 6] = [
        "#4C72B0", // blue
        "#DD8452", // orange
        "#55A868", // green
        "#C44E52", // red
        "#8172B3", // purple
        "#937860", // brown
    ];

    pub const DEFAULT_LABELS: [(&str, &str); 3] = [
        ("aflnet", "AFLNet"),
        ("chatafl", "ChatAFL"),
        ("xpgfuzz", "XPGFUZZ"),
    ];

    pub const DEFAULT_X_LABEL: &str = "Time (minutes)";
    pub const DEFAULT_Y_LABEL: &str = "Branches covered";
}
