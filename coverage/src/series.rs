use common::time::Epoch;

use crate::errors::{Error, Result};

pub type Point = (Epoch, f64);

/// Coverage over time: strictly increasing timestamps, non-decreasing values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    points: Vec<Point>,
}

impl TimeSeries {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        for (i, (timestamp, value)) in points.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::invalid_argument(format!(
                    "value {value} at index {i} is not finite"
                )));
            }

            if let Some((last_timestamp, last_value)) = i.checked_sub(1).map(|j| points[j]) {
                if *timestamp <= last_timestamp {
                    return Err(Error::invalid_argument(format!(
                        "timestamp {timestamp} at index {i} does not increase (previous {last_timestamp})"
                    )));
                }
                if *value < last_value {
                    return Err(Error::invalid_argument(format!(
                        "value {value} at index {i} decreases (previous {last_value})"
                    )));
                }
            }
        }

        Ok(Self { points })
    }

    /// Assign timestamps `start, start + step, ...` to synthesized values.
    pub fn from_values(start: Epoch, step: Epoch, values: &[f64]) -> Result<Self> {
        if step == 0 {
            return Err(Error::invalid_argument("series step must be at least 1 second"));
        }

        Self::new(
            values
                .iter()
                .enumerate()
                .map(|(i, value)| (start + i as Epoch * step, *value))
                .collect(),
        )
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<Epoch> {
        self.points.first().map(|(timestamp, _)| *timestamp)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|(_, value)| *value)
    }

    /// Reduce the series for plotting.
    ///
    /// A point is kept when its value changed and it is at least `min_diff`
    /// seconds after the previously kept point. The last point is always kept.
    pub fn thin(&self, min_diff: Epoch) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::new();

        for (timestamp, value) in self.points.iter().copied() {
            if let Some((last_timestamp, last_value)) = points.last() {
                if value == *last_value {
                    // same value => keep
                    continue;
                } else if (timestamp - *last_timestamp) < min_diff {
                    // update only every x seconds
                    continue;
                }
            }

            points.push((timestamp, value));
        }

        // add point at last timestamp
        if let Some(last) = self.points.last() {
            if points.last() != Some(last) {
                points.push(*last);
            }
        }

        points
    }

    /// Points as (minutes since start, value) for plotting.
    pub fn to_minutes(&self, min_diff: Epoch) -> Vec<(f64, f64)> {
        let start = self.start().unwrap_or(0);
        self.thin(min_diff)
            .into_iter()
            .map(|(timestamp, value)| ((timestamp - start) as f64 / 60., value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_from_step() -> Result<()> {
        let series = TimeSeries::from_values(1_000, 30, &[1., 2., 2., 5.])?;
        assert_eq!(
            series.points(),
            &[(1_000, 1.), (1_030, 2.), (1_060, 2.), (1_090, 5.)]
        );
        assert_eq!(series.start(), Some(1_000));
        assert_eq!(series.last_value(), Some(5.));
        Ok(())
    }

    #[test]
    fn rejects_unordered_points() {
        let err = TimeSeries::new(vec![(10, 1.), (10, 2.)]).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = TimeSeries::new(vec![(10, 2.), (20, 1.)]).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = TimeSeries::from_values(0, 0, &[1.]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn thin_keeps_changes_and_last_point() -> Result<()> {
        let series = TimeSeries::from_values(0, 30, &[0., 1., 1., 2., 3., 3., 3.])?;

        assert_eq!(
            series.thin(60),
            vec![(0, 0.), (60, 1.), (120, 3.), (180, 3.)]
        );
        assert_eq!(series.thin(0), vec![(0, 0.), (30, 1.), (90, 2.), (120, 3.), (180, 3.)]);
        Ok(())
    }
}
