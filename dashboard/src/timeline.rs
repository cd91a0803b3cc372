use std::collections::HashMap;

use chrono::NaiveTime;
use thiserror::Error;
use tracing::warn;

use crate::api::RobotSeries;

/// Hard cap on robots charted at once.
pub const MAX_SELECTED: usize = 6;

/// Line smoothing, selected at compile time (options: Linear, Monotone, Step).
pub const INTERPOLATION: Interpolation = Interpolation::Linear;

/// Fixed 6-color palette, assigned by selection order and cycled.
pub const PALETTE: [(u8, u8, u8); 6] = [
    (0xFF, 0x57, 0x33),
    (0x33, 0xFF, 0x57),
    (0x57, 0x33, 0xFF),
    (0xFF, 0x33, 0xA1),
    (0x33, 0xFF, 0xF1),
    (0xF1, 0xFF, 0x33),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Monotone,
    Step,
}

impl Interpolation {
    /// Smoothing tension matching the chart config: linear 0.1, monotone 0.2,
    /// stepped lines have none.
    pub fn tension(self) -> f64 {
        match self {
            Interpolation::Linear => 0.1,
            Interpolation::Monotone => 0.2,
            Interpolation::Step => 0.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("select at most {MAX_SELECTED} robots (got {0})")]
    TooManySelected(usize),
}

/// One charted robot: points are aligned to the view's label axis, with None
/// where the robot has no sample for a label.
#[derive(Debug, Clone)]
pub struct TimelineSeries {
    pub robot: String,
    pub color: (u8, u8, u8),
    pub points: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct TimelineView {
    pub labels: Vec<String>,
    pub series: Vec<TimelineSeries>,
    pub interpolation: Interpolation,
}

/// Reject oversized selections before any fetch happens.
pub fn check_selection(selected: &[String]) -> Result<(), TimelineError> {
    if selected.len() > MAX_SELECTED {
        return Err(TimelineError::TooManySelected(selected.len()));
    }
    Ok(())
}

/// Build the chart view for the selected robots.
///
/// The label axis is the time-sorted union of every selected robot's labels;
/// a robot missing a label contributes a gap there instead of a misaligned
/// point. Robots absent from the payload are skipped (and do not consume a
/// palette color).
pub fn build_view(
    data: &HashMap<String, RobotSeries>,
    selected: &[String],
) -> Result<TimelineView, TimelineError> {
    check_selection(selected)?;

    let mut labels: Vec<String> = Vec::new();
    for robot in selected {
        if let Some(series) = data.get(robot) {
            for label in &series.labels {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
        }
    }
    sort_time_labels(&mut labels);

    let mut series_out = Vec::new();
    let mut color_index = 0usize;
    for robot in selected {
        let Some(series) = data.get(robot) else { continue };

        // Pair labels with values, truncating to the shorter of the two if
        // the backend ever sends mismatched lengths.
        let by_label: HashMap<&str, f64> = series
            .labels
            .iter()
            .zip(series.values.iter())
            .map(|(l, v)| (l.as_str(), *v))
            .collect();
        if series.labels.len() != series.values.len() {
            warn!(
                "timeline: {robot} has {} labels but {} values",
                series.labels.len(),
                series.values.len()
            );
        }

        let points = labels
            .iter()
            .map(|l| by_label.get(l.as_str()).copied())
            .collect();

        series_out.push(TimelineSeries {
            robot: robot.clone(),
            color: PALETTE[color_index % PALETTE.len()],
            points,
        });
        color_index += 1;
    }

    Ok(TimelineView {
        labels,
        series: series_out,
        interpolation: INTERPOLATION,
    })
}

/// Stable-sort "HH:MM" labels ascending by time of day. Labels that do not
/// parse sort after all valid ones, keeping their input order.
pub fn sort_time_labels(labels: &mut [String]) {
    let mut warned = false;
    labels.sort_by_key(|l| {
        let t = parse_hhmm(l);
        if t.is_none() && !warned {
            warn!("timeline: unparseable time label {l:?}");
            warned = true;
        }
        (t.is_none(), t)
    });
}

fn parse_hhmm(label: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(label, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(labels: &[&str], values: &[f64]) -> RobotSeries {
        serde_json::from_value(serde_json::json!({
            "horarios": labels,
            "desempenhos": values,
        }))
        .unwrap()
    }

    #[test]
    fn labels_sort_ascending_by_time_of_day() {
        let mut labels: Vec<String> =
            ["09:30", "08:00", "10:15"].iter().map(|s| s.to_string()).collect();
        sort_time_labels(&mut labels);
        assert_eq!(labels, ["08:00", "09:30", "10:15"]);
    }

    #[test]
    fn values_are_permuted_in_lockstep_with_labels() {
        let mut data = HashMap::new();
        data.insert("RFB".to_string(), series(&["09:30", "08:00", "10:15"], &[2.0, 1.0, 3.0]));
        let view = build_view(&data, &["RFB".to_string()]).unwrap();
        assert_eq!(view.labels, ["08:00", "09:30", "10:15"]);
        assert_eq!(view.series[0].points, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn seven_selected_is_rejected_before_building() {
        let data = HashMap::new();
        let selected: Vec<String> = (0..7).map(|i| format!("R{i}")).collect();
        assert_eq!(
            build_view(&data, &selected).unwrap_err(),
            TimelineError::TooManySelected(7)
        );
    }

    #[test]
    fn exactly_six_selected_is_accepted() {
        let mut data = HashMap::new();
        for i in 0..6 {
            data.insert(format!("R{i}"), series(&["08:00"], &[1.0]));
        }
        let selected: Vec<String> = (0..6).map(|i| format!("R{i}")).collect();
        let view = build_view(&data, &selected).unwrap();
        assert_eq!(view.series.len(), 6);
    }

    #[test]
    fn diverging_label_sets_produce_a_union_axis_with_gaps() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), series(&["08:00", "10:00"], &[1.0, 3.0]));
        data.insert("B".to_string(), series(&["09:00"], &[2.0]));
        let view = build_view(&data, &["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(view.labels, ["08:00", "09:00", "10:00"]);
        assert_eq!(view.series[0].points, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(view.series[1].points, vec![None, Some(2.0), None]);
    }

    #[test]
    fn absent_robots_are_skipped_and_do_not_consume_a_color() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), series(&["08:00"], &[1.0]));
        data.insert("C".to_string(), series(&["08:00"], &[3.0]));
        let selected: Vec<String> =
            ["A", "MISSING", "C"].iter().map(|s| s.to_string()).collect();
        let view = build_view(&data, &selected).unwrap();
        assert_eq!(view.series.len(), 2);
        assert_eq!(view.series[0].color, PALETTE[0]);
        assert_eq!(view.series[1].color, PALETTE[1]);
    }

    #[test]
    fn unparseable_labels_sort_last() {
        let mut labels: Vec<String> =
            ["bogus", "08:00", "07:00"].iter().map(|s| s.to_string()).collect();
        sort_time_labels(&mut labels);
        assert_eq!(labels, ["07:00", "08:00", "bogus"]);
    }
}
