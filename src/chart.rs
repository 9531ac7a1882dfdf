//! Chart layout
//!
//! Turns each controller's monthly totals into SVG coordinates: one line per controller, a grid
//! with month and hour ticks, a note at every controller's busiest month, and a legend box. The
//! actual markup lives in the page template, see [`crate::viewer`].

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::{
    legend::Legend,
    monthly::{Month, MonthlyTotal, MonthlyTotals, NoActivity},
};

/// Title shown above the plot
const TITLE: &str = "Total Hours by Month";
/// Width of the whole image
const WIDTH: f64 = 960.0;
/// Height of the whole image
const HEIGHT: f64 = 600.0;
/// Space around the plot area for title, ticks and axis labels: (left, top, right, bottom)
const MARGINS: (f64, f64, f64, f64) = (80.0, 50.0, 30.0, 100.0);
/// How far the peak note sits after its data point
const ANNOTATION_OFFSET_DAYS: Days = Days::new(5);
/// How far the peak note sits above its data point
const ANNOTATION_OFFSET_HOURS: f64 = 5.0;
/// Fraction of the data range left empty on either side of an axis
const AXIS_PADDING: f64 = 0.05;
/// Upper bound on the number of labelled months
const MAX_MONTH_TICKS: usize = 12;
/// Rough number of labelled hour values
const HOUR_TICKS: f64 = 6.0;
/// Distance between legend rows
const LEGEND_ROW_HEIGHT: f64 = 20.0;
/// Room for the line sample in front of each legend label
const LEGEND_SAMPLE_WIDTH: f64 = 40.0;
/// Approximate advance of one legend character
const LEGEND_CHAR_WIDTH: f64 = 7.5;

/// One controller's data, ready to be plotted.
#[derive(Clone, Debug, PartialEq)]
pub struct UserHistory {
    pub name: String,
    pub color: String,
    pub totals: MonthlyTotals,
}

/// Reasons a chart can't be laid out
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("cannot find the busiest month of {user}")]
    NoActivity {
        /// Display name of the controller without sessions
        user: String,
        #[source]
        source: NoActivity,
    },
    #[error("no controllers to plot")]
    NoSeries,
}

/// A position in image coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A labelled grid line. `position` is an x coordinate for months and a y coordinate for hours.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

/// The rectangle data is drawn in
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl PlotArea {
    /// The area left over after taking [`MARGINS`] off the image.
    fn new() -> Self {
        let (left, top, right, bottom) = MARGINS;
        let (right, bottom) = (WIDTH - right, HEIGHT - bottom);
        Self {
            left,
            top,
            right,
            bottom,
            width: right - left,
            height: bottom - top,
            center_x: (left + right) / 2.0,
            center_y: (top + bottom) / 2.0,
        }
    }
}

/// Note pointing at a controller's busiest month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeakAnnotation {
    /// Controller name, first line of the note
    pub name: String,
    /// `YYYY-MM`, second line of the note
    pub month: String,
    /// Bottom left corner of the text, where the arrow starts
    pub anchor: Point,
    /// The data point the arrow points to
    pub target: Point,
}

/// One controller's line
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub color: String,
    /// SVG path data through all markers, in month order
    pub path: String,
    pub markers: Vec<Point>,
    pub peak: PeakAnnotation,
    /// Vertical center of this series' legend row
    pub legend_y: f64,
}

/// Box in the upper left corner holding the legend rows
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LegendBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A laid out chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub width: f64,
    pub height: f64,
    pub plot_area: PlotArea,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub legend_box: LegendBox,
    /// Rendered together with the legend state, see [`crate::viewer::Viewer`]
    #[serde(skip)]
    pub series: Vec<Series>,
}

/// Maps a data range onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    fn map(self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        round(r0 + (value - d0) / (d1 - d0) * (r1 - r0))
    }
}

impl Chart {
    /// Lay out one series per controller, in the given order.
    ///
    /// # Errors
    ///
    /// Fails if there is nobody to plot, or if someone has no months to plot, since their busiest
    /// month can't be annotated.
    pub fn plot(users: &[UserHistory]) -> Result<Self, ChartError> {
        if users.is_empty() {
            return Err(ChartError::NoSeries);
        }
        let peaks = users
            .iter()
            .map(|user| {
                user.totals.peak().map_err(|source| ChartError::NoActivity {
                    user: user.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let all_months = || users.iter().flat_map(|user| user.totals.iter());
        // Both exist since every user has a peak
        let first_month = all_months()
            .map(|total| total.month)
            .min()
            .ok_or(ChartError::NoSeries)?;
        let last_month = all_months()
            .map(|total| total.month)
            .max()
            .ok_or(ChartError::NoSeries)?;

        let x_max = peaks
            .iter()
            .map(|peak| day_number(annotation_day(peak)))
            .fold(day_number(last_month.first_day()), f64::max);
        let (x_min, x_max) = padded(day_number(first_month.first_day()), x_max);

        let lowest = all_months().map(|total| total.total_hours).fold(0.0, f64::min);
        let highest = peaks
            .iter()
            .map(|peak| peak.total_hours + ANNOTATION_OFFSET_HOURS)
            .fold(f64::MIN, f64::max);
        let (mut y_min, y_max) = padded(lowest, highest);
        if lowest >= 0.0 {
            y_min = y_min.max(0.0);
        }

        let plot_area = PlotArea::new();
        let x_scale = LinearScale {
            domain: (x_min, x_max),
            range: (plot_area.left, plot_area.right),
        };
        let y_scale = LinearScale {
            domain: (y_min, y_max),
            range: (plot_area.bottom, plot_area.top),
        };
        let project = |month: NaiveDate, hours: f64| Point {
            x: x_scale.map(day_number(month)),
            y: y_scale.map(hours),
        };

        let series = users
            .iter()
            .zip(&peaks)
            .enumerate()
            .map(|(row, (user, peak))| {
                let markers = user
                    .totals
                    .iter()
                    .map(|total| project(total.month.first_day(), total.total_hours))
                    .collect::<Vec<_>>();
                Series {
                    label: user.name.clone(),
                    color: user.color.clone(),
                    path: svg_path(&markers),
                    markers,
                    peak: PeakAnnotation {
                        name: user.name.clone(),
                        month: peak.month.to_string(),
                        anchor: project(
                            annotation_day(peak),
                            peak.total_hours + ANNOTATION_OFFSET_HOURS,
                        ),
                        target: project(peak.month.first_day(), peak.total_hours),
                    },
                    legend_y: legend_row_y(&plot_area, row),
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            title: TITLE,
            x_label: "Month",
            y_label: "Total hours",
            width: WIDTH,
            height: HEIGHT,
            x_ticks: month_ticks(first_month, last_month, x_scale),
            y_ticks: hour_ticks(y_scale),
            legend_box: legend_box(&plot_area, users),
            plot_area,
            series,
        })
    }

    /// A legend for this chart's series, with everything visible.
    pub fn legend(&self) -> Legend {
        Legend::new(self.series.iter().map(|series| series.label.as_str()))
    }
}

/// Round to a tenth of a pixel, which keeps the markup short.
fn round(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Days since the common era, as an x coordinate
fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

/// Day the peak note of a series is placed at
fn annotation_day(peak: &MonthlyTotal) -> NaiveDate {
    peak.month.first_day() + ANNOTATION_OFFSET_DAYS
}

/// Widen a data range by [`AXIS_PADDING`] on both sides. Empty ranges get one unit of room.
fn padded(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span > 0.0 {
        (min - span * AXIS_PADDING, max + span * AXIS_PADDING)
    } else {
        (min - 1.0, max + 1.0)
    }
}

fn svg_path(points: &[Point]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let command = if i == 0 { 'M' } else { 'L' };
            format!("{command} {} {}", point.x, point.y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label every month between `first` and `last`, skipping some if there are too many.
fn month_ticks(first: Month, last: Month, scale: LinearScale) -> Vec<Tick> {
    let months = std::iter::successors(Some(first), |month| Some(month.succ()))
        .take_while(|month| *month <= last)
        .collect::<Vec<_>>();
    let step = months.len().div_ceil(MAX_MONTH_TICKS).max(1);
    months
        .into_iter()
        .step_by(step)
        .map(|month| Tick {
            position: scale.map(day_number(month.first_day())),
            label: month.to_string(),
        })
        .collect()
}

/// Label round hour values within the scale's domain.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn hour_ticks(scale: LinearScale) -> Vec<Tick> {
    let (min, max) = scale.domain;
    let step = nice_step((max - min) / HOUR_TICKS);
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last)
        .map(|i| {
            // Strip float noise such as 0.30000000000000004
            let value = (i as f64 * step * 1e6).round() / 1e6;
            Tick {
                position: scale.map(value),
                label: format!("{value}"),
            }
        })
        .collect()
}

/// The 1, 2 or 5 times a power of ten closest above `raw`.
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

#[expect(clippy::cast_precision_loss)]
fn legend_row_y(plot_area: &PlotArea, row: usize) -> f64 {
    plot_area.top + LEGEND_ROW_HEIGHT * (row as f64 + 1.0)
}

#[expect(clippy::cast_precision_loss)]
fn legend_box(plot_area: &PlotArea, users: &[UserHistory]) -> LegendBox {
    let longest = users
        .iter()
        .map(|user| user.name.chars().count())
        .max()
        .unwrap_or(0);
    LegendBox {
        x: plot_area.left + 8.0,
        y: plot_area.top + 8.0,
        width: LEGEND_SAMPLE_WIDTH + LEGEND_CHAR_WIDTH * longest as f64 + 12.0,
        height: LEGEND_ROW_HEIGHT * users.len() as f64 + 4.0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::{Chart, ChartError, UserHistory, nice_step, padded};
    use crate::{monthly::MonthlyTotals, sessions::AtcSession};

    fn user(name: &str, color: &str, sessions: &[(i32, u32, u32, f64)]) -> UserHistory {
        UserHistory {
            name: name.to_owned(),
            color: color.to_owned(),
            totals: sessions
                .iter()
                .map(|&(year, month, day, duration_hours)| AtcSession {
                    start: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
                    duration_hours,
                })
                .collect::<MonthlyTotals>(),
        }
    }

    fn erik() -> UserHistory {
        user("Erik", "green", &[(2024, 3, 1, 2.5), (2024, 3, 15, 0.75)])
    }

    #[test]
    fn single_month() {
        let chart = Chart::plot(&[erik()]).unwrap();
        assert_eq!(chart.series.len(), 1);

        let series = &chart.series[0];
        assert_eq!(series.label, "Erik");
        assert_eq!(series.color, "green");
        assert_eq!(series.markers.len(), 1);
        assert_eq!(series.peak.name, "Erik");
        assert_eq!(series.peak.month, "2024-03");
        assert_eq!(series.peak.target, series.markers[0]);
        assert!(series.path.starts_with("M "));

        // Later and higher, so right and up on screen
        assert!(series.peak.anchor.x > series.peak.target.x);
        assert!(series.peak.anchor.y < series.peak.target.y);

        let area = chart.plot_area;
        for point in [series.peak.anchor, series.peak.target] {
            assert!((area.left..=area.right).contains(&point.x), "{point:?}");
            assert!((area.top..=area.bottom).contains(&point.y), "{point:?}");
        }

        let months = chart.x_ticks.iter().map(|t| t.label.as_str()).collect::<Vec<_>>();
        assert_eq!(months, ["2024-03"]);
    }

    #[test]
    fn several_series() {
        let users = [
            erik(),
            user(
                "Luka",
                "red",
                &[(2023, 11, 2, 4.0), (2024, 1, 9, 10.0), (2024, 2, 20, 1.0)],
            ),
        ];
        let chart = Chart::plot(&users).unwrap();

        let labels = chart.series.iter().map(|s| s.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["Erik", "Luka"]);

        let luka = &chart.series[1];
        assert_eq!(luka.markers.len(), 3);
        assert_eq!(luka.peak.month, "2024-01");
        assert_eq!(luka.peak.target, luka.markers[1]);
        assert!(luka.markers.windows(2).all(|pair| pair[0].x < pair[1].x));
        assert!(chart.series[0].legend_y < luka.legend_y);

        let months = chart.x_ticks.iter().map(|t| t.label.as_str()).collect::<Vec<_>>();
        assert_eq!(months, ["2023-11", "2023-12", "2024-01", "2024-02", "2024-03"]);

        // Hour ticks go up the screen as the value grows
        assert!(!chart.y_ticks.is_empty());
        assert_eq!(chart.y_ticks[0].label, "0");
        assert!(chart.y_ticks.windows(2).all(|pair| pair[0].position > pair[1].position));
    }

    #[test]
    fn long_history_thins_month_ticks() {
        let sessions = (1..=12)
            .flat_map(|month| [(2022, month, 3, 1.0), (2023, month, 3, 2.0)])
            .collect::<Vec<_>>();
        let chart = Chart::plot(&[user("Matisse", "blue", &sessions)]).unwrap();
        assert_eq!(chart.x_ticks.len(), 12);
        assert_eq!(chart.x_ticks[0].label, "2022-01");
        assert_eq!(chart.x_ticks[1].label, "2022-03");
    }

    #[test]
    fn user_without_sessions() {
        let users = [erik(), user("Jan-Willem", "pink", &[])];
        match Chart::plot(&users) {
            Err(ChartError::NoActivity { user, .. }) => assert_eq!(user, "Jan-Willem"),
            other => panic!("expected NoActivity, got {other:?}"),
        }
    }

    #[test]
    fn nobody() {
        assert!(matches!(Chart::plot(&[]), Err(ChartError::NoSeries)));
    }

    #[test]
    fn legend_matches_series() {
        let chart = Chart::plot(&[erik(), user("Luka", "red", &[(2024, 1, 9, 10.0)])]).unwrap();
        let legend = chart.legend();
        let labels = legend
            .entries()
            .map(|(_, entry)| entry.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["Erik", "Luka"]);
        assert!(legend.entries().all(|(_, entry)| entry.is_visible()));
    }

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(0.7), 1.0);
        assert_eq!(nice_step(1.3), 2.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(7.0), 10.0);
        assert_eq!(nice_step(42.0), 50.0);
    }

    #[test]
    fn padding() {
        assert_eq!(padded(0.0, 10.0), (-0.5, 10.5));
        assert_eq!(padded(4.0, 4.0), (3.0, 5.0));
    }
}
