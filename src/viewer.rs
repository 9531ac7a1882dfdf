//! The chart page and the legend state behind it

use std::sync::RwLock;

use serde::Serialize;
use tera::Tera;

use crate::{
    chart::{Chart, Series},
    legend::{Legend, SeriesId},
};

/// Name the page template is registered under. The `.html` suffix turns on autoescaping.
const TEMPLATE_NAME: &str = "chart.html";
const TEMPLATE: &str = include_str!("../templates/chart.html");

/// A chart together with its legend state.
pub struct Viewer {
    /// Holds the page template
    tera: Tera,
    chart: Chart,
    // https://docs.rs/tokio/latest/tokio/sync/struct.Mutex.html#which-kind-of-mutex-should-you-use
    // The lock is never held across an await, so std is fine
    legend: RwLock<Legend>,
}

/// A series as the template sees it
#[derive(Debug, Serialize)]
struct SeriesForPage<'a> {
    id: SeriesId,
    series: &'a Series,
    line: &'a str,
    annotation: &'a str,
    visible: bool,
    alpha: f64,
}

impl Viewer {
    /// Show `chart` with all of its series visible.
    pub fn new(chart: Chart) -> eyre::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
        let legend = RwLock::new(chart.legend());
        Ok(Self {
            tera,
            chart,
            legend,
        })
    }

    /// Render the page for the current legend state.
    pub fn to_html(&self) -> eyre::Result<String> {
        let legend = self.legend.read().unwrap();
        let series = self
            .chart
            .series
            .iter()
            .zip(legend.entries())
            .map(|(series, (id, entry))| SeriesForPage {
                id,
                series,
                line: &entry.line,
                annotation: &entry.annotation,
                visible: entry.is_visible(),
                alpha: entry.alpha(),
            })
            .collect::<Vec<_>>();

        let mut context = tera::Context::new();
        context.insert("chart", &self.chart);
        context.insert("series", &series);
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    /// Forward a legend click. Returns the series' new visibility, or `None` if it doesn't exist.
    pub fn toggle(&self, id: SeriesId) -> Option<bool> {
        self.legend.write().unwrap().on_pick(id)
    }
}
