//! Legend state and the click handler toggling series on and off

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opacity of a legend entry whose series is hidden
pub const HIDDEN_ALPHA: f64 = 0.2;

/// Position of a series in the chart, and of its entry in the legend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(usize);

impl SeriesId {
    #[cfg(test)]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }
}

impl Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a legend click touches for one series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    /// Series label, shown in the legend
    pub label: String,
    /// Element ID of the series' line and markers
    pub line: String,
    /// Element ID of the series' peak annotation
    pub annotation: String,
    /// Shared by the line and the annotation, so they can never disagree
    visible: bool,
}

impl LegendEntry {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Opacity to draw the entry itself with. Hidden series are dimmed.
    pub fn alpha(&self) -> f64 {
        if self.visible { 1.0 } else { HIDDEN_ALPHA }
    }
}

/// The legend of a chart, one entry per series in plotting order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    /// Create a legend with every series visible.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| LegendEntry {
                label: label.to_owned(),
                line: format!("line-{index}"),
                annotation: format!("peak-{index}"),
                visible: true,
            })
            .collect();
        Self { entries }
    }

    /// Handle a click on a legend entry: show its series and annotation if they were hidden, or
    /// hide them if they were shown.
    ///
    /// Returns the new visibility, or `None` if there is no such entry.
    pub fn on_pick(&mut self, picked: SeriesId) -> Option<bool> {
        let entry = self.entries.get_mut(picked.0)?;
        entry.visible = !entry.visible;
        debug!(series = %entry.label, visible = entry.visible, "Toggled series");
        Some(entry.visible)
    }

    pub fn entries(&self) -> impl Iterator<Item = (SeriesId, &LegendEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (SeriesId(index), entry))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{HIDDEN_ALPHA, Legend, SeriesId};

    fn legend() -> Legend {
        Legend::new(["Matisse", "Luka", "Erik"])
    }

    #[test]
    fn starts_visible() {
        let legend = legend();
        for (id, entry) in legend.entries() {
            assert!(entry.is_visible(), "{id}");
            assert_eq!(entry.alpha(), 1.0);
        }
        let (id, erik) = legend.entries().nth(2).unwrap();
        assert_eq!(id, SeriesId::new(2));
        assert_eq!(erik.label, "Erik");
        assert_eq!(erik.line, "line-2");
        assert_eq!(erik.annotation, "peak-2");
    }

    #[test]
    fn toggle_twice_round_trips() {
        let mut legend = legend();
        let original = legend.clone();

        assert_eq!(legend.on_pick(SeriesId::new(1)), Some(false));
        let (_, luka) = legend.entries().nth(1).unwrap();
        assert!(!luka.is_visible());
        assert_eq!(luka.alpha(), HIDDEN_ALPHA);

        assert_eq!(legend.on_pick(SeriesId::new(1)), Some(true));
        assert_eq!(legend, original);
    }

    #[test]
    fn series_are_independent() {
        let mut legend = legend();
        legend.on_pick(SeriesId::new(0));
        legend.on_pick(SeriesId::new(2));
        legend.on_pick(SeriesId::new(0));

        let visible = legend
            .entries()
            .map(|(_, entry)| entry.is_visible())
            .collect::<Vec<_>>();
        assert_eq!(visible, [true, true, false]);
    }

    #[test]
    fn unknown_series() {
        let mut legend = legend();
        assert_eq!(legend.on_pick(SeriesId::new(3)), None);
        assert_eq!(legend, self::legend());
    }
}
