use std::collections::HashMap;

use tracing::warn;

use crate::fleet;

/// Items visible in the ticker at once.
pub const WINDOW_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// One ticker entry: a robot and its percentage-change index.
#[derive(Debug, Clone)]
pub struct TickerItem {
    pub robot: String,
    pub value: f64,
}

impl TickerItem {
    pub fn trend(&self) -> Trend {
        if self.value > 0.0 {
            Trend::Up
        } else if self.value < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    /// Absolute value, two decimals, "%" suffix. The sign is carried by the
    /// arrow glyph and color instead.
    pub fn display_value(&self) -> String {
        format!("{:.2}%", self.value.abs())
    }
}

/// Build ticker items from the raw scroller payload. Robots not in the slot
/// table are dropped without comment; entries whose index is null or not a
/// finite number are skipped, each with a log line. The backend has been
/// seen quoting numbers, so numeric strings are accepted too. Items are
/// ordered by robot name so the ticker is deterministic between runs.
pub fn build_items(raw: &HashMap<String, serde_json::Value>) -> Vec<TickerItem> {
    let mut items: Vec<TickerItem> = raw
        .iter()
        .filter(|(robot, _)| fleet::card_slot(robot).is_some())
        .filter_map(|(robot, value)| match numeric_index(value) {
            Some(v) => Some(TickerItem {
                robot: robot.clone(),
                value: v,
            }),
            None => {
                warn!("ticker: index for {robot} is not a number: {value}");
                None
            }
        })
        .collect();
    items.sort_by(|a, b| a.robot.cmp(&b.robot));
    items
}

fn numeric_index(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    };
    parsed.filter(|v| v.is_finite())
}

/// Sliding window over the item list: up to `WINDOW_SIZE` consecutive items,
/// wrapping circularly, advancing one position per tick.
#[derive(Debug, Default)]
pub struct TickerWindow {
    start: usize,
}

impl TickerWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently visible slice, re-built every tick.
    pub fn visible<'a>(&self, items: &'a [TickerItem]) -> Vec<&'a TickerItem> {
        if items.is_empty() {
            return Vec::new();
        }
        (0..WINDOW_SIZE.min(items.len()))
            .map(|i| &items[(self.start + i) % items.len()])
            .collect()
    }

    /// Advance the window one position, wrapping at the end of the list.
    pub fn advance(&mut self, total: usize) {
        if total > 0 {
            self.start = (self.start + 1) % total;
        }
    }
}

/// Continuous horizontal scroll: a column offset advanced every frame by a
/// fixed speed, wrapping to 0 once it reaches the rendered content width.
#[derive(Debug)]
pub struct ScrollOffset {
    pos: u16,
    speed: u16,
}

impl ScrollOffset {
    pub fn new(speed: u16) -> Self {
        Self { pos: 0, speed }
    }

    pub fn position(&self) -> u16 {
        self.pos
    }

    pub fn step(&mut self, content_width: u16) {
        if content_width == 0 {
            self.pos = 0;
            return;
        }
        self.pos = self.pos.saturating_add(self.speed);
        if self.pos >= content_width {
            self.pos = 0;
        }
    }
}
