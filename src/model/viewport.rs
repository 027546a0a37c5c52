use chrono::NaiveDate;

use super::config::TimelineConfig;
use super::date;
use super::item::Item;

/// Direction of a single zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Map a vertical scroll delta to a zoom step. Positive deltas (wheel
    /// away from the user) zoom in.
    pub fn from_scroll(delta_y: f32) -> Option<Self> {
        if delta_y > 0.0 {
            Some(Self::In)
        } else if delta_y < 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// Scale and scroll offset after a zoom step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomStep {
    pub pixels_per_day: f32,
    pub scroll_offset: f32,
}

/// Maps the visible date range to pixel geometry.
///
/// All x values are in content coordinates: `0.0` is the left edge of the
/// gutter, and the first day starts at `gutter_width`.
#[derive(Debug, Clone)]
pub struct TimelineViewport {
    /// The first day on the axis.
    pub min_date: NaiveDate,
    /// The last day on the axis (inclusive).
    pub max_date: NaiveDate,
    /// Pixels per day (controls zoom level).
    pub pixels_per_day: f32,
    /// Left margin reserved for lane labels.
    pub gutter_width: f32,
    min_scale: f32,
    max_scale: f32,
    zoom_in_factor: f32,
    zoom_out_factor: f32,
    tick_steps: Vec<u32>,
}

impl TimelineViewport {
    pub fn new(min_date: NaiveDate, max_date: NaiveDate, config: &TimelineConfig) -> Self {
        let (min_date, max_date) = if min_date <= max_date {
            (min_date, max_date)
        } else {
            (max_date, min_date)
        };
        Self {
            min_date,
            max_date,
            pixels_per_day: config
                .default_pixels_per_day
                .clamp(config.min_pixels_per_day, config.max_pixels_per_day),
            gutter_width: config.gutter_width,
            min_scale: config.min_pixels_per_day,
            max_scale: config.max_pixels_per_day,
            zoom_in_factor: config.zoom_in_factor,
            zoom_out_factor: config.zoom_out_factor,
            tick_steps: config.tick_steps.clone(),
        }
    }

    /// Use the explicit bounds when given, otherwise span every item.
    /// With no items either, the axis covers only `today`.
    pub fn from_items(
        items: &[Item],
        explicit: Option<(NaiveDate, NaiveDate)>,
        today: NaiveDate,
        config: &TimelineConfig,
    ) -> Self {
        let (min_date, max_date) = explicit.unwrap_or_else(|| data_bounds(items).unwrap_or((today, today)));
        Self::new(min_date, max_date, config)
    }

    /// Keep the current scale but move the axis bounds.
    pub fn set_bounds(&mut self, min_date: NaiveDate, max_date: NaiveDate) {
        self.min_date = min_date.min(max_date);
        self.max_date = min_date.max(max_date);
    }

    pub fn scale_limits(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Set the scale, clamped into the configured limits.
    pub fn set_pixels_per_day(&mut self, pixels_per_day: f32) {
        self.pixels_per_day = pixels_per_day.clamp(self.min_scale, self.max_scale);
    }

    /// Left edge of `date` in content coordinates.
    pub fn x_for_date(&self, date: NaiveDate) -> f32 {
        let days = date::days_between(self.min_date, date) as f32;
        self.gutter_width + days * self.pixels_per_day
    }

    /// Bar width for an inclusive span; never narrower than one pixel.
    pub fn width_for_span(&self, start: NaiveDate, end: NaiveDate) -> f32 {
        let days = (date::days_between(start, end) + 1) as f32;
        (days * self.pixels_per_day).max(1.0)
    }

    /// Day under a content x coordinate. Positions inside the gutter map to
    /// the first day.
    pub fn date_at_x(&self, x: f32) -> NaiveDate {
        let days = ((x - self.gutter_width).max(0.0) / self.pixels_per_day).floor() as i64;
        date::add_days(self.min_date, days)
    }

    /// Whole days covered by a horizontal pointer travel, rounded to nearest.
    pub fn day_delta_for(&self, delta_x: f32) -> i64 {
        (delta_x / self.pixels_per_day).round() as i64
    }

    /// Day under a pointer, given the horizontal scroll of the content.
    pub fn date_under_cursor(&self, cursor_screen_x: f32, scroll_offset: f32) -> NaiveDate {
        self.date_at_x(scroll_offset + cursor_screen_x)
    }

    pub fn total_days(&self) -> i64 {
        date::days_between(self.min_date, self.max_date) + 1
    }

    pub fn total_width(&self) -> f32 {
        self.gutter_width + self.total_days() as f32 * self.pixels_per_day
    }

    /// Smallest candidate step whose labels are at least `min_label_pixels`
    /// apart; the largest candidate when none is wide enough.
    pub fn tick_step(&self, min_label_pixels: f32) -> u32 {
        self.tick_steps
            .iter()
            .copied()
            .find(|&step| step as f32 * self.pixels_per_day >= min_label_pixels)
            .or_else(|| self.tick_steps.last().copied())
            .unwrap_or(1)
    }

    /// Tick marks across the whole axis at multiples of [`Self::tick_step`].
    pub fn ticks(&self, min_label_pixels: f32) -> Ticks {
        let step = i64::from(self.tick_step(min_label_pixels));
        let total = self.total_days();
        Ticks {
            origin: self.min_date,
            gutter_width: self.gutter_width,
            pixels_per_day: self.pixels_per_day,
            step,
            count: (total + step - 1) / step,
            next: 0,
        }
    }

    /// Zoom one step while keeping the date under the cursor fixed on screen.
    ///
    /// `cursor_screen_x` is relative to the left edge of the scroll area and
    /// `scroll_offset` is its current horizontal scroll.
    pub fn zoom_at(&self, cursor_screen_x: f32, scroll_offset: f32, direction: ZoomDirection) -> ZoomStep {
        let cursor_days =
            (scroll_offset + cursor_screen_x - self.gutter_width).max(0.0) / self.pixels_per_day;
        let factor = match direction {
            ZoomDirection::In => self.zoom_in_factor,
            ZoomDirection::Out => self.zoom_out_factor,
        };
        let pixels_per_day = (self.pixels_per_day * factor).clamp(self.min_scale, self.max_scale);
        let anchor_x = self.gutter_width + cursor_days * pixels_per_day;
        ZoomStep {
            pixels_per_day,
            scroll_offset: (anchor_x - cursor_screen_x).max(0.0),
        }
    }

    /// Apply [`Self::zoom_at`] and return the new scroll offset.
    pub fn zoom_in_place(&mut self, cursor_screen_x: f32, scroll_offset: f32, direction: ZoomDirection) -> f32 {
        let step = self.zoom_at(cursor_screen_x, scroll_offset, direction);
        self.pixels_per_day = step.pixels_per_day;
        step.scroll_offset
    }

    /// Keep a scroll offset inside the content for a view of `visible_width`.
    pub fn clamp_scroll(&self, scroll_offset: f32, visible_width: f32) -> f32 {
        let max = (self.total_width() - visible_width).max(0.0);
        scroll_offset.clamp(0.0, max)
    }

    /// Position of the today marker, or `None` when today is off the axis.
    pub fn today_x(&self, today: NaiveDate) -> Option<f32> {
        (self.min_date..=self.max_date)
            .contains(&today)
            .then(|| self.x_for_date(today))
    }
}

/// Earliest start and latest end across `items`.
pub fn data_bounds(items: &[Item]) -> Option<(NaiveDate, NaiveDate)> {
    let min = items.iter().map(|it| it.start.min(it.end)).min()?;
    let max = items.iter().map(|it| it.end.max(it.start)).max()?;
    Some((min, max))
}

/// One labelled mark on the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub date: NaiveDate,
    /// Days from the first day on the axis.
    pub day_offset: i64,
    /// Content x, gutter included.
    pub x: f32,
}

impl Tick {
    pub fn label(&self) -> String {
        date::format_ymd(self.date)
    }
}

/// Finite tick sequence. Clone it to restart from the first tick.
#[derive(Debug, Clone)]
pub struct Ticks {
    origin: NaiveDate,
    gutter_width: f32,
    pixels_per_day: f32,
    step: i64,
    count: i64,
    next: i64,
}

impl Ticks {
    pub fn step(&self) -> u32 {
        self.step as u32
    }
}

impl Iterator for Ticks {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.next >= self.count {
            return None;
        }
        let day_offset = self.next * self.step;
        self.next += 1;
        Some(Tick {
            date: date::add_days(self.origin, day_offset),
            day_offset,
            x: self.gutter_width + day_offset as f32 * self.pixels_per_day,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.next).max(0) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Ticks {}
