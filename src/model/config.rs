use serde::{Deserialize, Serialize};

use super::lanes::LaneOptions;
use crate::error::{Result, TimelineError};

/// Tunables for the timeline view. Every field has a default, so a host
/// config only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Left margin reserved for lane labels.
    pub gutter_width: f32,
    pub default_pixels_per_day: f32,
    pub min_pixels_per_day: f32,
    pub max_pixels_per_day: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// Narrowest spacing allowed between two tick labels.
    pub min_label_pixels: f32,
    /// Candidate tick steps in days, ascending.
    pub tick_steps: Vec<u32>,
    /// Horizontal travel before a press on a bar body becomes a move.
    pub move_threshold_px: f32,
    pub lane_height: f32,
    #[serde(flatten)]
    pub lanes: LaneOptions,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            gutter_width: 180.0,
            default_pixels_per_day: 70.0,
            min_pixels_per_day: 4.0,
            max_pixels_per_day: 400.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
            min_label_pixels: 80.0,
            tick_steps: vec![1, 2, 3, 5, 7, 10, 14, 21, 30],
            move_threshold_px: 4.0,
            lane_height: 50.0,
            lanes: LaneOptions::default(),
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Normalise scale limits and reject values the geometry cannot use.
    pub fn validated(mut self) -> Result<Self> {
        if self.min_pixels_per_day > self.max_pixels_per_day {
            std::mem::swap(&mut self.min_pixels_per_day, &mut self.max_pixels_per_day);
        }
        if !(self.min_pixels_per_day > 0.0) {
            return Err(TimelineError::Config(format!(
                "min_pixels_per_day must be positive, got {}",
                self.min_pixels_per_day
            )));
        }
        if !(self.zoom_in_factor > 1.0) || !(self.zoom_out_factor > 0.0 && self.zoom_out_factor < 1.0) {
            return Err(TimelineError::Config(
                "zoom_in_factor must be > 1 and zoom_out_factor within (0, 1)".to_string(),
            ));
        }
        if self.tick_steps.is_empty() || self.tick_steps.contains(&0) {
            return Err(TimelineError::Config(
                "tick_steps must be non-empty and positive".to_string(),
            ));
        }
        if !self.tick_steps.windows(2).all(|w| w[0] < w[1]) {
            return Err(TimelineError::Config(
                "tick_steps must be strictly ascending".to_string(),
            ));
        }
        if self.gutter_width < 0.0 || self.move_threshold_px < 0.0 {
            return Err(TimelineError::Config(
                "gutter_width and move_threshold_px cannot be negative".to_string(),
            ));
        }
        self.default_pixels_per_day = self
            .default_pixels_per_day
            .clamp(self.min_pixels_per_day, self.max_pixels_per_day);
        Ok(self)
    }
}
