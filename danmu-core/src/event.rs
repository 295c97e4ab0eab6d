//! Comment event data structures

use crate::style::{Color, DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE};

/// How a comment moves across the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Enters at the left edge and exits at the right edge
    #[cfg_attr(feature = "serde", serde(rename = "L2R"))]
    ScrollLeftToRight,
    /// Enters at the right edge and exits at the left edge
    #[cfg_attr(feature = "serde", serde(rename = "R2L"))]
    ScrollRightToLeft,
    /// Horizontally centered, stacked down from the top
    #[cfg_attr(feature = "serde", serde(rename = "TOP"))]
    FixedTop,
    /// Horizontally centered, stacked up from the bottom
    #[cfg_attr(feature = "serde", serde(rename = "BOTTOM"))]
    FixedBottom,
}

/// Pool of rows a comment competes for. Both scroll directions share one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneGroup {
    Scroll,
    FixedTop,
    FixedBottom,
}

impl LaneGroup {
    /// All lane groups
    pub const ALL: [LaneGroup; 3] = [LaneGroup::Scroll, LaneGroup::FixedTop, LaneGroup::FixedBottom];
}

impl Category {
    /// Returns the lane group comments of this category are laid out in
    pub fn lane_group(self) -> LaneGroup {
        match self {
            Self::ScrollLeftToRight | Self::ScrollRightToLeft => LaneGroup::Scroll,
            Self::FixedTop => LaneGroup::FixedTop,
            Self::FixedBottom => LaneGroup::FixedBottom,
        }
    }

    /// Checks if comments of this category move horizontally
    pub fn is_scrolling(self) -> bool {
        self.lane_group() == LaneGroup::Scroll
    }

    /// Conventional on-screen lifetime in seconds, for producers without an end time
    pub fn default_duration(self) -> f64 {
        if self.is_scrolling() {
            8.0
        } else {
            4.0
        }
    }
}

/// A single timed comment, as produced by an upstream parser
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommentEvent {
    /// Movement category
    pub category: Category,
    /// Text to display
    pub text: String,
    /// Playback time (seconds) at which the comment appears
    pub start_time: f64,
    /// On-screen lifetime in seconds at normal speed
    pub duration: f64,
    /// Text color
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Color,
    /// Font family name
    #[cfg_attr(feature = "serde", serde(default = "default_font_name"))]
    pub font_name: String,
    /// Font size in points
    #[cfg_attr(feature = "serde", serde(default = "default_font_size"))]
    pub font_size: u32,
}

#[cfg(feature = "serde")]
fn default_font_name() -> String {
    DEFAULT_FONT_NAME.to_string()
}

#[cfg(feature = "serde")]
fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

impl CommentEvent {
    /// Creates a new comment with the default style
    pub fn new(category: Category, text: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            category,
            text: text.into(),
            start_time,
            duration,
            color: Color::WHITE,
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }

    /// Sets the text color
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the font family and size
    pub fn with_font(mut self, font_name: impl Into<String>, font_size: u32) -> Self {
        self.font_name = font_name.into();
        self.font_size = font_size;
        self
    }

    /// Returns the playback time at which the comment leaves the screen
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Replaces empty style fields with the defaults
    pub(crate) fn fill_style_defaults(&mut self) {
        if self.font_name.trim().is_empty() {
            self.font_name = DEFAULT_FONT_NAME.to_string();
        }
        if self.font_size == 0 {
            self.font_size = DEFAULT_FONT_SIZE;
        }
    }
}
