//! Capability interfaces the scheduler needs from a rendering backend
//!
//! The scheduler never sees concrete rendering types. A backend measures text
//! and animates labels; everything it hands out is an opaque handle owned by
//! the scheduler until it is given back.

use danmu_core::Color;
use std::sync::mpsc::Sender;

/// Measured size of a piece of text in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Screen-space position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Linear movement of a label from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub start: Point,
    pub end: Point,
    pub duration_ms: u64,
}

impl Flight {
    /// Position at `t_ms` milliseconds into the flight
    pub fn position_at(&self, t_ms: u64) -> Point {
        if self.duration_ms == 0 || t_ms >= self.duration_ms {
            return self.end;
        }
        let f = t_ms as f64 / self.duration_ms as f64;
        Point::new(
            self.start.x + (self.end.x - self.start.x) * f,
            self.start.y + (self.end.y - self.start.y) * f,
        )
    }
}

/// Style applied to a label before it is shown
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_name: String,
    pub font_size: u32,
    pub color: Color,
}

/// Identifies one on-screen comment for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommentId {
    pub(crate) slot: usize,
    pub(crate) generation: u64,
}

/// Single-use completion notice handed to the animator with each animation.
///
/// Firing consumes the token, so a comment can only be completed once.
/// Dropping it without firing is allowed (a stopped animation never completes).
#[derive(Debug)]
pub struct Completion {
    id: CommentId,
    tx: Sender<CommentId>,
}

impl Completion {
    pub(crate) fn new(id: CommentId, tx: Sender<CommentId>) -> Self {
        Self { id, tx }
    }

    /// The comment this token completes
    pub fn id(&self) -> CommentId {
        self.id
    }

    /// Reports that the animation ran to its end
    pub fn fire(self) {
        // The dispatcher may already be gone; nothing is waiting then.
        let _ = self.tx.send(self.id);
    }
}

/// Text measurement capability
pub trait TextMeasurer {
    /// Measures `text` rendered in the given font
    fn measure_text(&mut self, font_name: &str, font_size: u32, text: &str) -> TextExtent;
}

/// Label and animation capability
pub trait Animator {
    /// Opaque renderable text item
    type Label;
    /// Opaque animation driving one label
    type Animation;

    /// Creates a new hidden label
    fn create_label(&mut self, text: &str) -> Self::Label;

    /// Rebinds a pooled label to new text
    fn set_text(&mut self, label: &mut Self::Label, text: &str);

    fn set_style(&mut self, label: &mut Self::Label, style: &TextStyle);

    fn show(&mut self, label: &mut Self::Label);

    fn hide(&mut self, label: &mut Self::Label);

    /// Creates a new idle animation
    fn create_animation(&mut self) -> Self::Animation;

    /// Starts moving `label` along `flight`. The animator must call
    /// [`Completion::fire`] when the flight ends, and must not fire it after
    /// [`Animator::stop`].
    fn start_animation(
        &mut self,
        animation: &mut Self::Animation,
        label: &Self::Label,
        flight: &Flight,
        on_complete: Completion,
    );

    /// Stops an animation. Stopping an idle animation does nothing.
    fn stop(&mut self, animation: &mut Self::Animation);

    /// Releases a label the pool has no room for
    fn destroy_label(&mut self, _label: Self::Label) {}

    /// Releases an animation the pool has no room for
    fn destroy_animation(&mut self, _animation: Self::Animation) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_flight_interpolation() {
        let flight = Flight {
            start: Point::new(100.0, 10.0),
            end: Point::new(-20.0, 10.0),
            duration_ms: 1000,
        };

        assert_eq!(flight.position_at(0), Point::new(100.0, 10.0));
        assert_eq!(flight.position_at(500), Point::new(40.0, 10.0));
        assert_eq!(flight.position_at(5000), Point::new(-20.0, 10.0));
    }

    #[test]
    fn test_completion_fires_once() {
        let (tx, rx) = mpsc::channel();
        let id = CommentId {
            slot: 3,
            generation: 7,
        };

        let completion = Completion::new(id, tx);
        assert_eq!(completion.id(), id);
        completion.fire();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![id]);
    }
}
