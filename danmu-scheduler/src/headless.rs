//! In-memory rendering backend without a display
//!
//! Estimates text extents, tracks which labels are visible and runs
//! animations against times supplied through [`HeadlessRenderer::advance`].

use crate::render::{Animator, Completion, Flight, TextExtent, TextMeasurer, TextStyle};
use std::collections::{HashMap, HashSet};

/// Label handle of the headless backend
#[derive(Debug)]
pub struct HeadlessLabel {
    id: u64,
    text: String,
    style: Option<TextStyle>,
}

impl HeadlessLabel {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> Option<&TextStyle> {
        self.style.as_ref()
    }
}

/// Animation handle of the headless backend
#[derive(Debug)]
pub struct HeadlessAnimation {
    id: u64,
}

#[derive(Debug)]
struct Running {
    label_id: u64,
    ends_at: f64,
    flight: Flight,
    completion: Completion,
}

/// Rendering backend that only keeps books
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    now: f64,
    next_id: u64,
    running: HashMap<u64, Running>,
    visible: HashSet<u64>,
    interrupted: usize,
    finished: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the renderer's time to `now` and fires the completions of every
    /// animation that has ended, earliest first. Returns how many ended.
    pub fn advance(&mut self, now: f64) -> usize {
        self.now = self.now.max(now);

        let mut due: Vec<(f64, u64)> = self
            .running
            .iter()
            .filter(|(_, run)| run.ends_at <= self.now)
            .map(|(&id, run)| (run.ends_at, id))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, id) in &due {
            if let Some(run) = self.running.remove(id) {
                run.completion.fire();
            }
        }
        self.finished += due.len();
        due.len()
    }

    /// Animations currently in flight
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Labels currently shown
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// In-flight animations stopped before their end
    pub fn interrupted_count(&self) -> usize {
        self.interrupted
    }

    /// Animations that ran to their end
    pub fn finished_count(&self) -> usize {
        self.finished
    }

    /// Checks if the label with the given id is being animated
    pub fn is_animating_label(&self, label_id: u64) -> bool {
        self.running.values().any(|run| run.label_id == label_id)
    }

    /// Flight of the animation currently moving the label with the given id
    pub fn flight_of(&self, label_id: u64) -> Option<&Flight> {
        self.running
            .values()
            .find(|run| run.label_id == label_id)
            .map(|run| &run.flight)
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl TextMeasurer for HeadlessRenderer {
    /// Half an em per ASCII character, a full em for everything else
    fn measure_text(&mut self, _font_name: &str, font_size: u32, text: &str) -> TextExtent {
        let em = font_size as f64;
        let width: f64 = text
            .chars()
            .map(|c| if c.is_ascii() { em * 0.5 } else { em })
            .sum();
        TextExtent {
            width,
            height: (em * 1.25).ceil(),
        }
    }
}

impl Animator for HeadlessRenderer {
    type Label = HeadlessLabel;
    type Animation = HeadlessAnimation;

    fn create_label(&mut self, text: &str) -> HeadlessLabel {
        HeadlessLabel {
            id: self.allocate_id(),
            text: text.to_string(),
            style: None,
        }
    }

    fn set_text(&mut self, label: &mut HeadlessLabel, text: &str) {
        label.text.clear();
        label.text.push_str(text);
    }

    fn set_style(&mut self, label: &mut HeadlessLabel, style: &TextStyle) {
        label.style = Some(style.clone());
    }

    fn show(&mut self, label: &mut HeadlessLabel) {
        self.visible.insert(label.id);
    }

    fn hide(&mut self, label: &mut HeadlessLabel) {
        self.visible.remove(&label.id);
    }

    fn create_animation(&mut self) -> HeadlessAnimation {
        HeadlessAnimation {
            id: self.allocate_id(),
        }
    }

    fn start_animation(
        &mut self,
        animation: &mut HeadlessAnimation,
        label: &HeadlessLabel,
        flight: &Flight,
        on_complete: Completion,
    ) {
        let ends_at = self.now + flight.duration_ms as f64 / 1000.0;
        self.running.insert(
            animation.id,
            Running {
                label_id: label.id,
                ends_at,
                flight: *flight,
                completion: on_complete,
            },
        );
    }

    fn stop(&mut self, animation: &mut HeadlessAnimation) {
        if self.running.remove(&animation.id).is_some() {
            self.interrupted += 1;
        }
    }

    fn destroy_label(&mut self, label: HeadlessLabel) {
        self.visible.remove(&label.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{CommentId, Point};
    use std::sync::mpsc;

    fn flight(duration_ms: u64) -> Flight {
        Flight {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            duration_ms,
        }
    }

    #[test]
    fn test_measure_text() {
        let mut renderer = HeadlessRenderer::new();
        let extent = renderer.measure_text("Any", 20, "ab弹幕");
        assert_eq!(extent.width, 60.0);
        assert_eq!(extent.height, 25.0);
    }

    #[test]
    fn test_completions_fire_when_due() {
        let (tx, rx) = mpsc::channel();
        let mut renderer = HeadlessRenderer::new();
        let mut label = renderer.create_label("hi");
        renderer.show(&mut label);

        let mut slow = renderer.create_animation();
        let mut fast = renderer.create_animation();
        let slow_id = CommentId { slot: 0, generation: 1 };
        let fast_id = CommentId { slot: 1, generation: 2 };
        renderer.start_animation(&mut slow, &label, &flight(2000), Completion::new(slow_id, tx.clone()));
        renderer.start_animation(&mut fast, &label, &flight(500), Completion::new(fast_id, tx));
        assert!(renderer.is_animating_label(label.id()));

        assert_eq!(renderer.advance(0.4), 0);
        assert_eq!(renderer.advance(0.5), 1);
        assert_eq!(renderer.advance(3.0), 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![fast_id, slow_id]);
        assert_eq!(renderer.finished_count(), 2);
        assert_eq!(renderer.visible_count(), 1);
    }

    #[test]
    fn test_stopped_animation_never_completes() {
        let (tx, rx) = mpsc::channel();
        let mut renderer = HeadlessRenderer::new();
        let label = renderer.create_label("hi");
        let mut animation = renderer.create_animation();
        let id = CommentId { slot: 0, generation: 1 };

        renderer.start_animation(&mut animation, &label, &flight(100), Completion::new(id, tx));
        renderer.stop(&mut animation);
        renderer.stop(&mut animation);

        assert_eq!(renderer.advance(10.0), 0);
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(renderer.interrupted_count(), 1);
    }
}
