//! Playback clock over a comment sequence

use danmu_core::CommentSequence;
use std::ops::Range;

/// Maps wall-clock time and user seeks to a playback position and a cursor
/// into the sequence.
///
/// `elapsed = (now - start_reference) + shift`. While paused, `now` is frozen
/// at the pause instant. All methods take the current wall-clock time so the
/// clock itself has no notion of a time source.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    start_reference: f64,
    shift: f64,
    cursor: usize,
    paused_at: Option<f64>,
}

impl PlaybackClock {
    /// Creates a playing clock positioned at the start of the sequence
    pub fn new(now: f64) -> Self {
        Self {
            start_reference: now,
            shift: 0.0,
            cursor: 0,
            paused_at: None,
        }
    }

    /// Playback position in seconds
    pub fn elapsed(&self, now: f64) -> f64 {
        self.paused_at.unwrap_or(now) - self.start_reference + self.shift
    }

    /// Index of the next comment to dispatch
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.paused_at.is_none()
    }

    /// Returns the comments that became due since the last tick and moves the
    /// cursor past them. Yields nothing while paused.
    pub fn tick(&mut self, sequence: &CommentSequence, now: f64) -> Range<usize> {
        let start = self.cursor;
        if !self.is_playing() {
            return start..start;
        }

        let elapsed = self.elapsed(now);
        while self.cursor < sequence.len() && sequence[self.cursor].start_time <= elapsed {
            self.cursor += 1;
        }
        start..self.cursor
    }

    /// Moves playback back by `seconds`
    pub fn rewind(&mut self, sequence: &CommentSequence, now: f64, seconds: f64) {
        self.shift -= seconds;
        self.relocate(sequence, now);
    }

    /// Moves playback forward by `seconds`
    pub fn fast_forward(&mut self, sequence: &CommentSequence, now: f64, seconds: f64) {
        self.shift += seconds;
        self.relocate(sequence, now);
    }

    /// Moves playback to an absolute position, clamped to the sequence span
    pub fn seek_to(&mut self, sequence: &CommentSequence, now: f64, seconds: f64) {
        let target = if seconds.is_nan() { 0.0 } else { seconds };
        self.shift += target - self.elapsed(now);
        self.relocate(sequence, now);
    }

    /// Jumps to the comment at fraction `p` of the sequence.
    ///
    /// `p` is clamped to `[0, 1]`. The playback position becomes that
    /// comment's start time, or the end of the sequence for `p = 1`.
    pub fn jump_to_fraction(&mut self, sequence: &CommentSequence, now: f64, p: f64) {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let len = sequence.len();
        let cursor = ((p * len as f64).round() as usize).min(len);
        let target = sequence
            .start_time(cursor)
            .unwrap_or_else(|| sequence.total_time());

        self.shift = target - (self.paused_at.unwrap_or(now) - self.start_reference);
        self.cursor = cursor;
    }

    /// Toggles between playing and paused, returning whether it now plays.
    ///
    /// Neither the cursor nor the playback position jump: resuming continues
    /// from where the pause started. On resume `shift` moves back by the
    /// paused span, so wall time spent paused never counts as playback.
    pub fn play_pause(&mut self, now: f64) -> bool {
        match self.paused_at.take() {
            Some(paused_at) => self.shift -= now - paused_at,
            None => self.paused_at = Some(now),
        }
        self.is_playing()
    }

    /// Clamps the position to the sequence span and points the cursor at the
    /// first comment not yet started
    fn relocate(&mut self, sequence: &CommentSequence, now: f64) {
        let elapsed = self.elapsed(now);
        let clamped = elapsed.clamp(0.0, sequence.total_time());
        if clamped != elapsed {
            self.shift += clamped - elapsed;
        }
        self.cursor = sequence.first_at_or_after(clamped);
    }
}
