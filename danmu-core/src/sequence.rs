//! Time-sorted comment sequences

use crate::{CommentEvent, Error, Result};
use std::ops::Index;

/// An immutable sequence of comments sorted ascending by start time
#[derive(Debug, Clone, Default)]
pub struct CommentSequence {
    events: Vec<CommentEvent>,
}

impl CommentSequence {
    /// Validates and sorts a list of comments.
    ///
    /// Comments sharing a start time keep their input order. Empty style
    /// fields are replaced with the defaults.
    pub fn new(mut events: Vec<CommentEvent>) -> Result<Self> {
        for (index, event) in events.iter_mut().enumerate() {
            if !event.start_time.is_finite() || event.start_time < 0.0 {
                return Err(Error::InvalidStartTime {
                    index,
                    value: event.start_time,
                });
            }
            if !event.duration.is_finite() || event.duration <= 0.0 {
                return Err(Error::InvalidDuration {
                    index,
                    value: event.duration,
                });
            }
            event.fill_style_defaults();
        }

        // Stable, so ties keep input order
        events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Ok(Self { events })
    }

    /// Reads a JSON array of comment records
    #[cfg(feature = "serde")]
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let events: Vec<CommentEvent> = serde_json::from_reader(reader)?;
        Self::new(events)
    }

    /// Writes the sequence as a JSON array of comment records
    #[cfg(feature = "serde")]
    pub fn to_json_writer<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    /// Returns the number of comments
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Checks if the sequence holds no comments
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Gets a comment by index
    pub fn get(&self, index: usize) -> Option<&CommentEvent> {
        self.events.get(index)
    }

    /// Iterates over the comments in start-time order
    pub fn iter(&self) -> std::slice::Iter<'_, CommentEvent> {
        self.events.iter()
    }

    /// Returns the comments as a slice
    pub fn events(&self) -> &[CommentEvent] {
        &self.events
    }

    /// Returns the start time of the comment at `index`
    pub fn start_time(&self, index: usize) -> Option<f64> {
        self.events.get(index).map(|e| e.start_time)
    }

    /// Returns the index of the first comment starting at or after `time`,
    /// or `len()` if there is none
    pub fn first_at_or_after(&self, time: f64) -> usize {
        self.events.partition_point(|e| e.start_time < time)
    }

    /// Returns the time at which the last comment leaves the screen
    pub fn total_time(&self) -> f64 {
        self.events
            .iter()
            .map(CommentEvent::end_time)
            .fold(0.0, f64::max)
    }
}

impl Index<usize> for CommentSequence {
    type Output = CommentEvent;

    fn index(&self, index: usize) -> &Self::Output {
        &self.events[index]
    }
}

impl<'a> IntoIterator for &'a CommentSequence {
    type Item = &'a CommentEvent;
    type IntoIter = std::slice::Iter<'a, CommentEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
