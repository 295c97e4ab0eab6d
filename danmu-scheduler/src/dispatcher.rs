//! Comment dispatcher: drives one playback session tick by tick

use crate::admission::AdmissionController;
use crate::clock::PlaybackClock;
use crate::config::{PlaybackSettings, SchedulerConfig};
use crate::lanes::{plan_flight, LaneAllocator};
use crate::pool::ResourcePool;
use crate::render::{Animator, CommentId, Completion, TextMeasurer, TextStyle};
use crate::time::{MonotonicTime, TimeSource};
use crate::Result;
use danmu_core::{CommentEvent, CommentSequence, LaneGroup};
use slab::Slab;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, trace};

/// Lifecycle of a single comment.
///
/// `Pending → AdmissionCheck → Rejected | Accepted → LaneAssigned →
/// Animating → Completed | Cleared`. There are no backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    Pending,
    AdmissionCheck,
    Rejected,
    Accepted,
    LaneAssigned,
    Animating,
    Completed,
    Cleared,
}

impl CommentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cleared)
    }

    /// Checks if `next` directly follows this state
    pub fn can_advance_to(self, next: CommentState) -> bool {
        use CommentState::*;
        matches!(
            (self, next),
            (Pending, AdmissionCheck)
                | (AdmissionCheck, Rejected)
                | (AdmissionCheck, Accepted)
                | (Accepted, LaneAssigned)
                | (LaneAssigned, Animating)
                | (Animating, Completed)
                | (Animating, Cleared)
        )
    }

    fn advance(self, next: CommentState) -> CommentState {
        debug_assert!(
            self.can_advance_to(next),
            "invalid comment transition {self:?} -> {next:?}"
        );
        next
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Comments that became due
    pub due: usize,
    pub admitted: usize,
    pub rejected: usize,
    /// Comments whose animation finished since the previous tick
    pub completed: usize,
}

/// Counters for the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub admitted: usize,
    pub rejected: usize,
    pub completed: usize,
    /// Comments taken off screen by a seek
    pub cleared: usize,
    /// Number of seek-triggered clears
    pub clears: usize,
    /// Highest number of comments on screen at once
    pub peak_active: usize,
}

impl DispatchStats {
    fn record(&mut self, state: CommentState) {
        match state {
            CommentState::Rejected => self.rejected += 1,
            CommentState::Animating => self.admitted += 1,
            CommentState::Completed => self.completed += 1,
            CommentState::Cleared => self.cleared += 1,
            _ => {}
        }
    }
}

/// Handle creation and reuse in the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub labels_created: usize,
    pub animations_created: usize,
    pub idle_labels: usize,
    pub idle_animations: usize,
}

/// A comment currently on screen
#[derive(Debug)]
pub struct ActiveComment<L, A> {
    id: CommentId,
    event_index: usize,
    group: LaneGroup,
    lane: usize,
    deadline: f64,
    state: CommentState,
    label: L,
    animation: A,
}

impl<L, A> ActiveComment<L, A> {
    /// Index of the comment in the loaded sequence
    pub fn event_index(&self) -> usize {
        self.event_index
    }

    pub fn lane_group(&self) -> LaneGroup {
        self.group
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Wall-clock time at which the animation is expected to end
    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn label(&self) -> &L {
        &self.label
    }
}

struct SchedulerState<L, A> {
    sequence: CommentSequence,
    clock: PlaybackClock,
    admission: AdmissionController,
    lanes: LaneAllocator,
    pool: ResourcePool<L, A>,
    active: Slab<ActiveComment<L, A>>,
    next_generation: u64,
    stats: DispatchStats,
}

impl<L, A> SchedulerState<L, A> {
    fn new(sequence: CommentSequence, config: &SchedulerConfig, now: f64) -> Self {
        let max_active = config.settings.max_active_count;
        let admission = match config.rng_seed {
            Some(seed) => AdmissionController::from_seed(max_active, seed),
            None => AdmissionController::new(max_active),
        };

        Self {
            sequence,
            clock: PlaybackClock::new(now),
            admission,
            lanes: LaneAllocator::new(config.lane_count(), config.layout.scroll_reuse_fraction),
            pool: ResourcePool::new(config.pool_capacity, config.animation_retention),
            active: Slab::new(),
            next_generation: 0,
            stats: DispatchStats::default(),
        }
    }

    /// Runs one due comment through admission, lane assignment and pool
    /// acquisition, and starts its animation
    fn dispatch<R>(
        &mut self,
        renderer: &mut R,
        config: &SchedulerConfig,
        completions: &Sender<CommentId>,
        index: usize,
        now: f64,
    ) -> CommentState
    where
        R: TextMeasurer + Animator<Label = L, Animation = A>,
    {
        let mut state = CommentState::Pending.advance(CommentState::AdmissionCheck);
        let active = self.active.len();
        if !self.admission.admit(active) {
            state = state.advance(CommentState::Rejected);
            self.stats.record(state);
            trace!(index, active, "Comment rejected");
            return state;
        }
        state = state.advance(CommentState::Accepted);

        let event = &self.sequence[index];
        let (duration, font_size) = scaled(event, &config.settings);
        let extent = renderer.measure_text(&event.font_name, font_size, &event.text);

        let group = event.category.lane_group();
        let lane = self.lanes.assign(group, now, duration);
        state = state.advance(CommentState::LaneAssigned);

        let duration_ms = (duration * 1000.0) as u64;
        let flight = plan_flight(&config.layout, &config.screen, event.category, lane, extent, duration_ms);

        let mut label = self.pool.acquire_label(renderer, &event.text);
        let style = TextStyle {
            font_name: event.font_name.clone(),
            font_size,
            color: event.color,
        };
        renderer.set_style(&mut label, &style);
        renderer.show(&mut label);
        let mut animation = self.pool.acquire_animation(renderer);

        self.next_generation += 1;
        let entry = self.active.vacant_entry();
        let id = CommentId {
            slot: entry.key(),
            generation: self.next_generation,
        };
        renderer.start_animation(
            &mut animation,
            &label,
            &flight,
            Completion::new(id, completions.clone()),
        );
        state = state.advance(CommentState::Animating);

        entry.insert(ActiveComment {
            id,
            event_index: index,
            group,
            lane,
            deadline: now + duration,
            state,
            label,
            animation,
        });
        self.stats.record(state);
        self.stats.peak_active = self.stats.peak_active.max(self.active.len());

        trace!(index, ?group, lane, duration_ms, "Comment animating");
        state
    }

    /// Takes a finished comment off screen. Stale or repeated ids are ignored.
    fn complete<R>(&mut self, renderer: &mut R, id: CommentId) -> bool
    where
        R: Animator<Label = L, Animation = A>,
    {
        match self.active.get(id.slot) {
            Some(comment) if comment.id == id => {}
            _ => return false,
        }

        let mut comment = self.active.remove(id.slot);
        renderer.hide(&mut comment.label);
        let state = comment.state.advance(CommentState::Completed);
        self.pool.release(renderer, comment.label, comment.animation);
        self.stats.record(state);
        trace!(index = comment.event_index, "Comment completed");
        true
    }

    /// Stops every in-flight animation, returns all handles to the pool and
    /// frees every lane
    fn clear<R>(&mut self, renderer: &mut R) -> usize
    where
        R: Animator<Label = L, Animation = A>,
    {
        let cleared = self.active.len();
        for mut comment in self.active.drain() {
            renderer.stop(&mut comment.animation);
            renderer.hide(&mut comment.label);
            let state = comment.state.advance(CommentState::Cleared);
            self.pool.release(renderer, comment.label, comment.animation);
            self.stats.record(state);
        }
        self.stats.clears += 1;
        self.lanes.reset();
        cleared
    }
}

/// Flight duration in seconds and font size after applying the playback
/// multipliers
fn scaled(event: &CommentEvent, settings: &PlaybackSettings) -> (f64, u32) {
    let duration = event.duration / settings.speed_multiplier;
    let font_size = ((event.font_size as f64 * settings.font_size_multiplier) as u32).max(1);
    (duration, font_size)
}

/// Orchestrates clock, admission, lanes and pools for one playback session.
///
/// Everything happens on the caller's thread: the owner calls [`tick`] on a
/// timer (see [`SchedulerConfig::tick_interval`]) and the renderer reports
/// finished animations through the [`Completion`] tokens it is given.
///
/// [`tick`]: CommentDispatcher::tick
pub struct CommentDispatcher<R, T = MonotonicTime>
where
    R: Animator,
{
    renderer: R,
    time: T,
    config: SchedulerConfig,
    state: Option<SchedulerState<R::Label, R::Animation>>,
    completions_tx: Sender<CommentId>,
    completions_rx: Receiver<CommentId>,
}

impl<R> CommentDispatcher<R, MonotonicTime>
where
    R: TextMeasurer + Animator,
{
    /// Creates a dispatcher running on real time
    pub fn with_system_time(renderer: R, config: SchedulerConfig) -> Result<Self> {
        Self::new(renderer, MonotonicTime::new(), config)
    }
}

impl<R, T> CommentDispatcher<R, T>
where
    R: TextMeasurer + Animator,
    T: TimeSource,
{
    /// Creates a dispatcher with no sequence loaded
    pub fn new(renderer: R, time: T, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let (completions_tx, completions_rx) = mpsc::channel();
        Ok(Self {
            renderer,
            time,
            config,
            state: None,
            completions_tx,
            completions_rx,
        })
    }

    /// Starts a new session over `sequence`, replacing any current one
    pub fn load(&mut self, sequence: CommentSequence) {
        self.stop();
        let now = self.time.now();
        info!(
            comments = sequence.len(),
            total_time = sequence.total_time(),
            lanes = self.config.lane_count(),
            "Loaded comment sequence"
        );
        self.state = Some(SchedulerState::new(sequence, &self.config, now));
    }

    /// Validates `events` and loads them. On error the current session is
    /// left untouched.
    pub fn load_events(&mut self, events: Vec<CommentEvent>) -> Result<()> {
        let sequence = CommentSequence::new(events)?;
        self.load(sequence);
        Ok(())
    }

    /// Ends the session, taking every comment off screen
    pub fn stop(&mut self) {
        self.process_completions();
        if let Some(mut state) = self.state.take() {
            let cleared = state.clear(&mut self.renderer);
            state.pool.purge(&mut self.renderer);
            info!(cleared, stats = ?state.stats, "Stopped playback session");
        }
        self.discard_completions();
    }

    /// Finishes completed comments and dispatches every comment that became due
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            completed: self.process_completions(),
            ..TickReport::default()
        };

        let Some(state) = self.state.as_mut() else {
            return report;
        };
        let now = self.time.now();
        let due = state.clock.tick(&state.sequence, now);
        for index in due {
            report.due += 1;
            match state.dispatch(&mut self.renderer, &self.config, &self.completions_tx, index, now) {
                CommentState::Animating => report.admitted += 1,
                _ => report.rejected += 1,
            }
        }
        report
    }

    /// Drains finished animations reported by the renderer, returning how
    /// many comments went off screen
    pub fn process_completions(&mut self) -> usize {
        let mut completed = 0;
        while let Ok(id) = self.completions_rx.try_recv() {
            if let Some(state) = self.state.as_mut() {
                if state.complete(&mut self.renderer, id) {
                    completed += 1;
                }
            }
        }
        completed
    }

    /// Moves playback back by `seconds`, clearing the screen
    pub fn rewind(&mut self, seconds: f64) {
        self.seek("rewind", |clock, sequence, now| clock.rewind(sequence, now, seconds));
    }

    /// Moves playback forward by `seconds`, clearing the screen
    pub fn fast_forward(&mut self, seconds: f64) {
        self.seek("fast_forward", |clock, sequence, now| {
            clock.fast_forward(sequence, now, seconds)
        });
    }

    /// Moves playback to `seconds`, clamped to the sequence span, clearing
    /// the screen
    pub fn seek_to(&mut self, seconds: f64) {
        self.seek("seek_to", |clock, sequence, now| clock.seek_to(sequence, now, seconds));
    }

    /// Jumps to fraction `p` of the sequence, clearing the screen
    pub fn jump_to_fraction(&mut self, p: f64) {
        self.seek("jump_to_fraction", |clock, sequence, now| {
            clock.jump_to_fraction(sequence, now, p)
        });
    }

    /// Moves the clock and clears the screen before returning, so no tick can
    /// observe the old on-screen state after a jump
    fn seek<F>(&mut self, kind: &'static str, move_clock: F)
    where
        F: FnOnce(&mut PlaybackClock, &CommentSequence, f64),
    {
        self.process_completions();
        let now = self.time.now();
        let Some(state) = self.state.as_mut() else {
            return;
        };

        move_clock(&mut state.clock, &state.sequence, now);
        let cleared = state.clear(&mut self.renderer);
        debug!(
            kind,
            elapsed = state.clock.elapsed(now),
            cursor = state.clock.cursor(),
            cleared,
            "Seek"
        );
        self.discard_completions();
    }

    fn discard_completions(&mut self) {
        while self.completions_rx.try_recv().is_ok() {}
    }

    /// Toggles play/pause, returning whether playback now runs
    pub fn play_pause(&mut self) -> bool {
        let now = self.time.now();
        match self.state.as_mut() {
            Some(state) => {
                let playing = state.clock.play_pause(now);
                debug!(playing, elapsed = state.clock.elapsed(now), "Play/pause");
                playing
            }
            None => false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.clock.is_playing())
    }

    /// Applies new playback settings. Comments already on screen keep their
    /// speed and size.
    pub fn set_config(&mut self, settings: PlaybackSettings) -> Result<()> {
        settings.validate()?;
        self.config.settings = settings;
        if let Some(state) = self.state.as_mut() {
            state.admission.set_max_active(settings.max_active_count);
        }
        debug!(?settings, "Updated playback settings");
        Ok(())
    }

    /// Playback position in seconds (0 when nothing is loaded)
    pub fn get_elapsed_time(&self) -> f64 {
        let now = self.time.now();
        self.state.as_ref().map_or(0.0, |s| s.clock.elapsed(now))
    }

    /// Time at which the last comment leaves the screen
    pub fn get_total_time(&self) -> f64 {
        self.state.as_ref().map_or(0.0, |s| s.sequence.total_time())
    }

    /// Index of the next comment to dispatch
    pub fn cursor(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.clock.cursor())
    }

    /// Share of the sequence already dispatched, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        match self.state.as_ref() {
            Some(s) if !s.sequence.is_empty() => s.clock.cursor() as f64 / s.sequence.len() as f64,
            _ => 0.0,
        }
    }

    /// Number of comments currently on screen
    pub fn active_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.active.len())
    }

    /// Iterates over the comments currently on screen
    pub fn active_comments(&self) -> impl Iterator<Item = &ActiveComment<R::Label, R::Animation>> {
        self.state
            .iter()
            .flat_map(|s| s.active.iter().map(|(_, comment)| comment))
    }

    /// Earliest expected end among the comments on screen
    pub fn next_deadline(&self) -> Option<f64> {
        self.active_comments()
            .map(ActiveComment::deadline)
            .min_by(f64::total_cmp)
    }

    /// Counters for the current session
    pub fn stats(&self) -> DispatchStats {
        self.state.as_ref().map(|s| s.stats).unwrap_or_default()
    }

    pub fn resource_usage(&self) -> ResourceUsage {
        self.state
            .as_ref()
            .map(|s| ResourceUsage {
                labels_created: s.pool.labels_created(),
                animations_created: s.pool.animations_created(),
                idle_labels: s.pool.idle_labels(),
                idle_animations: s.pool.idle_animations(),
            })
            .unwrap_or_default()
    }

    /// Lanes per lane group in the current session
    pub fn lane_count(&self) -> usize {
        self.state
            .as_ref()
            .map_or_else(|| self.config.lane_count(), |s| s.lanes.lane_count())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn sequence(&self) -> Option<&CommentSequence> {
        self.state.as_ref().map(|s| &s.sequence)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn time(&self) -> &T {
        &self.time
    }
}
