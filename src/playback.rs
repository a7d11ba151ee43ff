//! Playback state machine and its repeating timer.
//!
//! `PlaybackState` is a plain value with pure transitions. `Ticker` is the
//! scheduled repeating task. `PlaybackController` keeps the two consistent:
//! a timer runs exactly when the state is playing over a non-empty frame list,
//! at the period the current fps implies.

use std::time::{Duration, Instant};

use crate::frame::DEFAULT_PLAYBACK_FPS;

/// User-facing playback controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    /// Seek to a zero-based index; out-of-range values are clamped.
    Seek(i64),
    JumpToStart,
    JumpToEnd,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_frame_index: usize,
    pub is_playing: bool,
    pub frame_count: usize,
    pub playback_fps: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(0, DEFAULT_PLAYBACK_FPS)
    }
}

impl PlaybackState {
    /// Stopped at index 0.
    pub fn new(frame_count: usize, playback_fps: f64) -> Self {
        Self {
            current_frame_index: 0,
            is_playing: false,
            frame_count,
            playback_fps: sanitize_fps(playback_fps),
        }
    }

    /// No-op when already playing or when there is nothing to play.
    pub fn play(self) -> Self {
        if self.frame_count == 0 {
            return self;
        }
        Self {
            is_playing: true,
            ..self
        }
    }

    pub fn pause(self) -> Self {
        Self {
            is_playing: false,
            ..self
        }
    }

    pub fn toggle(self) -> Self {
        if self.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// `clamp(index, 0, frame_count - 1)`; play state is untouched.
    pub fn seek(self, index: i64) -> Self {
        let last = self.frame_count.saturating_sub(1) as i64;
        Self {
            current_frame_index: index.clamp(0, last) as usize,
            ..self
        }
    }

    pub fn jump_to_start(self) -> Self {
        self.seek(0)
    }

    pub fn jump_to_end(self) -> Self {
        self.seek(i64::MAX)
    }

    /// One timer period elapsed: advance and wrap. Ignored unless playing.
    pub fn tick(self) -> Self {
        if !self.is_playing || self.frame_count == 0 {
            return self;
        }
        Self {
            current_frame_index: (self.current_frame_index + 1) % self.frame_count,
            ..self
        }
    }

    /// The frame list changed size. The index is clamped into range; an empty
    /// list forces a stop at index 0.
    pub fn with_frame_count(self, frame_count: usize) -> Self {
        if frame_count == 0 {
            return Self {
                current_frame_index: 0,
                is_playing: false,
                frame_count: 0,
                ..self
            };
        }
        Self {
            frame_count,
            current_frame_index: self.current_frame_index.min(frame_count - 1),
            ..self
        }
    }

    pub fn with_fps(self, playback_fps: f64) -> Self {
        Self {
            playback_fps: sanitize_fps(playback_fps),
            ..self
        }
    }

    pub fn apply(self, command: PlaybackCommand) -> Self {
        match command {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Toggle => self.toggle(),
            PlaybackCommand::Seek(index) => self.seek(index),
            PlaybackCommand::JumpToStart => self.jump_to_start(),
            PlaybackCommand::JumpToEnd => self.jump_to_end(),
        }
    }

    /// Timer period, `1000 / fps` ms.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.playback_fps)
    }

    /// Whether a timer should currently be running.
    pub fn wants_timer(&self) -> bool {
        self.is_playing && self.frame_count > 0
    }
}

fn sanitize_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        log::warn!("ignoring invalid playback fps {}; using {}", fps, DEFAULT_PLAYBACK_FPS);
        DEFAULT_PLAYBACK_FPS
    }
}

/// Fixed-period repeating deadline.
///
/// The next deadline is scheduled from the instant a tick is observed, so a
/// slow draw delays the following tick instead of queueing a burst.
#[derive(Clone, Debug, Default)]
pub struct Ticker {
    period: Option<Duration>,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, period: Duration, now: Instant) {
        self.period = Some(period);
        self.next = Some(now + period);
    }

    pub fn stop(&mut self) {
        self.period = None;
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Time left until the next tick, zero if overdue, `None` when stopped.
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.next.map(|next| next.saturating_duration_since(now))
    }

    /// Fire at most once if the deadline has passed, then re-arm.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.period, self.next) {
            (Some(period), Some(next)) if now >= next => {
                self.next = Some(now + period);
                true
            }
            _ => false,
        }
    }
}

/// Owns `PlaybackState` and the timer that drives it.
#[derive(Clone, Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    ticker: Ticker,
}

impl PlaybackController {
    pub fn new(frame_count: usize, playback_fps: f64) -> Self {
        Self {
            state: PlaybackState::new(frame_count, playback_fps),
            ticker: Ticker::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn current_index(&self) -> usize {
        self.state.current_frame_index
    }

    pub fn apply(&mut self, command: PlaybackCommand, now: Instant) {
        self.state = self.state.apply(command);
        self.sync_timer(now);
    }

    pub fn set_frame_count(&mut self, frame_count: usize, now: Instant) {
        self.state = self.state.with_frame_count(frame_count);
        self.sync_timer(now);
    }

    pub fn set_fps(&mut self, playback_fps: f64, now: Instant) {
        self.state = self.state.with_fps(playback_fps);
        self.sync_timer(now);
    }

    /// Advance when the timer is due. Returns true if the index moved.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        if !self.ticker.poll(now) {
            return false;
        }
        let before = self.state.current_frame_index;
        self.state = self.state.tick();
        self.state.current_frame_index != before
    }

    /// Stop the timer and reset; used when the view goes away or switches video.
    pub fn teardown(&mut self) {
        self.ticker.stop();
        self.state = PlaybackState::new(0, self.state.playback_fps);
    }

    fn sync_timer(&mut self, now: Instant) {
        if !self.state.wants_timer() {
            self.ticker.stop();
            return;
        }
        let period = self.state.period();
        if self.ticker.period() != Some(period) {
            self.ticker.start(period, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_at_zero() {
        let state = PlaybackState::new(5, 2.0);
        assert_eq!(state.current_frame_index, 0);
        assert!(!state.is_playing);
    }

    #[test]
    fn tick_wraps_after_last_frame() {
        let state = PlaybackState::new(5, 2.0).seek(4).play();
        let next = state.tick();
        assert_eq!(next.current_frame_index, 0);
        assert!(next.is_playing);
    }

    #[test]
    fn tick_is_ignored_while_stopped() {
        let state = PlaybackState::new(5, 2.0).seek(2);
        assert_eq!(state.tick().current_frame_index, 2);
    }

    #[test]
    fn seek_clamps_to_range() {
        let state = PlaybackState::new(10, 2.0);
        assert_eq!(state.seek(-3).current_frame_index, 0);
        assert_eq!(state.seek(999).current_frame_index, 9);
        assert_eq!(state.seek(4).current_frame_index, 4);
        assert_eq!(state.jump_to_end().current_frame_index, 9);
        assert_eq!(state.seek(6).jump_to_start().current_frame_index, 0);
    }

    #[test]
    fn seek_keeps_play_state() {
        let playing = PlaybackState::new(10, 2.0).play().seek(3);
        assert!(playing.is_playing);
        let stopped = PlaybackState::new(10, 2.0).seek(3);
        assert!(!stopped.is_playing);
    }

    #[test]
    fn play_and_pause_are_idempotent() {
        let state = PlaybackState::new(3, 2.0);
        assert_eq!(state.play().play(), state.play());
        assert_eq!(state.pause(), state);
        assert!(!state.play().toggle().is_playing);
    }

    #[test]
    fn empty_list_never_plays() {
        let state = PlaybackState::new(0, 2.0);
        assert!(!state.play().is_playing);
        assert_eq!(state.seek(5).current_frame_index, 0);
        assert_eq!(state.tick().current_frame_index, 0);

        let mut controller = PlaybackController::new(0, 2.0);
        controller.apply(PlaybackCommand::Play, Instant::now());
        assert!(!controller.ticker().is_running());
        assert!(!controller.state().is_playing);
    }

    #[test]
    fn shrinking_frame_list_clamps_and_empty_stops() {
        let state = PlaybackState::new(10, 2.0).seek(8).play();
        let shrunk = state.with_frame_count(4);
        assert_eq!(shrunk.current_frame_index, 3);
        assert!(shrunk.is_playing);
        let empty = shrunk.with_frame_count(0);
        assert_eq!(empty.current_frame_index, 0);
        assert!(!empty.is_playing);
    }

    #[test]
    fn period_follows_fps_and_rejects_nonsense() {
        assert_eq!(PlaybackState::new(1, 2.0).period(), Duration::from_millis(500));
        assert_eq!(PlaybackState::new(1, 4.0).period(), Duration::from_millis(250));
        assert_eq!(PlaybackState::new(1, 0.0).playback_fps, DEFAULT_PLAYBACK_FPS);
        assert_eq!(PlaybackState::new(1, f64::NAN).playback_fps, DEFAULT_PLAYBACK_FPS);
    }

    #[test]
    fn ticker_fires_once_per_deadline() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new();
        assert!(!ticker.poll(t0));
        ticker.start(Duration::from_millis(100), t0);
        assert!(!ticker.poll(t0 + Duration::from_millis(50)));
        assert!(ticker.poll(t0 + Duration::from_millis(100)));
        assert!(!ticker.poll(t0 + Duration::from_millis(150)));
        // A late poll re-arms from the observed instant, no backlog burst.
        assert!(ticker.poll(t0 + Duration::from_millis(500)));
        assert!(!ticker.poll(t0 + Duration::from_millis(550)));
        assert_eq!(
            ticker.time_until(t0 + Duration::from_millis(550)),
            Some(Duration::from_millis(50))
        );
        ticker.stop();
        assert!(!ticker.poll(t0 + Duration::from_secs(10)));
        assert_eq!(ticker.time_until(t0), None);
    }

    #[test]
    fn controller_runs_timer_only_while_playing() {
        let t0 = Instant::now();
        let mut controller = PlaybackController::new(5, 2.0);
        assert!(!controller.ticker().is_running());

        controller.apply(PlaybackCommand::Play, t0);
        assert!(controller.ticker().is_running());
        assert!(!controller.on_timer(t0 + Duration::from_millis(499)));
        assert!(controller.on_timer(t0 + Duration::from_millis(500)));
        assert_eq!(controller.current_index(), 1);

        controller.apply(PlaybackCommand::Pause, t0);
        assert!(!controller.ticker().is_running());
        assert!(!controller.on_timer(t0 + Duration::from_secs(5)));
        assert_eq!(controller.current_index(), 1);
    }

    #[test]
    fn fps_change_rearms_timer_without_stopping() {
        let t0 = Instant::now();
        let mut controller = PlaybackController::new(5, 2.0);
        controller.apply(PlaybackCommand::Play, t0);
        let t1 = t0 + Duration::from_millis(100);
        controller.set_fps(10.0, t1);
        assert!(controller.state().is_playing);
        assert_eq!(controller.ticker().period(), Some(Duration::from_millis(100)));
        assert_eq!(controller.ticker().deadline(), Some(t1 + Duration::from_millis(100)));
    }

    #[test]
    fn frame_count_to_zero_releases_timer() {
        let t0 = Instant::now();
        let mut controller = PlaybackController::new(5, 2.0);
        controller.apply(PlaybackCommand::Play, t0);
        controller.set_frame_count(0, t0);
        assert!(!controller.ticker().is_running());
        controller.set_frame_count(3, t0);
        assert!(!controller.state().is_playing);
    }

    #[test]
    fn teardown_stops_everything() {
        let t0 = Instant::now();
        let mut controller = PlaybackController::new(5, 3.0);
        controller.apply(PlaybackCommand::Play, t0);
        controller.teardown();
        assert!(!controller.ticker().is_running());
        assert_eq!(controller.state().frame_count, 0);
        assert_eq!(controller.state().playback_fps, 3.0);
    }
}
