//! Interactive playback driver.
//!
//! Elapsed time is derived from a [`PlaybackClock`] and wraps modulo the
//! timeline's rounded total duration. Pausing freezes elapsed time; resuming
//! re-anchors the start offset so playback continues where it stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slidecast_common::clock::PlaybackClock;
use slidecast_timeline_model::Timeline;
use tokio::time::MissedTickBehavior;

use crate::compositor::render_frame;
use crate::image_cache::ImageCache;
use crate::resolver::resolve;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

/// Outcome of one rendered playback tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTick {
    pub elapsed_ms: f64,
    /// Active slide, `None` when the frame was left blank.
    pub slide_index: Option<usize>,
}

/// Wall-clock playback position over a timeline.
#[derive(Debug)]
pub struct Player<C: PlaybackClock> {
    clock: C,
    state: PlaybackState,
    total_ms: u64,
    elapsed_ms: f64,
    /// Clock reading that corresponds to elapsed zero while playing.
    anchor_ms: f64,
}

impl<C: PlaybackClock> Player<C> {
    /// A paused player at zero over a timeline of `total_ms`.
    pub fn new(clock: C, total_ms: u64) -> Self {
        Self {
            clock,
            state: PlaybackState::Paused,
            total_ms,
            elapsed_ms: 0.0,
            anchor_ms: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_ms
    }

    /// Elapsed time as of the last tick or state change.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        self.state = PlaybackState::Playing;
        self.reanchor();
        tracing::debug!(elapsed_ms = self.elapsed_ms, "Playback started");
    }

    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.tick();
        self.state = PlaybackState::Paused;
        tracing::debug!(elapsed_ms = self.elapsed_ms, "Playback paused");
    }

    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
        }
    }

    /// Jump to `ms`, wrapped into the timeline. Keeps the play state.
    pub fn seek(&mut self, ms: f64) {
        self.elapsed_ms = self.wrap(ms.max(0.0));
        if self.is_playing() {
            self.reanchor();
        }
    }

    /// Return to the start of the timeline.
    pub fn reset(&mut self) {
        self.seek(0.0);
    }

    /// Update the wrap length after the timeline changed.
    pub fn set_total_duration(&mut self, total_ms: u64) {
        if total_ms == self.total_ms {
            return;
        }
        if self.is_playing() {
            self.tick();
        }
        self.total_ms = total_ms;
        self.elapsed_ms = self.wrap(self.elapsed_ms);
        if self.is_playing() {
            self.reanchor();
        }
    }

    /// Recompute elapsed time from the clock and return it.
    pub fn tick(&mut self) -> f64 {
        if self.is_playing() {
            let raw = self.clock.now_ms() - self.anchor_ms;
            self.elapsed_ms = self.wrap(raw);
        }
        self.elapsed_ms
    }

    /// Tick, resolve and render the current instant of `timeline`.
    pub fn render_tick<S: Surface + ?Sized>(
        &mut self,
        timeline: &Timeline,
        surface: &mut S,
        cache: &mut ImageCache,
    ) -> PlaybackTick {
        self.set_total_duration(timeline.total_duration_ms_rounded());
        let elapsed_ms = self.tick();
        let frame = resolve(timeline, elapsed_ms);
        render_frame(frame.as_ref(), surface, cache);
        PlaybackTick {
            elapsed_ms,
            slide_index: frame.map(|f| f.slide_index),
        }
    }

    fn wrap(&self, ms: f64) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        ms.rem_euclid(self.total_ms as f64)
    }

    fn reanchor(&mut self) {
        self.anchor_ms = self.clock.now_ms() - self.elapsed_ms;
    }
}

/// Drive `player` at `refresh_hz` until it is paused or `stop` is raised.
///
/// `on_frame` sees every rendered tick together with the surface. Returns
/// the number of frames rendered.
pub async fn run_playback<C, S, F>(
    player: &mut Player<C>,
    timeline: &Timeline,
    surface: &mut S,
    cache: &mut ImageCache,
    refresh_hz: u32,
    stop: Arc<AtomicBool>,
    mut on_frame: F,
) -> u64
where
    C: PlaybackClock,
    S: Surface + ?Sized,
    F: FnMut(&PlaybackTick, &S),
{
    let period = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        refresh_hz,
        total_ms = timeline.total_duration_ms_rounded(),
        slides = timeline.len(),
        "Playback loop started"
    );

    let mut frames = 0u64;
    loop {
        interval.tick().await;
        if stop.load(Ordering::Relaxed) || !player.is_playing() {
            break;
        }
        let tick = player.render_tick(timeline, surface, cache);
        on_frame(&tick, surface);
        frames += 1;
    }

    tracing::info!(frames, elapsed_ms = player.elapsed_ms(), "Playback loop stopped");
    frames
}

/// Format milliseconds as `m:ss` for a time badge.
pub fn format_clock(ms: f64) -> String {
    let secs = (ms.max(0.0) / 1000.0).floor() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_cache::DecodePolicy;
    use crate::surface::RasterSurface;
    use slidecast_common::clock::ManualClock;
    use slidecast_timeline_model::{Color, Slide};

    fn player(total_ms: u64) -> (ManualClock, Player<ManualClock>) {
        let clock = ManualClock::new(1_000.0);
        let player = Player::new(clock.clone(), total_ms);
        (clock, player)
    }

    #[test]
    fn test_paused_player_does_not_advance() {
        let (clock, mut player) = player(3000);
        clock.advance_ms(500.0);
        assert_eq!(player.tick(), 0.0);
    }

    #[test]
    fn test_playing_wraps_modulo_total() {
        let (clock, mut player) = player(3000);
        player.play();
        clock.advance_ms(1200.0);
        assert_eq!(player.tick(), 1200.0);
        clock.advance_ms(2500.0);
        assert_eq!(player.tick(), 700.0);
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let (clock, mut player) = player(3000);
        player.play();
        clock.advance_ms(400.0);
        player.pause();
        clock.advance_ms(10_000.0);
        assert_eq!(player.tick(), 400.0);

        player.play();
        clock.advance_ms(100.0);
        assert_eq!(player.tick(), 500.0);
    }

    #[test]
    fn test_seek_and_reset() {
        let (clock, mut player) = player(3000);
        player.seek(3500.0);
        assert_eq!(player.elapsed_ms(), 500.0);

        player.play();
        clock.advance_ms(250.0);
        assert_eq!(player.tick(), 750.0);

        player.reset();
        assert_eq!(player.elapsed_ms(), 0.0);
        clock.advance_ms(10.0);
        assert_eq!(player.tick(), 10.0);
    }

    #[test]
    fn test_zero_length_timeline_holds_at_zero() {
        let (clock, mut player) = player(0);
        player.play();
        clock.advance_ms(1234.0);
        assert_eq!(player.tick(), 0.0);
    }

    #[test]
    fn test_toggle_flips_state() {
        let (_clock, mut player) = player(1000);
        player.toggle();
        assert_eq!(player.state(), PlaybackState::Playing);
        player.toggle();
        assert_eq!(player.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_render_tick_tracks_timeline_total() {
        let timeline = Timeline::from_slides(vec![
            Slide::new(2.0, Color::BLACK),
            Slide::new(1.0, Color::WHITE),
        ]);
        let (clock, mut player) = player(0);
        let mut surface = RasterSurface::new(8, 8, None).unwrap();
        let mut cache = ImageCache::new(DecodePolicy::Blocking);

        player.play();
        let first = player.render_tick(&timeline, &mut surface, &mut cache);
        assert_eq!(player.total_duration_ms(), 3000);
        assert_eq!(first.slide_index, Some(0));

        clock.advance_ms(2500.0);
        let tick = player.render_tick(&timeline, &mut surface, &mut cache);
        assert_eq!(tick.elapsed_ms, 2500.0);
        assert_eq!(tick.slide_index, Some(1));
        assert_eq!(surface.pixel(0, 0), Color::WHITE);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(2999.0), "0:02");
        assert_eq!(format_clock(61_000.0), "1:01");
    }

    #[tokio::test]
    async fn test_run_playback_stops_on_flag() {
        let timeline = Timeline::with_title_slide();
        let clock = ManualClock::new(0.0);
        let mut player = Player::new(clock.clone(), 0);
        let mut surface = RasterSurface::new(16, 9, None).unwrap();
        let mut cache = ImageCache::default();
        let stop = Arc::new(AtomicBool::new(false));

        player.play();
        let flag = Arc::clone(&stop);
        let frames = run_playback(
            &mut player,
            &timeline,
            &mut surface,
            &mut cache,
            240,
            stop,
            |tick, _surface| {
                clock.advance_ms(100.0);
                if tick.elapsed_ms >= 500.0 {
                    flag.store(true, Ordering::Relaxed);
                }
            },
        )
        .await;

        assert!(frames >= 6);
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn test_run_playback_returns_when_paused() {
        let timeline = Timeline::with_title_slide();
        let mut player = Player::new(ManualClock::new(0.0), 3000);
        let mut surface = RasterSurface::new(4, 4, None).unwrap();
        let mut cache = ImageCache::default();
        let frames = run_playback(
            &mut player,
            &timeline,
            &mut surface,
            &mut cache,
            60,
            Arc::new(AtomicBool::new(false)),
            |_, _| {},
        )
        .await;
        assert_eq!(frames, 0);
    }
}
