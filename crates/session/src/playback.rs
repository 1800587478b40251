//! Frame-stepping playback clock.
//!
//! The host owns the timer; it asks for [`PlaybackClock::tick_interval`] and
//! calls [`PlaybackClock::tick`] on each expiry, or feeds wall time through
//! [`PlaybackClock::advance_by_elapsed`].

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use timeseries::Frame;

pub const FALLBACK_FPS: f64 = 30.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("frame {frame} is outside 0..{total}")]
    FrameOutOfRange { frame: Frame, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayState {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackClock {
    fps: f64,
    total_frames: usize,
    current: Frame,
    state: PlayState,
    /// Wall time not yet turned into frames.
    carry: f64,
}

impl PlaybackClock {
    pub fn new(fps: f64, total_frames: usize) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { FALLBACK_FPS };
        Self { fps, total_frames, current: 0, state: PlayState::Stopped, carry: 0.0 }
    }

    pub fn fps(&self) -> f64 { self.fps }
    pub fn total_frames(&self) -> usize { self.total_frames }
    pub fn current_frame(&self) -> Frame { self.current }
    pub fn state(&self) -> PlayState { self.state }
    pub fn is_playing(&self) -> bool { self.state == PlayState::Playing }

    pub fn tick_interval(&self) -> Duration { Duration::from_millis((1000.0 / self.fps) as u64) }

    pub fn play(&mut self) {
        if self.total_frames == 0 {
            return;
        }
        self.carry = 0.0;
        self.state = PlayState::Playing;
    }

    pub fn pause(&mut self) {
        self.carry = 0.0;
        self.state = PlayState::Stopped;
    }

    pub fn toggle(&mut self) {
        if self.is_playing() { self.pause() } else { self.play() }
    }

    /// Advances one frame while playing. Reaching the last frame stops the
    /// clock; returns whether the frame changed.
    pub fn tick(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        if self.current + 1 < self.total_frames {
            self.current += 1;
            true
        } else {
            self.pause();
            false
        }
    }

    /// Converts elapsed wall time into whole-frame ticks, keeping the
    /// remainder for the next call. Returns the number of frames advanced.
    pub fn advance_by_elapsed(&mut self, elapsed: Duration) -> usize {
        if !self.is_playing() {
            return 0;
        }
        self.carry += elapsed.as_secs_f64();
        let due = (self.carry * self.fps + 1e-9).floor() as usize;
        self.carry = (self.carry - due as f64 / self.fps).max(0.0);
        let mut advanced = 0;
        for _ in 0..due {
            if !self.tick() {
                break;
            }
            advanced += 1;
        }
        advanced
    }

    /// Jumps to `frame` and pauses.
    pub fn seek(&mut self, frame: Frame) -> Result<(), PlaybackError> {
        if frame >= self.total_frames {
            return Err(PlaybackError::FrameOutOfRange { frame, total: self.total_frames });
        }
        self.current = frame;
        self.pause();
        Ok(())
    }

    pub fn current_time(&self) -> f64 { self.current as f64 / self.fps }

    pub fn total_time(&self) -> f64 { self.total_frames as f64 / self.fps }

    pub fn time_label(&self) -> String { format!("{:.2} / {:.2}", self.current_time(), self.total_time()) }
}
