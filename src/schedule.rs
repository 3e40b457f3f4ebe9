//! Derived run plan: which timesteps trigger evaluations and video capture,
//! computed up front from the configured periods.

use crate::config::ExperimentConfig;
use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestepEvent {
    /// Run the evaluation measures and push them to the loggers.
    Eval,
    /// Open a new video file.
    VideoStart,
    /// Render the current grid into the open video.
    VideoFrame,
    /// Flush and close the open video.
    VideoClose,
}

/// Precomputed event schedule for a whole run.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    pub n_timesteps: u64,
    pub period_eval: u64,
    pub do_video: bool,
    pub n_steps_between_videos: u64,
    pub n_steps_per_video: u64,
    pub n_steps_between_frames: u64,
}

impl SchedulePlan {
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        if config.n_timesteps == 0 {
            bail!("n_timesteps must be at least 1");
        }
        if config.period_eval == 0 {
            bail!("period_eval must be at least 1");
        }
        if config.do_video {
            if config.n_steps_between_frames == 0 {
                bail!("n_steps_between_frames must be at least 1");
            }
            if config.n_steps_per_video > config.n_steps_between_videos {
                bail!(
                    "n_steps_per_video ({}) must be less than or equal to n_steps_between_videos ({})",
                    config.n_steps_per_video,
                    config.n_steps_between_videos
                );
            }
            if config.n_steps_per_video == 0 {
                bail!("n_steps_per_video must be at least 1 when do_video is set");
            }
        }
        Ok(Self {
            n_timesteps: config.n_timesteps,
            period_eval: config.period_eval,
            do_video: config.do_video,
            n_steps_between_videos: config.n_steps_between_videos,
            n_steps_per_video: config.n_steps_per_video,
            n_steps_between_frames: config.n_steps_between_frames,
        })
    }

    /// All events fired at timestep `t`, in the order a run loop applies them.
    pub fn events_at(&self, t: u64) -> Vec<TimestepEvent> {
        let mut events = Vec::new();
        if t % self.period_eval == 0 {
            events.push(TimestepEvent::Eval);
        }
        if self.do_video {
            // Capture windows open at the start of each between-videos block.
            let t_current = t % self.n_steps_between_videos;
            if t_current == 0 {
                events.push(TimestepEvent::VideoStart);
            }
            if t_current < self.n_steps_per_video && t_current % self.n_steps_between_frames == 0 {
                events.push(TimestepEvent::VideoFrame);
            }
            if t_current == self.n_steps_per_video - 1 {
                events.push(TimestepEvent::VideoClose);
            }
        }
        events
    }

    pub fn n_evals(&self) -> u64 {
        self.n_timesteps.div_ceil(self.period_eval)
    }

    pub fn n_videos(&self) -> u64 {
        if self.do_video {
            self.n_timesteps.div_ceil(self.n_steps_between_videos)
        } else {
            0
        }
    }

    pub fn frames_per_video(&self) -> u64 {
        if self.do_video {
            self.n_steps_per_video.div_ceil(self.n_steps_between_frames)
        } else {
            0
        }
    }

    /// Iterate over the non-empty timesteps of the whole run.
    pub fn iter(&self) -> impl Iterator<Item = (u64, Vec<TimestepEvent>)> + '_ {
        (0..self.n_timesteps).filter_map(|t| {
            let events = self.events_at(t);
            (!events.is_empty()).then_some((t, events))
        })
    }
}
