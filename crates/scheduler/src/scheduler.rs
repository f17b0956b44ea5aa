use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use twinsim_kernel::PositionSink;
use twinsim_router::Router;

use crate::diagnostics::TickDiagnostics;
use crate::timer::FrameTimer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Simulation step, seconds.
    pub fixed_dt: f64,
    /// Longest frame delta accepted, seconds. Longer frames are clamped.
    pub max_frame_delta: f64,
    pub diagnostics_interval_ms: u64,
    /// Frames averaged for the reported frame time.
    pub timer_window: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_frame_delta: 0.25,
            diagnostics_interval_ms: 500,
            timer_window: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error("fixed_dt must be finite and positive, got {0}")]
    InvalidFixedDt(f64),
    #[error("max_frame_delta must be finite and positive, got {0}")]
    InvalidFrameDelta(f64),
}

/// Accumulator loop between the host's frame clock and the router.
#[derive(Debug)]
pub struct FixedStepScheduler {
    config: SchedulerConfig,
    accumulator: f64,
    last_frame: Option<Instant>,
    window_elapsed: Duration,
    window_ticks: u64,
    total_ticks: u64,
    faults: usize,
    timer: FrameTimer,
    diagnostics: Option<TickDiagnostics>,
}

impl FixedStepScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        if !(config.fixed_dt.is_finite() && config.fixed_dt > 0.0) {
            return Err(SchedulerError::InvalidFixedDt(config.fixed_dt));
        }
        if !(config.max_frame_delta.is_finite() && config.max_frame_delta > 0.0) {
            return Err(SchedulerError::InvalidFrameDelta(config.max_frame_delta));
        }
        Ok(Self {
            config,
            accumulator: 0.0,
            last_frame: None,
            window_elapsed: Duration::ZERO,
            window_ticks: 0,
            total_ticks: 0,
            faults: 0,
            timer: FrameTimer::new(config.timer_window),
            diagnostics: None,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Body faults reported by the router across all steps.
    pub fn faults(&self) -> usize {
        self.faults
    }

    /// Leftover simulation time not yet consumed by a step, seconds.
    pub fn accumulated(&self) -> f64 {
        self.accumulator
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Most recently published diagnostics window.
    pub fn diagnostics(&self) -> Option<&TickDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// Drive one host frame stamped `now`. The first frame only sets the
    /// clock. Returns the number of steps run.
    pub fn frame<S: PositionSink + ?Sized>(
        &mut self,
        now: Instant,
        router: &mut Router,
        sink: &mut S,
    ) -> usize {
        let delta = self
            .last_frame
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);
        self.advance(delta, router, sink)
    }

    /// Feed `delta` of frame time, run every whole step it covers, then push
    /// positions to `sink`. Returns the number of steps run.
    pub fn advance<S: PositionSink + ?Sized>(
        &mut self,
        delta: Duration,
        router: &mut Router,
        sink: &mut S,
    ) -> usize {
        let _span = tracing::info_span!("scheduler_frame").entered();
        self.timer.record(delta);

        let fixed_dt = self.config.fixed_dt;
        self.accumulator += delta.as_secs_f64().min(self.config.max_frame_delta);

        let mut steps = 0;
        while self.accumulator >= fixed_dt {
            let report = router.step(fixed_dt as f32);
            self.faults += report.faults.len();
            self.accumulator -= fixed_dt;
            steps += 1;
        }
        router.sync_positions(sink);

        self.window_ticks += steps as u64;
        self.total_ticks += steps as u64;
        self.window_elapsed += delta;
        if self.window_elapsed >= Duration::from_millis(self.config.diagnostics_interval_ms) {
            self.publish_diagnostics(router);
        }
        steps
    }

    fn publish_diagnostics(&mut self, router: &Router) {
        let diag = TickDiagnostics::capture(
            router,
            self.window_ticks,
            self.total_ticks,
            self.timer.average(),
        );
        tracing::debug!(%diag, bodies = diag.bodies, "tick diagnostics");
        self.diagnostics = Some(diag);
        self.window_ticks = 0;
        self.window_elapsed = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::collections::BTreeMap;
    use twinsim_common::BodyId;
    use twinsim_kernel::BodyOptions;
    use twinsim_router::RouterConfig;

    // Binary-exact step so accumulator arithmetic is exact in tests.
    fn coarse() -> FixedStepScheduler {
        FixedStepScheduler::new(SchedulerConfig {
            fixed_dt: 0.125,
            ..SchedulerConfig::default()
        })
        .unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = FixedStepScheduler::new(SchedulerConfig {
            fixed_dt: 0.0,
            ..SchedulerConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, SchedulerError::InvalidFixedDt(0.0));
    }

    #[test]
    fn whole_steps_per_frame() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());
        assert_eq!(scheduler.advance(ms(250), &mut router, &mut ()), 2);
        assert_eq!(router.tick(), 2);
        assert_eq!(scheduler.accumulated(), 0.0);
    }

    #[test]
    fn remainder_carries_into_next_frame() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());
        assert_eq!(scheduler.advance(ms(100), &mut router, &mut ()), 0);
        assert_eq!(scheduler.advance(ms(100), &mut router, &mut ()), 1);
        assert_eq!(scheduler.total_ticks(), 1);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());
        // A 3 s stall contributes only 0.25 s.
        assert_eq!(scheduler.advance(ms(3000), &mut router, &mut ()), 2);
    }

    #[test]
    fn first_frame_only_sets_the_clock() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());
        let t0 = Instant::now();
        assert_eq!(scheduler.frame(t0, &mut router, &mut ()), 0);
        assert_eq!(scheduler.frame(t0 + ms(250), &mut router, &mut ()), 2);
        assert_eq!(scheduler.frame(t0 + ms(375), &mut router, &mut ()), 1);
    }

    #[test]
    fn positions_are_synced_every_frame() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());
        router
            .register_body("crate", Vec3::new(0.0, 0.0, 10.0), BodyOptions::default())
            .unwrap();
        let mut sink: BTreeMap<BodyId, Vec3> = BTreeMap::new();

        scheduler.advance(ms(0), &mut router, &mut sink);
        assert_eq!(sink[&BodyId::from("crate")].z, 10.0);

        scheduler.advance(ms(250), &mut router, &mut sink);
        assert!(sink[&BodyId::from("crate")].z < 10.0);
    }

    #[test]
    fn diagnostics_publish_per_window_and_reset() {
        let mut scheduler = coarse();
        let mut router = Router::new(RouterConfig::default());

        scheduler.advance(ms(250), &mut router, &mut ());
        assert!(scheduler.diagnostics().is_none());
        scheduler.advance(ms(250), &mut router, &mut ());
        let diag = scheduler.diagnostics().unwrap();
        assert_eq!(diag.ticks, 4);
        assert_eq!(diag.total_ticks, 4);
        assert_eq!(diag.average_frame, ms(250));

        scheduler.advance(ms(250), &mut router, &mut ());
        scheduler.advance(ms(250), &mut router, &mut ());
        let diag = scheduler.diagnostics().unwrap();
        assert_eq!(diag.ticks, 4);
        assert_eq!(diag.total_ticks, 8);
        assert!(diag.to_string().starts_with("Mode: Light | Ticks: 4 |"));
    }
}
