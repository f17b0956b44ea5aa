use glam::Vec3;
use tokio::sync::{mpsc, oneshot, watch};
use twinsim_common::{BodyId, BodySnapshot};
use twinsim_kernel::{
    AnalyticBackend, Axis, BodyError, BodyOptions, PhysicsBackend, PositionSink, RigidBody,
    StepReport, World,
};
use twinsim_native::{BackendError, NativeBackend};

use crate::config::RouterConfig;
use crate::mode::{InitObserver, InitStatus, Mode};
use crate::registry::{RegistryHandle, RegistryOp};

type InitResult = Result<NativeBackend, BackendError>;

/// Owns the world and routes every operation to the active backend.
pub struct Router {
    config: RouterConfig,
    world: World,
    analytic: AnalyticBackend,
    native: Option<NativeBackend>,
    mode: Mode,
    /// Whether the caller's most recent request was for native mode.
    wants_native: bool,
    status: InitStatus,
    pending: Option<oneshot::Receiver<InitResult>>,
    observer: Option<watch::Receiver<InitStatus>>,
    notice_logged: bool,
    fallback_notices: usize,
    ops_tx: mpsc::UnboundedSender<RegistryOp>,
    ops_rx: mpsc::UnboundedReceiver<RegistryOp>,
}

impl Router {
    /// Create a router in light mode. A configured native mode is requested
    /// immediately, which needs an ambient tokio runtime.
    pub fn new(config: RouterConfig) -> Self {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let mut router = Self {
            config,
            world: World::new(),
            analytic: AnalyticBackend::new(config.integrator),
            native: None,
            mode: Mode::Light,
            wants_native: false,
            status: InitStatus::Idle,
            pending: None,
            observer: None,
            notice_logged: false,
            fallback_notices: 0,
            ops_tx,
            ops_rx,
        };
        if config.mode == Mode::Native {
            router.set_mode(Mode::Native);
        }
        router
    }

    /// Configuration the router was built with.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Backend stepping right now.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Lifecycle of the native backend.
    pub fn init_status(&self) -> InitStatus {
        self.status
    }

    /// Times the native backend was reported unavailable.
    pub fn fallback_notices(&self) -> usize {
        self.fallback_notices
    }

    /// Read-only view of the simulation context.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Completed simulation steps.
    pub fn tick(&self) -> u64 {
        self.world.tick()
    }

    /// Look up a registered body.
    pub fn body(&self, id: &BodyId) -> Option<&RigidBody> {
        self.world.get(id)
    }

    /// Registered bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.world.iter()
    }

    /// The native engine, once initialization has been applied.
    pub fn native_backend(&self) -> Option<&NativeBackend> {
        self.native.as_ref()
    }

    /// Name of the backend that steps the next tick.
    pub fn active_backend_name(&self) -> &'static str {
        match (self.mode, self.native.as_ref()) {
            (Mode::Native, Some(native)) => native.name(),
            _ => self.analytic.name(),
        }
    }

    /// Cloneable handle for queuing registrations from async tasks.
    pub fn registry_handle(&self) -> RegistryHandle {
        RegistryHandle::new(self.ops_tx.clone())
    }

    /// Register a body. Returns `Ok(false)` if the id is already registered.
    pub fn register_body(
        &mut self,
        id: impl Into<BodyId>,
        position: Vec3,
        options: BodyOptions,
    ) -> Result<bool, BodyError> {
        let body = RigidBody::new(id.into(), position, options)?;
        if self.world.contains(body.id()) {
            return Ok(false);
        }
        if self.mode == Mode::Native {
            if let Some(native) = self.native.as_mut() {
                native.create_body(&body);
            }
        }
        tracing::debug!(id = %body.id(), mode = %self.mode, "body registered");
        self.world.insert(body);
        Ok(true)
    }

    /// Remove a body and release its native counterpart, if any.
    pub fn unregister_body(&mut self, id: &BodyId) -> bool {
        if let Some(native) = self.native.as_mut() {
            native.remove_body(id);
        }
        let removed = self.world.remove(id).is_some();
        if removed {
            tracing::debug!(%id, "body unregistered");
        }
        removed
    }

    /// Advance the active backend by `dt`. Pending native resolution and
    /// queued registry operations are applied first.
    pub fn step(&mut self, dt: f32) -> StepReport {
        let _span = tracing::info_span!("router_step", mode = %self.mode).entered();
        self.poll_native();
        self.apply_queued_ops();

        match (self.mode, self.native.as_mut()) {
            (Mode::Native, Some(native)) => native.step(&mut self.world, dt),
            _ => self.analytic.step(&mut self.world, dt),
        }
    }

    /// Accumulate a force on a body for the next step. False for unknown ids.
    pub fn apply_force(&mut self, id: &BodyId, force: Vec3) -> bool {
        let Some(body) = self.world.get_mut(id) else {
            return false;
        };
        match (self.mode, self.native.as_mut()) {
            (Mode::Native, Some(native)) => native.apply_force(body, force),
            _ => self.analytic.apply_force(body, force),
        }
        true
    }

    /// Accumulate a torque on a body for the next step.
    pub fn apply_torque(&mut self, id: &BodyId, torque: Vec3) -> bool {
        let Some(body) = self.world.get_mut(id) else {
            return false;
        };
        match (self.mode, self.native.as_mut()) {
            (Mode::Native, Some(native)) => native.apply_torque(body, torque),
            _ => self.analytic.apply_torque(body, torque),
        }
        true
    }

    /// Engage the motor on every axis toward `target`.
    pub fn set_target_velocity(&mut self, id: &BodyId, target: Vec3) -> bool {
        match self.world.get_mut(id) {
            Some(body) => {
                body.set_target_velocity(target);
                true
            }
            None => false,
        }
    }

    /// Engage the motor on one axis only.
    pub fn set_target_axis(&mut self, id: &BodyId, axis: Axis, value: f32) -> bool {
        match self.world.get_mut(id) {
            Some(body) => {
                body.set_target_axis(axis, value);
                true
            }
            None => false,
        }
    }

    /// Zero every velocity field of a body, in the engine too when native.
    pub fn hard_stop(&mut self, id: &BodyId) -> bool {
        let Some(body) = self.world.get_mut(id) else {
            return false;
        };
        body.hard_stop();
        if let Some(native) = self.native.as_mut() {
            if native.contains(id) {
                native.resync_body(body);
            }
        }
        true
    }

    /// Stage authoritative states. Unknown ids are ignored.
    pub fn apply_snapshot(&mut self, snapshot: &[BodySnapshot]) -> usize {
        self.world.apply_snapshot(snapshot)
    }

    /// Push every body's position to the host's visual representation.
    pub fn sync_positions<S: PositionSink + ?Sized>(&self, sink: &mut S) {
        for body in self.world.iter() {
            sink.sync_position(body.id(), body.position());
        }
    }

    /// Request a backend. Native starts an initialization if none is in
    /// flight and switches at a later step boundary once it is ready.
    pub fn set_mode(&mut self, mode: Mode) {
        match mode {
            Mode::Light => {
                self.wants_native = false;
                if self.mode == Mode::Native {
                    self.mode = Mode::Light;
                    tracing::info!("switched to light integrator");
                }
            }
            Mode::Native => {
                self.wants_native = true;
                match self.status {
                    InitStatus::Idle => self.start_native_init(),
                    InitStatus::Initializing => {}
                    InitStatus::Ready => self.activate_native(),
                    InitStatus::Failed => {
                        tracing::debug!("native backend failed earlier; reset_native() to retry")
                    }
                }
            }
        }
    }

    /// Observe the current native initialization attempt.
    pub fn wait_native(&self) -> InitObserver {
        match (&self.observer, self.status) {
            (Some(rx), InitStatus::Initializing) => InitObserver::Pending(rx.clone()),
            _ => InitObserver::Settled(self.status),
        }
    }

    /// Apply a settled native initialization, if any. Called at the top of
    /// every step; hosts may call it directly between steps.
    pub fn poll_native(&mut self) -> InitStatus {
        let Some(rx) = self.pending.as_mut() else {
            return self.status;
        };
        let result = match rx.try_recv() {
            Err(oneshot::error::TryRecvError::Empty) => return self.status,
            Err(oneshot::error::TryRecvError::Closed) => Err(BackendError::Aborted(
                "initialization task ended without a result".into(),
            )),
            Ok(result) => result,
        };
        self.pending = None;
        self.observer = None;
        match result {
            Ok(native) => self.install_native(native),
            Err(err) => self.fail_native(err),
        }
        self.status
    }

    /// Forget a failed attempt so the next native request tries again.
    pub fn reset_native(&mut self) {
        if self.status == InitStatus::Failed {
            self.status = InitStatus::Idle;
            self.notice_logged = false;
            tracing::debug!("native backend reset");
        }
    }

    fn start_native_init(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.fail_native(BackendError::NoRuntime);
            return;
        };
        let (result_tx, result_rx) = oneshot::channel();
        let (status_tx, status_rx) = watch::channel(InitStatus::Initializing);
        let config = self.config.native;
        runtime.spawn(async move {
            let result = NativeBackend::initialize(config).await;
            let settled = if result.is_ok() {
                InitStatus::Ready
            } else {
                InitStatus::Failed
            };
            // Result first, so observers woken by the status find it waiting.
            let _ = result_tx.send(result);
            status_tx.send_replace(settled);
        });
        self.pending = Some(result_rx);
        self.observer = Some(status_rx);
        self.status = InitStatus::Initializing;
        tracing::debug!("native initialization started");
    }

    fn install_native(&mut self, native: NativeBackend) {
        tracing::info!(backend = native.name(), "native backend ready");
        self.native = Some(native);
        self.status = InitStatus::Ready;
        if self.wants_native {
            self.activate_native();
        }
    }

    /// Mirror every registered body, then hand stepping to the engine. Bodies
    /// the engine already knows are teleported to their current app state so
    /// motion continues from where the light integrator left it.
    fn activate_native(&mut self) {
        let Some(native) = self.native.as_mut() else {
            return;
        };
        for body in self.world.iter() {
            native.resync_body(body);
        }
        self.mode = Mode::Native;
        tracing::info!(bodies = self.world.len(), "switched to native backend");
    }

    fn fail_native(&mut self, err: BackendError) {
        self.status = InitStatus::Failed;
        self.mode = Mode::Light;
        self.wants_native = false;
        if !self.notice_logged {
            tracing::info!(error = %err, "native backend unavailable, using light integrator");
            self.notice_logged = true;
            self.fallback_notices += 1;
        }
    }

    fn apply_queued_ops(&mut self) {
        while let Ok(op) = self.ops_rx.try_recv() {
            match op {
                RegistryOp::Register {
                    id,
                    position,
                    options,
                } => {
                    if let Err(err) = self.register_body(id, position, options) {
                        tracing::warn!(error = %err, "queued registration rejected");
                    }
                }
                RegistryOp::Unregister(id) => {
                    self.unregister_body(&id);
                }
            }
        }
    }
}
