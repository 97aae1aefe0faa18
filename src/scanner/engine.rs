//! The QR scan engine: viewport control, scan admission and dispatch.
//!
//! One decode is in flight at most. The in-flight permit is taken while
//! the state lock is held, so admission, permit and the `LastScan`
//! snapshot are a single step; it is released by a guard when the scan
//! settles, whatever the outcome.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use super::admission::{AdmissionPolicy, LastScan, Verdict};
use super::geometry::{
    clamp_center_to_viewport, compute_capture_region, CaptureRegion, Frame, Point, WindowSize,
};
use super::input::{InputEffect, InputEvent};
use super::payload::RecentPayloads;
use super::throttle::Throttle;
use crate::config::{ConfigError, ScannerConfig};
use crate::host::RegionDecoder;

/// Receives decoded payloads. `on_scan_failure` defaults to a no-op.
pub trait ScanHandler: Send + Sync {
    fn on_scan_success(&self, payload: &str) -> impl Future<Output = ()> + Send;

    fn on_scan_failure(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl<T: ScanHandler> ScanHandler for Arc<T> {
    fn on_scan_success(&self, payload: &str) -> impl Future<Output = ()> + Send {
        (**self).on_scan_success(payload)
    }

    fn on_scan_failure(&self) -> impl Future<Output = ()> + Send {
        (**self).on_scan_failure()
    }
}

/// What a single scan attempt ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Inactive, already scanning, or the frame has not changed enough.
    NotAdmitted,
    /// A forced scan found another decode in flight.
    Busy,
    /// New payload, handed to `on_scan_success`.
    Delivered(String),
    /// Payload seen within the TTL; no callback.
    Duplicate(String),
    /// Host found no code.
    NoPayload,
    /// Host call failed.
    Failed,
}

struct EngineState {
    window: WindowSize,
    frame: Frame,
    last_scan: Option<LastScan>,
    recent: RecentPayloads,
    was_active: bool,
    recenter: Throttle<Point>,
    resize: Throttle<f64>,
}

pub struct QrScanEngine<D, H> {
    config: ScannerConfig,
    policy: AdmissionPolicy,
    decoder: D,
    handler: H,
    active: watch::Receiver<bool>,
    state: Mutex<EngineState>,
    in_flight: AtomicBool,
    frame_tx: watch::Sender<Frame>,
    scanning_tx: watch::Sender<bool>,
}

impl<D, H> QrScanEngine<D, H>
where
    D: RegionDecoder,
    H: ScanHandler,
{
    /// Builds an engine. Activation is read from `active`; call
    /// [`sync_activation`](Self::sync_activation) (or [`run`](Self::run))
    /// to apply transitions.
    ///
    /// Fails if `config` does not pass [`ScannerConfig::validate`].
    pub fn new(
        config: ScannerConfig,
        window: WindowSize,
        active: watch::Receiver<bool>,
        decoder: D,
        handler: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mid = window.midpoint();
        let frame = Frame::new(
            config.default_size,
            clamp_center_to_viewport(mid.x, mid.y, config.default_size, window),
        );
        let policy = AdmissionPolicy {
            position_threshold_px: config.position_threshold_px,
            size_threshold_px: config.size_threshold_px,
            static_resample: config.static_frame_resample(),
        };
        let state = EngineState {
            window,
            frame,
            last_scan: None,
            recent: RecentPayloads::new(
                config.recent_payload_ttl(),
                config.recent_payload_cache_size,
            ),
            was_active: false,
            recenter: Throttle::new(config.recenter_throttle()),
            resize: Throttle::new(config.resize_throttle()),
        };

        Ok(Self {
            policy,
            decoder,
            handler,
            active,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
            frame_tx: watch::channel(frame).0,
            scanning_tx: watch::channel(false).0,
            config,
        })
    }

    pub fn frame(&self) -> Frame {
        self.state().frame
    }

    pub fn subscribe_frame(&self) -> watch::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn subscribe_scanning(&self) -> watch::Receiver<bool> {
        self.scanning_tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub fn window(&self) -> WindowSize {
        self.state().window
    }

    pub fn recent_payload_count(&self) -> usize {
        self.state().recent.len()
    }

    /// Capture rectangle for the current frame.
    pub fn capture_region(&self) -> CaptureRegion {
        let state = self.state();
        compute_capture_region(&state.frame, self.config.capture_padding, state.window)
    }

    /// Applies an activation edge if the active flag changed since last call.
    ///
    /// Becoming active resets the size, forgets recent payloads and
    /// recenters on the window. Becoming inactive only stops admissions.
    pub fn sync_activation(&self) {
        let active = self.is_active();
        let mut state = self.state();
        if active == state.was_active {
            return;
        }
        state.was_active = active;

        if !active {
            drop(state);
            log::info!("[QR] Scanner deactivated");
            return;
        }

        let size = self.config.default_size;
        let mid = state.window.midpoint();
        state.recent.reset();
        state.recenter.reset();
        state.resize.reset();
        state.frame = Frame::new(size, clamp_center_to_viewport(mid.x, mid.y, size, state.window));
        let frame = state.frame;
        drop(state);

        self.publish_frame(frame);
        log::info!(
            "[QR] Scanner activated at ({:.0}, {:.0}), size {}",
            frame.center.x,
            frame.center.y,
            frame.size
        );
    }

    pub fn handle_input(&self, event: InputEvent) -> InputEffect {
        let now = Instant::now();
        match event {
            InputEvent::WindowResized(window) => {
                self.resize_window(window);
                InputEffect::Applied
            }
            _ if !self.is_active() => InputEffect::Ignored,
            InputEvent::PointerMoved { x, y } => self.request_recenter(Point::new(x, y), now),
            InputEvent::Wheel { delta_y } if delta_y == 0.0 => InputEffect::Ignored,
            InputEvent::Wheel { delta_y } => {
                let direction = if delta_y < 0.0 { 1.0 } else { -1.0 };
                self.request_resize(direction * self.config.size_step, now)
            }
            InputEvent::Key(key) if key.has_modifier() => InputEffect::Ignored,
            InputEvent::Key(key) => match key.key.as_str() {
                "+" | "=" => self.request_resize(self.config.size_step, now),
                "-" | "_" => self.request_resize(-self.config.size_step, now),
                k if k.eq_ignore_ascii_case("enter") => InputEffect::ScanRequested,
                _ => InputEffect::Ignored,
            },
            InputEvent::Confirm => InputEffect::ScanRequested,
        }
    }

    /// Applies throttled input whose window has elapsed.
    pub fn flush_throttled(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state();
        let mut changed = false;

        if let Some(center) = state.recenter.flush(now) {
            apply_center(&mut state, center);
            changed = true;
        }
        if let Some(delta) = state.resize.flush(now) {
            apply_resize(&mut state, delta, &self.config);
            changed = true;
        }

        let frame = state.frame;
        drop(state);
        if changed {
            self.publish_frame(frame);
        }
        changed
    }

    /// Earliest instant at which [`flush_throttled`](Self::flush_throttled) has work.
    pub fn next_flush_deadline(&self) -> Option<Instant> {
        let state = self.state();
        match (state.recenter.deadline(), state.resize.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Passive scan attempt, subject to the admission policy.
    pub async fn tick(&self) -> ScanOutcome {
        self.detect_and_scan(false, None).await
    }

    /// Forced scan of `region`, bypassing the movement and staleness checks.
    pub async fn scan(&self, region: CaptureRegion) -> ScanOutcome {
        self.detect_and_scan(true, Some(region)).await
    }

    /// Forced scan of the current frame.
    pub async fn scan_current(&self) -> ScanOutcome {
        self.detect_and_scan(true, None).await
    }

    async fn detect_and_scan(&self, force: bool, region: Option<CaptureRegion>) -> ScanOutcome {
        let now = Instant::now();

        // Apply a pending activation edge before judging the frame.
        self.sync_activation();
        if !force && !self.is_active() {
            return ScanOutcome::NotAdmitted;
        }

        let (_permit, region) = {
            let mut state = self.state();

            if !force {
                match self
                    .policy
                    .evaluate(state.last_scan.as_ref(), &state.frame, now)
                {
                    Verdict::Reject => return ScanOutcome::NotAdmitted,
                    Verdict::Admit(reason) => log::debug!("[QR] Scan admitted: {:?}", reason),
                }
            }

            let Some(permit) = ScanPermit::acquire(&self.in_flight, &self.scanning_tx) else {
                return if force {
                    log::debug!("[QR] Forced scan skipped, decode already in flight");
                    ScanOutcome::Busy
                } else {
                    ScanOutcome::NotAdmitted
                };
            };

            state.last_scan = Some(LastScan {
                at: now,
                frame: state.frame,
            });
            let region = region.unwrap_or_else(|| {
                compute_capture_region(&state.frame, self.config.capture_padding, state.window)
            });
            (permit, region)
        };

        let payload = match self.decoder.decode_region(region).await {
            Ok(Some(payload)) if !payload.is_empty() => payload,
            Ok(_) => {
                self.handler.on_scan_failure().await;
                return ScanOutcome::NoPayload;
            }
            Err(e) => {
                log::warn!("[QR] Region decode failed: {}", e);
                self.handler.on_scan_failure().await;
                return ScanOutcome::Failed;
            }
        };

        let fresh = {
            let mut state = self.state();
            if state.recent.is_recent(&payload, now) {
                false
            } else {
                state.recent.remember(payload.clone(), now);
                true
            }
        };
        if !fresh {
            log::debug!("[QR] Suppressed repeated payload");
            return ScanOutcome::Duplicate(payload);
        }

        log::info!("[QR] Decoded {} bytes", payload.len());
        self.handler.on_scan_success(&payload).await;
        ScanOutcome::Delivered(payload)
    }

    fn request_recenter(&self, target: Point, now: Instant) -> InputEffect {
        let mut state = self.state();
        let Some(target) = state.recenter.offer(target, now) else {
            return InputEffect::Throttled;
        };
        apply_center(&mut state, target);
        let frame = state.frame;
        drop(state);
        self.publish_frame(frame);
        InputEffect::Applied
    }

    fn request_resize(&self, delta: f64, now: Instant) -> InputEffect {
        let mut state = self.state();
        let Some(delta) = state.resize.offer(delta, now) else {
            return InputEffect::Throttled;
        };
        apply_resize(&mut state, delta, &self.config);
        let frame = state.frame;
        drop(state);
        self.publish_frame(frame);
        InputEffect::Applied
    }

    /// Re-clamps the frame to a new window. Coming from an empty window
    /// the frame has no meaningful position yet, so it is recentered.
    fn resize_window(&self, window: WindowSize) {
        let mut state = self.state();
        let center = if state.window.is_empty() {
            window.midpoint()
        } else {
            state.frame.center
        };
        state.window = window;
        apply_center(&mut state, center);
        let frame = state.frame;
        drop(state);
        self.publish_frame(frame);
    }

    fn publish_frame(&self, frame: Frame) {
        self.frame_tx.send_if_modified(|current| {
            if *current == frame {
                return false;
            }
            *current = frame;
            true
        });
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D, H> QrScanEngine<D, H>
where
    D: RegionDecoder + 'static,
    H: ScanHandler + 'static,
{
    /// Cadence driver. Ticks every `scan_interval`, applies activation
    /// changes and input until the input stream or activity source closes.
    ///
    /// Each scan runs on its own task so input keeps flowing while a
    /// decode is pending; the in-flight permit prevents overlap.
    pub async fn run(self: Arc<Self>, mut inputs: mpsc::Receiver<InputEvent>) {
        let mut cadence = tokio::time::interval(self.config.scan_interval());
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut active = self.active.clone();

        self.sync_activation();
        log::info!(
            "[QR] Cadence driver started ({}ms)",
            self.config.scan_interval_ms
        );

        loop {
            let flush_at = self.next_flush_deadline();
            tokio::select! {
                _ = cadence.tick() => {
                    if self.is_active() && !self.is_scanning() {
                        self.spawn_scan(false);
                    }
                }
                changed = active.changed() => {
                    if changed.is_err() {
                        log::info!("[QR] Activity source closed");
                        break;
                    }
                    self.sync_activation();
                }
                event = inputs.recv() => {
                    let Some(event) = event else {
                        log::info!("[QR] Input stream closed");
                        break;
                    };
                    if self.handle_input(event) == InputEffect::ScanRequested {
                        self.spawn_scan(true);
                    }
                }
                _ = wait_until(flush_at) => {
                    self.flush_throttled();
                }
            }
        }
    }

    fn spawn_scan(self: &Arc<Self>, force: bool) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = if force {
                engine.scan_current().await
            } else {
                engine.tick().await
            };
            log::trace!("[QR] Scan outcome: {:?}", outcome);
        });
    }
}

fn apply_center(state: &mut EngineState, target: Point) {
    state.frame.center =
        clamp_center_to_viewport(target.x, target.y, state.frame.size, state.window);
}

fn apply_resize(state: &mut EngineState, delta: f64, config: &ScannerConfig) {
    let size = (state.frame.size + delta).clamp(config.min_size, config.max_size);
    state.frame.size = size;
    let center = state.frame.center;
    apply_center(state, center);
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Single-permit guard for the in-flight decode.
struct ScanPermit<'a> {
    flag: &'a AtomicBool,
    published: &'a watch::Sender<bool>,
}

impl<'a> ScanPermit<'a> {
    fn acquire(flag: &'a AtomicBool, published: &'a watch::Sender<bool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        published.send_replace(true);
        Some(Self { flag, published })
    }
}

impl Drop for ScanPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.published.send_replace(false);
    }
}
