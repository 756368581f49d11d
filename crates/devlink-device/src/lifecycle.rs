//! Device lifecycle state machine.
//!
//! Every concrete device embeds a [`DeviceCore`], which owns the device's
//! transport, its [`Lifecycle`] and a set of [`DeviceHooks`] supplied by the
//! device kind. All state changes funnel through one setter that validates
//! the transition, records it, and publishes the new status to watchers.
//!
//! # States
//!
//! - `Disconnected`: initial, no transport open
//! - `Connecting`: transport opening and `on_initialize` running
//! - `Ready`: idle and operable
//! - `Busy`: one operation (or a capture session) in progress
//! - `Error`: failed, until reset or disconnect
//!
//! # Valid Transitions
//!
//! - Disconnected → Connecting → Ready
//! - Connecting → Disconnected (open or initialise failed)
//! - Ready ⇄ Busy
//! - Ready/Busy → Error → Ready (reset)
//! - Ready/Busy/Error → Disconnected
//!
//! # Examples
//!
//! ```
//! use devlink_core::DeviceState;
//! use devlink_device::lifecycle::can_transition;
//!
//! assert!(can_transition(DeviceState::Ready, DeviceState::Busy));
//! assert!(!can_transition(DeviceState::Disconnected, DeviceState::Ready));
//! ```

#![allow(async_fn_in_trait)]

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use devlink_core::constants::STATUS_HISTORY_SIZE;
use devlink_core::{DeviceState, DeviceStatus, EndpointAddress};
use devlink_transport::{AnyTransport, CancellationToken, Transport};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};

/// Whether the lifecycle allows moving from `from` to `to`.
pub fn can_transition(from: DeviceState, to: DeviceState) -> bool {
    use DeviceState::*;

    matches!(
        (from, to),
        (Disconnected, Connecting)
            | (Connecting, Ready | Disconnected)
            | (Ready, Busy | Error | Disconnected)
            | (Busy, Ready | Error | Disconnected)
            | (Error, Ready | Disconnected)
    )
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// State left.
    pub from: DeviceState,

    /// State entered.
    pub to: DeviceState,

    /// Reason recorded with the change.
    pub message: String,

    /// When the change happened.
    pub at: DateTime<Utc>,
}

/// Status, bounded transition history and status broadcast for one device.
#[derive(Debug)]
pub struct Lifecycle {
    device_id: String,
    status: DeviceStatus,
    history: VecDeque<StatusTransition>,
    status_tx: watch::Sender<DeviceStatus>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Disconnected` state.
    pub fn new(device_id: impl Into<String>) -> Self {
        let status = DeviceStatus::disconnected();
        let (status_tx, _) = watch::channel(status.clone());
        Self {
            device_id: device_id.into(),
            status,
            history: VecDeque::with_capacity(STATUS_HISTORY_SIZE),
            status_tx,
        }
    }

    /// Id of the device this lifecycle belongs to.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current status.
    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    /// Current state.
    pub fn state(&self) -> DeviceState {
        self.status.state
    }

    /// Receiver that observes every future status change.
    pub fn subscribe(&self) -> watch::Receiver<DeviceStatus> {
        self.status_tx.subscribe()
    }

    /// Most recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StatusTransition> {
        &self.history
    }

    /// Fail with `NotReady` unless the device is `Ready`.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.status.is_ready() {
            Ok(())
        } else {
            Err(DeviceError::not_ready(&self.device_id, self.status.state))
        }
    }

    /// Move to `to`, recording `message`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidTransition`] if the table does not allow
    /// the change; the status is left untouched in that case.
    pub fn transition(
        &mut self,
        to: DeviceState,
        message: impl Into<String>,
    ) -> Result<StatusTransition> {
        let from = self.status.state;
        if !can_transition(from, to) {
            return Err(DeviceError::InvalidTransition {
                device_id: self.device_id.clone(),
                from,
                to,
            });
        }

        self.status = DeviceStatus::new(to, message);
        let transition = StatusTransition {
            from,
            to,
            message: self.status.message.clone(),
            at: self.status.changed_at,
        };

        if self.history.len() >= STATUS_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        self.status_tx.send_replace(self.status.clone());

        debug!(
            device_id = %self.device_id,
            %from,
            %to,
            message = %self.status.message,
            "Device state changed"
        );
        Ok(transition)
    }
}

/// Device-kind specific behaviour plugged into a [`DeviceCore`].
///
/// `on_initialize` is the one hook every device must provide; it usually
/// checks that the device is actually present and fails the whole connect
/// sequence if it is not.
pub trait DeviceHooks: Send {
    /// Run after the transport opened, before the device becomes `Ready`.
    async fn on_initialize(
        &mut self,
        transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Recover from `Error`. The device returns to `Ready` only if this
    /// succeeds.
    async fn on_reset(
        &mut self,
        _transport: &mut AnyTransport,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        Ok(())
    }

    /// Observe every status change after it is recorded.
    fn on_status_changed(&mut self, _status: &DeviceStatus) {}
}

/// Transport, lifecycle and hooks shared by every concrete device.
#[derive(Debug)]
pub struct DeviceCore<H> {
    lifecycle: Lifecycle,
    address: EndpointAddress,
    transport: AnyTransport,
    hooks: H,
}

impl<H: DeviceHooks> DeviceCore<H> {
    /// Create a disconnected core. The transport stays closed until
    /// [`connect`](Self::connect).
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        hooks: H,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(device_id),
            address,
            transport,
            hooks,
        }
    }

    /// Device id.
    pub fn device_id(&self) -> &str {
        self.lifecycle.device_id()
    }

    /// Address the transport opens.
    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> DeviceStatus {
        self.lifecycle.status().clone()
    }

    /// Current state.
    pub fn state(&self) -> DeviceState {
        self.lifecycle.state()
    }

    /// Receiver that observes every future status change.
    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.lifecycle.subscribe()
    }

    /// The lifecycle, for history inspection.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Device-specific hooks.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub(crate) fn transport_mut(&mut self) -> &mut AnyTransport {
        &mut self.transport
    }

    /// Whether the underlying transport is open.
    pub fn is_transport_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Fail with `NotReady` unless the device is `Ready`.
    pub fn ensure_ready(&self) -> Result<()> {
        self.lifecycle.ensure_ready()
    }

    /// The single state setter: validate, record, publish, notify hooks.
    pub fn set_status(&mut self, state: DeviceState, message: impl Into<String>) -> Result<()> {
        self.lifecycle.transition(state, message)?;
        self.hooks.on_status_changed(self.lifecycle.status());
        Ok(())
    }

    /// Open the transport and initialise the device.
    ///
    /// Connecting an already `Ready` device is a no-op. If opening or
    /// initialising fails, the transport is closed again and the device
    /// returns to `Disconnected` with the failure as its status message.
    /// Dropping the returned future mid-connect also leaves the device
    /// `Disconnected`; a transport left open by the abandoned attempt is
    /// closed by the next `connect` or `disconnect`.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` from `Busy` or `Error`, otherwise the transport or
    /// initialisation error.
    pub async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self.state() {
            DeviceState::Disconnected => {}
            DeviceState::Ready => return Ok(()),
            state => return Err(DeviceError::not_ready(self.device_id(), state)),
        }

        self.close_stale_transport().await;
        self.set_status(
            DeviceState::Connecting,
            format!("connecting to {}", self.address),
        )?;

        let mut attempt = ConnectAttempt {
            core: self,
            armed: true,
        };
        let result = attempt.open_and_initialize(cancel).await;
        attempt.armed = false;
        let core = &mut *attempt.core;

        match result {
            Ok(()) => {
                core.set_status(DeviceState::Ready, "connected")?;
                info!(device_id = %core.device_id(), address = %core.address, "Device connected");
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = core.transport.close().await {
                    warn!(device_id = %core.device_id(), "Error closing transport after failed connect: {}", close_err);
                }
                core.set_status(DeviceState::Disconnected, format!("connect failed: {}", e))?;
                warn!(device_id = %core.device_id(), "Connect failed: {}", e);
                Err(e)
            }
        }
    }

    /// Close the transport and return to `Disconnected`.
    ///
    /// Idempotent. The device is `Disconnected` afterwards even if closing
    /// reported an error.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state() == DeviceState::Disconnected {
            self.close_stale_transport().await;
            return Ok(());
        }

        let closed = self.transport.close().await;
        self.set_status(DeviceState::Disconnected, "disconnected")?;
        info!(device_id = %self.device_id(), "Device disconnected");
        closed.map_err(Into::into)
    }

    async fn close_stale_transport(&mut self) {
        if !self.transport.is_open() {
            return;
        }
        debug!(device_id = %self.device_id(), "Closing transport left by an abandoned connect");
        if let Err(e) = self.transport.close().await {
            warn!(device_id = %self.device_id(), "Error closing stale transport: {}", e);
        }
    }

    /// Clear `Error` back to `Ready` if the device's reset check passes.
    ///
    /// Resetting a `Ready` device is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` from any other state, or the reset hook's error (the
    /// device stays in `Error`).
    pub async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self.state() {
            DeviceState::Ready => return Ok(()),
            DeviceState::Error => {}
            state => return Err(DeviceError::not_ready(self.device_id(), state)),
        }

        self.hooks.on_reset(&mut self.transport, cancel).await?;
        self.set_status(DeviceState::Ready, "reset")
    }

    /// Enter `Busy` for one operation.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` unless the device is `Ready`.
    pub fn begin(&mut self, operation: &str) -> Result<OperationGuard<'_, H>> {
        self.ensure_ready()?;
        self.set_status(DeviceState::Busy, operation)?;
        Ok(OperationGuard {
            core: self,
            operation: operation.to_string(),
            armed: true,
        })
    }
}

/// In-flight `connect`; reverts `Connecting` to `Disconnected` if dropped
/// before it settles.
struct ConnectAttempt<'a, H: DeviceHooks> {
    core: &'a mut DeviceCore<H>,
    armed: bool,
}

impl<H: DeviceHooks> ConnectAttempt<'_, H> {
    async fn open_and_initialize(&mut self, cancel: &CancellationToken) -> Result<()> {
        let core = &mut *self.core;
        core.transport.open(&core.address, cancel).await?;
        core.hooks.on_initialize(&mut core.transport, cancel).await
    }
}

impl<H: DeviceHooks> Drop for ConnectAttempt<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self
            .core
            .set_status(DeviceState::Disconnected, "connect abandoned")
        {
            warn!(device_id = %self.core.device_id(), "Failed to release connect: {}", e);
        }
    }
}

/// Keeps a device `Busy` for the duration of one operation.
///
/// Finish it with [`finish`](Self::finish). If the guard is dropped instead,
/// for example because the operation future was dropped on cancellation,
/// the device goes back to `Ready`.
#[derive(Debug)]
pub struct OperationGuard<'a, H: DeviceHooks> {
    core: &'a mut DeviceCore<H>,
    operation: String,
    armed: bool,
}

impl<H: DeviceHooks> OperationGuard<'_, H> {
    /// Transport of the device under operation.
    pub fn transport(&mut self) -> &mut AnyTransport {
        &mut self.core.transport
    }

    /// Hooks of the device under operation.
    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }

    /// Id of the device under operation.
    pub fn device_id(&self) -> &str {
        self.core.device_id()
    }

    /// Settle the operation.
    ///
    /// Success and cancellation return the device to `Ready`; any other
    /// error moves it to `Error`. The result is passed through.
    pub fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        self.armed = false;
        let settled = match &result {
            Ok(_) => self
                .core
                .set_status(DeviceState::Ready, format!("{} completed", self.operation)),
            Err(e) if e.is_cancelled() => self
                .core
                .set_status(DeviceState::Ready, format!("{} cancelled", self.operation)),
            Err(e) => self
                .core
                .set_status(DeviceState::Error, format!("{} failed: {}", self.operation, e)),
        };
        if let Err(e) = settled {
            warn!(device_id = %self.core.device_id(), "Failed to settle operation: {}", e);
        }
        result
    }

    /// Leave the device `Busy` after the guard goes away, for sessions that
    /// outlive one call (camera streaming).
    pub fn keep_busy(mut self) {
        self.armed = false;
    }
}

impl<H: DeviceHooks> Drop for OperationGuard<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let message = format!("{} abandoned", self.operation);
        if let Err(e) = self.core.set_status(DeviceState::Ready, message) {
            warn!(device_id = %self.core.device_id(), "Failed to release operation: {}", e);
        }
    }
}
