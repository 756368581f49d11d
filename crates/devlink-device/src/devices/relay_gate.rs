//! Barrier or turnstile driven by a relay board over a byte transport.
//!
//! Commands are plain byte frames taken from the profile as hex strings:
//!
//! | Option          | Default        |
//! |-----------------|----------------|
//! | `open_command`  | `A0 01 01 A2`  |
//! | `close_command` | `A0 01 00 A1`  |
//! | `init_command`  | none           |
//!
//! The defaults switch channel 1 of the common LCUS-type USB/serial relay
//! boards.

use std::time::Duration;

use devlink_core::{Capability, DeviceInfo, DeviceProfile, DeviceStatus, EndpointAddress};
use devlink_transport::{AnyTransport, CancellationToken, Transport};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Device, Gate, describe};

const CAPABILITIES: &[Capability] = &[Capability::Gate];

const DEFAULT_OPEN_COMMAND: [u8; 4] = [0xA0, 0x01, 0x01, 0xA2];
const DEFAULT_CLOSE_COMMAND: [u8; 4] = [0xA0, 0x01, 0x00, 0xA1];

/// Parse `"A0 01 01 A2"`, `"A0:01:01:A2"` or `"A00101A2"` into bytes.
///
/// # Errors
///
/// Returns an invalid profile error on odd length or non-hex digits.
pub fn parse_hex(input: &str) -> devlink_core::Result<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ':' | '-'))
        .collect();

    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(devlink_core::Error::invalid_profile(format!(
            "command '{}' must be a non-empty sequence of hex byte pairs",
            input
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    devlink_core::Error::invalid_profile(format!(
                        "command '{}' contains non-hex digits",
                        input
                    ))
                })
        })
        .collect()
}

fn command_option(
    profile: &DeviceProfile,
    key: &str,
    default: Option<&[u8]>,
) -> devlink_core::Result<Option<Vec<u8>>> {
    match profile.option(key) {
        Some(hex) => parse_hex(hex).map(Some),
        None => Ok(default.map(<[u8]>::to_vec)),
    }
}

#[derive(Debug)]
struct RelayHooks {
    profile: DeviceProfile,
    open_command: Vec<u8>,
    close_command: Vec<u8>,
    init_command: Option<Vec<u8>>,
}

impl DeviceHooks for RelayHooks {
    async fn on_initialize(
        &mut self,
        transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(command) = &self.init_command {
            transport.send(command, cancel).await?;
            debug!(bytes = command.len(), "Relay board initialised");
        }
        Ok(())
    }
}

/// Relay-driven gate.
#[derive(Debug)]
pub struct RelayGate {
    core: DeviceCore<RelayHooks>,
    open: bool,
}

impl RelayGate {
    /// Create a disconnected gate.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if a command option is not valid hex.
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        profile: DeviceProfile,
    ) -> Result<Self> {
        let hooks = RelayHooks {
            open_command: command_option(&profile, "open_command", Some(&DEFAULT_OPEN_COMMAND))?
                .unwrap_or_default(),
            close_command: command_option(&profile, "close_command", Some(&DEFAULT_CLOSE_COMMAND))?
                .unwrap_or_default(),
            init_command: command_option(&profile, "init_command", None)?,
            profile,
        };
        Ok(Self {
            core: DeviceCore::new(device_id, address, transport, hooks),
            open: false,
        })
    }

    async fn actuate(
        &mut self,
        operation: &str,
        opened: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut op = self.core.begin(operation)?;
        let command = if opened {
            op.hooks().open_command.clone()
        } else {
            op.hooks().close_command.clone()
        };
        let sent = op
            .transport()
            .send(&command, cancel)
            .await
            .map(drop)
            .map_err(DeviceError::from);
        op.finish(sent)?;

        self.open = opened;
        info!(device_id = %self.core.device_id(), open = opened, "Gate actuated");
        Ok(())
    }
}

impl Device for RelayGate {
    fn device_id(&self) -> &str {
        self.core.device_id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn status(&self) -> DeviceStatus {
        self.core.status()
    }

    fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.core.subscribe_status()
    }

    fn info(&self) -> DeviceInfo {
        describe(
            self.core.device_id(),
            Capability::Gate,
            &self.core.hooks().profile,
        )
    }

    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.connect(cancel).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.core.disconnect().await
    }

    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.reset(cancel).await
    }
}

impl Gate for RelayGate {
    async fn open(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.actuate("open", true, cancel).await
    }

    async fn close(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.actuate("close", false, cancel).await
    }

    /// Open, hold, then close.
    ///
    /// The gate is closed even when `cancel` fires during the hold; the
    /// close command runs under its own token.
    async fn pulse(&mut self, hold: Duration, cancel: &CancellationToken) -> Result<()> {
        self.actuate("open", true, cancel).await?;

        let held = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DeviceError::Cancelled),
            _ = tokio::time::sleep(hold) => Ok(()),
        };

        let closed = self.actuate("close", false, &CancellationToken::new()).await;
        closed.and(held)
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
