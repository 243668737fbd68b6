/// Connection lifecycle: states, events and the collaborators that drive them
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{DeviceIdentity, ServiceInfo};

/// Service exposing the battery telemetry characteristic
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x00453ed2_f5e0_11ea_b224_00155df38b93);
/// Characteristic pushing battery and motion samples
pub const BATTERY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00453ed2_f5e0_11ea_b224_00155df38b92);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    ServicesResolving,
    NotifyEnabling,
    Streaming,
    Disconnected,
}

/// Something the connection manager reports about the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    ConnectFailed(String),
    ServicesResolved(Vec<ServiceInfo>),
    NotifyEnabled(Uuid),
    NotifyFailed { characteristic: Uuid, reason: String },
    ValueUpdated { characteristic: Uuid, value: Vec<u8> },
    Disconnected,
}

impl LinkEvent {
    fn name(&self) -> &'static str {
        match self {
            LinkEvent::Connected => "connected",
            LinkEvent::ConnectFailed(_) => "connect failed",
            LinkEvent::ServicesResolved(_) => "services resolved",
            LinkEvent::NotifyEnabled(_) => "notify enabled",
            LinkEvent::NotifyFailed { .. } => "notify failed",
            LinkEvent::ValueUpdated { .. } => "value updated",
            LinkEvent::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: LinkState,
    pub event: &'static str,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected '{}' event in state {:?}", self.event, self.from)
    }
}

impl LinkState {
    /// Start a new connection attempt
    pub fn begin(self) -> Result<LinkState, IllegalTransition> {
        match self {
            LinkState::Idle | LinkState::Disconnected => Ok(LinkState::Connecting),
            from => Err(IllegalTransition {
                from,
                event: "connect",
            }),
        }
    }

    /// State after `event`
    ///
    /// Services are located by the caller after `ServicesResolved`; a lookup
    /// failure ends the session outside of this table.
    pub fn on_event(self, event: &LinkEvent) -> Result<LinkState, IllegalTransition> {
        use LinkState::*;

        let next = match (self, event) {
            (Connecting, LinkEvent::Connected) => ServicesResolving,
            (Connecting, LinkEvent::ConnectFailed(_)) => Disconnected,
            (ServicesResolving, LinkEvent::ServicesResolved(_)) => NotifyEnabling,
            (NotifyEnabling, LinkEvent::NotifyEnabled(_)) => Streaming,
            (NotifyEnabling, LinkEvent::NotifyFailed { .. }) => Disconnected,
            (Streaming, LinkEvent::ValueUpdated { .. }) => Streaming,
            (ServicesResolving | NotifyEnabling | Streaming, LinkEvent::Disconnected) => {
                Disconnected
            }
            (from, event) => {
                return Err(IllegalTransition {
                    from,
                    event: event.name(),
                })
            }
        };
        Ok(next)
    }
}

/// The wireless stack, seen as a source of link events
///
/// Outcomes of `connect` and `enable_notifications` are reported through
/// `next_event`, as are resolved services and notification values. The
/// manager resolves services on its own once connected.
#[async_trait]
pub trait ConnectionManager: Send {
    async fn connect(&mut self, device: &DeviceIdentity);

    async fn enable_notifications(&mut self, service: Uuid, characteristic: Uuid);

    /// Next event in arrival order, `None` once the manager is stopped
    async fn next_event(&mut self) -> Option<LinkEvent>;

    /// Tear down the link (if still up) and stop delivering events
    async fn stop(&mut self);
}

/// Source of delays between reconnect attempts
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
