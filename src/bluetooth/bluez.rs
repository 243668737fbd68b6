/// BlueZ-backed connection manager
use std::time::Duration;

use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, AdapterEvent, Address, Device, DeviceEvent, DeviceProperty, Session};
use futures_util::{pin_mut, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use crate::bluetooth::link::{ConnectionManager, LinkEvent};
use crate::models::{DeviceIdentity, ServiceInfo};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30); // Give up on a pending connect
const DISCOVERY_WINDOW: Duration = Duration::from_secs(10); // Longest wait for an unknown device

/// Connection manager for a single peripheral on one local adapter
///
/// Device property changes and notification values are forwarded from
/// background tasks into one channel, so the controller sees them in
/// arrival order.
pub struct BluezManager {
    _session: Session,
    adapter: Adapter,
    device: Option<Device>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    tasks: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl BluezManager {
    /// Open a BlueZ session and power on the named adapter
    pub async fn new(adapter_name: &str) -> bluer::Result<Self> {
        // Initialize Bluetooth session
        let session = match Session::new().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create Bluetooth session: {}", e);
                return Err(e);
            }
        };

        let adapter = match session.adapter(adapter_name) {
            Ok(adapter) => adapter,
            Err(e) => {
                error!("Failed to get Bluetooth adapter {}: {}", adapter_name, e);
                return Err(e);
            }
        };

        // Ensure Bluetooth adapter is powered on
        if let Err(e) = adapter.set_powered(true).await {
            error!("Failed to power on adapter {}: {}", adapter_name, e);
            return Err(e);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(BluezManager {
            _session: session,
            adapter,
            device: None,
            events_tx,
            events_rx,
            tasks: Vec::new(),
            stopped: false,
        })
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Drop everything left over from the previous session
    fn reset(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events_tx = events_tx;
        self.events_rx = events_rx;
        self.device = None;
        self.stopped = false;
    }

    /// Run LE discovery until BlueZ knows `address`, bounded by DISCOVERY_WINDOW
    async fn ensure_known(&self, address: Address) -> bluer::Result<()> {
        if self.adapter.device_addresses().await?.contains(&address) {
            return Ok(());
        }

        info!(
            "[{}] Unknown to adapter {}, discovering",
            address,
            self.adapter.name()
        );

        // Configure discovery filter for Low Energy devices only
        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: false,
            ..Default::default()
        };

        // Apply the discovery filter (warn if it fails, but continue)
        if let Err(e) = self.adapter.set_discovery_filter(filter).await {
            warn!("Failed to set discovery filter: {}", e);
        }

        let discovery = self.adapter.discover_devices().await?;
        pin_mut!(discovery);

        let found = timeout(DISCOVERY_WINDOW, async {
            while let Some(event) = discovery.next().await {
                debug!("Discovery event: {:?}", event);
                if let AdapterEvent::DeviceAdded(added) = event {
                    if added == address {
                        return true;
                    }
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        if !found {
            warn!("[{}] Not seen during discovery", address);
        }
        Ok(())
    }

    async fn try_connect(&self, address: Address) -> Result<Device, String> {
        self.ensure_known(address).await.map_err(|e| e.to_string())?;
        let device = self.adapter.device(address).map_err(|e| e.to_string())?;

        match timeout(CONNECT_TIMEOUT, device.connect()).await {
            Ok(Ok(())) => Ok(device),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "no response within {}s",
                CONNECT_TIMEOUT.as_secs()
            )),
        }
    }
}

#[async_trait]
impl ConnectionManager for BluezManager {
    async fn connect(&mut self, identity: &DeviceIdentity) {
        self.reset();

        match self.try_connect(identity.address()).await {
            Ok(device) => {
                self.emit(LinkEvent::Connected);

                let tx = self.events_tx.clone();
                let watched = device.clone();
                self.tasks.push(tokio::spawn(async move {
                    if let Err(e) = watch_link(watched, tx.clone()).await {
                        error!("Link watcher failed: {}", e);
                        let _ = tx.send(LinkEvent::Disconnected);
                    }
                }));
                self.device = Some(device);
            }
            Err(reason) => self.emit(LinkEvent::ConnectFailed(reason)),
        }
    }

    async fn enable_notifications(&mut self, service: Uuid, characteristic: Uuid) {
        let Some(device) = self.device.clone() else {
            self.emit(LinkEvent::NotifyFailed {
                characteristic,
                reason: "not connected".to_string(),
            });
            return;
        };

        let found = match find_characteristic(&device, service, characteristic).await {
            Ok(found) => found,
            Err(reason) => {
                self.emit(LinkEvent::NotifyFailed {
                    characteristic,
                    reason,
                });
                return;
            }
        };

        // The subscription borrows the characteristic, so both live in the task
        let tx = self.events_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let values = match found.notify().await {
                Ok(values) => values,
                Err(e) => {
                    let _ = tx.send(LinkEvent::NotifyFailed {
                        characteristic,
                        reason: e.to_string(),
                    });
                    return;
                }
            };
            let _ = tx.send(LinkEvent::NotifyEnabled(characteristic));

            pin_mut!(values);
            while let Some(value) = values.next().await {
                let event = LinkEvent::ValueUpdated {
                    characteristic,
                    value,
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            debug!("Notification stream for {} ended", characteristic);
        }));
    }

    async fn next_event(&mut self) -> Option<LinkEvent> {
        if self.stopped {
            return None;
        }
        self.events_rx.recv().await
    }

    async fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Some(device) = self.device.take() {
            match device.is_connected().await {
                Ok(true) => {
                    if let Err(e) = device.disconnect().await {
                        warn!("[{}] Failed to disconnect: {}", device.address(), e);
                    }
                }
                Ok(false) => {}
                Err(e) => debug!("[{}] Connection state unknown: {}", device.address(), e),
            }
        }

        self.stopped = true;
    }
}

/// Link condition observed once the property subscription is in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkSnapshot {
    /// The link dropped before the subscription could see it go
    Dropped,
    Resolved,
    Resolving,
}

fn snapshot(connected: bool, services_resolved: bool) -> LinkSnapshot {
    match (connected, services_resolved) {
        (false, _) => LinkSnapshot::Dropped,
        (true, true) => LinkSnapshot::Resolved,
        (true, false) => LinkSnapshot::Resolving,
    }
}

/// Report service resolution and the end of the link
///
/// The watcher starts after `connect` returns, so state changes before the
/// subscription are read back explicitly rather than waited for.
async fn watch_link(device: Device, tx: mpsc::UnboundedSender<LinkEvent>) -> bluer::Result<()> {
    let events = device.events().await?;
    pin_mut!(events);

    let connected = device.is_connected().await?;
    let services_resolved = connected && device.is_services_resolved().await?;

    let mut resolved = false;
    match snapshot(connected, services_resolved) {
        LinkSnapshot::Dropped => {
            debug!("[{}] Link dropped before watcher started", device.address());
            let _ = tx.send(LinkEvent::Disconnected);
            return Ok(());
        }
        LinkSnapshot::Resolved => {
            resolved = true;
            let _ = tx.send(LinkEvent::ServicesResolved(list_services(&device).await?));
        }
        LinkSnapshot::Resolving => {}
    }

    while let Some(event) = events.next().await {
        match event {
            DeviceEvent::PropertyChanged(DeviceProperty::ServicesResolved(true)) if !resolved => {
                resolved = true;
                let _ = tx.send(LinkEvent::ServicesResolved(list_services(&device).await?));
            }
            DeviceEvent::PropertyChanged(DeviceProperty::Connected(false)) => break,
            _ => {}
        }
    }

    let _ = tx.send(LinkEvent::Disconnected);
    Ok(())
}

async fn list_services(device: &Device) -> bluer::Result<Vec<ServiceInfo>> {
    let mut services = Vec::new();
    for service in device.services().await? {
        let mut characteristics = Vec::new();
        for characteristic in service.characteristics().await? {
            characteristics.push(characteristic.uuid().await?);
        }
        services.push(ServiceInfo {
            uuid: service.uuid().await?,
            characteristics,
        });
    }
    Ok(services)
}

/// Look up `characteristic` in `service` on a connected device
///
/// Subscribing lets BlueZ pick notifications or indications depending on
/// what the characteristic supports; the battery characteristic indicates.
async fn find_characteristic(
    device: &Device,
    service: Uuid,
    characteristic: Uuid,
) -> Result<Characteristic, String> {
    let services = device.services().await.map_err(|e| e.to_string())?;
    for s in services {
        if s.uuid().await.map_err(|e| e.to_string())? != service {
            continue;
        }
        for c in s.characteristics().await.map_err(|e| e.to_string())? {
            if c.uuid().await.map_err(|e| e.to_string())? == characteristic {
                return Ok(c);
            }
        }
    }
    Err(format!(
        "characteristic {} not found in service {}",
        characteristic, service
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_before_subscription_is_reported() {
        assert_eq!(snapshot(false, false), LinkSnapshot::Dropped);
        // BlueZ can still report stale resolution for a dropped link
        assert_eq!(snapshot(false, true), LinkSnapshot::Dropped);
    }

    #[test]
    fn live_link_waits_for_or_reports_services() {
        assert_eq!(snapshot(true, true), LinkSnapshot::Resolved);
        assert_eq!(snapshot(true, false), LinkSnapshot::Resolving);
    }
}
