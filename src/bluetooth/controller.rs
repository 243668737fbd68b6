/// Connection lifecycle driver with automatic reconnection
use std::time::Duration;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::bluetooth::decoder::DecodeMode;
use crate::bluetooth::link::{
    Clock, ConnectionManager, LinkEvent, LinkState, BATTERY_CHARACTERISTIC_UUID,
    BATTERY_SERVICE_UUID,
};
use crate::error::{ProtocolError, SessionError};
use crate::models::{DeviceIdentity, Sample, ServiceInfo};
use crate::sink::SinkPublisher;
use crate::units::{adc_to_voltage, voltage_to_percentage};
use crate::utils::{format_datetime, unix_seconds};

/// Pause between the end of one session and the next connection attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

enum Flow {
    Continue,
    Stop,
}

/// Find `characteristic` inside `service` among resolved services
pub fn find_characteristic(
    services: &[ServiceInfo],
    service: Uuid,
    characteristic: Uuid,
) -> Result<(Uuid, Uuid), ProtocolError> {
    let found = services
        .iter()
        .find(|s| s.uuid == service)
        .ok_or(ProtocolError::ServiceNotFound(service))?;

    found
        .characteristics
        .iter()
        .find(|&&c| c == characteristic)
        .map(|&c| (found.uuid, c))
        .ok_or(ProtocolError::CharacteristicNotFound {
            service,
            characteristic,
        })
}

/// Owns one peripheral link and everything fed by it
///
/// The aggregator lives as long as the controller, not the session, so
/// samples from consecutive sessions share aggregation windows.
pub struct ConnectionController<M, C> {
    device: DeviceIdentity,
    manager: M,
    clock: C,
    mode: DecodeMode,
    aggregator: Aggregator,
    publisher: SinkPublisher,
    state: LinkState,
}

impl<M: ConnectionManager, C: Clock> ConnectionController<M, C> {
    pub fn new(
        device: DeviceIdentity,
        manager: M,
        clock: C,
        mode: DecodeMode,
        publisher: SinkPublisher,
    ) -> Self {
        ConnectionController {
            device,
            manager,
            clock,
            mode,
            aggregator: Aggregator::new(),
            publisher,
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Samples waiting in the current aggregation window
    pub fn pending_samples(&self) -> usize {
        self.aggregator.pending()
    }

    /// Reconnect forever; returns only if the surrounding task is cancelled
    pub async fn run(&mut self) {
        loop {
            // errors are logged by cycle, the next attempt starts regardless
            let _ = self.cycle().await;
        }
    }

    /// One session followed by the reconnect delay
    pub async fn cycle(&mut self) -> Result<(), SessionError> {
        let result = self.run_session().await;
        if let Err(e) = &result {
            error!("[{}] Session aborted: {}", self.device, e);
        }
        self.clock.sleep(RECONNECT_DELAY).await;
        result
    }

    /// Connect and process events until the link goes down
    pub async fn run_session(&mut self) -> Result<(), SessionError> {
        self.state = self.state.begin().unwrap_or_else(|e| {
            warn!("[{}] Forcing new session: {}", self.device, e);
            LinkState::Connecting
        });
        info!(
            "[{}] Connecting at {}",
            self.device,
            format_datetime(&OffsetDateTime::now_utc())
        );

        self.manager.connect(&self.device).await;

        let result = loop {
            let Some(event) = self.manager.next_event().await else {
                warn!("[{}] Event stream ended in state {:?}", self.device, self.state);
                break Ok(());
            };
            match self.handle_event(event).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.manager.stop().await;
        self.state = LinkState::Disconnected;
        result
    }

    async fn handle_event(&mut self, event: LinkEvent) -> Result<Flow, SessionError> {
        let next = match self.state.on_event(&event) {
            Ok(next) => next,
            Err(e) => {
                warn!("[{}] Ignoring event: {}", self.device, e);
                return Ok(Flow::Continue);
            }
        };
        self.state = next;

        match event {
            LinkEvent::Connected => {
                info!("[{}] Connected", self.device);
            }
            LinkEvent::ConnectFailed(reason) => {
                error!("[{}] Connection failed: {}", self.device, reason);
                return Ok(Flow::Stop);
            }
            LinkEvent::ServicesResolved(services) => {
                let (service, characteristic) = find_characteristic(
                    &services,
                    BATTERY_SERVICE_UUID,
                    BATTERY_CHARACTERISTIC_UUID,
                )?;
                info!(
                    "[{}] Services resolved, enabling notifications on {}",
                    self.device, characteristic
                );
                self.manager
                    .enable_notifications(service, characteristic)
                    .await;
            }
            LinkEvent::NotifyEnabled(characteristic) => {
                info!(
                    "[{}] Notifications enabled on {}",
                    self.device, characteristic
                );
            }
            LinkEvent::NotifyFailed {
                characteristic,
                reason,
            } => {
                error!(
                    "[{}] Failed to enable notifications on {}: {}",
                    self.device, characteristic, reason
                );
                return Ok(Flow::Stop);
            }
            LinkEvent::ValueUpdated {
                characteristic,
                value,
            } => {
                if characteristic == BATTERY_CHARACTERISTIC_UUID {
                    self.on_value(&value);
                } else {
                    debug!(
                        "[{}] Ignoring notification from {}",
                        self.device, characteristic
                    );
                }
            }
            LinkEvent::Disconnected => {
                info!("[{}] Disconnected", self.device);
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn on_value(&mut self, value: &[u8]) {
        let sample = match self.mode.decode(value) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("[{}] Dropping notification: {}", self.device, e);
                return;
            }
        };

        let voltage = adc_to_voltage(sample.adc());
        let percent = voltage_to_percentage(voltage);
        let now = unix_seconds(&OffsetDateTime::now_utc());

        match sample {
            Sample::Motion(s) => {
                info!(
                    "{:.1} ADC: {} BATT: {:.3} {:.1}% [{}, {}, {}]",
                    now, s.adc, voltage, percent, s.x, s.y, s.z
                );
                if let Some(record) = self.aggregator.add(&s) {
                    info!(
                        "[{}] {} samples: avg ADC {:.1}, {:.3} V, {:.1}%",
                        self.device,
                        record.sample_count,
                        record.avg_adc,
                        record.battery_voltage,
                        record.battery_percent
                    );
                    if let Err(e) = self.publisher.publish(&record) {
                        error!("[{}] Failed to publish record: {}", self.device, e);
                    }
                }
            }
            Sample::Battery(b) => {
                info!("{:.1} ADC: {} BATT: {:.3} {:.1}%", now, b.adc, voltage, percent);
            }
        }
    }
}
