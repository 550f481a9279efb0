//! In-memory [`Platform`] for tests, with failure injection and hooks to push notifications
//! and drop the link from the "peripheral" side.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use futures::{future, FutureExt, StreamExt};
use uuid::Uuid;

use crate::device::platform::{Link, LinkLost, NotificationStream, Platform};
use crate::device::types::{DeviceId, DiscoveredDevice};
use crate::error::DeviceError;

/// Step at which the fake refuses to cooperate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Discover,
    OpenLink,
    ResolveChannel,
    EnableNotifications,
}

#[derive(Default)]
struct FakeState {
    devices: Vec<DiscoveredDevice>,
    failure: Option<Failure>,
    drop_after_subscribe: bool,
    links_opened: usize,
    links_closed: usize,
    active_subscriptions: usize,
    connected: bool,
    notifications: Option<mpsc::UnboundedSender<Vec<u8>>>,
    link_lost: Option<oneshot::Sender<()>>,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeState>>,
}

impl FakePlatform {
    pub fn with_device(name: &str) -> Self {
        let platform = FakePlatform::default();
        platform.state().devices.push(DiscoveredDevice {
            id: DeviceId(format!("fake/{}", name)),
            name: Some(name.to_string()),
            address: "00:11:22:33:44:55".to_string(),
            rssi: Some(-50),
        });
        platform
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn device_id(&self) -> DeviceId {
        self.state().devices[0].id.clone()
    }

    pub fn fail_at(&self, failure: Failure) {
        self.state().failure = Some(failure);
    }

    pub fn clear_failure(&self) {
        self.state().failure = None;
    }

    /// The peripheral goes away right after notifications are enabled, before the
    /// link-loss watch is in place.
    pub fn drop_after_subscribe(&self) {
        self.state().drop_after_subscribe = true;
    }

    fn check(&self, step: Failure) -> Result<(), DeviceError> {
        if self.state().failure == Some(step) {
            return Err(DeviceError::Btle { source: btleplug::Error::Other(format!("{:?} refused", step).into()) });
        }
        Ok(())
    }

    pub fn links_opened(&self) -> usize {
        self.state().links_opened
    }

    pub fn links_closed(&self) -> usize {
        self.state().links_closed
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state().active_subscriptions
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Sends a payload as the peripheral would. Returns false if nobody is subscribed.
    pub fn notify(&self, payload: &str) -> bool {
        match &self.state().notifications {
            Some(sender) => sender.unbounded_send(payload.as_bytes().to_vec()).is_ok(),
            None => false,
        }
    }

    /// The link dies and the notification stream ends, but no disconnect event is delivered.
    pub fn end_notifications_silently(&self) {
        let mut state = self.state();
        state.connected = false;
        state.active_subscriptions = 0;
        state.notifications = None;
    }

    /// Simulates the peripheral going out of range.
    pub fn drop_link(&self) {
        let mut state = self.state();
        state.connected = false;
        state.active_subscriptions = 0;
        state.notifications = None;
        if let Some(sender) = state.link_lost.take() {
            let _ = sender.send(());
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    type Link = FakeLink;

    async fn discover(&self, _scan_duration: Duration) -> Result<Vec<DiscoveredDevice>, DeviceError> {
        self.check(Failure::Discover)?;
        Ok(self.state().devices.clone())
    }

    async fn open_link(&self, device: &DeviceId) -> Result<FakeLink, DeviceError> {
        self.check(Failure::OpenLink)?;
        let mut state = self.state();
        if !state.devices.iter().any(|known| &known.id == device) {
            return Err(DeviceError::UnknownDevice(device.to_string()));
        }
        state.links_opened += 1;
        state.connected = true;
        Ok(FakeLink { platform: self.clone() })
    }
}

pub struct FakeLink {
    platform: FakePlatform,
}

#[async_trait]
impl Link for FakeLink {
    type Channel = Uuid;

    async fn resolve_channel(&self, service: Uuid, characteristic: Uuid) -> Result<Uuid, DeviceError> {
        if self.platform.check(Failure::ResolveChannel).is_err() {
            return Err(DeviceError::MissingService(service));
        }
        Ok(characteristic)
    }

    async fn enable_notifications(&self, _channel: &Uuid) -> Result<NotificationStream, DeviceError> {
        self.platform.check(Failure::EnableNotifications)?;
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.platform.state();
        state.notifications = Some(sender);
        state.active_subscriptions += 1;
        if state.drop_after_subscribe {
            state.connected = false;
            state.active_subscriptions = 0;
            state.notifications = None;
        }
        Ok(receiver.boxed())
    }

    async fn disable_notifications(&self, _channel: &Uuid) -> Result<(), DeviceError> {
        let mut state = self.platform.state();
        state.notifications = None;
        state.active_subscriptions = state.active_subscriptions.saturating_sub(1);
        Ok(())
    }

    async fn link_lost(&self) -> Result<LinkLost, DeviceError> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.platform.state();
        if !state.connected {
            return Ok(future::ready(()).boxed());
        }
        state.link_lost = Some(sender);
        Ok(async move {
            // a dropped sender means the fake was torn down, which also counts as lost
            let _ = receiver.await;
        }.boxed())
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.platform.is_connected())
    }

    async fn close(&self) -> Result<(), DeviceError> {
        let mut state = self.platform.state();
        state.connected = false;
        state.active_subscriptions = 0;
        state.notifications = None;
        state.link_lost = None;
        state.links_closed += 1;
        Ok(())
    }
}
