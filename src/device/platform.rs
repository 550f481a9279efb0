//! The host's wireless peripheral API, as seen by the session controller.
//!
//! [`btle`](crate::device::btle) implements these traits on top of btleplug. Tests use the
//! fake in [`fake`](crate::device::fake).

use std::fmt::Debug;
use std::time::Duration;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::device::types::{DeviceId, DiscoveredDevice};
use crate::error::DeviceError;

/// Raw payloads pushed by the subscribed channel.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Resolves once, when the link drops without being asked to.
pub type LinkLost = BoxFuture<'static, ()>;

#[async_trait]
pub trait Platform: Send + Sync + 'static {
    type Link: Link;

    /// Scans for any nearby peripheral, regardless of the services it advertises.
    async fn discover(&self, scan_duration: Duration) -> Result<Vec<DiscoveredDevice>, DeviceError>;

    async fn open_link(&self, device: &DeviceId) -> Result<Self::Link, DeviceError>;
}

#[async_trait]
pub trait Link: Send + Sync + 'static {
    type Channel: Debug + Send + Sync + 'static;

    async fn resolve_channel(&self, service: Uuid, characteristic: Uuid) -> Result<Self::Channel, DeviceError>;

    async fn enable_notifications(&self, channel: &Self::Channel) -> Result<NotificationStream, DeviceError>;

    async fn disable_notifications(&self, channel: &Self::Channel) -> Result<(), DeviceError>;

    async fn link_lost(&self) -> Result<LinkLost, DeviceError>;

    async fn is_connected(&self) -> Result<bool, DeviceError>;

    async fn close(&self) -> Result<(), DeviceError>;
}
