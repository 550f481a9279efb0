use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{future, FutureExt, StreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::time::sleep;
use uuid::Uuid;

use crate::device::platform::{Link, LinkLost, NotificationStream, Platform};
use crate::device::types::{DeviceId, DiscoveredDevice};
use crate::error::DeviceError;

fn device_id(peripheral: &Peripheral) -> DeviceId {
    DeviceId(format!("{:?}", peripheral.id()))
}

/// btleplug backed [`Platform`]. Remembers the peripherals of the latest scan so that the
/// user's choice can be resolved back into a handle.
pub struct BtlePlatform {
    manager: Manager,
    known: Mutex<HashMap<DeviceId, (Adapter, Peripheral)>>,
}

impl BtlePlatform {
    pub async fn new() -> Result<Self, DeviceError> {
        Ok(BtlePlatform {
            manager: Manager::new().await?,
            known: Mutex::new(HashMap::new()),
        })
    }

    async fn start_scanning(&self) -> Result<Vec<Adapter>, DeviceError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(DeviceError::NoAdapter);
        }

        for adapter in &adapters {
            info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
            // no service filter: the peripheral does not necessarily advertise the data service
            adapter.start_scan(ScanFilter::default()).await?;
        }

        Ok(adapters)
    }
}

async fn collect_peripherals(adapter: &Adapter, found: &mut IndexMap<DeviceId, (DiscoveredDevice, Adapter, Peripheral)>) {
    if let Err(err) = adapter.stop_scan().await {
        warn!("Failed to stop scanning: {}", err);
    }

    let peripherals = match adapter.peripherals().await {
        Ok(v) => v,
        Err(err) => {
            warn!("Failed to query BLE adapter for peripherals: {}", err);
            return;
        },
    };

    for peripheral in peripherals {
        let properties = match peripheral.properties().await {
            Ok(Some(properties)) => properties,
            Ok(None) => {
                debug!("Peripheral has no properties");
                continue;
            },
            Err(err) => {
                warn!("Could not query peripheral for properties: {:?}", err);
                continue;
            },
        };

        let id = device_id(&peripheral);
        let device = DiscoveredDevice {
            id: id.clone(),
            name: properties.local_name,
            address: properties.address.to_string(),
            rssi: properties.rssi,
        };
        debug!("Discovered {}", device);
        found.insert(id, (device, adapter.clone(), peripheral));
    }
}

#[async_trait]
impl Platform for BtlePlatform {
    type Link = BtleLink;

    async fn discover(&self, scan_duration: Duration) -> Result<Vec<DiscoveredDevice>, DeviceError> {
        let adapters = self.start_scanning().await?;
        sleep(scan_duration).await;

        let mut found = IndexMap::new();
        for adapter in &adapters {
            collect_peripherals(adapter, &mut found).await;
        }
        info!("Discovered {} peripheral(s)", found.len());

        let mut known = self.known.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        known.clear();

        Ok(found
            .into_values()
            .map(|(device, adapter, peripheral)| {
                known.insert(device.id.clone(), (adapter, peripheral));
                device
            })
            .collect())
    }

    async fn open_link(&self, device: &DeviceId) -> Result<BtleLink, DeviceError> {
        let (adapter, peripheral) = self.known
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(device)
            .cloned()
            .ok_or_else(|| DeviceError::UnknownDevice(device.to_string()))?;

        info!("Connecting to peripheral {}...", device);
        peripheral.connect().await?;

        Ok(BtleLink { adapter, peripheral })
    }
}

pub struct BtleLink {
    adapter: Adapter,
    peripheral: Peripheral,
}

#[async_trait]
impl Link for BtleLink {
    type Channel = Characteristic;

    async fn resolve_channel(&self, service_uuid: Uuid, characteristic_uuid: Uuid) -> Result<Characteristic, DeviceError> {
        info!("Connected; Discovering services...");
        self.peripheral.discover_services().await?;

        let services = self.peripheral.services();
        let service = services
            .iter()
            .find(|service| service.uuid == service_uuid)
            .ok_or(DeviceError::MissingService(service_uuid))?;

        service.characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == characteristic_uuid)
            .cloned()
            .ok_or(DeviceError::MissingCharacteristic(characteristic_uuid))
    }

    async fn enable_notifications(&self, channel: &Characteristic) -> Result<NotificationStream, DeviceError> {
        info!("Subscribing to characteristic {:?} {:?}", channel.service_uuid, channel.uuid);
        self.peripheral.subscribe(channel).await?;

        // the stream carries every subscribed characteristic of the peripheral
        let uuid = channel.uuid;
        let stream = self.peripheral.notifications().await?;
        Ok(stream
            .filter_map(move |notification| future::ready((notification.uuid == uuid).then_some(notification.value)))
            .boxed())
    }

    async fn disable_notifications(&self, channel: &Characteristic) -> Result<(), DeviceError> {
        self.peripheral.unsubscribe(channel).await?;
        Ok(())
    }

    async fn link_lost(&self) -> Result<LinkLost, DeviceError> {
        let mut events = self.adapter.events().await?;
        let id = self.peripheral.id();

        // a drop before the event stream was taken would never be reported
        if !self.peripheral.is_connected().await? {
            warn!("Peripheral disconnected while subscribing");
            return Ok(future::ready(()).boxed());
        }

        Ok(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected) = event {
                    if disconnected == id {
                        return;
                    }
                }
            }
            warn!("Adapter event stream ended");
        }.boxed())
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn close(&self) -> Result<(), DeviceError> {
        info!("Disconnecting from peripheral...");
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
