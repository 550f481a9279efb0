use log::{debug, info, warn};

use crate::config::types::Config;
use crate::device::display::{ConnectionStatus, DisplayState};
use crate::device::parser::parse_notification;
use crate::device::platform::{Link, LinkLost, NotificationStream, Platform};
use crate::device::types::{DeviceId, DiscoveredDevice, Field};
use crate::error::ConnectError;

/// An established connection together with its active subscription.
struct Session<L: Link> {
    device: DeviceId,
    link: L,
    channel: L::Channel,
}

/// What the event loop has to watch while a session is up. Dropping it drops the subscription.
pub struct SessionFeeds {
    pub notifications: NotificationStream,
    pub link_lost: LinkLost,
}

/// Owns the one session this application may have and the values it displays.
pub struct SessionController<P: Platform> {
    platform: P,
    config: Config,
    session: Option<Session<P::Link>>,
    attempt_in_progress: bool,
    display: DisplayState,
}

impl<P: Platform> SessionController<P> {
    pub fn new(platform: P, config: Config) -> Self {
        SessionController {
            platform,
            config,
            session: None,
            attempt_in_progress: false,
            display: DisplayState::default(),
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn connected_device(&self) -> Option<&DeviceId> {
        self.session.as_ref().map(|session| &session.device)
    }

    fn guard_attempt(&self) -> Result<(), ConnectError> {
        if self.session.is_some() {
            return Err(ConnectError::SessionActive);
        }
        if self.attempt_in_progress {
            return Err(ConnectError::AttemptInProgress);
        }
        Ok(())
    }

    /// Starts a connect attempt by scanning for candidates to offer to the user.
    pub async fn begin_connect(&mut self) -> Result<Vec<DiscoveredDevice>, ConnectError> {
        self.guard_attempt()?;
        self.attempt_in_progress = true;
        self.display.status = ConnectionStatus::Connecting;

        let result = match self.platform.discover(self.config.device.scan_duration()).await {
            Ok(devices) if devices.is_empty() => Err(ConnectError::NoDevicesFound),
            Ok(devices) => Ok(devices),
            Err(source) => Err(ConnectError::Discovery { source }),
        };

        if result.is_err() {
            self.cleanup();
        }
        result
    }

    /// The user dismissed the device chooser. Nothing to report if a session is already up.
    pub fn cancel_connect(&mut self) -> Option<ConnectError> {
        if self.session.is_some() {
            debug!("Ignoring cancelled device selection, already connected");
            return None;
        }

        info!("Device selection cancelled");
        self.cleanup();
        Some(ConnectError::PromptCancelled)
    }

    /// Links to the chosen device, resolves the data channel and subscribes to it. Nothing
    /// acquired along the way survives a failure.
    pub async fn connect(&mut self, device: &DeviceId) -> Result<SessionFeeds, ConnectError> {
        if self.session.is_some() {
            return Err(ConnectError::SessionActive);
        }
        self.attempt_in_progress = true;
        self.display.status = ConnectionStatus::Connecting;

        let result = self.establish(device).await;
        self.attempt_in_progress = false;

        match result {
            Ok((session, feeds)) => {
                info!("Session established with {}", device);
                self.session = Some(session);
                self.display.status = ConnectionStatus::Connected;
                Ok(feeds)
            },
            Err(err) => {
                warn!("Connecting to {} failed: {}", device, err);
                self.cleanup();
                Err(err)
            },
        }
    }

    async fn establish(&self, device: &DeviceId) -> Result<(Session<P::Link>, SessionFeeds), ConnectError> {
        let link = self.platform.open_link(device).await
            .map_err(|source| ConnectError::Link { source })?;

        match self.subscribe(&link).await {
            Ok((channel, feeds)) => Ok((Session { device: device.clone(), link, channel }, feeds)),
            Err(err) => {
                if let Err(close_err) = link.close().await {
                    warn!("Failed to close link after failed connect: {}", close_err);
                }
                Err(err)
            },
        }
    }

    async fn subscribe(&self, link: &P::Link) -> Result<(<P::Link as Link>::Channel, SessionFeeds), ConnectError> {
        let device_config = &self.config.device;

        let channel = link
            .resolve_channel(device_config.service_uuid, device_config.data_characteristic_uuid)
            .await
            .map_err(|source| ConnectError::Resolve { source })?;

        let notifications = link.enable_notifications(&channel).await
            .map_err(|source| ConnectError::Subscribe { source })?;

        let link_lost = link.link_lost().await
            .map_err(|source| ConnectError::Subscribe { source })?;

        Ok((channel, SessionFeeds { notifications, link_lost }))
    }

    /// Safe in any state.
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Disconnecting from {}", session.device);

            let connected = match session.link.is_connected().await {
                Ok(connected) => connected,
                Err(err) => {
                    warn!("Error checking for connection state: {}", err);
                    true
                },
            };

            if connected {
                if let Err(err) = session.link.disable_notifications(&session.channel).await {
                    debug!("Failed to unsubscribe from {:?}: {}", session.channel, err);
                }
                if let Err(err) = session.link.close().await {
                    warn!("Failed to disconnect: {}", err);
                }
            }
        }

        self.cleanup();
    }

    /// The link dropped without being asked to.
    pub fn handle_link_lost(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("Connection to {} lost", session.device);
        }
        self.cleanup();
    }

    /// Asks the platform whether the link is still up and treats a dead one as lost.
    /// Returns true while a session is established.
    pub async fn check_link(&mut self) -> bool {
        let alive = match &self.session {
            None => return false,
            Some(session) => match session.link.is_connected().await {
                Ok(connected) => connected,
                Err(err) => {
                    warn!("Error checking for connection state: {}", err);
                    false
                },
            },
        };

        if !alive {
            self.handle_link_lost();
        }
        alive
    }

    /// Stores the reading carried by `payload`, if any.
    pub fn handle_notification(&mut self, payload: &[u8]) -> Option<Field> {
        match parse_notification(&self.config.labels, payload) {
            Some(reading) => {
                let field = reading.field;
                self.display.apply(reading);
                Some(field)
            },
            None => {
                debug!("Ignoring notification {:?}", String::from_utf8_lossy(payload));
                None
            },
        }
    }

    fn cleanup(&mut self) {
        self.session = None;
        self.attempt_in_progress = false;
        self.display.reset();
    }
}
