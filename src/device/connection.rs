use std::convert::Infallible;
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use iced::subscription::{self, Subscription};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::types::Config;
use crate::device::btle::BtlePlatform;
use crate::device::constants::{COMMAND_CHANNEL_SIZE, EVENT_CHANNEL_SIZE};
use crate::device::platform::{LinkLost, NotificationStream, Platform};
use crate::device::session::{SessionController, SessionFeeds};
use crate::device::types::{SessionCommand, SessionEvent};

async fn next_notification(notifications: &mut Option<NotificationStream>) -> Option<Vec<u8>> {
    match notifications {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_link_lost(link_lost: &mut Option<LinkLost>) {
    match link_lost {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn emit(events: &mut Sender<SessionEvent>, event: SessionEvent) {
    if let Err(err) = events.send(event).await {
        warn!("Failed to send SessionEvent: {}", err);
    }
}

async fn emit_display<P: Platform>(events: &mut Sender<SessionEvent>, controller: &SessionController<P>) {
    emit(events, SessionEvent::Display(controller.display().clone())).await;
}

async fn emit_failure(events: &mut Sender<SessionEvent>, err: impl std::fmt::Display) {
    error!("Connection error: {}", err);
    emit(events, SessionEvent::Failed(format!("Failed to connect to device: {}", err))).await;
}

/// Drives one [`SessionController`]: GUI commands, notifications and link loss are handled one
/// at a time, in arrival order. Returns after `cancel` fires or the command channel closes,
/// with the session torn down and [`SessionEvent::Closed`] sent.
pub async fn run_session<P: Platform>(
    platform: P,
    config: Config,
    mut commands: Receiver<SessionCommand>,
    mut events: Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    let mut controller = SessionController::new(platform, config);
    let mut notifications: Option<NotificationStream> = None;
    let mut link_lost: Option<LinkLost> = None;

    emit_display(&mut events, &controller).await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            command = commands.next() => {
                let Some(command) = command else {
                    break;
                };

                match command {
                    SessionCommand::Discover => {
                        match controller.begin_connect().await {
                            Ok(devices) => emit(&mut events, SessionEvent::Discovered(devices)).await,
                            Err(err) => emit_failure(&mut events, err).await,
                        }
                    },
                    SessionCommand::Connect(device) => {
                        match controller.connect(&device).await {
                            Ok(SessionFeeds { notifications: stream, link_lost: lost }) => {
                                notifications = Some(stream);
                                link_lost = Some(lost);
                            },
                            Err(err) => emit_failure(&mut events, err).await,
                        }
                    },
                    SessionCommand::CancelPrompt => {
                        if let Some(err) = controller.cancel_connect() {
                            emit_failure(&mut events, err).await;
                        }
                    },
                    SessionCommand::Disconnect => {
                        notifications = None;
                        link_lost = None;
                        controller.disconnect().await;
                    },
                }

                emit_display(&mut events, &controller).await;
            },
            payload = next_notification(&mut notifications) => {
                match payload {
                    Some(payload) => {
                        if controller.handle_notification(&payload).is_some() {
                            emit_display(&mut events, &controller).await;
                        }
                    },
                    // the stream also ends when the link goes down without a disconnect event
                    None => {
                        notifications = None;
                        if !controller.check_link().await {
                            link_lost = None;
                            emit_display(&mut events, &controller).await;
                        }
                    },
                }
            },
            _ = wait_link_lost(&mut link_lost) => {
                notifications = None;
                link_lost = None;
                controller.handle_link_lost();
                emit_display(&mut events, &controller).await;
            },
        }
    }

    info!("Stopping session");
    drop(notifications);
    drop(link_lost);
    controller.disconnect().await;
    emit(&mut events, SessionEvent::Closed).await;
}

/// Hosts [`run_session`] on the btleplug platform. The first event is [`SessionEvent::Ready`]
/// carrying the sender for [`SessionCommand`]s.
pub fn session_subscription(cancel: CancellationToken, config: Config) -> Subscription<SessionEvent> {
    struct Session;

    subscription::channel(
        std::any::TypeId::of::<Session>(),
        EVENT_CHANNEL_SIZE,
        move |mut events: Sender<SessionEvent>| async move {
            let (command_sender, commands) = channel::<SessionCommand>(COMMAND_CHANNEL_SIZE);
            emit(&mut events, SessionEvent::Ready(command_sender)).await;

            match BtlePlatform::new().await {
                Ok(platform) => {
                    run_session(platform, config, commands, events, cancel).await;
                },
                Err(err) => {
                    // commands sent from now on fail, which the GUI reports
                    drop(commands);
                    error!("Bluetooth is not available: {}", err);
                    emit(&mut events, SessionEvent::Failed(format!("Bluetooth is not available: {}", err))).await;
                    cancel.cancelled().await;
                    emit(&mut events, SessionEvent::Closed).await;
                },
            }

            // subscription::channel expects the future to never resolve
            std::future::pending::<Infallible>().await
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use crate::device::display::ConnectionStatus;
    use crate::device::fake::{Failure, FakePlatform};
    use crate::device::types::{DiscoveredDevice, Field};
    use crate::device::display::DisplayState;

    struct Harness {
        platform: FakePlatform,
        commands: Sender<SessionCommand>,
        events: Receiver<SessionEvent>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start(platform: FakePlatform) -> Harness {
            let (commands, command_receiver) = channel(COMMAND_CHANNEL_SIZE);
            let (event_sender, events) = channel(EVENT_CHANNEL_SIZE);
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(run_session(
                platform.clone(),
                Config::default(),
                command_receiver,
                event_sender,
                cancel.clone(),
            ));
            Harness { platform, commands, events, cancel, handle }
        }

        async fn send(&mut self, command: SessionCommand) {
            self.commands.send(command).await.unwrap();
        }

        async fn next_event(&mut self) -> SessionEvent {
            timeout(Duration::from_secs(5), self.events.next())
                .await
                .expect("timed out waiting for a SessionEvent")
                .expect("session loop hung up")
        }

        async fn display_where(&mut self, predicate: impl Fn(&DisplayState) -> bool) -> DisplayState {
            loop {
                if let SessionEvent::Display(display) = self.next_event().await {
                    if predicate(&display) {
                        return display;
                    }
                }
            }
        }

        async fn discovered(&mut self) -> Vec<DiscoveredDevice> {
            loop {
                if let SessionEvent::Discovered(devices) = self.next_event().await {
                    return devices;
                }
            }
        }

        async fn failure(&mut self) -> String {
            loop {
                if let SessionEvent::Failed(message) = self.next_event().await {
                    return message;
                }
            }
        }

        async fn connect(&mut self) {
            self.send(SessionCommand::Discover).await;
            let devices = self.discovered().await;
            self.send(SessionCommand::Connect(devices[0].id.clone())).await;
            self.display_where(|display| display.status == ConnectionStatus::Connected).await;
        }
    }

    #[tokio::test]
    async fn readings_reach_the_display_until_the_link_drops() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.connect().await;

        assert!(harness.platform.notify("Ortalama BPM: 78"));
        assert!(harness.platform.notify("Hello"));
        assert!(harness.platform.notify("Glukoz:  103 "));
        let display = harness.display_where(|display| display.value(Field::Glucose).is_some()).await;
        assert_eq!(display.value_text(Field::HeartRate), "78");
        assert_eq!(display.value_text(Field::OxygenSaturation), "--");
        assert_eq!(display.value_text(Field::Glucose), "103");

        harness.platform.drop_link();
        let display = harness.display_where(|display| display.status == ConnectionStatus::Disconnected).await;
        assert_eq!(display, DisplayState::default());
    }

    #[tokio::test]
    async fn disconnect_command_tears_the_session_down() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.connect().await;
        assert!(harness.platform.notify("Ortalama SpO2: 96"));
        harness.display_where(|display| display.value(Field::OxygenSaturation).is_some()).await;

        harness.send(SessionCommand::Disconnect).await;
        let display = harness.display_where(|display| display.status == ConnectionStatus::Disconnected).await;
        assert_eq!(display, DisplayState::default());
        assert_eq!(harness.platform.links_closed(), 1);
        assert!(!harness.platform.notify("Ortalama BPM: 70"));
    }

    #[tokio::test]
    async fn failed_connect_is_reported_and_recoverable() {
        let platform = FakePlatform::with_device("Arduino");
        platform.fail_at(Failure::ResolveChannel);
        let mut harness = Harness::start(platform);

        harness.send(SessionCommand::Discover).await;
        let devices = harness.discovered().await;
        harness.send(SessionCommand::Connect(devices[0].id.clone())).await;

        let message = harness.failure().await;
        assert!(message.starts_with("Failed to connect to device: could not resolve the data channel"));
        let display = harness.display_where(|_| true).await;
        assert_eq!(display, DisplayState::default());
        assert_eq!(harness.platform.links_closed(), 1);

        harness.platform.clear_failure();
        harness.connect().await;
        assert!(harness.platform.notify("Ortalama BPM: 64"));
        let display = harness.display_where(|display| display.value(Field::HeartRate).is_some()).await;
        assert_eq!(display.value_text(Field::HeartRate), "64");
        assert_eq!(harness.platform.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn ended_notification_stream_on_a_dead_link_disconnects() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.connect().await;

        harness.platform.end_notifications_silently();
        let display = harness.display_where(|display| display.status == ConnectionStatus::Disconnected).await;
        assert_eq!(display, DisplayState::default());

        harness.connect().await;
        assert_eq!(harness.platform.links_opened(), 2);
    }

    #[tokio::test]
    async fn cancelled_prompt_while_connected_reports_nothing() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.connect().await;

        harness.send(SessionCommand::CancelPrompt).await;
        let display = harness.display_where(|_| true).await;
        assert_eq!(display.status, ConnectionStatus::Connected);

        harness.send(SessionCommand::Disconnect).await;
        loop {
            match harness.next_event().await {
                SessionEvent::Failed(message) => panic!("unexpected failure: {}", message),
                SessionEvent::Display(display) if display.status == ConnectionStatus::Disconnected => break,
                _ => {},
            }
        }
    }

    #[tokio::test]
    async fn cancelled_prompt_is_reported() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.send(SessionCommand::Discover).await;
        harness.discovered().await;

        harness.send(SessionCommand::CancelPrompt).await;
        assert_eq!(harness.failure().await, "Failed to connect to device: device selection was cancelled");
        let display = harness.display_where(|_| true).await;
        assert_eq!(display.status, ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn cancel_disconnects_and_closes() {
        let mut harness = Harness::start(FakePlatform::with_device("Arduino"));
        harness.connect().await;

        harness.cancel.cancel();
        loop {
            if let SessionEvent::Closed = harness.next_event().await {
                break;
            }
        }
        harness.handle.await.unwrap();
        assert_eq!(harness.platform.links_closed(), 1);
        assert!(!harness.platform.is_connected());
    }
}
