use futures::channel::mpsc::Sender;
use futures::SinkExt;
use iced::{Alignment, Application, Color, Command, Element, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::theme::{self, Theme};
use iced::widget::{Column, button, column, container, horizontal_rule, row, scrollable, text};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::connection::session_subscription;
use crate::device::display::{ConnectionStatus, DisplayState};
use crate::device::types::{DiscoveredDevice, Field, SessionCommand, SessionEvent};
use crate::error::AppRunError;
use crate::gui::style::DeviceEntryStyleSheet;
use crate::gui::types::Message;

pub struct ApplicationFlags {
    config_io: ConfigIO,
}

pub struct MonitorApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    // messages that the user must click away
    notices: Vec<String>,

    config_io: ConfigIO,
    // the session only starts once the config is known
    config: Option<Config>,

    session_commands: Option<Sender<SessionCommand>>,
    display: DisplayState,
    // device chooser, open while Some
    candidates: Option<Vec<DiscoveredDevice>>,
    // window to close once the session loop reports Closed
    closing: Option<window::Id>,
}

impl MonitorApplication {
    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();

        let fut = async move {
            match config_io.read().await {
                Ok(config) => (config, None),
                Err(err) => {
                    error!("Failed to load config: {:?}", &err);
                    (Config::default(), Some(format!("Failed to load config, using defaults: {}", &err)))
                },
            }
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn send_command(&self, command: SessionCommand) -> Command<Message> {
        let Some(mut sender) = self.session_commands.clone() else {
            warn!("Session is not ready, dropping {:?}", command);
            return Command::none();
        };

        let fut = async move {
            match sender.send(command).await {
                Ok(_) => true,
                Err(err) => {
                    error!("Failed to send SessionCommand: {}", err);
                    false
                },
            }
        };

        Command::perform(fut, Message::CommandSent)
    }

    fn handle_session_event(&mut self, event: SessionEvent) -> Command<Message> {
        match event {
            SessionEvent::Ready(sender) => {
                info!("Session ready");
                self.session_commands = Some(sender);
            },
            SessionEvent::Display(display) => {
                if display.status != ConnectionStatus::Connecting {
                    self.candidates = None;
                }
                self.display = display;
            },
            SessionEvent::Discovered(devices) => {
                self.candidates = Some(devices);
            },
            SessionEvent::Failed(message) => {
                self.notices.push(message);
            },
            SessionEvent::Closed => {
                info!("Session closed");
                self.session_commands = None;
                if let Some(id) = self.closing.take() {
                    return window::close(id);
                }
            },
        }

        Command::none()
    }

    fn notice_view<'a>(&'a self, notice: &'a str) -> Element<'a, Message> {
        container(
            column![
                text(notice),

                button(text("Okay"))
                    .on_press(Message::NoticeConfirmed),

            ].align_items(Alignment::Center).spacing(20),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }

    fn chooser_view<'a>(&'a self, candidates: &'a [DiscoveredDevice]) -> Element<'a, Message> {
        let entries = candidates.iter().map(|device| -> Element<Message> {
            button(text(device.to_string()))
                .width(Length::Fill)
                .style(theme::Button::Custom(Box::new(DeviceEntryStyleSheet)))
                .on_press(Message::DeviceChosen(device.id.clone()))
                .into()
        });

        container(
            column![
                text("Choose a device").size(20),

                scrollable(Column::with_children(entries).spacing(8))
                    .height(Length::Fill),

                button(text("Cancel"))
                    .style(theme::Button::Secondary)
                    .on_press(Message::PromptCancelled),
            ].align_items(Alignment::Center).spacing(20),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }

    fn monitor_view(&self) -> Element<Message> {
        let status = self.display.status;
        let [r, g, b] = status.color();

        let mut toggle = button(text(status.toggle_label()))
            .style(if status == ConnectionStatus::Connected { theme::Button::Destructive } else { theme::Button::Primary });

        if status != ConnectionStatus::Connecting && self.session_commands.is_some() {
            toggle = toggle.on_press(Message::TogglePress);
        }

        let value_row = |field: Field| -> Element<Message> {
            row![
                text(field.title()).width(Length::Fill),
                text(self.display.value_text(field)).size(32),
            ]
            .align_items(Alignment::Center)
            .spacing(20)
            .into()
        };

        container(
            column![
                text(status.label())
                    .size(20)
                    .style(Color::from_rgb8(r, g, b)),

                horizontal_rule(10),

                Column::with_children(Field::ALL.into_iter().map(value_row))
                    .spacing(20)
                    .width(Length::Fill),

                toggle,
            ]
            .align_items(Alignment::Center)
            .spacing(30),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

impl Application for MonitorApplication {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (MonitorApplication, Command<Self::Message>) {
        let app = MonitorApplication {
            app_cancel: CancellationToken::new(),
            notices: Vec::new(),
            config_io: flags.config_io,
            config: None,
            session_commands: None,
            display: DisplayState::default(),
            candidates: None,
            closing: None,
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        String::from(concat!("Vitals Monitor ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((config, error_message)) => {
                info!("Config load complete");
                self.config = Some(config);
                if let Some(error_message) = error_message {
                    self.notices.push(error_message);
                }
            },
            Message::SessionEvent(event) => {
                return self.handle_session_event(event);
            },
            Message::CommandSent(false) => {
                self.display.reset();
                self.notices.push("The Bluetooth session is not running".to_string());
            },
            Message::TogglePress => {
                match self.display.status {
                    ConnectionStatus::Disconnected => {
                        // reflected right away, the scan takes a while to report back
                        self.display.status = ConnectionStatus::Connecting;
                        return self.send_command(SessionCommand::Discover);
                    },
                    ConnectionStatus::Connected => {
                        return self.send_command(SessionCommand::Disconnect);
                    },
                    ConnectionStatus::Connecting => {},
                }
            },
            Message::DeviceChosen(device) => {
                self.candidates = None;
                return self.send_command(SessionCommand::Connect(device));
            },
            Message::PromptCancelled => {
                self.candidates = None;
                return self.send_command(SessionCommand::CancelPrompt);
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.app_cancel.cancel();

                if self.config.is_none() {
                    return window::close(id);
                }
                // wait for the session loop to let go of the peripheral
                self.closing = Some(id);
            },
            _ => {},
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen().map(Message::EventOccurred)];

        if let Some(config) = &self.config {
            subscriptions.push(
                session_subscription(self.app_cancel.clone(), config.clone())
                    .map(Message::SessionEvent)
            );
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<Message> {
        if let Some(notice) = self.notices.first() {
            return self.notice_view(notice);
        }

        if let Some(candidates) = &self.candidates {
            return self.chooser_view(candidates);
        }

        self.monitor_view()
    }
}

pub fn run_application() -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync()?;
    // one instance at a time, so there is never more than one session
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let flags = ApplicationFlags { config_io };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("vitals-monitor".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(420.0, 480.0);
    settings.window.resizable = false;

    // this function will call process::exit() unless there was a startup error
    MonitorApplication::run(settings)?;
    Ok(())
}
