use iced::Event;

use crate::config::types::Config;
use crate::device::types::{DeviceId, SessionEvent};

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)),
    SessionEvent(SessionEvent),
    CommandSent(bool), // false if the session loop is gone
    TogglePress,
    DeviceChosen(DeviceId),
    PromptCancelled,
    NoticeConfirmed,
}
