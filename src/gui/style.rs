use iced::{Background, Border, Color, Shadow, Theme};
use iced::widget::button::{StyleSheet, Appearance};

/// Flat list entry used by the device chooser.
pub struct DeviceEntryStyleSheet;

impl StyleSheet for DeviceEntryStyleSheet {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> Appearance {
        Appearance {
            shadow_offset: Default::default(),
            background: Some(Background::Color(Color::from_rgb8(0xF2, 0xF2, 0xF2))),
            text_color: Color::BLACK,
            border: Border {
                color: Color::from_rgb8(0xDD, 0xDD, 0xDD),
                width: 1.0,
                radius: 4.0.into(),
            },
            shadow: Shadow::default(),
        }
    }

    fn hovered(&self, style: &Self::Style) -> Appearance {
        Appearance {
            background: Some(Background::Color(Color::from_rgb8(0xE3, 0xF2, 0xE4))),
            ..self.active(style)
        }
    }
}
