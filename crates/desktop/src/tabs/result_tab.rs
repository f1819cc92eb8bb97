use std::path::Path;

use iced::widget::{column, container, scrollable, text};
use iced::{Element, Length};

use crate::app::Message;

pub fn view<'a>(transcript: &'a str, saved_path: Option<&Path>) -> Element<'a, Message> {
    if transcript.is_empty() {
        return container(text("No transcription yet.").size(13))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let saved = saved_path
        .map(|p| format!("Saved to {}", p.display()))
        .unwrap_or_else(|| "Not saved".to_string());

    column![
        text(saved).size(12),
        container(
            scrollable(container(text(transcript).size(14)).padding(8).width(Length::Fill))
                .height(Length::Fill),
        )
        .style(container::bordered_box)
        .height(Length::Fill),
    ]
    .spacing(6)
    .into()
}
