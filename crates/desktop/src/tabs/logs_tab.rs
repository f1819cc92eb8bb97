use iced::widget::{container, scrollable, text};
use iced::{Element, Font, Length};

use crate::app::Message;

/// Worker output as it arrives, pinned to the newest line.
pub fn view(log: &str) -> Element<'_, Message> {
    let body = if log.is_empty() {
        text("Logs from the transcription process appear here.").size(12)
    } else {
        text(log).size(12).font(Font::MONOSPACE)
    };

    container(
        scrollable(container(body).padding(8).width(Length::Fill))
            .anchor_bottom()
            .height(Length::Fill),
    )
    .style(container::bordered_box)
    .height(Length::Fill)
    .into()
}
