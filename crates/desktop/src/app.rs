use std::path::PathBuf;

use iced::widget::{button, column, container, pick_list, row, text, Space};
use iced::{Element, Length, Subscription, Task, Theme};

use whisper_transcriber_core::job::domain::failure_hint::with_hint;
use whisper_transcriber_core::job::domain::job::Job;
use whisper_transcriber_core::job::domain::language::Language;
use whisper_transcriber_core::job::infrastructure::process_launcher::ProcessLauncher;
use whisper_transcriber_core::job::infrastructure::text_file_sink::TextFileSink;
use whisper_transcriber_core::model::domain::catalog;
use whisper_transcriber_core::model::domain::model_reference::{
    discover_local_models, ModelReference,
};
use whisper_transcriber_core::model::infrastructure::model_resolver;
use whisper_transcriber_core::pipeline::job_controller::{JobController, JobEvent};
use whisper_transcriber_core::shared::constants::{AUDIO_EXTENSIONS, DEFAULT_MODEL, POLL_INTERVAL};
use whisper_transcriber_core::shared::settings::Settings;
use whisper_transcriber_core::shared::time_format::format_elapsed;

use crate::tabs;
use crate::theme;

const STOPPED_NOTICE: &str = "[Stopped] Transcription stopped by user.";

/// Lines kept in the log pane; older ones are dropped.
const MAX_LOG_LINES: usize = 2000;

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Logs,
    Result,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Logs, Tab::Result];

    fn label(self) -> &'static str {
        match self {
            Tab::Logs => "Execution Log",
            Tab::Result => "Transcription Result",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    SelectAudio,
    AudioSelected(Option<PathBuf>),
    ModelSelected(ModelReference),
    LoadLocalModel,
    LocalFolderSelected(Option<PathBuf>),
    LanguageSelected(Language),
    OpenSource,
    StartTranscription,
    StopTranscription,
    PollWorker,
    DialogClosed,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    active_tab: Tab,
    theme: Theme,
    settings: Settings,
    controller: JobController<ProcessLauncher>,
    audio_path: Option<PathBuf>,
    models: Vec<ModelReference>,
    selected_model: Option<ModelReference>,
    language: Language,
    log: String,
    transcript: String,
    saved_path: Option<PathBuf>,
    status: String,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let launcher = ProcessLauncher::current_exe().unwrap_or_else(|e| {
            log::error!("Cannot locate own executable ({e}), falling back to PATH lookup");
            ProcessLauncher::new(env!("CARGO_BIN_NAME"), Vec::new())
        });

        let mut models: Vec<ModelReference> = catalog::ids()
            .map(|id| ModelReference::Remote(id.to_string()))
            .collect();
        if let Some(dir) = &settings.last_model_dir {
            add_models(
                &mut models,
                discover_local_models(dir).into_iter().map(ModelReference::Local),
            );
        }
        let last = ModelReference::parse(settings.last_model.as_deref().unwrap_or(DEFAULT_MODEL));
        if last.is_local() {
            add_models(&mut models, std::iter::once(last.clone()));
        }
        let selected_model = models
            .iter()
            .find(|m| **m == last)
            .or_else(|| models.first())
            .cloned();

        (
            Self {
                active_tab: Tab::Logs,
                theme: theme::resolve_theme(),
                settings,
                controller: JobController::new(launcher, Box::new(TextFileSink)),
                audio_path: None,
                models,
                selected_model,
                language: Language::Auto,
                log: String::new(),
                transcript: String::new(),
                saved_path: None,
                status: "Ready".to_string(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::SelectAudio => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select audio file")
                            .add_filter("Audio Files", AUDIO_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::AudioSelected,
                );
            }
            Message::AudioSelected(Some(path)) => {
                self.audio_path = Some(path);
            }
            Message::AudioSelected(None) => {}
            Message::ModelSelected(model) => {
                self.settings.remember_model(&model.to_string());
                self.settings.save();
                self.selected_model = Some(model);
            }
            Message::LoadLocalModel => {
                let start_dir = self.settings.last_model_dir.clone();
                return Task::perform(
                    async move {
                        let mut dialog =
                            rfd::AsyncFileDialog::new().set_title("Select model folder");
                        if let Some(dir) = start_dir {
                            dialog = dialog.set_directory(dir);
                        }
                        dialog.pick_folder().await.map(|h| h.path().to_path_buf())
                    },
                    Message::LocalFolderSelected,
                );
            }
            Message::LocalFolderSelected(Some(folder)) => {
                let found = discover_local_models(&folder);
                let Some(first) = found.first().cloned() else {
                    return show_dialog(
                        rfd::MessageLevel::Warning,
                        "No models found",
                        format!(
                            "No whisper model files (*.bin) were found in {}",
                            folder.display()
                        ),
                    );
                };
                add_models(&mut self.models, found.into_iter().map(ModelReference::Local));
                let model = ModelReference::Local(first);
                self.settings.remember_model(&model.to_string());
                self.settings.save();
                self.selected_model = Some(model);
            }
            Message::LocalFolderSelected(None) => {}
            Message::LanguageSelected(language) => {
                self.language = language;
            }
            Message::OpenSource => {
                if let Some(model) = &self.selected_model {
                    if let Err(e) = open::that(model.source()) {
                        log::warn!("Failed to open {}: {e}", model.source());
                    }
                }
            }
            Message::StartTranscription => return self.start_transcription(),
            Message::StopTranscription => {
                if self.controller.cancel() {
                    append_log(&mut self.log, &format!("\n{STOPPED_NOTICE}\n"));
                    self.status = "Stopped".to_string();
                }
            }
            Message::PollWorker => return self.poll_worker(),
            Message::DialogClosed => {}
        }
        Task::none()
    }

    fn start_transcription(&mut self) -> Task<Message> {
        let Some(audio_path) = self.audio_path.clone() else {
            return show_dialog(
                rfd::MessageLevel::Warning,
                "No audio file",
                "Please select an audio file first.".to_string(),
            );
        };
        let Some(model) = self.selected_model.clone() else {
            return show_dialog(
                rfd::MessageLevel::Warning,
                "No model",
                "Please select a model first.".to_string(),
            );
        };

        self.log.clear();
        self.transcript.clear();
        self.saved_path = None;
        let job = Job::new(audio_path, model, self.language);
        match self.controller.start(job) {
            Ok(()) => {
                self.status = "Transcribing...".to_string();
                self.active_tab = Tab::Logs;
                Task::none()
            }
            Err(e) => show_dialog(rfd::MessageLevel::Error, "Error", e.to_string()),
        }
    }

    fn poll_worker(&mut self) -> Task<Message> {
        let model = self.controller.current_job().map(|job| job.model().clone());
        let mut task = Task::none();
        for event in self.controller.poll_tick() {
            match event {
                JobEvent::Log(text) => append_log(&mut self.log, &text),
                JobEvent::Completed {
                    text,
                    duration,
                    saved,
                } => {
                    self.transcript = text;
                    self.active_tab = Tab::Result;
                    task = match saved {
                        Ok(path) => {
                            self.status = "Done".to_string();
                            let message = format!(
                                "Transcription saved to:\n{}\n\nTime taken: {}",
                                path.display(),
                                format_elapsed(duration)
                            );
                            self.saved_path = Some(path);
                            show_dialog(rfd::MessageLevel::Info, "Success", message)
                        }
                        Err(e) => {
                            self.status = "Done (not saved)".to_string();
                            show_dialog(rfd::MessageLevel::Error, "Error", e.to_string())
                        }
                    };
                }
                JobEvent::Failed(message) => {
                    self.status = "Failed".to_string();
                    append_log(&mut self.log, &format!("\nError: {message}\n"));
                    let detail = match &model {
                        Some(model) => with_hint(&message, model),
                        None => message,
                    };
                    task = show_dialog(rfd::MessageLevel::Error, "Error", detail);
                }
                JobEvent::SilentExit { status } => {
                    self.status = "Failed".to_string();
                    task = show_dialog(
                        rfd::MessageLevel::Error,
                        "Error",
                        format!("The transcription process ended unexpectedly ({status})."),
                    );
                }
            }
        }
        task
    }

    pub fn view(&self) -> Element<'_, Message> {
        let running = self.controller.is_running();

        let audio_label = self
            .audio_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "No file selected".to_string());
        let file_row = row![
            text("Audio File").width(90),
            text(audio_label).width(Length::Fill),
            button(text("Browse...")).on_press_maybe((!running).then_some(Message::SelectAudio)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center);

        let model_row = row![
            text("Model").width(90),
            pick_list(
                self.models.as_slice(),
                self.selected_model.clone(),
                Message::ModelSelected
            )
            .width(Length::Fill),
            button(text("Load Local..."))
                .on_press_maybe((!running).then_some(Message::LoadLocalModel)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center);

        let model_info = self
            .selected_model
            .as_ref()
            .map(|model| {
                let cache_note = match model {
                    ModelReference::Remote(id) if model_resolver::is_cached(id) => " (downloaded)",
                    ModelReference::Remote(_) => " (downloaded on first use)",
                    ModelReference::Local(_) => "",
                };
                row![
                    Space::new().width(90),
                    text(format!("{}{cache_note}", model.info())).size(12),
                    Space::new().width(Length::Fill),
                    button(text("Source").size(12))
                        .on_press(Message::OpenSource)
                        .style(button::text),
                ]
                .spacing(12)
                .align_y(iced::Alignment::Center)
            })
            .unwrap_or_else(|| row![]);

        let language_row = row![
            text("Language").width(90),
            pick_list(Language::ALL, Some(self.language), Message::LanguageSelected),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center);

        let action = if running {
            button(text("Stop Transcription"))
                .on_press(Message::StopTranscription)
                .style(button::danger)
        } else {
            button(text("Start Transcription"))
                .on_press(Message::StartTranscription)
                .style(button::primary)
        };
        let action_row = row![
            action.padding([8, 20]),
            Space::new().width(Length::Fill),
            text(&self.status).size(13),
        ]
        .align_y(iced::Alignment::Center);

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let btn = button(text(tab.label()).size(13))
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let tab_content: Element<'_, Message> = match self.active_tab {
            Tab::Logs => tabs::logs_tab::view(&self.log),
            Tab::Result => tabs::result_tab::view(&self.transcript, self.saved_path.as_deref()),
        };

        container(
            column![
                file_row,
                model_row,
                model_info,
                language_row,
                action_row,
                tab_bar,
                container(tab_content).height(Length::Fill),
            ]
            .spacing(10),
        )
        .padding(16)
        .height(Length::Fill)
        .into()
    }

    pub fn theme(&self) -> Theme {
        self.theme.clone()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.controller.is_running() {
            iced::time::every(POLL_INTERVAL).map(|_| Message::PollWorker)
        } else {
            Subscription::none()
        }
    }
}

/// Append models not already listed, keeping discovery order.
fn add_models(models: &mut Vec<ModelReference>, found: impl Iterator<Item = ModelReference>) {
    for model in found {
        if !models.contains(&model) {
            models.push(model);
        }
    }
}

fn append_log(log: &mut String, text: &str) {
    log.push_str(text);
    let excess = log.matches('\n').count().saturating_sub(MAX_LOG_LINES);
    if excess == 0 {
        return;
    }
    if let Some((cut, _)) = log.match_indices('\n').nth(excess - 1) {
        log.drain(..=cut);
    }
}

fn show_dialog(level: rfd::MessageLevel, title: &'static str, description: String) -> Task<Message> {
    Task::perform(
        async move {
            rfd::AsyncMessageDialog::new()
                .set_level(level)
                .set_title(title)
                .set_description(description)
                .set_buttons(rfd::MessageButtons::Ok)
                .show()
                .await;
        },
        |_| Message::DialogClosed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_log_keeps_the_newest_lines() {
        let mut log = String::new();
        for i in 0..MAX_LOG_LINES + 5 {
            append_log(&mut log, &format!("line {i}\n"));
        }
        append_log(&mut log, "partial");

        assert_eq!(log.lines().count(), MAX_LOG_LINES + 1);
        assert!(log.starts_with("line 5\n"), "got: {}", &log[..20]);
        assert!(log.ends_with(&format!("line {}\npartial", MAX_LOG_LINES + 4)));
    }

    #[test]
    fn test_append_log_below_limit_is_untouched() {
        let mut log = String::new();
        append_log(&mut log, "Loading model");
        append_log(&mut log, "...\n");
        assert_eq!(log, "Loading model...\n");
    }

    #[test]
    fn test_add_models_skips_duplicates() {
        let mut models = vec![ModelReference::Remote("whisper-tiny".into())];
        add_models(
            &mut models,
            vec![
                ModelReference::Remote("whisper-tiny".into()),
                ModelReference::Local(PathBuf::from("/models/custom")),
                ModelReference::Local(PathBuf::from("/models/custom")),
            ]
            .into_iter(),
        );
        assert_eq!(
            models,
            vec![
                ModelReference::Remote("whisper-tiny".into()),
                ModelReference::Local(PathBuf::from("/models/custom")),
            ]
        );
    }
}
