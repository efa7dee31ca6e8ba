use crate::controller::conversation::AskOutcome;
use crate::controller::health::ServiceStatus;
use crate::controller::reset::{
    clear_all_notice, new_conversation_notice, Confirmation, CLEAR_ALL_PROMPT,
};
use crate::controller::upload::{upload_failed_notice, upload_succeeded_notice, CandidateFile};
use crate::controller::Controller;
use crate::event::{AppEvent, NoticeLevel};
use crate::session::{PendingKind, Role, Session, UploadState};
use crate::theme::Theme;
use crate::ui::{composer, markdown, source_panel};
use eframe::egui::{self, RichText, ScrollArea};
use std::future::Future;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;

const SUGGESTED_TOPICS: [&str; 4] = [
    "Main findings or conclusions",
    "Methodology used",
    "Key concepts or definitions",
    "Specific sections or data",
];

pub struct PaperQaApp {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
    controller: Controller,
    runtime_handle: Handle,
    ctx: egui::Context,
    theme: Theme,
    service_status: ServiceStatus,
    input_buffer: String,
    path_buffer: String,
    notice: Option<(NoticeLevel, String)>,
    diagnostics_log: Vec<String>,
    confirm_clear_open: bool,
    new_document_open: bool,
    scroll_to_bottom: bool,
}

impl PaperQaApp {
    pub fn new(
        ctx: egui::Context,
        controller: Controller,
        runtime_handle: Handle,
        startup_document: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        let theme = Theme::default();
        theme.apply_visuals(&ctx);
        controller.spawn_health_poller(&runtime_handle, tx.clone(), ctx.clone());

        let mut app = Self {
            rx,
            tx,
            controller,
            runtime_handle,
            ctx,
            theme,
            service_status: ServiceStatus::Unknown,
            input_buffer: String::new(),
            path_buffer: String::new(),
            notice: None,
            diagnostics_log: Vec::new(),
            confirm_clear_open: false,
            new_document_open: false,
            scroll_to_bottom: false,
        };

        if let Some(path) = startup_document {
            match CandidateFile::from_path(&path) {
                Some(file) => app.submit_document(file),
                None => app.log_diagnostic(format!("ignored startup path {}", path.display())),
            }
        }

        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn show_notice(&mut self, level: NoticeLevel, text: String) {
        self.log_diagnostic(text.clone());
        self.notice = Some((level, text));
    }

    /// Runs `task` on the runtime and wakes the UI once it settles.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Option<AppEvent>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();
        self.runtime_handle.spawn(async move {
            if let Some(event) = task.await {
                let _ = tx.send(event);
            }
            ctx.request_repaint();
        });
    }

    /// Single funnel for dropped, picked and startup documents.
    fn submit_document(&mut self, file: CandidateFile) {
        let pending = match self.controller.begin_submit(file) {
            Ok(pending) => pending,
            Err(err) => {
                self.show_notice(NoticeLevel::Error, upload_failed_notice(&err));
                return;
            }
        };

        self.notice = None;
        self.log_diagnostic(format!("uploading {}", pending.file_name()));
        let controller = self.controller.clone();
        self.spawn(async move {
            let name = pending.file_name().to_string();
            let event = match controller.finish_submit(pending).await {
                Ok(receipt) => AppEvent::info(upload_succeeded_notice(&name, &receipt)),
                Err(err) => AppEvent::error(upload_failed_notice(&err)),
            };
            Some(event)
        });
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        let Some(file) = dropped.first().and_then(CandidateFile::from_dropped) else {
            return;
        };
        if dropped.len() > 1 {
            self.log_diagnostic(format!(
                "{} files dropped, only {} is used",
                dropped.len(),
                file.name
            ));
        }
        self.submit_document(file);
    }

    fn submit_picked_path(&mut self) {
        if let Some(file) = CandidateFile::from_picked(&self.path_buffer) {
            self.submit_document(file);
        }
    }

    fn submit_question(&mut self) {
        let Some(pending) = self.controller.begin_ask(&self.input_buffer) else {
            return;
        };
        self.input_buffer.clear();
        self.scroll_to_bottom = true;

        let controller = self.controller.clone();
        self.spawn(async move {
            match controller.finish_ask(pending).await {
                AskOutcome::Failed(err) => {
                    Some(AppEvent::Diagnostic(format!("question failed: {err}")))
                }
                AskOutcome::Answered { passages } => {
                    Some(AppEvent::Diagnostic(format!("answer received with {passages} sources")))
                }
                AskOutcome::Skipped => None,
            }
        });
    }

    fn start_new_conversation(&mut self) {
        let controller = self.controller.clone();
        self.spawn(async move {
            let outcome = controller.start_new_conversation().await;
            let text = new_conversation_notice(&outcome);
            Some(match outcome {
                Ok(()) => AppEvent::info(text),
                Err(_) => AppEvent::error(text),
            })
        });
    }

    fn answer_clear_confirmation(&mut self, confirmation: Confirmation) {
        self.confirm_clear_open = false;
        let controller = self.controller.clone();
        self.spawn(async move {
            let outcome = controller.clear_all_data(confirmation).await;
            let text = clear_all_notice(&outcome)?;
            Some(match outcome {
                Ok(_) => AppEvent::info(text),
                Err(_) => AppEvent::error(text),
            })
        });
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Notice { level, text } => {
                self.scroll_to_bottom = true;
                self.show_notice(level, text);
            }
            AppEvent::StatusChanged(status) => {
                self.log_diagnostic(format!("service status changed: {status:?}"));
                self.service_status = status;
            }
            AppEvent::Diagnostic(message) => {
                self.scroll_to_bottom = true;
                self.log_diagnostic(message);
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context, session: &Session) {
        let idle = self.controller.is_idle();
        let mut new_chat = false;
        let mut clear_all = false;
        let mut new_document = false;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Research Paper Q&A");
                if let Some(name) = session.document_name() {
                    ui.separator();
                    ui.label(RichText::new(format!("📄 {name}")).color(self.theme.text_muted));
                }
                ui.separator();
                let status = &self.service_status;
                let label = ui.label(
                    RichText::new(status.label()).color(self.theme.status_color(status)),
                );
                if let ServiceStatus::Unreachable(reason) | ServiceStatus::Degraded(reason) = status
                {
                    label.on_hover_text(reason.as_str());
                }

                if session.upload_state() == UploadState::Ready {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        clear_all = ui
                            .add_enabled(idle, egui::Button::new("🗑 Clear All"))
                            .clicked();
                        new_chat = ui
                            .add_enabled(idle, egui::Button::new("⟲ New Chat"))
                            .clicked();
                        new_document = ui
                            .add_enabled(idle, egui::Button::new("🔄 New Document"))
                            .clicked();
                    });
                }
            });
        });

        if new_chat {
            self.start_new_conversation();
        }
        if clear_all {
            self.confirm_clear_open = true;
        }
        if new_document {
            self.path_buffer.clear();
            self.new_document_open = true;
        }
    }

    fn render_notice(&mut self, ui: &mut egui::Ui) {
        let Some((level, text)) = &self.notice else {
            return;
        };
        let mut dismissed = false;
        self.theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(text.as_str()).color(self.theme.notice_color(*level)));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    dismissed = ui.small_button("✕").clicked();
                });
            });
        });
        if dismissed {
            self.notice = None;
        }
    }

    fn render_upload_screen(&mut self, ctx: &egui::Context, session: &Session) {
        let hovering = ctx.input(|input| !input.raw.hovered_files.is_empty());
        let uploading = session.upload_state() == UploadState::Uploading;
        let limit_mb = self.controller.config().max_upload_bytes / (1024 * 1024);
        let mut pick_now = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_notice(ui);
            ui.vertical_centered(|ui| {
                ui.add_space(self.theme.spacing_24);
                ui.heading("Research Paper Q&A");
                ui.label(
                    RichText::new("Upload a research paper and start asking questions")
                        .color(self.theme.text_muted),
                );
                ui.add_space(self.theme.spacing_16);

                self.theme.drop_zone_frame(hovering).show(ui, |ui| {
                    ui.set_width(ui.available_width().min(560.0));
                    ui.vertical_centered(|ui| {
                        if uploading {
                            ui.add(egui::Spinner::new());
                            ui.label("Processing your research paper...");
                            ui.label(
                                RichText::new("This may take a few moments")
                                    .small()
                                    .color(self.theme.text_muted),
                            );
                            return;
                        }

                        ui.label(RichText::new("Drop your PDF here or enter its path").strong());
                        ui.label(
                            RichText::new(format!("Supports PDF files up to {limit_mb}MB"))
                                .small()
                                .color(self.theme.text_muted),
                        );
                        ui.add_space(self.theme.spacing_8);
                        pick_now = path_entry(ui, &mut self.path_buffer);
                    });
                });
            });

            ui.add_space(self.theme.spacing_24);
            self.render_diagnostics(ui);
        });

        if pick_now && !uploading {
            self.submit_picked_path();
        }
    }

    fn render_source_panel(&mut self, ctx: &egui::Context, session: &Session) {
        let mut toggled = None;
        egui::SidePanel::right("source_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                toggled = source_panel::render(ui, &self.theme, session);
            });

        if let Some(position) = toggled {
            self.controller.toggle_passage(position);
        }
    }

    fn render_transcript(&mut self, ui: &mut egui::Ui, session: &Session) {
        if session.turns().is_empty() && !session.is_pending() {
            ui.vertical_centered(|ui| {
                ui.add_space(self.theme.spacing_24);
                ui.heading("Ready to answer your questions!");
                ui.label(RichText::new("Try asking about:").color(self.theme.text_muted));
                for topic in SUGGESTED_TOPICS {
                    self.theme.card_frame().show(ui, |ui| {
                        ui.label(topic);
                    });
                }
            });
            return;
        }

        for turn in session.turns() {
            let from_user = turn.role() == Role::User;
            let align = if from_user {
                egui::Align::Max
            } else {
                egui::Align::Min
            };
            ui.with_layout(egui::Layout::top_down(align), |ui| {
                self.theme.bubble_frame(from_user).show(ui, |ui| {
                    ui.set_max_width(ui.available_width() * 0.8);
                    if from_user {
                        ui.label(turn.content());
                    } else {
                        markdown::render(ui, &self.theme, turn.content());
                    }
                });
            });
            ui.add_space(self.theme.spacing_8);
        }

        if session.pending() == Some(PendingKind::Question) {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label(RichText::new("Analyzing...").color(self.theme.text_muted));
            });
        }

        if self.scroll_to_bottom {
            ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
        }
    }

    fn render_diagnostics(&self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Diagnostics")
            .default_open(false)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("diagnostics_log")
                    .max_height(90.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in &self.diagnostics_log {
                            ui.label(RichText::new(entry).small().color(self.theme.text_muted));
                        }
                    });
            });
    }

    fn render_chat(&mut self, ctx: &egui::Context, session: &Session) {
        let composer_id = egui::Id::new("question_composer");
        let enter_pressed = composer::take_submit_key(ctx, composer_id);
        let mut send_now = enter_pressed;

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(self.theme.surface_0))
            .show(ctx, |ui| {
                self.render_notice(ui);

                let transcript_height = (ui.available_height() - 190.0).max(120.0);
                ScrollArea::vertical()
                    .id_salt("chat_transcript")
                    .max_height(transcript_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| self.render_transcript(ui, session));
                self.scroll_to_bottom = false;

                ui.separator();
                self.render_diagnostics(ui);

                let input_enabled = !session.is_pending();
                self.theme.composer_frame().show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let hint = if input_enabled {
                            "Ask a question about the research paper..."
                        } else {
                            "Waiting for response..."
                        };
                        ui.add_enabled(
                            input_enabled,
                            egui::TextEdit::multiline(&mut self.input_buffer)
                                .id(composer_id)
                                .desired_rows(2)
                                .desired_width(ui.available_width() - 90.0)
                                .hint_text(hint),
                        );
                        send_now |= ui
                            .add_enabled(
                                input_enabled && !self.input_buffer.trim().is_empty(),
                                egui::Button::new("Send"),
                            )
                            .clicked();
                    });
                });
            });

        if send_now {
            self.submit_question();
        }
    }

    /// Manual pick while a document is loaded. Drops keep working as well.
    fn render_new_document_window(&mut self, ctx: &egui::Context) {
        if !self.new_document_open {
            return;
        }

        let idle = self.controller.is_idle();
        let limit_mb = self.controller.config().max_upload_bytes / (1024 * 1024);
        let mut open = true;
        let mut pick_now = false;
        egui::Window::new("Upload new document")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Replacing the document starts a fresh conversation.");
                ui.label(
                    RichText::new(format!("Supports PDF files up to {limit_mb}MB"))
                        .small()
                        .color(self.theme.text_muted),
                );
                ui.add_space(self.theme.spacing_8);
                ui.add_enabled_ui(idle, |ui| {
                    pick_now = path_entry(ui, &mut self.path_buffer);
                });
            });

        self.new_document_open = open;
        if pick_now && idle {
            self.new_document_open = false;
            self.submit_picked_path();
        }
    }

    fn render_clear_confirmation(&mut self, ctx: &egui::Context) {
        if !self.confirm_clear_open {
            return;
        }

        let mut answer = None;
        egui::Window::new("Clear all data?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(CLEAR_ALL_PROMPT);
                ui.add_space(self.theme.spacing_8);
                ui.horizontal(|ui| {
                    if ui
                        .button(RichText::new("Clear everything").color(self.theme.danger))
                        .clicked()
                    {
                        answer = Some(Confirmation::Confirmed);
                    }
                    if ui.button("Cancel").clicked() {
                        answer = Some(Confirmation::Declined);
                    }
                });
            });

        if let Some(confirmation) = answer {
            self.answer_clear_confirmation(confirmation);
        }
    }
}

impl eframe::App for PaperQaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.handle_dropped_files(ctx);

        let session = self.controller.snapshot();
        self.render_top_bar(ctx, &session);
        match session.upload_state() {
            UploadState::NoDocument | UploadState::Uploading => {
                self.render_upload_screen(ctx, &session)
            }
            UploadState::Ready => {
                self.render_source_panel(ctx, &session);
                self.render_chat(ctx, &session);
            }
        }
        self.render_new_document_window(ctx);
        self.render_clear_confirmation(ctx);
    }
}

/// Path field plus Upload button. Returns true when the user submitted a path.
fn path_entry(ui: &mut egui::Ui, buffer: &mut String) -> bool {
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(buffer)
                .desired_width(380.0)
                .hint_text("/path/to/paper.pdf"),
        );
        let entered =
            response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
        let clicked = ui
            .add_enabled(!buffer.trim().is_empty(), egui::Button::new("Upload"))
            .clicked();
        entered || clicked
    })
    .inner
}
