use crate::session::Session;
use crate::sources::{self, PassageBody};
use crate::theme::Theme;
use crate::ui::markdown;
use eframe::egui::{self, RichText, ScrollArea};

/// Draws the passages of the latest answer. Returns the position whose header
/// was clicked, if any.
pub fn render(ui: &mut egui::Ui, theme: &Theme, session: &Session) -> Option<usize> {
    ui.heading("Source Documents");
    ui.separator();

    let Some(summary) = sources::summary_line(session) else {
        ui.add_space(theme.spacing_16);
        ui.label(
            RichText::new("Ask a question to see relevant document chunks here!")
                .color(theme.text_muted),
        );
        return None;
    };
    ui.label(RichText::new(summary).strong());

    let mut toggled = None;
    ScrollArea::vertical()
        .id_salt(("source_passages", session.passage_generation()))
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for view in sources::passage_views(session) {
                theme.card_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    let marker = if view.expanded { "▼" } else { "▶" };
                    let header = ui.add(
                        egui::Label::new(RichText::new(format!("{marker} {}", view.title)).strong())
                            .sense(egui::Sense::click()),
                    );
                    if header.clicked() {
                        toggled = Some(view.position);
                    }

                    for line in &view.header_lines {
                        ui.label(RichText::new(line).small().color(theme.text_muted));
                    }

                    ui.add_space(theme.spacing_4);
                    match &view.body {
                        PassageBody::Preview(text) => {
                            ui.label(text.as_ref());
                        }
                        PassageBody::Formatted(text) => markdown::render(ui, theme, text),
                    }
                });
                ui.add_space(theme.spacing_8);
            }
        });

    toggled
}
