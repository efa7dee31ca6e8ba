//! Minimal formatted-text rendering for answers and expanded passages.
//!
//! Markdown is flattened into a single egui `LayoutJob`: headings and strong
//! text are highlighted, code uses the monospace font, lists get bullets or
//! their numbers.

use crate::theme::Theme;
use eframe::egui::{self, text::LayoutJob, FontId, TextFormat};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Plain,
    Strong,
    Emphasis,
    Heading(HeadingLevel),
    Code,
}

pub fn render(ui: &mut egui::Ui, theme: &Theme, markdown: &str) {
    let mut job = layout(theme, markdown);
    job.wrap.max_width = ui.available_width();
    ui.label(job);
}

pub fn layout(theme: &Theme, markdown: &str) -> LayoutJob {
    let mut job = LayoutJob::default();
    let mut stack = vec![Span::Plain];
    // One entry per open list: the next item number, or `None` for bullets.
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH) {
        let current = stack.last().copied().unwrap_or(Span::Plain);
        match event {
            Event::Start(Tag::Heading { level, .. }) => stack.push(Span::Heading(level)),
            Event::Start(Tag::Strong) => stack.push(Span::Strong),
            Event::Start(Tag::Emphasis) => stack.push(Span::Emphasis),
            Event::Start(Tag::CodeBlock(_)) => stack.push(Span::Code),
            Event::Start(Tag::List(start)) => {
                if !lists.is_empty() && !job.text.ends_with('\n') {
                    append(&mut job, theme, Span::Plain, "\n");
                }
                lists.push(start);
            }
            Event::Start(Tag::Item) => {
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let marker = match lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                append(&mut job, theme, Span::Plain, &format!("{indent}{marker}"));
            }
            Event::End(TagEnd::Heading(_) | TagEnd::Strong | TagEnd::Emphasis) => {
                stack.pop();
                if matches!(current, Span::Heading(_)) {
                    append(&mut job, theme, Span::Plain, "\n\n");
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                stack.pop();
                append(&mut job, theme, Span::Plain, "\n");
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    append(&mut job, theme, Span::Plain, "\n");
                }
            }
            Event::End(TagEnd::Item) => {
                if !job.text.ends_with('\n') {
                    append(&mut job, theme, Span::Plain, "\n");
                }
            }
            Event::End(TagEnd::Paragraph) => {
                let separator = if lists.is_empty() { "\n\n" } else { "" };
                append(&mut job, theme, Span::Plain, separator);
            }
            Event::Text(text) => append(&mut job, theme, current, &text),
            Event::Code(code) => append(&mut job, theme, Span::Code, &code),
            Event::SoftBreak => append(&mut job, theme, current, " "),
            Event::HardBreak => append(&mut job, theme, current, "\n"),
            Event::Rule => append(&mut job, theme, Span::Plain, "\n────\n"),
            _ => {}
        }
    }

    trim_trailing_newlines(&mut job);
    job
}

fn append(job: &mut LayoutJob, theme: &Theme, span: Span, text: &str) {
    if text.is_empty() {
        return;
    }
    let format = match span {
        Span::Plain => TextFormat::simple(FontId::proportional(14.0), theme.text_primary),
        Span::Strong => TextFormat::simple(FontId::proportional(14.0), theme.text_strong),
        Span::Emphasis => TextFormat {
            italics: true,
            ..TextFormat::simple(FontId::proportional(14.0), theme.text_primary)
        },
        Span::Heading(level) => {
            let size = match level {
                HeadingLevel::H1 => 20.0,
                HeadingLevel::H2 => 18.0,
                _ => 16.0,
            };
            TextFormat::simple(FontId::proportional(size), theme.text_strong)
        }
        Span::Code => TextFormat {
            background: theme.surface_3,
            ..TextFormat::simple(FontId::monospace(13.0), theme.text_primary)
        },
    };
    job.append(text, 0.0, format);
}

fn trim_trailing_newlines(job: &mut LayoutJob) {
    let trimmed = job.text.trim_end_matches('\n').len();
    if trimmed == job.text.len() {
        return;
    }
    job.text.truncate(trimmed);
    job.sections.retain(|section| section.byte_range.start < trimmed);
    for section in &mut job.sections {
        section.byte_range.end = section.byte_range.end.min(trimmed);
    }
}
