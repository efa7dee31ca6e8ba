//! Source panel view derivation. Nothing here is stored; views are rebuilt
//! from the session's passages and expansion flags on every frame.

use crate::session::{Session, SourcePassage};
use std::borrow::Cow;

pub const PREVIEW_CHARS: usize = 150;
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassageBody<'a> {
    /// Plain text, possibly cut to [`PREVIEW_CHARS`].
    Preview(Cow<'a, str>),
    /// Full content, meant for the formatted-text renderer.
    Formatted(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageView<'a> {
    pub position: usize,
    pub title: String,
    pub header_lines: Vec<String>,
    pub expanded: bool,
    pub body: PassageBody<'a>,
}

pub fn passage_views(session: &Session) -> Vec<PassageView<'_>> {
    session
        .passages()
        .iter()
        .enumerate()
        .map(|(position, passage)| passage_view(position, passage, session.is_expanded(position)))
        .collect()
}

pub fn passage_view(position: usize, passage: &SourcePassage, expanded: bool) -> PassageView<'_> {
    let body = if expanded {
        PassageBody::Formatted(&passage.content)
    } else {
        PassageBody::Preview(collapsed_preview(&passage.content))
    };

    PassageView {
        position,
        title: format!("Source {}", passage.label(position)),
        header_lines: header_lines(passage),
        expanded,
        body,
    }
}

/// First [`PREVIEW_CHARS`] characters plus [`ELLIPSIS`] when the content is
/// longer, otherwise the content untouched.
pub fn collapsed_preview(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}{ELLIPSIS}", &content[..cut])),
        None => Cow::Borrowed(content),
    }
}

pub fn header_lines(passage: &SourcePassage) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(section) = non_empty(passage.section_label.as_deref()) {
        lines.push(format!("Section: {section}"));
    }
    if let Some(subsection) = non_empty(passage.subsection_label.as_deref()) {
        lines.push(format!("Subsection: {subsection}"));
    }
    lines
}

pub fn summary_line(session: &Session) -> Option<String> {
    match session.passages().len() {
        0 => None,
        count => Some(format!("{count} relevant chunks found")),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
