use eframe::egui::{self, Key, Modifiers};

/// Enter sends; Shift+Enter is left for the text edit to insert a newline.
pub fn submits_on_enter(modifiers: Modifiers) -> bool {
    !modifiers.shift
}

/// Consumes a plain Enter press aimed at the focused composer so the text edit
/// never sees it. Must run before the text edit is drawn.
pub fn take_submit_key(ctx: &egui::Context, composer_id: egui::Id) -> bool {
    if !ctx.memory(|memory| memory.has_focus(composer_id)) {
        return false;
    }
    ctx.input_mut(|input| {
        let modifiers = input.modifiers;
        let pressed = input.key_pressed(Key::Enter) && submits_on_enter(modifiers);
        if pressed {
            input.consume_key(modifiers, Key::Enter);
        }
        pressed
    })
}

#[cfg(test)]
mod tests {
    use super::submits_on_enter;
    use eframe::egui::Modifiers;

    #[test]
    fn plain_enter_submits() {
        assert!(submits_on_enter(Modifiers::NONE));
        assert!(submits_on_enter(Modifiers::CTRL));
    }

    #[test]
    fn shift_enter_inserts_newline() {
        assert!(!submits_on_enter(Modifiers::SHIFT));
        assert!(!submits_on_enter(Modifiers::SHIFT | Modifiers::CTRL));
    }
}
