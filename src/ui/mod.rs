pub mod composer;
pub mod markdown;
pub mod source_panel;
