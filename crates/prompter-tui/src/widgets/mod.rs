mod script_view;
mod status_bar;

pub use script_view::ScriptViewWidget;
pub use status_bar::StatusBarWidget;
