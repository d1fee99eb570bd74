pub mod confirm_overlay;
pub mod header;
pub mod log_panel;
pub mod menu;
