// Presentation layer - Visual mappings, panel content and the terminal front-end
pub mod commands;
pub mod console_surface;
pub mod html_export;
pub mod info_cards;
pub mod mapping;
