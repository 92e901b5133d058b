pub mod folder_source;
pub mod png_display;
