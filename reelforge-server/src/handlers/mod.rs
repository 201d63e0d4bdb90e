//! HTTP request handlers organized by functionality

pub mod catalog;
pub mod renders;
pub mod scenes;

pub use catalog::{health_handler, list_music_styles_handler, list_voices_handler};
pub use renders::{
    cancel_render_handler, create_render_handler, get_render_handler,
};
pub use scenes::enrich_scenes_handler;
