pub mod cache;
pub mod canvas;
pub mod config;
pub mod error;
pub mod export;
pub mod mark;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod sync;
