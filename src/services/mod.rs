// src/services/mod.rs
pub mod gemini;
pub mod image_processor;
pub mod pipeline;
pub mod session_store;
pub mod stylist;

pub use gemini::GeminiClient;
pub use image_processor::ImageProcessor;
pub use pipeline::StylingPipeline;
pub use session_store::SessionStore;
pub use stylist::StylistService;
