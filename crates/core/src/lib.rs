//! Core domain types, rate limiting, layout adjustment and shape-tree
//! translation for PowerPoint deck translation.

pub mod error;
pub mod layout;
pub mod model;
pub mod ratelimit;
pub mod text;
pub mod walk;

pub use error::{Error, Result};
pub use layout::adjust_font_size;
pub use model::{
    Cell, Paragraph, PresentationFormat, Row, Run, RunKey, Shape, Slide, Table, TextFrame,
};
pub use ratelimit::{estimate_tokens, Clock, RateLimiter, RateLimits, SystemClock};
pub use text::is_meaningful;
pub use walk::{translate_shapes, translate_slide, Translator, WalkStats};
