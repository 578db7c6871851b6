//! PPTX (Office Open XML) package backend for deck translation.
//!
//! Opens .pptx files (ZIP archives containing XML documents), exposes each
//! slide's shape tree and writes edited runs back into a new package.

pub mod package;
pub mod slide;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use package::Deck;
pub use slide::SlidePart;
