//! notary-watermark
//!
//! Produces the provenance derivative of a PDF: every page gets the marker
//! text in its lower-left corner and, when one can be fetched and decoded, a
//! small logo just above it.
//!
//! Only an unreadable document is fatal. Logo problems degrade to a text-only
//! stamp (or, under `TextPolicy::WithLogoOnly`, an unmarked copy).

pub mod engine;
pub mod logo;
pub mod overlay;

pub use engine::WatermarkEngine;
pub use logo::{decode_logo, LogoDecode, LogoDecoder, LogoFetch, LogoImage, LogoSource, LOGO_DECODERS};
pub use overlay::StampSummary;
