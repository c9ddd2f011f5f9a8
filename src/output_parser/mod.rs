//! # LLM Output Cleanup
//!
//! Turns raw model output into the plain text the pipeline passes between
//! stages: think blocks removed, a lone code fence unwrapped, and chatty
//! boilerplate prefixes ("Sure! ", "Here's your outline:") dropped.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`parse_text`] | Clean text extraction |
//! | [`parse_plain`] | Same, but keeps the opening words as written |
//! | [`preprocess`] | Think-block stripping, fence unwrapping, trimming |
//! | [`strip_think_tags`] | Remove `<think>` blocks from text |
//! | [`extract_thinking`] | Keep the removed reasoning for inspection |

pub mod error;
pub mod extract;
pub mod text;

pub use error::ParseError;
pub use extract::{extract_thinking, preprocess, strip_think_tags};
pub use text::{parse_plain, parse_text};
