//! Pipeline stages for PDF-to-course generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the model backend can be swapped without touching
//! the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ normalize ──▶ layout ──▶ render
//! (URL/path) (lopdf)   (model)  (fences/JSON) (blocks/pages) (lopdf)
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL into memory
//! 2. [`extract`]   — plain text of every page, in order
//! 3. [`llm`]       — the completion-service port; the only stage with
//!    network I/O besides downloads
//! 4. [`normalize`] — strip Markdown fences and parse the JSON reply
//! 5. [`layout`]    — course → layout blocks → positioned lines per page,
//!    measured with the [`fonts`] metrics
//! 6. [`render`]    — write the pages as a PDF

pub mod extract;
pub mod fonts;
pub mod input;
pub mod layout;
pub mod llm;
pub mod normalize;
pub mod render;
