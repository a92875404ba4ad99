//! # Document Templates
//!
//! Public template links: [`service::TemplateFillService`] hands out the
//! template and its field definitions, then renders a filled copy and opens a
//! signature request for it.

pub mod docx;
pub mod placeholders;
pub mod service;

pub use docx::{DocumentError, render_docx};
pub use service::TemplateFillService;
