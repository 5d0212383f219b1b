//! Reference document loading for review context.
//!
//! Discovers manuals in a directory (the `ignore` crate walks it), extracts
//! their text (`pdf-extract` for PDFs), and concatenates the result into a
//! [`corpus::ReferenceCorpus`] bounded to a character budget. The corpus is
//! cached by [`corpus::DocumentLoader`] until the document set changes.

pub mod corpus;
pub mod extract;
pub mod walker;

pub use corpus::{DocumentLoader, ReferenceCorpus};
