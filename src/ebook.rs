//! Core ebook model and its persistence.
//!
//! # Overview
//! A [`Book`](book::Book) is the root of a [`Chapter`](chapter::Chapter) tree.
//! Every chapter carries a [`VariantMap`](variant::VariantMap) of typed attributes,
//! an optional lazy [`Text`](content::Text), and its ordered children.
//!
//! ## Core Components
//! - [`book`]: The root of a chapter tree plus book-level extensions.
//! - [`chapter`]: Tree nodes with single-parent ownership and explicit cleanup.
//! - [`attributes`]: Standard attribute names and typed accessors.
//! - [`variant`]: Closed-set attribute values, type tags, and the [`Registry`](variant::Registry).
//! - [`content`]: Lazily-read binary ([`Flob`](content::Flob)) and textual content.
//! - [`errors`]: Ebook-related error types.
//!
//! ## Persistence
//! - [`archive`]: Named-entry stores over zip files and directories.
//! - [`pmab`]: The PMAB archive format.

pub mod archive;
pub mod attributes;
pub mod book;
pub mod chapter;
pub mod content;
pub mod errors;
pub mod pmab;
pub mod variant;
