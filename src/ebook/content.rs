//! Lazily-read content: binary [`Flob`]s and textual [`Text`]s.
//!
//! Both are cheap, cloneable handles. Creating one never reads the
//! backing resource, and reading one never caches; I/O failures surface
//! as [`ContentError`](crate::ebook::errors::ContentError) at the read call.

pub(crate) mod consts;
mod flob;
mod text;

pub use self::flob::Flob;
pub use self::text::{Lines, Text};
