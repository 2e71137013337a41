pub(crate) mod str;
pub(crate) mod uri;
