/// Fallback MIME for content without a recognized extension.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

pub(crate) mod text {
    pub(crate) const PLAIN: &str = "plain";
    pub(crate) const HTML: &str = "html";
}

// (extension, mime); the first extension listed for a MIME is preferred on output
#[rustfmt::skip]
const TABLE: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xhtml", "application/xhtml+xml"),
    ("css", "text/css"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("mp4", "video/mp4"),
    ("zip", "application/zip"),
    ("pdf", "application/pdf"),
    ("epub", "application/epub+zip"),
    ("pmab", "application/pmab+zip"),
];

/// Guesses the MIME of `name` from its extension (case-insensitive).
pub(crate) fn mime_for_name(name: &str) -> &'static str {
    crate::util::uri::extension(name)
        .and_then(|ext| {
            TABLE
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(OCTET_STREAM)
}

/// The preferred extension for `mime`, falling back to its subtype
/// (`image/x-icon` → `x-icon`).
pub(crate) fn extension_for_mime(mime: &str) -> &str {
    TABLE
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(mime))
        .map(|(ext, _)| *ext)
        .or_else(|| {
            mime.split_once('/')
                .map(|(_, sub)| sub.split(['+', ';']).next().unwrap_or(sub).trim())
                .filter(|sub| !sub.is_empty())
        })
        .unwrap_or("dat")
}
