use std::path::Path;

/// Static asset classes recognised by path extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Stylesheet,
    Script,
    Data,
    Font,
    Image,
    Audio,
}

impl AssetKind {
    /// Whether responses of this kind may be stored in the disk cache.
    /// JSON is usually API data rather than a static file, so it is never cached.
    pub fn cacheable(self) -> bool {
        !matches!(self, AssetKind::Data)
    }
}

/// Classify a request path by its extension into an (AssetKind, MIME type) pair.
///
/// Returns `None` for unrecognized extensions and for paths without one, including
/// HTML pages, which are always forwarded. Extensions are matched case-insensitively.
pub fn classify(path: &str) -> Option<(AssetKind, &'static str)> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();

    let result = match ext.as_str() {
        "css" => (AssetKind::Stylesheet, "text/css; charset=utf-8"),

        "js" => (AssetKind::Script, "application/javascript; charset=utf-8"),
        "mjs" => (AssetKind::Script, "application/javascript; charset=utf-8"),

        "json" => (AssetKind::Data, "application/json"),

        "woff" => (AssetKind::Font, "font/woff"),
        "woff2" => (AssetKind::Font, "font/woff2"),
        "ttf" => (AssetKind::Font, "font/ttf"),
        "otf" => (AssetKind::Font, "font/otf"),
        "eot" => (AssetKind::Font, "application/vnd.ms-fontobject"),

        "svg" => (AssetKind::Image, "image/svg+xml"),
        "png" => (AssetKind::Image, "image/png"),
        "jpg" => (AssetKind::Image, "image/jpeg"),
        "jpeg" => (AssetKind::Image, "image/jpeg"),
        "gif" => (AssetKind::Image, "image/gif"),
        "webp" => (AssetKind::Image, "image/webp"),
        "ico" => (AssetKind::Image, "image/x-icon"),

        "mp3" => (AssetKind::Audio, "audio/mpeg"),
        "m4a" => (AssetKind::Audio, "audio/mp4"),
        "wav" => (AssetKind::Audio, "audio/wav"),

        _ => return None,
    };

    Some(result)
}

/// Upstream content types that are too generic to trust for a known asset extension.
fn is_untrusted(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    matches!(
        essence.as_str(),
        "" | "application/octet-stream" | "text/plain" | "text/html"
    )
}

/// Content type to send instead of the upstream one, if it needs correcting.
///
/// Browsers refuse stylesheets and scripts served as `text/plain` or `text/html`
/// when `X-Content-Type-Options: nosniff` is set, so a missing or generic upstream
/// type is replaced by the one implied by the path extension.
pub fn corrected_content_type(path: &str, upstream: Option<&str>) -> Option<&'static str> {
    let (_, mime) = classify(path)?;
    match upstream {
        Some(ct) if !is_untrusted(ct) => None,
        _ => Some(mime),
    }
}

pub fn is_html(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/html")
}
