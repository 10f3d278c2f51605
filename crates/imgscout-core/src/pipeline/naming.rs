//! File and display name helpers.

/// Reduce `input` to `[A-Za-z0-9._-]`.
///
/// Each run of other characters becomes a single `_`, leading and trailing
/// underscores are trimmed, and `fallback` is returned if nothing is left.
pub fn safe_name(input: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Guess `(extension, mime type)` from a content type, then the URL.
///
/// Checks jpeg, png, gif and webp in that order and defaults to JPEG.
pub fn guess_ext_and_type(content_type: Option<&str>, url: &str) -> (&'static str, &'static str) {
    const KNOWN: [(&str, &[&str], &str, &str); 4] = [
        ("jpeg", &[".jpg", ".jpeg"], ".jpg", "image/jpeg"),
        ("png", &[".png"], ".png", "image/png"),
        ("gif", &[".gif"], ".gif", "image/gif"),
        ("webp", &[".webp"], ".webp", "image/webp"),
    ];

    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    for (ct_marker, suffixes, ext, mime) in KNOWN {
        let ct_hit = ct.contains(ct_marker) || (ct_marker == "jpeg" && ct.contains("jpg"));
        if ct_hit || suffixes.iter().any(|s| path.ends_with(s)) {
            return (ext, mime);
        }
    }
    (".jpg", "image/jpeg")
}

/// `(extension, mime type)` from the image's magic bytes, for the formats
/// [`guess_ext_and_type`] knows.
pub fn sniff_ext_and_type(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Jpeg => Some((".jpg", "image/jpeg")),
        image::ImageFormat::Png => Some((".png", "image/png")),
        image::ImageFormat::Gif => Some((".gif", "image/gif")),
        image::ImageFormat::WebP => Some((".webp", "image/webp")),
        _ => None,
    }
}

/// True when the content type declares WEBP.
pub fn is_webp(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("webp"))
        .unwrap_or(false)
}
