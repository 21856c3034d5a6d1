use std::path::Path;

/// Maximum length of a generated filename in bytes
pub const MAX_FILENAME_BYTES: usize = 255;

/// Characters never allowed in an output filename
const UNSAFE_FILENAME_CHARS: &[char] = &[
    '?', '[', ']', '/', '\\', '=', '<', '>', ':', ';', ',', '\'', '"', '&', '$', '#', '*', '(',
    ')', '|', '~', '`', '!', '{', '}', '%', '+',
];

/// Sanitizes a user-requested output filename.
///
/// Keeps only the last path component, drops control and reserved characters,
/// turns inner whitespace runs into a single `-` and trims separators from both
/// ends. May return an empty string; callers decide the fallback.
pub fn sanitize_filename(filename: &str) -> String {
    // Get only the filename component (remove any path)
    let normalized = filename.replace('\\', "/");
    let name = Path::new(normalized.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if normalized.contains("..") {
        tracing::debug!("Path components stripped from requested filename: {}", filename);
    }

    let mut sanitized = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if c.is_control() || UNSAFE_FILENAME_CHARS.contains(&c) {
            continue;
        }
        if pending_dash && !sanitized.is_empty() {
            sanitized.push('-');
        }
        pending_dash = false;
        sanitized.push(c);
    }

    let trimmed = sanitized.trim_matches(|c: char| c == '.' || c == '-' || c == '_');

    truncate_on_char_boundary(trimmed, MAX_FILENAME_BYTES).to_string()
}

/// Cuts `value` to at most `max` bytes without splitting a character.
pub fn truncate_on_char_boundary(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Normalizes a form field key: lowercase, ASCII alphanumerics and `_` only.
pub fn normalize_field_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Lowercase slug: ASCII alphanumerics kept, every other run becomes one `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// True if the name ends in `.htm` or `.html`, case-insensitively.
pub fn has_html_extension(name: &str) -> bool {
    html_extension_len(name).is_some()
}

/// Removes a trailing `.htm`/`.html` extension if present.
pub fn strip_html_extension(name: &str) -> &str {
    match html_extension_len(name) {
        Some(len) => &name[..name.len() - len],
        None => name,
    }
}

fn html_extension_len(name: &str) -> Option<usize> {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".html") {
        Some(5)
    } else if lower.ends_with(".htm") {
        Some(4)
    } else {
        None
    }
}

/// Removes a trailing `_NN` iteration suffix (exactly two digits).
pub fn strip_iteration_suffix(stem: &str) -> &str {
    let bytes = stem.as_bytes();
    let len = bytes.len();
    if len >= 3
        && bytes[len - 3] == b'_'
        && bytes[len - 2].is_ascii_digit()
        && bytes[len - 1].is_ascii_digit()
    {
        &stem[..len - 3]
    } else {
        stem
    }
}

/// Checks that a media type looks like `type/subtype` made of token characters.
pub fn is_well_formed_media_type(value: &str) -> bool {
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
    };

    match value.split_once('/') {
        Some((kind, subtype)) => is_token(kind) && is_token(subtype),
        None => false,
    }
}
