//! Locator resolution
//!
//! Rendition URIs are written in absolute form so a synthesized playlist can
//! be served from any location.

/// Resolve `reference` against `base`.
///
/// Absolute URIs and `data:` locators are returned unchanged. A base that
/// ends in a file name (`.../master.m3u8`) resolves against its directory;
/// any other base is treated as a directory.
pub fn resolve(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    if is_absolute(reference) {
        return reference.to_string();
    }

    let (origin, base_path) = split_origin(strip_suffix(base.trim()));
    let (ref_path, ref_suffix) = split_suffix(reference);

    let joined = if ref_path.starts_with('/') {
        ref_path.to_string()
    } else {
        format!("{}{}", base_directory(base_path), ref_path)
    };

    format!("{}{}{}", origin, normalize_path(&joined), ref_suffix)
}

/// True for `scheme://...` and `data:` locators
pub fn is_absolute(locator: &str) -> bool {
    locator.contains("://") || locator.starts_with("data:")
}

/// Final path segment of a locator, without query
pub fn file_name(locator: &str) -> &str {
    let path = strip_suffix(locator);
    path.rsplit('/').next().unwrap_or(path)
}

/// Drop query and fragment
fn strip_suffix(locator: &str) -> &str {
    split_suffix(locator).0
}

fn split_suffix(locator: &str) -> (&str, &str) {
    match locator.find(&['?', '#'][..]) {
        Some(pos) => locator.split_at(pos),
        None => (locator, ""),
    }
}

/// Split `scheme://host/path` into (`scheme://host`, `/path`)
fn split_origin(locator: &str) -> (&str, &str) {
    match locator.find("://") {
        Some(scheme_end) => {
            let host_start = scheme_end + 3;
            match locator[host_start..].find('/') {
                Some(path_start) => locator.split_at(host_start + path_start),
                None => (locator, ""),
            }
        }
        None => ("", locator),
    }
}

fn base_directory(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if path.ends_with('/') {
        return path.to_string();
    }

    match path.rsplit_once('/') {
        Some((dir, last)) if last.contains('.') => format!("{}/", dir),
        None if path.contains('.') => String::new(),
        _ => format!("{}/", path),
    }
}

/// Collapse `.`, `..` and empty segments
fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/') && path.len() > 1;

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push('/');
    }
    out
}
