//! Slash-separated path helpers.
//!
//! Catalog paths are backend paths, not host paths: SMB shares, FTP trees and
//! WebDAV collections all use `/` regardless of the platform the scanner runs
//! on, so these helpers operate on strings rather than `std::path`.

/// Join a directory path and an entry name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Directory portion of `path`; `None` for a bare name or the root itself.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Last path component.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Lowercased extension without the dot, if the name has one.
pub fn extension(name: &str) -> Option<String> {
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    Some(name[idx + 1..].to_ascii_lowercase())
}

/// True when `path` equals `prefix` or lies below it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return !path.is_empty();
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Replace the `old_prefix` of `path` with `new_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(path, old_prefix) {
        return None;
    }
    let old_prefix = old_prefix.trim_end_matches('/');
    Some(format!("{}{}", new_prefix.trim_end_matches('/'), &path[old_prefix.len()..]))
}
