/// Normalises a category into the container name it maps to.
///
/// Returns `None` when nothing is left after trimming.
pub fn normalize_category(category: &str) -> Option<String> {
    let container = category.trim().to_lowercase();
    if container.is_empty() {
        None
    } else {
        Some(container)
    }
}

/// The extension of the given file name including the leading dot,
/// or an empty string if it has none.
pub fn file_extension(file_name: &str) -> &str {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => &base[idx..],
        _ => "",
    }
}

/// Recovers the blob name from a previously returned public URL.
pub fn blob_name_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
