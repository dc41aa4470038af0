//! Engine path utilities
//!
//! Engine paths use either separator and may start with a `$alias$`
//! prefix naming a root from the file-system configuration.

/// Normalize an engine path
/// - Converts backslashes to forward slashes
/// - Removes redundant separators and `.` components
/// - Resolves `..` without climbing above the start
/// - Keeps a leading `/` for absolute paths
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let absolute = path.starts_with('/');

    let mut components = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    let joined = components.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Case-folded key for case-insensitive lookups
pub fn path_key(path: &str) -> String {
    normalize_path(path).to_ascii_lowercase()
}

/// Split `$alias$rest` into the alias name and the remainder
pub fn split_alias(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix('$')?;
    let end = rest.find('$')?;
    let name = &rest[..end];
    if name.is_empty() {
        return None;
    }
    Some((name, rest[end + 1..].trim_start_matches(['/', '\\'])))
}

/// Split path into folder and file name
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Join an engine path onto a base folder
pub fn join_paths(base: &str, relative: &str) -> String {
    if base.is_empty() {
        return normalize_path(relative);
    }
    normalize_path(&format!("{}/{}", base.trim_end_matches(['/', '\\']), relative))
}

/// Check if path matches a glob pattern
/// Supports * (any chars) and ? (single char), ASCII case-insensitive
pub fn glob_match(pattern: &str, path: &str) -> bool {
    glob_match_impl(
        pattern.to_ascii_lowercase().as_bytes(),
        path.to_ascii_lowercase().as_bytes(),
    )
}

fn glob_match_impl(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        // Let the last star swallow one more byte.
        match backtrack {
            Some((star_p, star_t)) => {
                backtrack = Some((star_p, star_t + 1));
                p = star_p + 1;
                t = star_t + 1;
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Get file extension from path
pub fn get_extension(path: &str) -> Option<&str> {
    let (_, name) = split_path(path);
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => Some(&name[pos + 1..]),
        _ => None,
    }
}
