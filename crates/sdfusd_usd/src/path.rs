//! Prim path helpers.
//!
//! Paths are plain strings (`/world/model/link`). The pseudo-root is `/`.

pub const ROOT: &str = "/";

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turn an arbitrary name into a legal prim name.
pub fn make_valid_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

pub fn is_absolute_prim_path(path: &str) -> bool {
    if path == ROOT {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(is_valid_identifier),
        None => false,
    }
}

pub fn append_child(parent: &str, name: &str) -> String {
    if parent == ROOT || parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Parent path; `None` for the pseudo-root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(i) => Some(&path[..i]),
        None => Some(ROOT),
    }
}

/// Last path element.
pub fn prim_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip a property suffix (`/a/b.outputs:rgb` -> `/a/b`).
pub fn prim_part(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].find('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    }
}

/// Whether `path` is `prefix` or lies below it.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == ROOT {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('.'),
        None => false,
    }
}

/// Move `path` from under `from` to under `to`.
pub fn replace_prefix(path: &str, from: &str, to: &str) -> Option<String> {
    if !has_prefix(path, from) {
        return None;
    }
    let rest = if from == ROOT { &path[1..] } else { &path[from.len()..] };
    if rest.is_empty() {
        return Some(to.to_string());
    }
    if rest.starts_with('.') {
        return Some(format!("{}{}", to, rest));
    }
    Some(append_child(to, rest.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("ground_plane"));
        assert!(!is_valid_identifier("2cubes"));
        assert!(!is_valid_identifier("a b"));
        assert_eq!(make_valid_identifier("my robot-1"), "my_robot_1");
        assert_eq!(make_valid_identifier("2cubes"), "_2cubes");
        assert_eq!(make_valid_identifier(""), "_");
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_path("/world/box"), Some("/world"));
        assert_eq!(parent_path("/world"), Some("/"));
        assert_eq!(parent_path("/"), None);
        assert_eq!(prim_name("/world/box"), "box");
        assert_eq!(append_child("/", "world"), "/world");
        assert_eq!(append_child("/world", "box"), "/world/box");
    }

    #[test]
    fn test_prefix() {
        assert!(has_prefix("/box/link", "/box"));
        assert!(has_prefix("/box", "/box"));
        assert!(!has_prefix("/boxes", "/box"));
        assert_eq!(
            replace_prefix("/Robot/base/visual", "/Robot", "/world/robot"),
            Some("/world/robot/base/visual".to_string())
        );
        assert_eq!(
            replace_prefix("/Looks/M/Tex.outputs:rgb", "/Looks/M", "/x"),
            Some("/x/Tex.outputs:rgb".to_string())
        );
    }

    #[test]
    fn test_prim_part() {
        assert_eq!(prim_part("/Looks/M/Tex.outputs:rgb"), "/Looks/M/Tex");
        assert_eq!(prim_part("/Looks/M"), "/Looks/M");
    }
}
