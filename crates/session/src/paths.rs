//! File path to `file://` URI conversion.

use std::path::{Component, Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Turn a path as typed by a user into the absolute URI engines report.
///
/// - `file:///srv/foo.php` is returned as-is
/// - `/srv/foo.php` becomes `file:///srv/foo.php`
/// - `foo.php` is resolved against `code_dir`
pub fn to_absolute_uri(path: &str, code_dir: &Path) -> String {
    if path.starts_with(FILE_SCHEME) {
        return path.to_string();
    }

    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        code_dir.join(path)
    };
    format!("{FILE_SCHEME}{}", clean(&absolute).display())
}

/// Strip the scheme from a `file://` URI, leaving other strings alone.
pub fn to_local_path(uri: &str) -> &str {
    uri.strip_prefix(FILE_SCHEME).unwrap_or(uri)
}

/// Where the file behind `uri` lives on this machine.
///
/// URIs under the engine's `code_dir` are moved onto the local `codebase`;
/// anything else is taken as a local path already.
pub fn to_codebase_path(uri: &str, code_dir: &Path, codebase: &Path) -> PathBuf {
    let path = Path::new(to_local_path(uri));
    match path.strip_prefix(code_dir) {
        Ok(relative) => codebase.join(relative),
        Err(_) => path.to_path_buf(),
    }
}

/// Drop `.` components and fold `..` into its parent.
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_is_unchanged() {
        assert_eq!(
            to_absolute_uri("file:///srv/www/index.php", Path::new("/home/me")),
            "file:///srv/www/index.php"
        );
    }

    #[test]
    fn absolute_path_gains_scheme() {
        assert_eq!(
            to_absolute_uri("/srv/www/index.php", Path::new("/home/me")),
            "file:///srv/www/index.php"
        );
    }

    #[test]
    fn relative_path_joins_code_dir() {
        assert_eq!(
            to_absolute_uri("index.php", Path::new("/srv/www")),
            "file:///srv/www/index.php"
        );
        assert_eq!(
            to_absolute_uri("./core/../index.php", Path::new("/srv/www")),
            "file:///srv/www/index.php"
        );
    }

    #[test]
    fn local_path() {
        assert_eq!(to_local_path("file:///srv/index.php"), "/srv/index.php");
        assert_eq!(to_local_path("index.php"), "index.php");
    }

    #[test]
    fn remote_uri_maps_onto_local_codebase() {
        let local = to_codebase_path(
            "file:///var/www/html/lib/util.php",
            Path::new("/var/www/html"),
            Path::new("/home/me/shop"),
        );

        assert_eq!(local, Path::new("/home/me/shop/lib/util.php"));
    }

    #[test]
    fn uri_outside_code_dir_is_left_alone() {
        let local = to_codebase_path(
            "file:///usr/share/php/Pear.php",
            Path::new("/var/www/html"),
            Path::new("/home/me/shop"),
        );

        assert_eq!(local, Path::new("/usr/share/php/Pear.php"));
    }
}
