use std::path::{Path, PathBuf};

const SEARCH_PATHS: [&str; 3] = ["", "../", "../../"];

/// First existing `relative_path` below the working directory or one of
/// its parents.
pub fn find_resource(relative_path: impl AsRef<Path>) -> Option<PathBuf> {
    let relative_path = relative_path.as_ref();
    if relative_path.is_absolute() {
        return relative_path.exists().then(|| relative_path.to_path_buf());
    }
    SEARCH_PATHS
        .iter()
        .map(|base| Path::new(base).join(relative_path))
        .find(|full_path| full_path.exists())
}

/// Resolves a mesh given on the command line, also trying `meshes/`.
pub fn find_mesh(name: impl AsRef<Path>) -> Option<PathBuf> {
    let name = name.as_ref();
    find_resource(name).or_else(|| find_resource(Path::new("meshes").join(name)))
}

/// Cache directory: an existing one is reused, otherwise `dir` as given.
pub fn cache_dir(dir: impl AsRef<Path>) -> PathBuf {
    let dir = dir.as_ref();
    find_resource(dir)
        .filter(|p| p.is_dir())
        .unwrap_or_else(|| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_files_from_the_crate_root() {
        assert_eq!(find_resource("Cargo.toml"), Some(PathBuf::from("Cargo.toml")));
        assert!(find_resource("no/such/file.obj").is_none());
        assert!(find_mesh("no_such_mesh.obj").is_none());
    }

    #[test]
    fn missing_cache_dir_is_kept_as_given() {
        assert_eq!(cache_dir("no_such_cache_dir"), PathBuf::from("no_such_cache_dir"));
    }
}
