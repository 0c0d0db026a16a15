//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes `path` into an absolute path.
///
/// Relative paths are anchored at `root`. `.` components are dropped and `..`
/// components pop their parent. The filesystem is never consulted, so the
/// path does not need to exist.
pub fn normalize<P: AsRef<Path>>(root: &Path, path: P) -> PathBuf {
    let path = path.as_ref();
    let joined = match path.is_absolute() {
        true => path.to_path_buf(),
        false => root.join(path),
    };
    let mut result = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::CurDir => (),
            Component::ParentDir => {
                // never pop past the root
                if result.parent().is_some() {
                    result.pop();
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Normalizes `path` against the current working directory.
pub fn absolute<P: AsRef<Path>>(path: P) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::env::current_dir()?, path))
}

/// Converts a path into a string with forward slashes for display purposes.
pub fn into_std_str(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Checks if `dir` exists and contains at least one entry.
pub fn is_populated_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_relative() {
        let root = PathBuf::from("/work/proj");
        assert_eq!(normalize(&root, "rtl/top.vhd"), PathBuf::from("/work/proj/rtl/top.vhd"));
        assert_eq!(normalize(&root, "./rtl/../tb/tb.vhd"), PathBuf::from("/work/proj/tb/tb.vhd"));
        assert_eq!(normalize(&root, "../lib"), PathBuf::from("/work/lib"));
    }

    #[test]
    fn normalize_absolute() {
        let root = PathBuf::from("/work/proj");
        assert_eq!(normalize(&root, "/opt/ip/./core.v"), PathBuf::from("/opt/ip/core.v"));
        assert_eq!(normalize(&root, "/../a"), PathBuf::from("/a"));
    }

    #[test]
    fn populated_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(is_populated_dir(dir.path()), false);
        std::fs::write(dir.path().join("a.v"), "").unwrap();
        assert_eq!(is_populated_dir(dir.path()), true);
        assert_eq!(is_populated_dir(&dir.path().join("missing")), false);
    }
}
