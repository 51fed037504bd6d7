//! Locating the raw files that make up one source.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{NetCdfError, NetCdfResult};

/// List files directly inside `directory` whose names match `pattern`.
///
/// Results are ordered by file name, which for yearly/monthly dumps is
/// chronological order.
pub fn locate_files(directory: &Path, pattern: &str) -> NetCdfResult<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            NetCdfError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let matched = entry
            .file_name()
            .to_str()
            .map(|name| wildcard_match(pattern, name))
            .unwrap_or(false);

        if matched {
            paths.push(entry.into_path());
        }
    }

    if paths.is_empty() {
        return Err(NetCdfError::NoFiles {
            directory: directory.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }

    debug!(
        directory = %directory.display(),
        pattern = pattern,
        count = paths.len(),
        "Located source files"
    );

    Ok(paths)
}

/// Match a file name against a pattern with `*` (any run) and `?` (one char).
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    // Position of the last '*' and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ni = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.nc", "era5_t2m_2001.nc"));
        assert!(!wildcard_match("*.nc", "era5_t2m_2001.nc.tmp"));
        assert!(wildcard_match("cru_ts4.04.*.tmp.dat.nc", "cru_ts4.04.1901.2019.tmp.dat.nc"));
        assert!(!wildcard_match("cru_ts4.04.*.tmp.dat.nc", "cru_ts4.04.1901.2019.tmx.dat.nc"));
        assert!(wildcard_match("t2m_19??.nc", "t2m_1999.nc"));
        assert!(!wildcard_match("t2m_19??.nc", "t2m_2000.nc"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_locate_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["t2m_2002.nc", "t2m_2001.nc", "notes.txt", "t2m_2003.nc"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.nc")).unwrap();

        let files = locate_files(dir.path(), "*.nc").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["t2m_2001.nc", "t2m_2002.nc", "t2m_2003.nc"]);
    }

    #[test]
    fn test_locate_files_none_matching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"").unwrap();
        let err = locate_files(dir.path(), "*.nc").unwrap_err();
        assert!(matches!(err, NetCdfError::NoFiles { .. }));
    }
}
