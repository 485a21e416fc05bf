//! Filepath: src/infra/utils.rs
//! Path helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic, testable, and discoverable.

use std::path::{Path, PathBuf};

/// String-level path helpers. Build logs carry paths as text,
/// so these operate on `&str` and always produce forward slashes.
pub struct PathUtils;

impl PathUtils
{
    /// True for `/abs`, `C:\abs`, `C:/abs` and `\\unc` forms
    pub fn is_abs(path: &str) -> bool
    {
        if path.starts_with('/') || path.starts_with("\\\\")
        {
            return true;
        }

        // Drive letter prefix
        let bytes = path.as_bytes();
        bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'/' || bytes[2] == b'\\')
    }

    /// Canonical slash form used for every directory we record
    pub fn convert_path(path: &str) -> String
    {
        path.replace('\\', "/")
    }

    /// Join `rel` onto `base` and resolve `.` and `..` lexically.
    /// An absolute `rel` replaces `base`.
    pub fn join_clean(
        base: &str,
        rel: &str,
    ) -> String
    {
        let rel = Self::convert_path(rel);
        let joined = if Self::is_abs(&rel)
        {
            rel
        }
        else
        {
            let base = Self::convert_path(base);
            format!("{}/{}", base.trim_end_matches('/'), rel)
        };

        Self::clean(&joined)
    }

    /// Lexical cleanup: collapse `//`, drop `.`, fold `..`
    pub fn clean(path: &str) -> String
    {
        // Keep a drive or root prefix out of the folding
        let (prefix, rest) = split_root(path);
        let rooted = !prefix.is_empty();

        let mut parts: Vec<&str> = Vec::new();

        for seg in rest.split('/')
        {
            match seg
            {
                "" | "." => {}
                ".." =>
                {
                    match parts
                        .last()
                        .copied()
                    {
                        Some("..") => parts.push(".."),
                        Some(_) =>
                        {
                            parts.pop();
                        }
                        None if !rooted => parts.push(".."),
                        // `..` at the root stays at the root
                        None => {}
                    }
                }
                s => parts.push(s),
            }
        }

        let body = parts.join("/");

        if rooted
        {
            format!("{prefix}{body}")
        }
        else if body.is_empty()
        {
            ".".to_string()
        }
        else
        {
            body
        }
    }

    /// Existence check used by strict mode
    pub fn file_exists(path: &str) -> bool
    {
        Path::new(path).exists()
    }

    /// Resolve an executable name against `PATH`.
    /// Names that already contain a separator are checked directly.
    pub fn find_in_path(name: &str) -> Option<PathBuf>
    {
        if name.contains('/') || name.contains('\\')
        {
            let p = PathBuf::from(name);
            return is_executable(&p).then(|| dunce::canonicalize(&p).unwrap_or(p));
        }

        let paths = std::env::var_os("PATH")?;
        Self::find_in_dirs(name, std::env::split_paths(&paths))
    }

    /// First executable `name` under `dirs`. Relative entries such as
    /// `.` or `bin` are skipped so the result is always absolute.
    pub fn find_in_dirs<I>(
        name: &str,
        dirs: I,
    ) -> Option<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for dir in dirs
        {
            if !dir.is_absolute()
            {
                continue;
            }

            for candidate in executable_candidates(&dir, name)
            {
                if is_executable(&candidate)
                {
                    return Some(candidate);
                }
            }
        }

        None
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool
{
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool
{
    path.is_file()
}

/// Split `/`, `C:/` or `//` style roots from the remainder
fn split_root(path: &str) -> (&str, &str)
{
    let bytes = path.as_bytes();

    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
    {
        return path.split_at(3);
    }

    if path.starts_with("//")
    {
        return path.split_at(2);
    }

    if path.starts_with('/')
    {
        return path.split_at(1);
    }

    ("", path)
}

#[cfg(windows)]
fn executable_candidates(
    dir: &Path,
    name: &str,
) -> Vec<PathBuf>
{
    if Path::new(name)
        .extension()
        .is_some()
    {
        return vec![dir.join(name)];
    }

    vec![dir.join(format!("{name}.exe")), dir.join(name)]
}

#[cfg(not(windows))]
fn executable_candidates(
    dir: &Path,
    name: &str,
) -> Vec<PathBuf>
{
    vec![dir.join(name)]
}
