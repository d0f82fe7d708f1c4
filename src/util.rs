use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(repo_root).with_context(|| {
        format!(
            "strip prefix {} from {}",
            repo_root.display(),
            path.display()
        )
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Repo-relative form of a user-supplied path, absolute or not.
pub fn repo_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    if path.is_absolute() {
        let root = repo_root
            .canonicalize()
            .unwrap_or_else(|_| repo_root.to_path_buf());
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        normalize_rel_path(&root, &path)
    } else {
        Ok(normalize_path(path))
    }
}

pub fn slice_lines(content: &str, start_line: i64, end_line: i64) -> String {
    if content.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = (start_line.max(1) - 1) as usize;
    let mut end = end_line.max(1) as usize;
    if start >= lines.len() {
        return String::new();
    }
    if end > lines.len() {
        end = lines.len();
    }
    if end <= start {
        end = start + 1;
    }
    lines[start..end].join("\n")
}

pub fn truncate_str_bytes(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes.min(value.len());
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}
