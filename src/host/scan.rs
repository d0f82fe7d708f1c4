use anyhow::{Context, Result};
use blake3::Hasher;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

pub const CSHARP_EXTENSIONS: &[&str] = &["cs", "csx"];

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

pub fn scan_repo(repo_root: &Path) -> Result<Vec<ScannedFile>> {
    scan_repo_with_options(repo_root, ScanOptions::default())
}

pub fn scan_repo_with_options(repo_root: &Path, options: ScanOptions) -> Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "walk error");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        if !is_csharp(path) {
            continue;
        }
        let rel_path = crate::util::normalize_rel_path(repo_root, path)?;
        let hash = hash_file(path).with_context(|| format!("hash {}", path.display()))?;
        files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
            hash,
        });
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    tracing::debug!(files = files.len(), root = %repo_root.display(), "scanned repo");
    Ok(files)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_name() {
        name if name == OsStr::new(".git") => true,
        name if name == OsStr::new("bin") => true,
        name if name == OsStr::new("obj") => true,
        _ => false,
    }
}

pub fn is_csharp(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CSHARP_EXTENSIONS.contains(&ext))
}

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

pub fn hash_file(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    Ok(hash_bytes(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_only_csharp_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/obj")).unwrap();
        fs::write(dir.path().join("src/A.cs"), "class A {}").unwrap();
        fs::write(dir.path().join("src/B.txt"), "nope").unwrap();
        fs::write(dir.path().join("src/obj/Gen.cs"), "class G {}").unwrap();
        fs::write(dir.path().join("Script.csx"), "var x = 1;").unwrap();
        let files = scan_repo(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|file| file.rel_path.as_str()).collect();
        assert_eq!(names, vec!["Script.csx", "src/A.cs"]);
        assert_eq!(files[1].hash, hash_bytes(b"class A {}"));
    }

    #[test]
    fn gitignore_respected_unless_disabled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "Generated.cs\n").unwrap();
        fs::write(dir.path().join("Generated.cs"), "class G {}").unwrap();
        fs::write(dir.path().join("Kept.cs"), "class K {}").unwrap();
        assert_eq!(scan_repo(dir.path()).unwrap().len(), 1);
        let all = scan_repo_with_options(dir.path(), ScanOptions::new(true)).unwrap();
        assert_eq!(all.len(), 2);
    }
}
