//! Jar writer for a staged webjar tree.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Result, WebjarError};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub entries: usize,
    pub size: u64,
    pub sha256: String,
}

fn generated_manifest() -> String {
    format!(
        "Manifest-Version: 1.0\r\nCreated-By: webjar {}\r\n\r\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Zip `build_dir` into `build_dir/<file_name>`.
///
/// The manifest is always the first entry: the staged one if present,
/// otherwise a generated one. The archive never contains itself.
pub fn build_archive(build_dir: &Path, file_name: &str) -> Result<ArchiveInfo> {
    if !build_dir.is_dir() {
        return Err(WebjarError::packaging(format!(
            "staging directory {} does not exist; nothing to package",
            build_dir.display()
        )));
    }

    let archive_path = build_dir.join(file_name);
    let mut entries = collect_entries(build_dir, &archive_path)?;
    let manifest_idx = entries
        .iter()
        .position(|(name, is_dir)| !is_dir && name == MANIFEST_PATH);
    let staged_manifest = manifest_idx.map(|idx| entries.remove(idx));
    entries.retain(|(name, is_dir)| !(*is_dir && name == "META-INF/"));

    let file = File::create(&archive_path).map_err(|e| archive_error(&archive_path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.add_directory("META-INF/", options).map_err(zip_error)?;
    zip.start_file(MANIFEST_PATH, options).map_err(zip_error)?;
    match staged_manifest {
        Some(_) => {
            let mut src = File::open(build_dir.join(MANIFEST_PATH))
                .map_err(|e| archive_error(build_dir.join(MANIFEST_PATH), e))?;
            io::copy(&mut src, &mut zip).map_err(|e| archive_error(&archive_path, e))?;
        }
        None => zip
            .write_all(generated_manifest().as_bytes())
            .map_err(|e| archive_error(&archive_path, e))?,
    }

    for (name, is_dir) in &entries {
        if *is_dir {
            zip.add_directory(name.as_str(), options).map_err(zip_error)?;
        } else {
            let src_path = build_dir.join(name);
            zip.start_file(name.as_str(), options).map_err(zip_error)?;
            let mut src = File::open(&src_path).map_err(|e| archive_error(&src_path, e))?;
            io::copy(&mut src, &mut zip).map_err(|e| archive_error(&archive_path, e))?;
        }
    }

    zip.finish().map_err(zip_error)?;

    let bytes = fs::read(&archive_path).map_err(|e| archive_error(&archive_path, e))?;
    Ok(ArchiveInfo {
        entries: entries.len() + 2,
        size: bytes.len() as u64,
        sha256: hex::encode(Sha256::digest(&bytes)),
        path: archive_path,
    })
}

/// `(entry name, is_dir)` pairs in walk order; directory names end in `/`.
fn collect_entries(build_dir: &Path, archive_path: &Path) -> Result<Vec<(String, bool)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(build_dir)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| WebjarError::packaging(format!("failed to read staging tree: {e}")))?;
        let path = entry.path();
        if path == archive_path {
            continue;
        }
        let Ok(rel) = path.strip_prefix(build_dir) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            entries.push((format!("{name}/"), true));
        } else if path.is_file() {
            entries.push((name, false));
        }
    }
    Ok(entries)
}

fn archive_error(path: impl AsRef<Path>, err: io::Error) -> WebjarError {
    WebjarError::packaging(format!(
        "failed to write archive entry {}: {err}",
        path.as_ref().display()
    ))
}

fn zip_error(err: zip::result::ZipError) -> WebjarError {
    WebjarError::packaging(format!("failed to build archive: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).expect("open")).expect("zip");
        (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn archives_staged_tree_with_manifest_first() {
        let td = tempdir().expect("tempdir");
        let build = td.path().join("maven-dist");
        write(
            &build.join("META-INF/resources/webjars/foo/1.2.3/index.js"),
            "x",
        );

        let info = build_archive(&build, "foo-1.2.3.jar").expect("archive");
        assert_eq!(info.path, build.join("foo-1.2.3.jar"));
        assert_eq!(info.sha256.len(), 64);
        assert!(info.size > 0);

        let names = entry_names(&info.path);
        assert_eq!(names[0], "META-INF/");
        assert_eq!(names[1], MANIFEST_PATH);
        assert!(names.contains(&"META-INF/resources/webjars/foo/1.2.3/index.js".to_string()));
        assert!(!names.iter().any(|n| n.ends_with(".jar")));
        assert_eq!(names.len(), info.entries);
    }

    #[test]
    fn staged_manifest_is_kept() {
        let td = tempdir().expect("tempdir");
        let build = td.path().join("maven-dist");
        write(&build.join(MANIFEST_PATH), "Manifest-Version: 1.0\r\nX-Custom: yes\r\n");

        let info = build_archive(&build, "foo.jar").expect("archive");
        let mut archive = ZipArchive::new(File::open(&info.path).expect("open")).expect("zip");
        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_PATH)
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read");
        assert!(manifest.contains("X-Custom: yes"));
        assert_eq!(
            entry_names(&info.path)
                .iter()
                .filter(|n| n.as_str() == MANIFEST_PATH)
                .count(),
            1
        );
    }

    #[test]
    fn rebuilding_does_not_nest_previous_archive() {
        let td = tempdir().expect("tempdir");
        let build = td.path().join("maven-dist");
        write(&build.join("META-INF/resources/a.css"), "a");

        let first = build_archive(&build, "foo.jar").expect("first");
        let second = build_archive(&build, "foo.jar").expect("second");
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn missing_build_dir_is_packaging_error() {
        let td = tempdir().expect("tempdir");
        let err = build_archive(&td.path().join("maven-dist"), "foo.jar").unwrap_err();
        assert!(matches!(err, WebjarError::Packaging(_)));
    }
}
