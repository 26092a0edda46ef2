use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::store::{Semester, SourceRef};

pub const ARCHIVE_DIR: &str = "dean_lists";
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

/// Lower-cased extension if it is one calamine can read.
pub fn workbook_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    WORKBOOK_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// `{semester}{year}dean list.{ext}`, the name uploads are stored under.
pub fn archive_file_name(semester: Semester, year: i64, ext: &str) -> String {
    format!("{}{}dean list.{}", semester.as_str(), year, ext)
}

pub fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Copy the uploaded workbook into `<dir>/dean_lists/` and fingerprint it.
///
/// An existing archive with the same name is replaced.
pub fn archive_workbook(
    src: &Path,
    dir: &Path,
    semester: Semester,
    year: i64,
) -> anyhow::Result<SourceRef> {
    let ext = workbook_extension(src)
        .ok_or_else(|| anyhow!("not a workbook: {}", src.to_string_lossy()))?;
    let out_dir = dir.join(ARCHIVE_DIR);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;

    let dst: PathBuf = out_dir.join(archive_file_name(semester, year, &ext));
    let tmp = dst.with_extension(format!("{ext}.copying"));
    std::fs::copy(src, &tmp).with_context(|| {
        format!(
            "failed to copy {} to {}",
            src.to_string_lossy(),
            tmp.to_string_lossy()
        )
    })?;
    std::fs::rename(&tmp, &dst).with_context(|| {
        format!("failed to move archived workbook to {}", dst.to_string_lossy())
    })?;

    let sha256 = sha256_file(&dst)?;
    Ok(SourceRef {
        path: Some(dst.to_string_lossy().to_string()),
        sha256: Some(sha256),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn extension_filter() {
        assert_eq!(workbook_extension(Path::new("a/B.XLSX")).as_deref(), Some("xlsx"));
        assert_eq!(workbook_extension(Path::new("list.ods")).as_deref(), Some("ods"));
        assert_eq!(workbook_extension(Path::new("list.csv")), None);
        assert_eq!(workbook_extension(Path::new("noext")), None);
    }

    #[test]
    fn archive_name_matches_upload_convention() {
        assert_eq!(
            archive_file_name(Semester::Spring, 2025, "xls"),
            "spring2025dean list.xls"
        );
    }

    #[test]
    fn archive_copies_and_hashes() {
        let dir = temp_dir("deanlist-archive");
        let src = dir.join("upload.xlsx");
        std::fs::write(&src, b"abc").unwrap();

        let r = archive_workbook(&src, &dir, Semester::Fall, 2024).expect("archive");
        let path = PathBuf::from(r.path.unwrap());
        assert_eq!(path, dir.join(ARCHIVE_DIR).join("fall2024dean list.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert_eq!(
            r.sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
