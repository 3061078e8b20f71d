use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FdError;

/// Writes `content` to `dir/file_name` through a temp file in the same
/// directory, so a reader never sees a half-written spreadsheet.
pub fn write_bytes_atomic(
    dir: &Utf8Path,
    file_name: &str,
    content: &[u8],
) -> Result<Utf8PathBuf, FdError> {
    let file_name = sanitize_file_name(file_name);
    fs::create_dir_all(dir.as_std_path()).map_err(|err| FdError::Filesystem(err.to_string()))?;
    let dest = dir.join(&file_name);
    let mut temp = tempfile::Builder::new()
        .prefix("fdrates-export")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| FdError::Filesystem(err.to_string()))?;
    std::io::Write::write_all(&mut temp, content)
        .map_err(|err| FdError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| FdError::Filesystem(err.to_string()))?;
    Ok(dest)
}

fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        crate::api::DEFAULT_EXPORT_FILENAME.to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories_from_suggested_name() {
        assert_eq!(sanitize_file_name("../../etc/rates.xlsx"), "rates.xlsx");
        assert_eq!(sanitize_file_name(".."), "Bank_FD_Rates.xlsx");
    }

    #[test]
    fn writes_file_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
        let path = write_bytes_atomic(&dir, "rates.xlsx", b"PK").unwrap();
        assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"PK");
        assert!(path.ends_with("rates.xlsx"));
    }
}
