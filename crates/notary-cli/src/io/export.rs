use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use notary_core::naming::signed_file_name;
use notary_core::{NotaryError, NotaryResult};

/// Where the derivative goes: `--out`, else `<stem>-signed.<ext>` beside the input.
pub fn derivative_path(input: &Path, out: Option<&Path>) -> NotaryResult<PathBuf> {
    if let Some(p) = out {
        return Ok(p.to_path_buf());
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| NotaryError::invalid_argument(format!("{} has no file name", input.display())))?;
    Ok(input.with_file_name(signed_file_name(&name)))
}

/// Write the derivative, creating parent directories. Goes through a
/// sibling temp file so a failed write never leaves a truncated PDF behind.
///
/// Failures are output-side and carry no `NotaryError` kind.
pub fn write_derivative(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("write {}", tmp.display()));
    }
    fs::rename(&tmp, path).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_sits_next_to_input() {
        assert_eq!(
            derivative_path(Path::new("docs/contract-v1.pdf"), None).unwrap(),
            PathBuf::from("docs/contract-v1-signed.pdf")
        );
        assert_eq!(
            derivative_path(Path::new("a.pdf"), Some(Path::new("out/b.pdf"))).unwrap(),
            PathBuf::from("out/b.pdf")
        );
    }

    #[test]
    fn write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("x").join("y-signed.pdf");
        write_derivative(&p, b"%PDF-1.5").unwrap();
        assert_eq!(fs::read(&p).unwrap(), b"%PDF-1.5");
        assert!(!dir.path().join("x").join("y-signed.pdf.part").exists());
    }

    #[test]
    fn write_failure_is_not_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = write_derivative(&blocker.join("out-signed.pdf"), b"%PDF-1.5").unwrap_err();
        assert!(err.to_string().contains("blocker"), "{err}");
        assert_eq!(crate::cmd::error_kind(&err), None);
        assert_eq!(crate::cmd::exit_code(crate::cmd::error_kind(&err)), 1);
    }
}
