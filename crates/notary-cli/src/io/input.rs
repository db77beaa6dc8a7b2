use std::fs::File;
use std::io::Read;
use std::path::Path;

use notary_core::fingerprint::fingerprint_reader_limited;
use notary_core::model::Fingerprint;
use notary_core::{NotaryError, NotaryResult};
use notary_watermark::LogoSource;
use url::Url;

/// Read a whole document, refusing anything larger than `max_bytes`.
pub fn read_document(path: &Path, max_bytes: u64) -> NotaryResult<Vec<u8>> {
    let file = open(path)?;
    let mut bytes = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| NotaryError::input_read(format!("{}: {e}", path.display())))?;
    if bytes.len() as u64 > max_bytes {
        return Err(NotaryError::input_read(format!(
            "{}: larger than the {max_bytes} byte limit",
            path.display()
        )));
    }
    Ok(bytes)
}

/// Fingerprint a file by streaming it.
pub fn fingerprint_file(path: &Path, max_bytes: u64) -> NotaryResult<Fingerprint> {
    fingerprint_reader_limited(open(path)?, max_bytes)
}

fn open(path: &Path) -> NotaryResult<File> {
    if path.is_dir() {
        return Err(NotaryError::input_read(format!("{} is a directory", path.display())));
    }
    File::open(path).map_err(|e| NotaryError::input_read(format!("{}: {e}", path.display())))
}

/// Name registered for a document when `--name` is absent: its file name.
pub fn document_name(path: &Path, explicit: Option<&str>) -> NotaryResult<String> {
    if let Some(n) = explicit {
        return Ok(n.to_string());
    }
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| NotaryError::invalid_argument(format!("{} has no file name", path.display())))
}

/// Turn `--logo` values into one source, in the order given.
pub fn logo_source(args: &[String]) -> LogoSource {
    LogoSource::first_available(args.iter().map(|a| logo_arg(a)).collect())
}

fn logo_arg(arg: &str) -> LogoSource {
    match Url::parse(arg) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => LogoSource::Url(u.to_string()),
        Ok(u) if u.scheme() == "file" => u
            .to_file_path()
            .map(LogoSource::File)
            .unwrap_or_else(|_| LogoSource::from_arg(arg)),
        _ => LogoSource::from_arg(arg),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notary_core::ErrorKind;

    use super::*;

    #[test]
    fn size_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("doc.pdf");
        std::fs::write(&p, b"0123456789").unwrap();

        assert_eq!(read_document(&p, 10).unwrap().len(), 10);
        assert_eq!(read_document(&p, 9).unwrap_err().kind(), ErrorKind::InputRead);
        assert_eq!(fingerprint_file(&p, 9).unwrap_err().kind(), ErrorKind::InputRead);
        assert_eq!(read_document(dir.path(), 100).unwrap_err().kind(), ErrorKind::InputRead);
    }

    #[test]
    fn names_default_to_file_name() {
        let p = PathBuf::from("/tmp/in/contract-v1.pdf");
        assert_eq!(document_name(&p, None).unwrap(), "contract-v1.pdf");
        assert_eq!(document_name(&p, Some("other.pdf")).unwrap(), "other.pdf");
        assert!(document_name(Path::new("/"), None).is_err());
    }

    #[test]
    fn logo_args_map_to_sources() {
        assert_eq!(logo_source(&[]), LogoSource::None);
        assert_eq!(
            logo_source(&["https://cdn.example/l.png".into()]),
            LogoSource::Url("https://cdn.example/l.png".into())
        );
        assert_eq!(
            logo_source(&["assets/logo.png".into(), "file:///srv/logo.jpg".into()]),
            LogoSource::FirstAvailable(vec![
                LogoSource::File("assets/logo.png".into()),
                LogoSource::File("/srv/logo.jpg".into()),
            ])
        );
    }
}
