//! Append-only local ledger backed by a JSON-lines file.
//!
//! Each accepted record is one line. The file is replayed into memory on open
//! and only ever appended to; nothing is rewritten or compacted.
//!
//! An append that fails midway is cut back to the previous length. If the
//! process dies instead, the unterminated last line is dropped on the next open.
//! Only that final line is treated as an interrupted write; a malformed line
//! anywhere else is `LedgerProtocol`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use notary_core::{NotaryError, NotaryResult};

use crate::constants::CLIENT_VERSION;
use crate::ledger::{LedgerClient, LedgerIndex, LedgerRecord, TxReceipt};

pub struct FileLedger {
    path: PathBuf,
    state: Mutex<FileState>,
}

struct FileState {
    index: LedgerIndex,
    file: File,
}

impl FileLedger {
    /// Open (creating if needed) the ledger at `path` and replay it.
    ///
    /// I/O failures are `LedgerUnavailable`. An unparseable unterminated last
    /// line is truncated away with a warning; any other unparseable line is
    /// `LedgerProtocol`.
    pub fn open<P: AsRef<Path>>(path: P) -> NotaryResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| unavailable(&path, e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| unavailable(&path, e))?;

        let index = replay(&path, &mut file)?;

        info!(path = %path.display(), records = index.len(), "opened file ledger");
        Ok(Self {
            path,
            state: Mutex::new(FileState { index, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn replay(path: &Path, file: &mut File) -> NotaryResult<LedgerIndex> {
    let mut raw = Vec::new();
    file.read_to_end(&mut raw).map_err(|e| unavailable(path, e))?;

    let mut index = LedgerIndex::default();
    let mut pos = 0;
    let mut line_no = 0;
    while pos < raw.len() {
        line_no += 1;
        let (line, next, terminated) = match raw[pos..].iter().position(|b| *b == b'\n') {
            Some(i) => (&raw[pos..pos + i], pos + i + 1, true),
            None => (&raw[pos..], raw.len(), false),
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            pos = next;
            continue;
        }

        let record: LedgerRecord = match serde_json::from_slice(line) {
            Ok(record) => record,
            Err(e) if !terminated => {
                warn!(
                    path = %path.display(),
                    line = line_no,
                    bytes = line.len(),
                    error = %e,
                    "truncating torn final ledger line"
                );
                file.set_len(pos as u64).map_err(|e| unavailable(path, e))?;
                break;
            }
            Err(e) => {
                return Err(NotaryError::ledger_protocol(format!(
                    "{}: line {line_no}: {e}",
                    path.display()
                )))
            }
        };
        if !terminated {
            // Complete record whose newline never landed.
            append_line(file, b"\n").map_err(|e| unavailable(path, e))?;
        }

        if index.check_new(&record).is_err() {
            warn!(line = line_no, fingerprint = %record.fingerprint, "ignoring later duplicate in ledger file");
        } else {
            index.insert(record);
        }
        pos = next;
    }
    Ok(index)
}

/// Append target that can be cut back after a partial write.
trait AppendLog: Write {
    fn end(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendLog for File {
    fn end(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Append `line` durably, or leave the log at its previous length.
fn append_line<L: AppendLog>(log: &mut L, line: &[u8]) -> io::Result<()> {
    let before = log.end()?;
    let written = log
        .write_all(line)
        .and_then(|()| log.flush())
        .and_then(|()| log.sync());
    if let Err(e) = written {
        if let Err(undo) = log.truncate_to(before) {
            warn!(error = %undo, len = before, "could not roll back partial ledger append");
        }
        return Err(e);
    }
    Ok(())
}

fn unavailable(path: &Path, e: std::io::Error) -> NotaryError {
    NotaryError::ledger_unavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl LedgerClient for FileLedger {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn ping(&self) -> NotaryResult<()> {
        let state = self.state.lock();
        state
            .file
            .metadata()
            .map(|_| ())
            .map_err(|e| unavailable(&self.path, e))
    }

    async fn submit_document(&self, record: &LedgerRecord) -> NotaryResult<TxReceipt> {
        let mut state = self.state.lock();
        state.index.check_new(record)?;

        let mut line = serde_json::to_vec(record)
            .map_err(|e| NotaryError::ledger_protocol(format!("encode record: {e}")))?;
        line.push(b'\n');

        append_line(&mut state.file, &line).map_err(|e| unavailable(&self.path, e))?;

        let seq = state.index.insert(record.clone());
        debug!(fingerprint = %record.fingerprint, seq, "file ledger appended record");
        Ok(TxReceipt {
            tx_id: format!("file:{CLIENT_VERSION}:{seq}"),
        })
    }

    async fn get_document_by_fingerprint(&self, fingerprint: &str) -> NotaryResult<Option<LedgerRecord>> {
        Ok(self.state.lock().index.get(fingerprint))
    }

    async fn get_document_by_name(&self, name: &str) -> NotaryResult<Option<LedgerRecord>> {
        Ok(self.state.lock().index.get_by_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::ErrorKind;

    fn rec(fp: char, name: &str, signer: &str) -> LedgerRecord {
        LedgerRecord {
            fingerprint: fp.to_string().repeat(64),
            name: name.to_string(),
            signer: signer.to_string(),
            signed_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.jsonl");

        {
            let l = FileLedger::open(&path).unwrap();
            l.submit_document(&rec('a', "a.pdf", "0xA")).await.unwrap();
            l.submit_document(&rec('b', "b.pdf", "0xB")).await.unwrap();
        }

        let l = FileLedger::open(&path).unwrap();
        assert_eq!(l.len(), 2);
        let got = l.get_document_by_name("b.pdf").await.unwrap().unwrap();
        assert_eq!(got.signer, "0xB");
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn duplicate_is_rejected_and_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let l = FileLedger::open(&path).unwrap();

        l.submit_document(&rec('a', "a.pdf", "0xA")).await.unwrap();
        let err = l
            .submit_document(&rec('a', "renamed.pdf", "0xB"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateRecord);

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
        let got = l.get_document_by_fingerprint(&"a".repeat(64)).await.unwrap().unwrap();
        assert_eq!(got.signer, "0xA");
    }

    #[test]
    fn corrupt_line_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, "{not json}\n").unwrap();
        let err = FileLedger::open(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::LedgerProtocol);
    }

    #[tokio::test]
    async fn torn_final_line_is_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut good = serde_json::to_vec(&rec('a', "a.pdf", "0xA")).unwrap();
        good.push(b'\n');
        let mut torn = good.clone();
        torn.extend_from_slice(br#"{"fingerprint":"bbbb"#);
        fs::write(&path, &torn).unwrap();

        let l = FileLedger::open(&path).unwrap();
        assert_eq!(l.len(), 1);
        assert_eq!(fs::read(&path).unwrap(), good);

        l.submit_document(&rec('b', "b.pdf", "0xB")).await.unwrap();
        drop(l);

        let l = FileLedger::open(&path).unwrap();
        assert_eq!(l.len(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn unterminated_valid_last_line_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, serde_json::to_vec(&rec('a', "a.pdf", "0xA")).unwrap()).unwrap();

        let l = FileLedger::open(&path).unwrap();
        assert_eq!(l.len(), 1);
        l.submit_document(&rec('b', "b.pdf", "0xB")).await.unwrap();
        drop(l);

        let l = FileLedger::open(&path).unwrap();
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn malformed_middle_line_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let good = serde_json::to_string(&rec('a', "a.pdf", "0xA")).unwrap();
        fs::write(&path, format!("{good}\n{{\"fingerprint\":\"bbbb\n{good}\n")).unwrap();

        let err = FileLedger::open(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::LedgerProtocol);
        assert!(err.to_string().contains("line 2"), "{err}");
        // Nothing is repaired when the damage is not at the tail.
        assert!(fs::read_to_string(&path).unwrap().ends_with(&format!("{good}\n")));
    }

    /// Accepts `room` bytes, then fails every write.
    struct FullDisk {
        data: Vec<u8>,
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::other("no space left"));
            }
            let n = buf.len().min(self.room);
            self.data.extend_from_slice(&buf[..n]);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl AppendLog for FullDisk {
        fn end(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_append_rolls_back_partial_line() {
        let existing = b"{\"first\":1}\n".to_vec();
        let mut log = FullDisk { data: existing.clone(), room: 5 };

        assert!(append_line(&mut log, b"{\"second\":2}\n").is_err());
        assert_eq!(log.data, existing);

        log.room = 64;
        append_line(&mut log, b"{\"third\":3}\n").unwrap();
        assert!(log.data.ends_with(b"}\n{\"third\":3}\n"));
    }

    #[test]
    fn directory_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLedger::open(dir.path()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::LedgerUnavailable);
    }
}
