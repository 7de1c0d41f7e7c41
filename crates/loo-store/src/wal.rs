use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::CommitBatch;

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every commit.
    #[default]
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    OsDefault,
}

#[derive(Clone, Debug, Default)]
pub struct WalConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// File a WAL segment is written through. Frames go to it unbuffered.
pub(crate) trait SegmentFile: Write + Send {
    fn set_len(&self, len: u64) -> io::Result<()>;
    fn sync_all(&self) -> io::Result<()>;
}

impl SegmentFile for File {
    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }
}

struct WalWriter {
    file: Box<dyn SegmentFile>,
    /// End of the last complete frame.
    offset: u64,
    /// Set when a failed append could not be rolled back.
    wedged: bool,
}

impl WalWriter {
    fn write_frame(&mut self, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;
        if sync_mode == SyncMode::EveryWrite {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Cut off whatever part of a failed frame reached the file.
    fn roll_back(&mut self) {
        if let Err(e) = self.file.set_len(self.offset) {
            warn!(offset = self.offset, error = %e, "WAL rollback failed; refusing further appends");
            self.wedged = true;
        }
    }
}

/// Entries read back from a WAL segment.
#[derive(Debug, Default)]
pub struct Recovery {
    pub batches: Vec<CommitBatch>,
    /// Length of the prefix that parsed cleanly; anything after it is a torn write.
    pub valid_len: u64,
}

/// Append-only log of committed batches.
///
/// On-disk format, one entry per batch:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-encoded CommitBatch)]
/// ```
/// A batch is either fully framed and checksummed or it is ignored on
/// recovery, so a crash mid-write never yields half a batch.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) the WAL segment file at `path`.
    pub fn open(path: &Path, config: WalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let offset = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter {
                file: Box::new(file),
                offset,
                wedged: false,
            }),
            config,
        })
    }

    /// Append one batch. Returns the byte offset of the entry.
    ///
    /// On error the file is cut back to the end of the previous frame, so a
    /// failed append leaves nothing behind for recovery to find.
    pub fn append(&self, batch: &CommitBatch) -> StoreResult<u64> {
        let payload =
            serde_json::to_vec(batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("WAL entry exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.lock()?;
        if w.wedged {
            return Err(StoreError::Io(io::Error::other(
                "WAL has an unremovable partial frame; reopen the store",
            )));
        }
        let entry_offset = w.offset;
        if let Err(e) = w.write_frame(&frame, self.config.sync_mode) {
            w.roll_back();
            warn!(offset = entry_offset, error = %e, "WAL append failed");
            return Err(e.into());
        }

        w.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = payload.len(), "WAL append");
        Ok(entry_offset)
    }

    /// Read every intact batch, front to back.
    ///
    /// Entries failing the CRC check are skipped. A truncated or impossible
    /// length ends recovery; `valid_len` marks where the torn tail starts.
    pub fn recover(&self) -> StoreResult<Recovery> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut recovery = Recovery::default();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            let entry_end = offset + HEADER_SIZE as u64 + length as u64;

            if length == 0 || entry_end > file_len {
                warn!(offset, length, file_len, "torn WAL entry; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            file.read_exact(&mut payload)?;

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; skipping WAL entry"
                );
            } else {
                match serde_json::from_slice::<CommitBatch>(&payload) {
                    Ok(batch) => recovery.batches.push(batch),
                    Err(e) => warn!(offset, error = %e, "undecodable WAL entry; skipping"),
                }
            }

            offset = entry_end;
        }

        recovery.valid_len = offset;
        debug!(recovered = recovery.batches.len(), "WAL recovery complete");
        Ok(recovery)
    }

    /// Cut the file back to `len` bytes, dropping a torn tail.
    pub fn truncate_to(&self, len: u64) -> StoreResult<()> {
        let mut w = self.lock()?;
        if len >= w.offset {
            return Ok(());
        }
        w.file.set_len(len)?;
        w.file.sync_all()?;
        w.offset = len;
        warn!(len, "WAL truncated to last intact entry");
        Ok(())
    }

    /// Flush buffered data and sync it to disk.
    pub fn sync(&self) -> StoreResult<()> {
        let mut w = self.lock()?;
        w.file.flush()?;
        w.file.sync_all()?;
        Ok(())
    }

    /// Current write offset.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Route further writes through `file`, which must be positioned at the
    /// current end of the segment.
    #[cfg(test)]
    pub(crate) fn replace_segment(&self, file: Box<dyn SegmentFile>) {
        if let Ok(mut w) = self.writer.lock() {
            w.file = file;
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, WalWriter>> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
