//! Append-only newline-delimited file shared by all three logs.

use std::{
    io::{self, SeekFrom},
    path::{Path, PathBuf},
};

use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
    sync::Mutex,
};
use tracing::warn;

/// A file that only ever grows by whole lines.
///
/// Appends are serialized through an async mutex and flushed before the
/// call returns. With `sync_writes` the data is also fsynced. Reads take the
/// same lock, so a reader never observes a line mid-write.
#[derive(Debug)]
pub(crate) struct LineLog {
    path: PathBuf,
    writer: Mutex<File>,
    sync_writes: bool,
}

impl LineLog {
    /// Opens or creates the file at `path`.
    ///
    /// A file whose last byte is not a newline was torn by a crash mid-append.
    /// A newline is written so the next record starts on its own line.
    pub(crate) async fn open(path: impl AsRef<Path>, sync_writes: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&path).await?;

        let len = file.metadata().await?.len();
        if len > 0 {
            file.seek(SeekFrom::Start(len - 1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;

            if last[0] != b'\n' {
                warn!(path = %path.display(), "log ends with a partial line, terminating it");
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
        }

        Ok(Self { path, writer: Mutex::new(file), sync_writes })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. `line` must not contain a newline.
    pub(crate) async fn append(&self, line: &[u8]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');

        let mut file = self.writer.lock().await;
        file.write_all(&buf).await?;
        file.flush().await?;
        if self.sync_writes {
            file.sync_data().await?;
        }
        Ok(())
    }

    /// Calls `visit` with every non-blank line, in file order, without the
    /// trailing line terminator.
    ///
    /// Stops early when `visit` returns `false`.
    pub(crate) async fn scan<F>(&self, mut visit: F) -> io::Result<()>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let _writer = self.writer.lock().await;

        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }

            let line = trim_line(&buf);
            if line.is_empty() {
                continue;
            }
            if !visit(line) {
                return Ok(());
            }
        }
    }
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let end = buf.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
    let start = buf[..end].iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(end);
    &buf[start..end]
}
