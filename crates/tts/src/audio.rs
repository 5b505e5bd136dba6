//! Request-scoped audio files.
//!
//! Each synthesis writes to its own uniquely named file. The file lives
//! exactly as long as the [`AudioClip`] (or the [`AudioStream`] made from
//! it): dropping either removes it from disk, whether the stream was read to
//! the end or abandoned by a disconnecting client.

use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// Upper bound on the size of each chunk yielded by [`AudioStream`].
pub const AUDIO_CHUNK_SIZE: usize = 8 * 1024;

/// Synthesized audio held in a request-scoped file.
#[derive(Debug)]
pub struct AudioClip {
    file: File,
    path: TempPath,
    len: u64,
}

impl AudioClip {
    /// Write `audio` to a fresh file in `dir`, flush it to disk and rewind it.
    pub async fn from_bytes(dir: &Path, audio: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let (file, path) = tempfile::Builder::new()
            .prefix("tts-")
            .suffix(".mp3")
            .tempfile_in(dir)?
            .into_parts();

        let mut file = File::from_std(file);
        file.write_all(audio).await?;
        file.flush().await?;
        file.sync_all().await?;
        file.seek(SeekFrom::Start(0)).await?;

        tracing::debug!(path = %path.display(), bytes = audio.len(), "Audio clip written");
        Ok(Self {
            file,
            path,
            len: audio.len() as u64,
        })
    }

    /// Size of the encoded audio in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turn the clip into a single-pass chunked byte stream.
    pub fn into_stream(self) -> AudioStream {
        AudioStream {
            inner: ReaderStream::with_capacity(self.file, AUDIO_CHUNK_SIZE),
            _path: self.path,
        }
    }
}

/// Finite stream over an [`AudioClip`]'s bytes in chunks of at most
/// [`AUDIO_CHUNK_SIZE`]. Deletes the backing file when dropped.
pub struct AudioStream {
    // Declared before `_path` so the handle closes before the file is unlinked.
    inner: ReaderStream<File>,
    _path: TempPath,
}

impl Stream for AudioStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
