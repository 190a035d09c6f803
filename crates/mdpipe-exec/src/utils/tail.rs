use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK: usize = 8 * 1024;

/// Keeps only the last `limit` bytes written to it.
#[derive(Debug)]
pub struct TailBuffer {
    limit: usize,
    buf: VecDeque<u8>,
    seen: u64,
}

impl TailBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buf: VecDeque::with_capacity(limit.min(CHUNK)),
            seen: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.seen += bytes.len() as u64;
        if self.limit == 0 {
            return;
        }

        let bytes = if bytes.len() > self.limit {
            &bytes[bytes.len() - self.limit..]
        } else {
            bytes
        };
        let overflow = (self.buf.len() + bytes.len()).saturating_sub(self.limit);
        self.buf.drain(..overflow);
        self.buf.extend(bytes);
    }

    /// Total bytes pushed, including the discarded prefix.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn is_truncated(&self) -> bool {
        self.seen > self.buf.len() as u64
    }

    /// Tail as text; invalid UTF-8 (including a code point cut in half) is replaced.
    pub fn into_string(self) -> String {
        let bytes: Vec<u8> = self.buf.into();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// [`TailBuffer`] shared between a reader task and its owner.
///
/// Whatever the reader pushed stays readable after the task is aborted.
#[derive(Debug, Clone)]
pub struct SharedTail(Arc<Mutex<TailBuffer>>);

impl SharedTail {
    pub fn new(limit: usize) -> Self {
        Self(Arc::new(Mutex::new(TailBuffer::new(limit))))
    }

    fn push(&self, bytes: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes);
    }

    /// Move the collected tail out, leaving an empty buffer of the same size.
    pub fn take(&self) -> TailBuffer {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let limit = guard.limit;
        std::mem::replace(&mut *guard, TailBuffer::new(limit))
    }
}

/// Read `reader` to EOF into `tail`, which keeps only its last bytes.
pub async fn read_tail<R>(mut reader: R, tail: SharedTail) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        tail.push(&chunk[..n]);
    }
}
