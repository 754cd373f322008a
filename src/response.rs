use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use crate::extract_json::{until_nul, utf8_prefix};
use crate::{
    extract_bool, extract_double, extract_int, extract_string, metrics, parse_leading_int,
    Connection,
};

/// Capacity of a reader-owned response buffer, terminator included.
///
/// Large enough for a typical status line and header block followed by a
/// small JSON object.
pub const DEFAULT_BUFFER_SIZE: usize = 512;
/// Capacity of the scratch buffer backing [`ResponseReader::get_string`].
pub const DEFAULT_SCRATCH_SIZE: usize = 64;
/// Seconds the client waits for replies it consumes itself (installation
/// registration and session lookup).
pub const RESPONSE_TIMEOUT_SECS: u64 = 10;
/// Seconds [`ResponseReader::count`] waits for the count reply.
pub const COUNT_TIMEOUT_SECS: u64 = 30;
/// Seconds [`ResponseReader::next_object`] waits for a record.
pub const NEXT_OBJECT_TIMEOUT_SECS: u64 = 5;

const DISCARD_CHUNK: usize = 64;
const COUNT_REQUEST: u8 = b'c';
const NEXT_REQUEST: u8 = b'n';

enum Storage<'a> {
    Unset,
    Borrowed(&'a mut [u8]),
    Owned(Box<[u8]>),
}

impl Storage<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Unset => &[],
            Storage::Borrowed(buf) => buf,
            Storage::Owned(buf) => buf,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Unset => &mut [],
            Storage::Borrowed(buf) => buf,
            Storage::Owned(buf) => buf,
        }
    }
}

/// Where a reader is in the record pagination exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No count has been requested yet.
    Idle,
    /// The peer reported this many records.
    CountKnown(i64),
    /// A record request is outstanding.
    FetchingRecord(i64),
}

/// Fixed-capacity view of one response on a borrowed connection.
///
/// The buffer is either supplied by the caller through [`set_buffer`] or
/// allocated on the first read. Its capacity never changes; the last byte is
/// always kept as a NUL terminator, and bytes that do not fit are read off the
/// connection and dropped.
///
/// Field accessors read whatever is currently available before decoding, and
/// follow the zero-value rules of [`crate::extract_json`].
///
/// [`set_buffer`]: ResponseReader::set_buffer
pub struct ResponseReader<'a> {
    connection: &'a mut dyn Connection,
    storage: Storage<'a>,
    scratch: Option<Box<[u8]>>,
    cursor: usize,
    state: PageState,
    capacity: usize,
    scratch_size: usize,
}

impl<'a> ResponseReader<'a> {
    pub fn new(connection: &'a mut dyn Connection) -> Self {
        Self::with_capacity(connection, DEFAULT_BUFFER_SIZE, DEFAULT_SCRATCH_SIZE)
    }

    /// Reader whose self-allocated buffers use the given capacities.
    pub fn with_capacity(
        connection: &'a mut dyn Connection,
        capacity: usize,
        scratch_size: usize,
    ) -> Self {
        Self {
            connection,
            storage: Storage::Unset,
            scratch: None,
            cursor: 0,
            state: PageState::Idle,
            capacity: capacity.max(1),
            scratch_size: scratch_size.max(1),
        }
    }

    /// Uses `buffer` as response storage and zero-fills it.
    ///
    /// Ignored when `buffer` is empty or a buffer is already bound.
    pub fn set_buffer(&mut self, buffer: &'a mut [u8]) {
        if buffer.is_empty() || !matches!(self.storage, Storage::Unset) {
            return;
        }
        buffer.fill(0);
        self.storage = Storage::Borrowed(buffer);
        self.cursor = 0;
    }

    fn ensure_buffer(&mut self) {
        if matches!(self.storage, Storage::Unset) {
            self.storage = Storage::Owned(vec![0; self.capacity].into_boxed_slice());
            self.cursor = 0;
        }
    }

    /// Pulls currently available bytes into the buffer.
    ///
    /// Never waits. Once the buffer is full any further ready bytes are
    /// discarded so that the next exchange starts clean.
    pub fn read(&mut self) {
        self.ensure_buffer();
        let buf = self.storage.as_mut_slice();
        let last = buf.len() - 1;
        if self.cursor >= last {
            return;
        }

        buf[self.cursor..].fill(0);
        let start = self.cursor;
        while self.cursor < last && self.connection.available() > 0 {
            match self.connection.read_byte() {
                Some(byte) => {
                    buf[self.cursor] = byte;
                    self.cursor += 1;
                }
                None => break,
            }
        }
        metrics::record_bytes_received(self.cursor - start);

        let mut discarded = 0;
        let mut chunk = [0u8; DISCARD_CHUNK];
        while self.connection.available() > 0 {
            let n = self.connection.read(&mut chunk);
            if n == 0 {
                break;
            }
            discarded += n;
        }
        if discarded > 0 {
            debug!("Discarded {} bytes that did not fit the response buffer", discarded);
            metrics::record_bytes_discarded(discarded);
        }
        trace!("Response buffer holds {} of {} bytes", self.cursor, buf.len());
    }

    /// Waits in one-second steps, at most `max_secs` seconds, for data to
    /// arrive, then reads.
    pub async fn read_with_timeout(&mut self, max_secs: u64) {
        let mut remaining = max_secs;
        while self.connection.available() == 0 && remaining > 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            remaining -= 1;
        }
        self.read();
    }

    fn text(&self) -> &str {
        utf8_prefix(until_nul(self.storage.as_slice()))
    }

    /// Raw response text, read up to the current capacity.
    ///
    /// Empty when the connection never delivered anything, including when
    /// the request failed to connect.
    pub fn json_body(&mut self) -> &str {
        self.read();
        self.text()
    }

    /// Value of `key` as text.
    ///
    /// The result lives in a scratch buffer shared by all `get_string` calls
    /// on this reader and is truncated to its capacity.
    pub fn get_string(&mut self, key: &str) -> &str {
        self.read();
        let scratch = self
            .scratch
            .get_or_insert_with(|| vec![0; self.scratch_size].into_boxed_slice());
        scratch.fill(0);
        let n = extract_string(self.storage.as_slice(), key, scratch);
        utf8_prefix(&scratch[..n])
    }

    pub fn get_int(&mut self, key: &str) -> i64 {
        self.read();
        extract_int(self.storage.as_slice(), key)
    }

    pub fn get_double(&mut self, key: &str) -> f64 {
        self.read();
        extract_double(self.storage.as_slice(), key)
    }

    pub fn get_boolean(&mut self, key: &str) -> bool {
        self.read();
        extract_bool(self.storage.as_slice(), key)
    }

    /// The backend's `code` field; `0` when the response carries none.
    pub fn error_code(&mut self) -> i64 {
        self.get_int("code")
    }

    /// Status code from a leading `HTTP/1.x NNN` line, if the buffer has one.
    pub fn status(&mut self) -> Option<u16> {
        self.read();
        let line = self.text().lines().next()?;
        let mut parts = line.split_whitespace();
        if !parts.next()?.starts_with("HTTP/") {
            return None;
        }
        parts.next()?.parse().ok()
    }

    async fn send_control(&mut self, byte: u8) {
        if let Err(e) = self.connection.send(&[byte]).await {
            warn!("Failed to send control byte {:?}: {}", byte as char, e);
        }
    }

    fn reset(&mut self) {
        self.ensure_buffer();
        self.cursor = 0;
        self.storage.as_mut_slice().fill(0);
    }

    /// Asks the peer how many records the response holds and caches it.
    ///
    /// Waits up to [`COUNT_TIMEOUT_SECS`] for the reply. A reply that is not
    /// a number counts as zero.
    #[instrument(skip(self))]
    pub async fn count(&mut self) -> i64 {
        self.send_control(COUNT_REQUEST).await;
        self.reset();
        self.read_with_timeout(COUNT_TIMEOUT_SECS).await;
        self.read();

        let count = parse_leading_int(self.text().as_bytes());
        debug!("Peer reports {} records", count);
        self.state = PageState::CountKnown(count);
        count
    }

    /// Fetches the next record into the buffer.
    ///
    /// Requests the count first if it is not known. Returns `false` without
    /// any I/O when the known count is zero or negative, and `false` when no
    /// record arrives within [`NEXT_OBJECT_TIMEOUT_SECS`].
    #[instrument(skip(self))]
    pub async fn next_object(&mut self) -> bool {
        let count = match self.state {
            PageState::Idle => self.count().await,
            PageState::CountKnown(n) | PageState::FetchingRecord(n) => n,
        };
        if count <= 0 {
            return false;
        }

        self.state = PageState::FetchingRecord(count);
        self.send_control(NEXT_REQUEST).await;
        self.reset();
        self.read_with_timeout(NEXT_OBJECT_TIMEOUT_SECS).await;
        self.state = PageState::CountKnown(count);

        self.storage.as_slice().first().is_some_and(|&byte| byte != 0)
    }

    /// Cached record count, `-1` until [`count`](Self::count) has run.
    pub fn result_count(&self) -> i64 {
        match self.state {
            PageState::Idle => -1,
            PageState::CountKnown(n) | PageState::FetchingRecord(n) => n,
        }
    }

    pub fn page_state(&self) -> PageState {
        self.state
    }

    /// Releases the self-allocated buffer and the scratch buffer.
    ///
    /// A caller-supplied buffer stays bound and is left untouched. Calling
    /// `close` again is a no-op. Dropping the reader releases the same memory.
    pub fn close(&mut self) {
        if matches!(self.storage, Storage::Owned(_)) {
            self.storage = Storage::Unset;
        }
        self.scratch = None;
        self.cursor = 0;
        self.state = PageState::Idle;
    }

    /// The whole buffer, terminator and unused tail included.
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_slice()
    }

    /// Number of response bytes held.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// `true` once only the terminator slot is left.
    pub fn is_full(&self) -> bool {
        let len = self.storage.as_slice().len();
        len > 0 && self.cursor >= len - 1
    }

    /// `true` while a response buffer is bound.
    pub fn has_buffer(&self) -> bool {
        !matches!(self.storage, Storage::Unset)
    }

    pub fn has_scratch(&self) -> bool {
        self.scratch.is_some()
    }
}

impl std::fmt::Debug for ResponseReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseReader")
            .field("len", &self.cursor)
            .field("capacity", &self.storage.as_slice().len())
            .field("state", &self.state)
            .finish()
    }
}
