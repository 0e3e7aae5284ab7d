//! Bucket store speaking the memcached ASCII protocol.
//!
//! Only three commands are needed:
//!
//! ```text
//! gets <key>\r\n
//!     -> VALUE <key> <flags> <bytes> <cas>\r\n<data>\r\nEND\r\n | END\r\n
//! set <key> 0 0 <bytes>\r\n<data>\r\n
//!     -> STORED | NOT_STORED
//! cas <key> 0 0 <bytes> <cas>\r\n<data>\r\n
//!     -> STORED | EXISTS | NOT_FOUND
//! ```
//!
//! Connections are pooled per bucket. A connection that saw an error or a
//! timeout is dropped instead of being returned to the pool, since its read
//! position is no longer known.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use kvgate_model::types::{CasOutcome, Document};

use super::{BucketStore, StoreError};

/// Longest key the protocol accepts.
const MAX_KEY_LEN: usize = 250;

/// Largest value accepted from the store unless configured otherwise.
/// Matches memcached's default item size limit.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 1024 * 1024;

/// Reply to a storage command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageReply {
    Stored,
    NotStored,
    Exists,
    NotFound,
}

/// Header line of a `VALUE` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValueHeader {
    pub key: String,
    pub bytes: usize,
    pub cas: u64,
}

/// Check that a key can be sent without breaking the line protocol.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(StoreError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Encode `set` (no token) or `cas` (with token).
pub(crate) fn encode_storage_command(key: &str, value: &[u8], cas: Option<u64>) -> Vec<u8> {
    let header = match cas {
        Some(cas) => format!("cas {key} 0 0 {} {cas}\r\n", value.len()),
        None => format!("set {key} 0 0 {}\r\n", value.len()),
    };
    let mut out = Vec::with_capacity(header.len() + value.len() + 2);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    out
}

/// Map a server error line to a `StoreError`, if it is one.
fn error_reply(line: &str) -> Option<StoreError> {
    if line == "ERROR" || line.starts_with("CLIENT_ERROR") || line.starts_with("SERVER_ERROR") {
        Some(StoreError::Protocol(line.to_owned()))
    } else {
        None
    }
}

pub(crate) fn parse_storage_reply(line: &str) -> Result<StorageReply, StoreError> {
    match line {
        "STORED" => Ok(StorageReply::Stored),
        "NOT_STORED" => Ok(StorageReply::NotStored),
        "EXISTS" => Ok(StorageReply::Exists),
        "NOT_FOUND" => Ok(StorageReply::NotFound),
        other => Err(error_reply(other).unwrap_or_else(|| StoreError::Protocol(other.to_owned()))),
    }
}

/// Parse the first line of a `gets` reply. `Ok(None)` for `END`.
pub(crate) fn parse_value_header(line: &str) -> Result<Option<ValueHeader>, StoreError> {
    if line == "END" {
        return Ok(None);
    }
    if let Some(err) = error_reply(line) {
        return Err(err);
    }

    let malformed = || StoreError::Protocol(line.to_owned());
    let mut parts = line.split(' ');
    if parts.next() != Some("VALUE") {
        return Err(malformed());
    }
    let key = parts.next().ok_or_else(malformed)?.to_owned();
    let _flags: u32 = parts
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(malformed)?;
    let bytes: usize = parts
        .next()
        .and_then(|b| b.parse().ok())
        .ok_or_else(malformed)?;
    let cas: u64 = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(malformed)?;

    Ok(Some(ValueHeader { key, bytes, cas }))
}

/// One pooled connection.
#[derive(Debug)]
struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn open(addr: &str) -> Result<Self, StoreError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| StoreError::Connection {
                addr: addr.to_owned(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), StoreError> {
        let stream = self.stream.get_mut();
        stream.write_all(payload).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read one `\r\n`-terminated line, without the terminator.
    async fn read_line(&mut self) -> Result<String, StoreError> {
        let mut buf = Vec::with_capacity(64);
        let n = self.stream.read_until(b'\n', &mut buf).await?;
        if n == 0 || !buf.ends_with(b"\r\n") {
            return Err(StoreError::Interrupted(
                "connection closed by store".to_owned(),
            ));
        }
        buf.truncate(buf.len() - 2);
        String::from_utf8(buf).map_err(|e| StoreError::Protocol(e.to_string()))
    }

    async fn gets(
        &mut self,
        key: &str,
        max_value_bytes: usize,
    ) -> Result<Option<Document>, StoreError> {
        self.send(format!("gets {key}\r\n").as_bytes()).await?;

        let line = self.read_line().await?;
        let Some(header) = parse_value_header(&line)? else {
            return Ok(None);
        };
        if header.key != key {
            return Err(StoreError::Protocol(line));
        }

        if header.bytes > max_value_bytes {
            return Err(StoreError::Protocol(format!(
                "value of {} bytes exceeds the {max_value_bytes} byte limit",
                header.bytes
            )));
        }
        let block_len = header
            .bytes
            .checked_add(2)
            .ok_or_else(|| StoreError::Protocol(line.clone()))?;

        let mut data = vec![0u8; block_len];
        self.stream.read_exact(&mut data).await?;
        if !data.ends_with(b"\r\n") {
            return Err(StoreError::Protocol("data block not terminated".to_owned()));
        }
        data.truncate(header.bytes);

        let end = self.read_line().await?;
        if end != "END" {
            return Err(StoreError::Protocol(end));
        }

        Ok(Some(Document {
            key: header.key,
            value: Bytes::from(data),
            cas: header.cas,
        }))
    }

    async fn store(
        &mut self,
        key: &str,
        value: &[u8],
        cas: Option<u64>,
    ) -> Result<StorageReply, StoreError> {
        self.send(&encode_storage_command(key, value, cas)).await?;
        let line = self.read_line().await?;
        parse_storage_reply(&line)
    }
}

/// Bucket backed by a memcached-protocol endpoint.
#[derive(Debug)]
pub struct MemcachedBucketStore {
    name: String,
    addr: String,
    timeout: Duration,
    max_idle: usize,
    max_value_bytes: usize,
    idle: Mutex<Vec<Connection>>,
}

impl MemcachedBucketStore {
    /// Connect to the bucket's endpoint.
    ///
    /// One connection is opened eagerly so an unreachable store is reported
    /// at startup rather than on the first request.
    pub async fn connect(
        name: impl Into<String>,
        addr: impl Into<String>,
        timeout: Duration,
        max_idle: usize,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        let addr = addr.into();
        let conn = tokio::time::timeout(timeout, Connection::open(&addr))
            .await
            .map_err(|_| StoreError::Timeout(timeout))??;
        debug!(bucket = %name, %addr, "connected to store");

        Ok(Self {
            name,
            addr,
            timeout,
            max_idle: max_idle.max(1),
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            idle: Mutex::new(vec![conn]),
        })
    }

    /// Reject values larger than `limit` bytes instead of reading them.
    #[must_use]
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = limit;
        self
    }

    async fn acquire(&self) -> Result<Connection, StoreError> {
        let pooled = self.idle.lock().pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => Connection::open(&self.addr).await,
        }
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    /// Run `op` on a pooled connection within the operation timeout.
    ///
    /// `op` takes the connection by value and hands it back with its
    /// result; the connection is only pooled again if the exchange
    /// succeeded.
    async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = (Connection, Result<T, StoreError>)>,
    {
        let exchange = async {
            let conn = self.acquire().await?;
            let (conn, result) = op(conn).await;
            result.map(|value| (conn, value))
        };
        let (conn, result) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        self.release(conn);
        Ok(result)
    }
}

#[async_trait]
impl BucketStore for MemcachedBucketStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        validate_key(key)?;
        let max_value_bytes = self.max_value_bytes;
        self.with_connection(|mut conn| async move {
            let result = conn.gets(key, max_value_bytes).await;
            (conn, result)
        })
        .await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<bool, StoreError> {
        validate_key(key)?;
        let reply = self
            .with_connection(|mut conn| async move {
                let result = conn.store(key, &value, None).await;
                (conn, result)
            })
            .await?;
        match reply {
            StorageReply::Stored => Ok(true),
            StorageReply::NotStored => Ok(false),
            other => Err(StoreError::Protocol(format!("{other:?} in reply to set"))),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        cas: u64,
        value: Bytes,
    ) -> Result<CasOutcome, StoreError> {
        validate_key(key)?;
        let reply = self
            .with_connection(|mut conn| async move {
                let result = conn.store(key, &value, Some(cas)).await;
                (conn, result)
            })
            .await?;
        match reply {
            StorageReply::Stored => Ok(CasOutcome::Matched),
            StorageReply::Exists => Ok(CasOutcome::Conflict),
            StorageReply::NotFound => Ok(CasOutcome::NotFound),
            StorageReply::NotStored => {
                Err(StoreError::Protocol("NOT_STORED in reply to cas".to_owned()))
            }
        }
    }
}
