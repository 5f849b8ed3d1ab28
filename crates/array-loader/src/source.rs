//! Byte sources for loaders.
//!
//! Loaders read headers through [`open`], which yields a seekable reader over
//! either a local file or an HTTP resource. Remote reads are issued as
//! block-aligned `Range` requests so that only the header bytes a decoder
//! actually touches are transferred.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};

/// Default size of one range request.
pub const DEFAULT_BLOCK_SIZE: u64 = 64 * 1024;

/// Where a data source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(Url),
}

impl Location {
    /// Interpret an href as a local path, `file://` URL or HTTP(S) URL.
    pub fn parse(href: &str) -> Result<Self> {
        let url = match Url::parse(href) {
            Ok(url) if url.scheme().len() > 1 => url,
            // Not a URL, or a Windows drive letter.
            _ => return Ok(Self::Local(PathBuf::from(href))),
        };

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| LoaderError::InvalidHref(href.to_string())),
            other => Err(LoaderError::UnsupportedLocation(format!(
                "scheme '{other}' in {href}"
            ))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Settings shared by every remote byte source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Size of one range request in bytes.
    pub block_size: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            block_size: DEFAULT_BLOCK_SIZE,
            user_agent: concat!("array-loader/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SourceConfig {
    fn client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// A seekable byte stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Open `href` for header reads.
///
/// `storage_options` may carry a `headers` object whose string values are
/// sent with every HTTP request.
pub fn open(
    href: &str,
    storage_options: &Map<String, Value>,
    config: &SourceConfig,
) -> Result<Box<dyn ReadSeek>> {
    match Location::parse(href)? {
        Location::Local(path) => {
            debug!(path = %path.display(), "Opening local source");
            Ok(Box::new(BufReader::new(File::open(&path)?)))
        }
        Location::Remote(url) => {
            let headers = request_headers(storage_options)?;
            Ok(Box::new(HttpRangeReader::open(
                config.client()?,
                url,
                headers,
                config.block_size,
            )?))
        }
    }
}

/// Read the first `n` bytes of a source, or fewer if it is shorter.
pub fn read_prefix(reader: &mut dyn ReadSeek, n: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(n);
    (&mut *reader).take(n as u64).read_to_end(&mut buf)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(buf)
}

fn request_headers(storage_options: &Map<String, Value>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some(value) = storage_options.get("headers") else {
        return Ok(headers);
    };
    let Some(map) = value.as_object() else {
        return Err(LoaderError::invalid_option(
            "headers",
            "expected an object of header names to strings",
        ));
    };

    for (name, value) in map {
        let value = value
            .as_str()
            .ok_or_else(|| LoaderError::invalid_option("headers", format!("{name} is not a string")))?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| LoaderError::invalid_option("headers", e.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| LoaderError::invalid_option("headers", e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

// ============================================================================
// HTTP range reader
// ============================================================================

/// `Read + Seek` over an HTTP resource.
///
/// Fetches fixed-size blocks on demand and keeps them for the lifetime of the
/// reader. Servers that do not report a length or do not accept ranges are
/// read with a single GET.
pub struct HttpRangeReader {
    client: Client,
    url: Url,
    headers: HeaderMap,
    len: u64,
    pos: u64,
    block_size: u64,
    blocks: HashMap<u64, Bytes>,
    /// Whole body, when range requests are unavailable.
    body: Option<Bytes>,
}

impl HttpRangeReader {
    /// Probe the resource with a HEAD request.
    pub fn open(client: Client, url: Url, headers: HeaderMap, block_size: u64) -> Result<Self> {
        let resp = client.head(url.clone()).headers(headers.clone()).send()?;
        if !resp.status().is_success() {
            return Err(LoaderError::HttpStatus {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let accept_ranges = resp
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("bytes"))
            .unwrap_or(false);
        let content_length = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let mut reader = Self {
            client,
            url,
            headers,
            len: 0,
            pos: 0,
            block_size: block_size.max(1),
            blocks: HashMap::new(),
            body: None,
        };

        match content_length {
            Some(len) if accept_ranges => {
                debug!(url = %reader.url, len, "Using range requests");
                reader.len = len;
            }
            _ => {
                warn!(url = %reader.url, "Server does not support range requests, fetching whole body");
                reader.fetch_body()?;
            }
        }
        Ok(reader)
    }

    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn fetch_body(&mut self) -> Result<()> {
        let resp = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .send()?;
        if !resp.status().is_success() {
            return Err(LoaderError::HttpStatus {
                url: self.url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        let body = resp.bytes()?;
        self.len = body.len() as u64;
        self.body = Some(body);
        Ok(())
    }

    fn block(&mut self, index: u64) -> Result<Bytes> {
        if let Some(block) = self.blocks.get(&index) {
            return Ok(block.clone());
        }

        let start = index * self.block_size;
        let end = (start + self.block_size).min(self.len) - 1;
        debug!(url = %self.url, start, end, "Fetching byte range");

        let resp = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()?;

        let status = resp.status();
        if status == StatusCode::OK {
            // Range header ignored; keep the whole body instead.
            warn!(url = %self.url, "Server ignored range request");
            let body = resp.bytes()?;
            self.len = body.len() as u64;
            self.body = Some(body.clone());
            let lo = (start as usize).min(body.len());
            let hi = (end as usize + 1).min(body.len());
            return Ok(body.slice(lo..hi));
        }
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(LoaderError::HttpStatus {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes()?;
        self.blocks.insert(index, bytes.clone());
        Ok(bytes)
    }
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }

        if let Some(body) = &self.body {
            let start = self.pos as usize;
            let n = buf.len().min(body.len() - start);
            buf[..n].copy_from_slice(&body[start..start + n]);
            self.pos += n as u64;
            return Ok(n);
        }

        let index = self.pos / self.block_size;
        let offset = (self.pos % self.block_size) as usize;
        let block = self.block(index).map_err(io::Error::other)?;
        if offset >= block.len() {
            return Ok(0);
        }
        let n = buf.len().min(block.len() - offset);
        buf[..n].copy_from_slice(&block[offset..offset + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(n) => self.len as i128 + n as i128,
            SeekFrom::Current(n) => self.pos as i128 + n as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of resource",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}
