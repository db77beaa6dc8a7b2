//! Logo acquisition and decoding.
//!
//! Two independent fallbacks:
//! - fetch: `LogoSource::FirstAvailable` tries sources in order and the first
//!   one that yields bytes wins
//! - decode: `LOGO_DECODERS` is tried in order and the first decoder that
//!   accepts the bytes wins
//!
//! Neither step ever fails the watermark; a missing or undecodable logo is
//! reported and the page is stamped without it.

use std::fmt;
use std::path::PathBuf;

use image::ImageFormat;
use tracing::debug;

/// Where the watermark logo comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogoSource {
    #[default]
    None,
    Bytes(Vec<u8>),
    File(PathBuf),
    Url(String),
    FirstAvailable(Vec<LogoSource>),
}

/// Outcome of fetching logo bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoFetch {
    Fetched(Vec<u8>),
    Unavailable(String),
}

impl LogoSource {
    /// Interpret a command-line value: `http(s)://` is a URL, anything else a path.
    pub fn from_arg(value: &str) -> Self {
        let v = value.trim();
        if v.starts_with("http://") || v.starts_with("https://") {
            Self::Url(v.to_string())
        } else {
            Self::File(PathBuf::from(v))
        }
    }

    /// Collapse a list of sources: empty is `None`, a single one stands alone.
    pub fn first_available(mut sources: Vec<LogoSource>) -> Self {
        sources.retain(|s| !matches!(s, LogoSource::None));
        match sources.len() {
            0 => Self::None,
            1 => sources.remove(0),
            _ => Self::FirstAvailable(sources),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LogoSource::None)
    }

    pub async fn fetch(&self) -> LogoFetch {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        if leaves.is_empty() {
            return LogoFetch::Unavailable("no logo configured".to_string());
        }

        let mut reasons = Vec::new();
        for source in leaves {
            match fetch_one(source).await {
                Ok(bytes) => {
                    debug!(source = %source, bytes = bytes.len(), "logo fetched");
                    return LogoFetch::Fetched(bytes);
                }
                Err(reason) => {
                    debug!(source = %source, %reason, "logo source unavailable");
                    reasons.push(format!("{source}: {reason}"));
                }
            }
        }
        LogoFetch::Unavailable(reasons.join("; "))
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LogoSource>) {
        match self {
            LogoSource::None => {}
            LogoSource::FirstAvailable(list) => list.iter().for_each(|s| s.collect_leaves(out)),
            leaf => out.push(leaf),
        }
    }
}

impl fmt::Display for LogoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoSource::None => f.write_str("none"),
            LogoSource::Bytes(b) => write!(f, "<{} inline bytes>", b.len()),
            LogoSource::File(p) => write!(f, "{}", p.display()),
            LogoSource::Url(u) => f.write_str(u),
            LogoSource::FirstAvailable(list) => {
                let parts: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "first of [{}]", parts.join(", "))
            }
        }
    }
}

async fn fetch_one(source: &LogoSource) -> Result<Vec<u8>, String> {
    match source {
        LogoSource::Bytes(b) if b.is_empty() => Err("empty".to_string()),
        LogoSource::Bytes(b) => Ok(b.clone()),
        LogoSource::File(path) => tokio::fs::read(path).await.map_err(|e| e.to_string()),
        LogoSource::Url(url) => {
            let resp = reqwest::get(url.as_str()).await.map_err(|e| e.to_string())?;
            if !resp.status().is_success() {
                return Err(format!("http {}", resp.status()));
            }
            let body = resp.bytes().await.map_err(|e| e.to_string())?;
            Ok(body.to_vec())
        }
        LogoSource::None | LogoSource::FirstAvailable(_) => Err("not a leaf source".to_string()),
    }
}

/// One attempt in the decoder chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoDecoder {
    Png,
    Jpeg,
}

/// Decoders tried in order by [`decode_logo`].
pub const LOGO_DECODERS: [LogoDecoder; 2] = [LogoDecoder::Png, LogoDecoder::Jpeg];

impl LogoDecoder {
    pub fn name(&self) -> &'static str {
        match self {
            LogoDecoder::Png => "png",
            LogoDecoder::Jpeg => "jpeg",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            LogoDecoder::Png => ImageFormat::Png,
            LogoDecoder::Jpeg => ImageFormat::Jpeg,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Option<LogoImage> {
        let img = image::load_from_memory_with_format(bytes, self.format()).ok()?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let pixels = rgba.into_raw();
        let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(pixels.len() / 4);
        for px in pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        let alpha = if alpha.iter().all(|a| *a == u8::MAX) {
            None
        } else {
            Some(alpha)
        };

        Some(LogoImage {
            decoder: *self,
            width,
            height,
            rgb,
            alpha,
        })
    }
}

/// Decoded logo raster: 8-bit RGB samples plus an optional 8-bit alpha plane.
#[derive(Clone, PartialEq, Eq)]
pub struct LogoImage {
    pub decoder: LogoDecoder,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl fmt::Debug for LogoImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoImage")
            .field("decoder", &self.decoder)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alpha", &self.alpha.is_some())
            .finish()
    }
}

impl LogoImage {
    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoDecode {
    Decoded(LogoImage),
    Unsupported,
}

pub fn decode_logo(bytes: &[u8]) -> LogoDecode {
    for decoder in LOGO_DECODERS {
        if let Some(img) = decoder.decode(bytes) {
            debug!(decoder = decoder.name(), width = img.width, height = img.height, "logo decoded");
            return LogoDecode::Decoded(img);
        }
    }
    LogoDecode::Unsupported
}
