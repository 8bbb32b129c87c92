//! Image sizes, image sources and cache keys

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Request headers sent along with a remote probe
pub type Headers = BTreeMap<String, String>;

/// Width and height of an image, both finite and non-negative
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

#[derive(Deserialize)]
struct RawDimensions {
    width: f64,
    height: f64,
}

impl Dimensions {
    /// Create validated dimensions
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] for negative, NaN or infinite values.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if is_valid_axis(width) && is_valid_axis(height) {
            Ok(Self { width, height })
        } else {
            Err(Error::InvalidDimensions { width, height })
        }
    }

    /// True when either axis is zero, i.e. nothing can be laid out
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawDimensions::deserialize(deserializer)?;
        Dimensions::new(raw.width, raw.height).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Statically known size of an image; an axis is `None` when unknown
///
/// Unknown and zero are distinct: only `None` is replaced by a fallback.
/// Negative or non-finite axes are rejected on deserialize and treated as
/// unknown by [`resolve`](Self::resolve).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AssetDimensions {
    /// Known width, if any
    pub width: Option<f64>,
    /// Known height, if any
    pub height: Option<f64>,
}

#[derive(Deserialize)]
struct RawAssetDimensions {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

impl<'de> Deserialize<'de> for AssetDimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawAssetDimensions::deserialize(deserializer)?;
        let valid = |axis: Option<f64>| axis.map_or(true, is_valid_axis);
        if !valid(raw.width) || !valid(raw.height) {
            return Err(serde::de::Error::custom(format!(
                "invalid asset dimensions: width {:?}, height {:?}",
                raw.width, raw.height
            )));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
        })
    }
}

fn is_valid_axis(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl AssetDimensions {
    /// Nothing known about either axis
    pub const UNKNOWN: AssetDimensions = AssetDimensions {
        width: None,
        height: None,
    };

    /// Both axes known
    pub fn known(dims: Dimensions) -> Self {
        Self {
            width: Some(dims.width),
            height: Some(dims.height),
        }
    }

    /// A probe measurement, where a zero axis means the prober could not measure it
    pub fn measured(dims: Dimensions) -> Self {
        let axis = |v: f64| if v.is_finite() && v > 0.0 { Some(v) } else { None };
        Self {
            width: axis(dims.width),
            height: axis(dims.height),
        }
    }

    /// Fill unknown axes from `other`
    pub fn or(self, other: AssetDimensions) -> Self {
        Self {
            width: self.width.or(other.width),
            height: self.height.or(other.height),
        }
    }

    /// Fill unknown or invalid axes from `fallback`
    pub fn resolve(self, fallback: Dimensions) -> Dimensions {
        let axis = |v: Option<f64>| v.filter(|v| is_valid_axis(*v));
        Dimensions {
            width: axis(self.width).unwrap_or(fallback.width),
            height: axis(self.height).unwrap_or(fallback.height),
        }
    }
}

/// An image fetched over the network
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSource {
    /// Image URI; an empty URI cannot be looked up
    pub uri: String,
    /// Headers sent when probing the URI
    pub headers: Headers,
    /// Size declared alongside the URI, if any
    pub declared: AssetDimensions,
}

impl RemoteSource {
    /// Remote source with no headers and no declared size
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a declared size
    pub fn with_declared(mut self, declared: AssetDimensions) -> Self {
        self.declared = declared;
        self
    }
}

/// Something whose dimensions can be looked up
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Bundled asset, identified by its numeric resource id
    Resource(u32),
    /// Image at a URI
    Remote(RemoteSource),
}

impl ImageSource {
    /// Key under which this source's dimensions are cached
    ///
    /// A remote source with an empty URI has no key and is never cached.
    pub fn cache_key(&self) -> Option<CacheKey> {
        match self {
            ImageSource::Resource(id) => Some(CacheKey::Resource(*id)),
            ImageSource::Remote(remote) if remote.uri.is_empty() => None,
            ImageSource::Remote(remote) => Some(CacheKey::Uri(remote.uri.clone())),
        }
    }
}

impl FromStr for ImageSource {
    type Err = Error;

    /// All-digit strings are resource ids, anything else is a URI
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidSource(s.to_string()));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let id = s.parse().map_err(|_| Error::InvalidSource(s.to_string()))?;
            return Ok(ImageSource::Resource(id));
        }
        Ok(ImageSource::Remote(RemoteSource::new(s)))
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Resource(id) => write!(f, "{}", id),
            ImageSource::Remote(remote) => f.write_str(&remote.uri),
        }
    }
}

/// Exact-match cache key
///
/// Resource ids and URIs live in separate variants, so resource `7` and the
/// URI `"7"` never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Bundled asset id
    Resource(u32),
    /// Remote URI
    Uri(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Resource(id) => write!(f, "resource:{}", id),
            CacheKey::Uri(uri) => write!(f, "uri:{}", uri),
        }
    }
}
