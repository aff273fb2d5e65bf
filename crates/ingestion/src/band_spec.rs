//! Logical band descriptors.
//!
//! A [`BandSpec`] names a logical band, decides which physical band it
//! claims from that band's tags, and optionally restricts how the band is
//! read (sub-window and output buffer size).

use std::fmt;
use std::sync::Arc;

use raster_common::PixelWindow;
use raster_reader::{ReadRequest, Tags};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Predicate over a physical band's tags.
pub type TagPredicate = Arc<dyn Fn(&Tags) -> bool + Send + Sync>;

/// Descriptor for one logical band.
#[derive(Clone)]
pub struct BandSpec {
    predicate: TagPredicate,
    /// Logical name the matched band is stored under.
    pub name: String,
    /// Sub-window of the physical raster to read.
    pub window: Option<PixelWindow>,
    /// Output buffer width; defaults to the window (or raster) width.
    pub buffer_width: Option<usize>,
    /// Output buffer height; defaults to the window (or raster) height.
    pub buffer_height: Option<usize>,
}

impl BandSpec {
    /// Spec matching with an arbitrary predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Tags) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            name: name.into(),
            window: None,
            buffer_width: None,
            buffer_height: None,
        }
    }

    /// Spec matching bands whose tag `key` equals `value` exactly.
    pub fn tag_equals(
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let (key, value) = (key.into(), value.into());
        Self::new(name, move |tags: &Tags| {
            tags.get(&key).is_some_and(|v| *v == value)
        })
    }

    /// Spec matching bands with any tag whose key contains a match of
    /// `key_pattern` and whose value contains a match of `value_pattern`.
    pub fn pattern(
        name: impl Into<String>,
        key_pattern: &str,
        value_pattern: &str,
        key_case_insensitive: bool,
        value_case_insensitive: bool,
    ) -> Result<Self> {
        let key_re = compile(key_pattern, key_case_insensitive)?;
        let value_re = compile(value_pattern, value_case_insensitive)?;
        Ok(Self::new(name, move |tags: &Tags| {
            tags.iter()
                .any(|(k, v)| key_re.is_match(k) && value_re.is_match(v))
        }))
    }

    pub fn with_window(mut self, window: PixelWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the output buffer size as `(height, width)`.
    pub fn with_buffer_size(mut self, height: usize, width: usize) -> Self {
        self.buffer_height = Some(height);
        self.buffer_width = Some(width);
        self
    }

    /// Evaluate the predicate.
    pub fn matches(&self, tags: &Tags) -> bool {
        (self.predicate)(tags)
    }

    /// The read this spec asks for.
    pub fn read_request(&self) -> ReadRequest {
        ReadRequest {
            window: self.window,
            out_width: self.buffer_width,
            out_height: self.buffer_height,
        }
    }
}

impl fmt::Debug for BandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandSpec")
            .field("name", &self.name)
            .field("window", &self.window)
            .field("buffer_width", &self.buffer_width)
            .field("buffer_height", &self.buffer_height)
            .finish_non_exhaustive()
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| IngestionError::InvalidConfig(format!("bad pattern {pattern:?}: {e}")))
}

/// Serializable form of a pattern [`BandSpec`], as written in band plans.
///
/// ```yaml
/// name: nir
/// search_key: band
/// search_value: "^nir$"
/// value_case_insensitive: true
/// window: { rows: [0, 512], cols: [0, 512] }
/// buffer_width: 256
/// buffer_height: 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSpecConfig {
    pub name: String,
    pub search_key: String,
    pub search_value: String,
    #[serde(default)]
    pub key_case_insensitive: bool,
    #[serde(default)]
    pub value_case_insensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<PixelWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_height: Option<usize>,
}

impl BandSpecConfig {
    /// Compile into a [`BandSpec`].
    pub fn build(&self) -> Result<BandSpec> {
        let mut spec = BandSpec::pattern(
            &self.name,
            &self.search_key,
            &self.search_value,
            self.key_case_insensitive,
            self.value_case_insensitive,
        )?;
        spec.window = self.window;
        spec.buffer_width = self.buffer_width;
        spec.buffer_height = self.buffer_height;
        Ok(spec)
    }
}
