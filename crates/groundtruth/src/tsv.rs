//! Converts a tab separated image catalogue into per-split manifests.
//!
//! Input rows look like `images/length/train/mini/bfv3hlqx.jpg<TAB>0<TAB>0<TAB>1`.
//! Only the first column is used: the split and the class are both read from
//! the image key.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::{ManifestWriter, Result, Split};

/// Classes recognised in an image key, checked in this order.
pub const DRESS_CLASSES: [&str; 3] = ["mini", "midi", "long"];

#[derive(Clone, Debug)]
pub struct TsvLayout {
    /// Prefix removed from every image key before upload.
    pub strip_prefix: String,
    /// Prefix prepended to the stripped key, e.g. `dresses`.
    pub key_prefix: String,
}

impl Default for TsvLayout {
    fn default() -> Self {
        Self {
            strip_prefix: "images/length/".to_string(),
            key_prefix: "dresses".to_string(),
        }
    }
}

impl TsvLayout {
    pub fn object_key(&self, image_key: &str) -> String {
        let rest = image_key.replacen(&self.strip_prefix, "", 1);
        let prefix = self.key_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            rest
        } else {
            format!("{prefix}/{rest}")
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TsvCounts {
    pub per_split: BTreeMap<Split, u64>,
    pub per_class: BTreeMap<String, u64>,
    pub skipped: u64,
}

impl TsvCounts {
    pub fn total(&self) -> u64 {
        self.per_split.values().sum()
    }
}

pub fn split_of(image_key: &str) -> Option<Split> {
    if image_key.contains("train") {
        Some(Split::Train)
    } else if image_key.contains("test") {
        Some(Split::Test)
    } else if image_key.contains("val") {
        Some(Split::Val)
    } else {
        None
    }
}

pub fn class_of(image_key: &str) -> Option<&'static str> {
    DRESS_CLASSES.iter().copied().find(|c| image_key.contains(c))
}

pub struct SplitWriters<'a, W: Write> {
    pub train: &'a mut ManifestWriter<W>,
    pub test: &'a mut ManifestWriter<W>,
    pub val: &'a mut ManifestWriter<W>,
}

/// Routes every catalogue row to the manifest of its split.
///
/// Rows without a recognisable split or class (including the header) are
/// logged and skipped. Write errors abort the conversion.
pub fn convert_catalogue<R: BufRead, W: Write>(
    input: R,
    layout: &TsvLayout,
    out: SplitWriters<'_, W>,
) -> Result<TsvCounts> {
    let mut counts = TsvCounts::default();

    for line in input.lines() {
        let line = line?;
        let Some(image_key) = line.split('\t').next().map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };

        let Some(split) = split_of(image_key) else {
            warn!(row = %image_key, "unclear which split this row belongs to");
            counts.skipped += 1;
            continue;
        };
        let Some(class) = class_of(image_key) else {
            warn!(row = %image_key, "unclear which class this row belongs to");
            counts.skipped += 1;
            continue;
        };

        let writer = match split {
            Split::Train => &mut *out.train,
            Split::Test => &mut *out.test,
            Split::Val => &mut *out.val,
        };
        writer.append(&layout.object_key(image_key), class)?;

        *counts.per_split.entry(split).or_default() += 1;
        *counts.per_class.entry(class.to_string()).or_default() += 1;
    }

    info!(
        long = counts.per_class.get("long").copied().unwrap_or(0),
        midi = counts.per_class.get("midi").copied().unwrap_or(0),
        mini = counts.per_class.get("mini").copied().unwrap_or(0),
        total = counts.total(),
        "catalogue classes"
    );
    info!(
        train = counts.per_split.get(&Split::Train).copied().unwrap_or(0),
        test = counts.per_split.get(&Split::Test).copied().unwrap_or(0),
        val = counts.per_split.get(&Split::Val).copied().unwrap_or(0),
        skipped = counts.skipped,
        "catalogue splits"
    );

    Ok(counts)
}
