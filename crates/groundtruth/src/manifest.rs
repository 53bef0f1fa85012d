use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{source_ref, LabelRecord, Result};

/// Appends label records to a JSON Lines manifest.
///
/// - records are written in the order `append` is called
/// - no sorting, no deduplication (the same key may appear twice)
/// - a file opened with `create` is truncated; nothing is replaced atomically,
///   so a failure mid-way leaves a partial manifest on disk
pub struct ManifestWriter<W: Write> {
    out: W,
    bucket: String,
    label_field: String,
    creation_date: String,
    summary: ManifestSummary,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub records: u64,
    pub per_class: BTreeMap<String, u64>,
}

impl ManifestWriter<BufWriter<File>> {
    pub fn create(
        path: &Path,
        bucket: &str,
        label_field: &str,
        creation_date: &str,
    ) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), bucket, label_field, creation_date))
    }
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(out: W, bucket: &str, label_field: &str, creation_date: &str) -> Self {
        Self {
            out,
            bucket: bucket.to_string(),
            label_field: label_field.to_string(),
            creation_date: creation_date.to_string(),
            summary: ManifestSummary::default(),
        }
    }

    /// Writes one line for the object stored under `key`.
    pub fn append(&mut self, key: &str, class_name: &str) -> Result<LabelRecord> {
        let rec = LabelRecord::new(
            source_ref(&self.bucket, key),
            &self.label_field,
            class_name,
            &self.creation_date,
        );
        self.append_record(&rec)?;
        Ok(rec)
    }

    pub fn append_record(&mut self, rec: &LabelRecord) -> Result<()> {
        let line = rec.to_json_line()?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;

        self.summary.records += 1;
        *self.summary.per_class.entry(rec.class_name().to_string()).or_default() += 1;
        Ok(())
    }

    /// Flushes and hands back the sink together with what was written.
    pub fn finish(mut self) -> Result<(W, ManifestSummary)> {
        self.out.flush()?;
        Ok((self.out, self.summary))
    }
}

/// Renders a whole manifest in memory: one line per `(key, class)` entry.
pub fn render_manifest(
    bucket: &str,
    label_field: &str,
    creation_date: &str,
    entries: &[(String, String)],
) -> Result<String> {
    let mut w = ManifestWriter::new(Vec::new(), bucket, label_field, creation_date);
    for (key, class) in entries {
        w.append(key, class)?;
    }
    let (bytes, _) = w.finish()?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
