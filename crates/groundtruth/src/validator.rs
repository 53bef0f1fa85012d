use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;

#[derive(Clone, Debug)]
pub struct ManifestStats {
    pub records: u64,
    pub per_class: BTreeMap<String, u64>,
    pub manifest_hash: [u8; 32],
}

impl ManifestStats {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.manifest_hash)
    }
}

/// Re-reads a manifest and checks every line is a label record for `label_field`.
///
/// Returns all line errors at once. An empty manifest is an error.
pub fn validate_manifest_and_hash(path: &Path, label_field: &str) -> Result<ManifestStats, Vec<String>> {
    let f = File::open(path).map_err(|e| vec![format!("IO: {e}")])?;
    let reader = BufReader::new(f);

    let metadata_field = format!("{label_field}-metadata");
    let mut errors: Vec<String> = vec![];
    let mut hasher = blake3::Hasher::new();
    let mut per_class: BTreeMap<String, u64> = BTreeMap::new();
    let mut count: u64 = 0;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("Line {line_no}: IO read error: {e}"));
                continue;
            }
        };

        hasher.update(line.as_bytes());
        hasher.update(b"\n");

        if line.trim().is_empty() {
            errors.push(format!("Line {line_no}: empty line"));
            continue;
        }

        let v: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("Line {line_no}: invalid JSON: {e}"));
                continue;
            }
        };

        match v.get("source-ref").and_then(Value::as_str) {
            Some(r) if r.starts_with("s3://") => {}
            Some(r) => {
                errors.push(format!("Line {line_no}: source-ref is not an s3 uri: {r}"));
                continue;
            }
            None => {
                errors.push(format!("Line {line_no}: missing source-ref"));
                continue;
            }
        }

        if v.get(label_field).is_none() {
            errors.push(format!("Line {line_no}: missing {label_field}"));
            continue;
        }

        let class = v
            .get(&metadata_field)
            .and_then(|m| m.get("class-name"))
            .and_then(Value::as_str);
        let Some(class) = class else {
            errors.push(format!("Line {line_no}: missing {metadata_field}.class-name"));
            continue;
        };

        *per_class.entry(class.to_string()).or_default() += 1;
        count += 1;
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if count == 0 {
        return Err(vec!["No label records found".to_string()]);
    }

    Ok(ManifestStats {
        records: count,
        per_class,
        manifest_hash: hasher.finalize().into(),
    })
}
