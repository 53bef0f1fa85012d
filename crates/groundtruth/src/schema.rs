use serde::ser::{Serialize, SerializeMap, Serializer};

/// Fixed `type` attribute understood by the training service.
pub const IMAGE_CLASSIFICATION_TYPE: &str = "groundtruth/image-classification";

/// Placeholder label value; the service reads the class from `class-name`.
pub const LABEL_VALUE: u8 = 1;

pub const CONFIDENCE: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Split {
    Train,
    Test,
    Val,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Val => "val",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage URI of an object: `s3://<bucket>/<key>`
pub fn source_ref(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{}", key.trim_start_matches('/'))
}

/// Creation date in the shape the labeling jobs emit (`2020-04-20T14:17:37.603Z`).
pub fn creation_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// One manifest line. Immutable once built.
///
/// Serializes to
/// `{"source-ref":..,"<field>":1,"<field>-metadata":{..}}` with keys in
/// that order, which is why `Serialize` is written by hand.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRecord {
    pub source_ref: String,
    pub label_field: String,
    pub metadata: LabelMetadata,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LabelMetadata {
    pub confidence: u8,
    #[serde(rename = "job-name")]
    pub job_name: String,
    #[serde(rename = "class-name")]
    pub class_name: String,
    #[serde(rename = "human-annotated")]
    pub human_annotated: String,
    #[serde(rename = "creation-date")]
    pub creation_date: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl LabelRecord {
    pub fn new(source_ref: String, label_field: &str, class_name: &str, creation_date: &str) -> Self {
        Self {
            source_ref,
            label_field: label_field.to_string(),
            metadata: LabelMetadata {
                confidence: CONFIDENCE,
                job_name: format!("labeling-job/{label_field}"),
                class_name: class_name.to_string(),
                human_annotated: "yes".to_string(),
                creation_date: creation_date.to_string(),
                kind: IMAGE_CLASSIFICATION_TYPE.to_string(),
            },
        }
    }

    pub fn class_name(&self) -> &str {
        &self.metadata.class_name
    }

    pub fn metadata_field(&self) -> String {
        format!("{}-metadata", self.label_field)
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for LabelRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("source-ref", &self.source_ref)?;
        map.serialize_entry(&self.label_field, &LABEL_VALUE)?;
        map.serialize_entry(&self.metadata_field(), &self.metadata)?;
        map.end()
    }
}
