use rand::Rng;

pub const BUCKET_SUFFIX_LEN: usize = 10;

/// Lowercase `a..=z` string of `len` characters.
pub fn random_alpha<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// `<prefix>-<10 random letters>`, a valid and most likely unused bucket name.
pub fn bucket_name<R: Rng>(prefix: &str, rng: &mut R) -> String {
    format!("{prefix}-{}", random_alpha(rng, BUCKET_SUFFIX_LEN))
}

/// Version label that never collides with an earlier one: `<project>.<YYYY-MM-DDTHH.mm.ss>`.
pub fn version_label(project: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    format!("{project}.{}", at.format("%Y-%m-%dT%H.%M.%S"))
}
