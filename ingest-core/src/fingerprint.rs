//! Content fingerprints for change detection in the staging table.

use sha2::{Digest, Sha256};

use crate::normalize::{clean_lines_strict, normalize_for_identity};

/// SHA-256 over the identity form of (name, ingredients, instructions).
///
/// Case, diacritics, whitespace and repeated lines do not change the result,
/// so a re-scrape of an unchanged page produces the same digest whichever
/// extractor handled it.
pub fn fingerprint<S: AsRef<str>>(name: &str, ingredients: &[S], instructions: &[S]) -> String {
    let payload = [
        normalize_for_identity(name),
        clean_lines_strict(ingredients).join("\n"),
        clean_lines_strict(instructions).join("\n"),
    ]
    .join("\n");

    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Fingerprint for outcomes that carry no recipe content, seeded from
/// identity-bearing parts such as `source_url`, `final_url` and a cause code.
pub fn fingerprint_outcome(parts: &[&str]) -> String {
    fingerprint::<&str>(&parts.join("|"), &[], &[])
}
