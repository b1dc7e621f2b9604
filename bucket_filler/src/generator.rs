//! Object keys and bodies for generated objects.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;

const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const FOLDER_FORMAT: &str = "%Y%m%dT%H%M%S";
const SUFFIX_BYTES: usize = 16;

/// `<second-granularity UTC timestamp>/<32 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn folder(&self) -> &str {
        self.0.split_once('/').map_or("", |(folder, _)| folder)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn generate_key() -> ObjectKey {
    key_at(Utc::now())
}

fn key_at(now: DateTime<Utc>) -> ObjectKey {
    let mut suffix = [0u8; SUFFIX_BYTES];
    rand::thread_rng().fill_bytes(&mut suffix);

    ObjectKey(format!(
        "{}/{}",
        now.format(FOLDER_FORMAT),
        hex::encode(suffix)
    ))
}

/// Random alphanumeric string of exactly `length` characters.
pub fn generate_content(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);

    bytes
        .into_iter()
        .map(|b| ALPHABET[b as usize % ALPHABET.len()] as char)
        .collect()
}
