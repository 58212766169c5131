use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
}

/// Eight-digit public listing number derived from a hashed v7 seed, widened
/// to twelve digits once the short space is crowded. `None` when every
/// candidate was taken.
pub fn generate_listing_number<F, E>(mut exists: F) -> Result<Option<String>, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    for _ in 0..64 {
        let candidate = number_from_seed(&Uuid::now_v7().to_string());
        if !exists(&candidate)? {
            return Ok(Some(candidate));
        }
    }

    for _ in 0..64 {
        let candidate = wide_number_from_seed(&Uuid::now_v7().to_string());
        if !exists(&candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn number_from_seed(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let value = u64::from_be_bytes(first_eight(&digest)) % 90_000_000 + 10_000_000;
    value.to_string()
}

fn wide_number_from_seed(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let value = u64::from_be_bytes(first_eight(&digest)) % 900_000_000_000 + 100_000_000_000;
    value.to_string()
}

fn first_eight(digest: &[u8]) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    bytes
}

pub fn sha256_hex(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

/// Category slugs: ASCII, lowercase, `-` separated. Turkish letters are
/// folded to their Latin base so "Şahin" and "sahin" collide.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars().flat_map(fold_char) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_char(ch: char) -> Vec<char> {
    let folded = match ch {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ı' | 'I' | 'İ' | 'i' => 'i',
        'ö' | 'Ö' => 'o',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' => 'u',
        'â' | 'Â' | 'ä' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' => 'e',
        '&' => return vec![' ', 'a', 'n', 'd', ' '],
        '+' => return vec![' ', 'p', 'l', 'u', 's', ' '],
        other => other,
    };
    vec![folded]
}
