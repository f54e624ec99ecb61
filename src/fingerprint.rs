use sha2::{Digest, Sha256};

// Short stable hash of an email, so logs can correlate without storing addresses
pub fn fingerprint(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}
