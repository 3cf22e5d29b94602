use rzt_types::Digest;

/// Domain-separated BLAKE3 content hasher for stored blobs.
///
/// The domain tag is prepended to every hash computation, so these
/// addresses never collide with digests taken for another purpose.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for link images.
    pub const IMAGE: Self = Self {
        domain: "rzt-image-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected address.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"\x89PNG fake image";
        assert_eq!(ContentHasher::IMAGE.hash(data), ContentHasher::IMAGE.hash(data));
    }

    #[test]
    fn domain_tag_is_part_of_the_address() {
        let data = b"same pixels";
        let plain = Digest::from_hash(*blake3::hash(data).as_bytes());
        assert_ne!(ContentHasher::IMAGE.hash(data), plain);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::IMAGE.hash(b"original");
        assert!(ContentHasher::IMAGE.verify(b"original", &id));
        assert!(!ContentHasher::IMAGE.verify(b"tampered", &id));
    }
}
