use std::fmt;
use std::fs::File;
use std::io::{Result, Write};
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::SyphonError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Digest size in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SyphonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(SyphonError::UnknownHashAlgorithm(s.to_string())),
        }
    }
}

enum Hasher {
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha224 => Hasher::Sha224(Sha224::new()),
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        match self {
            Hasher::Sha224(h) => Digest::update(h, buf),
            Hasher::Sha256(h) => Digest::update(h, buf),
            Hasher::Sha384(h) => Digest::update(h, buf),
            Hasher::Sha512(h) => Digest::update(h, buf),
            Hasher::Blake3(h) => {
                h.update(buf);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha224(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha384(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => hex::encode(h.finalize().as_bytes()),
        }
    }
}

/// `Write` sink that feeds everything written into a digest.
pub struct HashingWriter {
    hasher: Hasher,
}

impl HashingWriter {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: Hasher::new(algorithm),
        }
    }

    /// Lowercase hex digest of everything written so far.
    pub fn finalize_hex(self) -> String {
        self.hasher.finalize_hex()
    }
}

impl Write for HashingWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.hasher.update(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let mut f = File::open(path)?;
    let mut w = HashingWriter::new(algorithm);
    std::io::copy(&mut f, &mut w)?;
    Ok(w.finalize_hex())
}

/// Lowercased `hex_str` if it is a well-formed digest for `algorithm`.
pub fn parse_hex_digest(hex_str: &str, algorithm: HashAlgorithm) -> Option<String> {
    let bytes = hex::decode(hex_str).ok()?;
    if bytes.len() != algorithm.digest_len() {
        return None;
    }
    Some(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vectors() {
        let mut w = HashingWriter::new(HashAlgorithm::Sha256);
        w.write_all(b"abc").unwrap();
        assert_eq!(
            w.finalize_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            HashingWriter::new(HashAlgorithm::Sha256).finalize_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_lengths_match_algorithms() {
        for a in [
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Blake3,
        ] {
            let hex = HashingWriter::new(a).finalize_hex();
            assert_eq!(hex.len(), a.digest_len() * 2, "{a}");
            assert_eq!(a.name().parse::<HashAlgorithm>().unwrap(), a);
        }
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = "md5".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, SyphonError::UnknownHashAlgorithm(n) if n == "md5"));
    }

    #[test]
    fn parse_hex_digest_validates() {
        let upper = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855";
        assert_eq!(
            parse_hex_digest(upper, HashAlgorithm::Sha256).unwrap(),
            upper.to_lowercase()
        );
        assert!(parse_hex_digest("abcd", HashAlgorithm::Sha256).is_none());
        assert!(parse_hex_digest("zz", HashAlgorithm::Sha256).is_none());
    }

    #[test]
    fn digest_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f");
        std::fs::write(&p, b"abc").unwrap();
        assert_eq!(
            digest_file(&p, HashAlgorithm::Sha256).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(digest_file(&dir.path().join("missing"), HashAlgorithm::Sha256).is_err());
    }
}
