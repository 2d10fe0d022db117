//! Hash computation for hashed tree nodes
//!
//! The digest is pluggable ([`HashProvider`]); SHA-1 is the default, MD5 and
//! BLAKE3 are alternates. Every digest is rendered as lowercase hex.
//!
//! - file hash      = H(name) || H(content)
//! - directory hash = H(name) || H(child hash 1 || child hash 2 || ...)
//!
//! Children are concatenated in byte-wise lexicographic order of their names.

use serde::{Deserialize, Serialize};
use sha1::Digest as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of the read buffer used while hashing file content
const CONTENT_BUFFER_SIZE: usize = 50 * 1024;

/// A streaming digest that finishes as lowercase hex
pub trait Digester {
    fn update(&mut self, data: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

/// Digest factory
pub trait HashProvider: Send + Sync {
    /// Fresh digest state
    fn digester(&self) -> Box<dyn Digester>;

    /// Identifier of the algorithm, e.g. `sha1`
    fn algorithm(&self) -> HashAlgorithm;
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Md5,
    Blake3,
}

impl HashAlgorithm {
    pub fn provider(self) -> Box<dyn HashProvider> {
        match self {
            HashAlgorithm::Sha1 => Box::new(Sha1Provider),
            HashAlgorithm::Md5 => Box::new(Md5Provider),
            HashAlgorithm::Blake3 => Box::new(Blake3Provider),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "md5" => Ok(HashAlgorithm::Md5),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!(
                "Unknown hash algorithm: {} (must be 'sha1', 'md5' or 'blake3')",
                other
            )),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-1 digests
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Provider;

struct Sha1Digester(sha1::Sha1);

impl Digester for Sha1Digester {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

impl HashProvider for Sha1Provider {
    fn digester(&self) -> Box<dyn Digester> {
        Box::new(Sha1Digester(sha1::Sha1::new()))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha1
    }
}

/// MD5 digests
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Provider;

struct Md5Digester(md5::Context);

impl Digester for Md5Digester {
    fn update(&mut self, data: &[u8]) {
        self.0.consume(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:x}", self.0.compute())
    }
}

impl HashProvider for Md5Provider {
    fn digester(&self) -> Box<dyn Digester> {
        Box::new(Md5Digester(md5::Context::new()))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Md5
    }
}

/// BLAKE3 digests
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Provider;

struct Blake3Digester(blake3::Hasher);

impl Digester for Blake3Digester {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

impl HashProvider for Blake3Provider {
    fn digester(&self) -> Box<dyn Digester> {
        Box::new(Blake3Digester(blake3::Hasher::new()))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake3
    }
}

/// Computes node hashes with a given provider
pub struct NodeHasher {
    provider: Box<dyn HashProvider>,
}

impl Default for NodeHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default().provider())
    }
}

impl NodeHasher {
    pub fn new(provider: Box<dyn HashProvider>) -> Self {
        Self { provider }
    }

    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self::new(algorithm.provider())
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.provider.algorithm()
    }

    /// Hex digest of a UTF-8 string
    pub fn hash_string(&self, s: &str) -> String {
        let mut digester = self.provider.digester();
        digester.update(s.as_bytes());
        digester.finalize_hex()
    }

    /// Hex digest of a file's content, streamed in fixed-size chunks
    pub fn hash_content(&self, file: &Path) -> std::io::Result<String> {
        let mut input = File::open(file)?;
        let mut digester = self.provider.digester();
        let mut buffer = vec![0u8; CONTENT_BUFFER_SIZE];
        loop {
            let read = input.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            digester.update(&buffer[..read]);
        }
        Ok(digester.finalize_hex())
    }

    /// File node hash: H(name) || H(content)
    pub fn hash_file(&self, name: &str, file: &Path) -> std::io::Result<String> {
        let hashed_name = self.hash_string(name);
        let hashed_content = self.hash_content(file)?;
        Ok(hashed_name + &hashed_content)
    }

    /// Directory node hash: H(name) || H(concatenation of child hashes in name order)
    ///
    /// `child_hashes` must already be ordered by child name.
    pub fn hash_directory<'a, I>(&self, name: &str, child_hashes: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut content = self.provider.digester();
        for child_hash in child_hashes {
            content.update(child_hash.as_bytes());
        }
        self.hash_string(name) + &content.finalize_hex()
    }
}
