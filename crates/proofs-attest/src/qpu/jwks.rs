//! # JWKS Cache
//!
//! Local cache of provider JSON Web Key Sets. The cache directory holds one
//! `<slug>.jwks.json` per provider, each `{"keys": [JWK, ...]}`, installed
//! by operator tooling. The cache is loaded once at process start and is
//! read-only afterwards; lookup is by `kid` with an optional `alg` filter
//! (strict kid+alg match first, kid-only as a fallback).

use std::collections::BTreeMap;
use std::path::Path;

use proofs_types::{ProofError, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// Suffix of cache files.
pub const JWKS_SUFFIX: &str = ".jwks.json";

/// Minimal JWK fields the cache indexes on.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC", "OKP").
    pub kty: String,
    /// Key id.
    #[serde(default)]
    pub kid: Option<String>,
    /// Intended algorithm.
    #[serde(default)]
    pub alg: Option<String>,
    /// Curve, for EC/OKP keys.
    #[serde(default)]
    pub crv: Option<String>,
    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
    /// EC/OKP x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,
    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksFile {
    keys: Vec<serde_json::Value>,
}

/// Reference to a cached public key and the provider it belongs to.
#[derive(Debug, Clone)]
pub struct QpuKeyRef {
    /// Provider slug (cache file stem).
    pub slug: String,
    /// Parsed indexing fields.
    pub jwk: Jwk,
    /// The raw JWK object (handed to the JWS backend verbatim).
    pub raw: serde_json::Value,
}

/// In-memory JWKS cache; immutable after loading.
#[derive(Debug, Default)]
pub struct JwksCache {
    providers: BTreeMap<String, Vec<(Jwk, serde_json::Value)>>,
}

impl JwksCache {
    /// Empty cache (no providers trusted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<slug>.jwks.json` in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut cache = Self::new();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ProofError::attestation(format!("cannot read JWKS cache dir {dir:?}: {e}"))
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(slug) = name.strip_suffix(JWKS_SUFFIX) else {
                continue;
            };
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => {
                    if let Err(e) = cache.insert_json(slug, &text) {
                        warn!(slug, error = %e, "skipping malformed JWKS file");
                    }
                }
                Err(e) => warn!(slug, error = %e, "skipping unreadable JWKS file"),
            }
        }
        debug!(providers = cache.providers.len(), "loaded JWKS cache");
        Ok(cache)
    }

    /// Insert a provider's JWKS document from JSON text.
    pub fn insert_json(&mut self, slug: &str, json: &str) -> Result<()> {
        let file: JwksFile = serde_json::from_str(json)
            .map_err(|e| ProofError::attestation(format!("JWKS for {slug:?} malformed: {e}")))?;
        let mut keys = Vec::with_capacity(file.keys.len());
        for raw in file.keys {
            let jwk: Jwk = serde_json::from_value(raw.clone())
                .map_err(|e| ProofError::attestation(format!("bad JWK in {slug:?}: {e}")))?;
            keys.push((jwk, raw));
        }
        self.providers.insert(slug.to_string(), keys);
        Ok(())
    }

    /// Provider slugs currently cached.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Find the first key matching `kid` (and `alg`, when given) across all
    /// providers. Falls back to a kid-only match when the strict pair
    /// matched nothing.
    pub fn find_key(&self, kid: &str, alg: Option<&str>) -> Option<QpuKeyRef> {
        let matching = |want_alg: Option<&str>| {
            self.providers.iter().find_map(|(slug, keys)| {
                keys.iter()
                    .find(|(jwk, _)| {
                        jwk.kid.as_deref() == Some(kid)
                            && match want_alg {
                                Some(a) => jwk.alg.as_deref() == Some(a),
                                None => true,
                            }
                    })
                    .map(|(jwk, raw)| QpuKeyRef {
                        slug: slug.clone(),
                        jwk: jwk.clone(),
                        raw: raw.clone(),
                    })
            })
        };
        match alg {
            Some(a) => matching(Some(a)).or_else(|| matching(None)),
            None => matching(None),
        }
    }
}
