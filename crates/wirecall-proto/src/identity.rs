use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use sha2::{Digest, Sha256};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

static IDENTITY_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    IDENTITY_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve the wire-level identity of a method signature.
///
/// The identity is the SHA-256 digest of the method name concatenated with
/// its ordered parameter type names, rendered as uppercase hex. It is a pure
/// function of its inputs and stable across platforms and processes, so both
/// ends of a call compute the same address without coordination.
///
/// Results are memoized in a process-wide map that is never evicted.
/// Concurrent first-time resolutions of the same signature are idempotent.
///
/// An empty name or parameter list is valid input and produces a defined
/// digest; callers are responsible for well-formed signatures.
pub fn resolve_identity(name: &str, param_types: &[&str]) -> String {
    let key = signature_key(name, param_types);

    {
        let map = cache().read().unwrap_or_else(|e| e.into_inner());
        if let Some(identity) = map.get(&key) {
            return identity.clone();
        }
    }

    let identity = digest_hex(key.as_bytes());
    let mut map = cache().write().unwrap_or_else(|e| e.into_inner());
    map.entry(key).or_insert_with(|| identity.clone());
    identity
}

/// The canonical signature string a digest is computed over.
pub fn signature_key(name: &str, param_types: &[&str]) -> String {
    let mut key = String::with_capacity(name.len() + param_types.len() * 8);
    key.push_str(name);
    for ty in param_types {
        key.push_str(ty);
    }
    key
}

fn digest_hex(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    let mut hex = String::with_capacity(2 * digest.len());
    for byte in digest {
        hex.push(HEX_UPPER[(byte >> 4) as usize] as char);
        hex.push(HEX_UPPER[(byte & 0x0F) as usize] as char);
    }
    hex
}

/// A client-side handle for one stub method.
///
/// Memoizes the identity digest for this handle, so a stub resolves its
/// signature once and reuses the result on every call.
#[derive(Debug)]
pub struct MethodHandle {
    name: String,
    param_types: Vec<String>,
    identity: OnceLock<String>,
}

impl MethodHandle {
    /// Create a handle for `name(param_types...)`.
    pub fn new(name: impl Into<String>, param_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            param_types: param_types.iter().map(|ty| (*ty).to_string()).collect(),
            identity: OnceLock::new(),
        }
    }

    /// Method name as declared by the service interface.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered parameter type names.
    pub fn param_types(&self) -> &[String] {
        &self.param_types
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    /// The wire identity, resolved on first use.
    pub fn identity(&self) -> &str {
        self.identity.get_or_init(|| {
            let refs: Vec<&str> = self.param_types.iter().map(String::as_str).collect();
            resolve_identity(&self.name, &refs)
        })
    }
}
