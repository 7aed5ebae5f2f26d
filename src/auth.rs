//! Control-port authentication support.
//!
//! Parsing of the method list advertised by `PROTOCOLINFO`, cookie file
//! loading, and the `HashedControlPassword` S2K hash a supervisor writes
//! into torrc before launching Tor.

use std::path::Path;

use rand::Rng;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// One authentication method a Tor daemon can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No credentials required.
    Null,
    /// Password checked against `HashedControlPassword`.
    HashedPassword,
    /// 32-byte secret read from Tor's cookie file.
    Cookie,
    /// Challenge-response cookie variant. Recognized but not used by this
    /// client.
    SafeCookie,
}

impl AuthMethod {
    /// Parse a method token from a `PROTOCOLINFO` `METHODS=` list.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "NULL" => Some(AuthMethod::Null),
            "HASHEDPASSWORD" => Some(AuthMethod::HashedPassword),
            "COOKIE" => Some(AuthMethod::Cookie),
            "SAFECOOKIE" => Some(AuthMethod::SafeCookie),
            _ => None,
        }
    }
}

/// The set of methods advertised by `PROTOCOLINFO`.
#[derive(Debug, Clone, Default)]
pub struct AuthMethods {
    methods: Vec<AuthMethod>,
}

impl AuthMethods {
    /// Add a method to the set.
    pub fn insert(&mut self, method: AuthMethod) {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
    }

    /// Whether the set contains `method`.
    pub fn contains(&self, method: AuthMethod) -> bool {
        self.methods.contains(&method)
    }

    /// Whether no method was advertised.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether NULL authentication is offered.
    pub fn allows_null(&self) -> bool {
        self.contains(AuthMethod::Null)
    }

    /// Whether cookie authentication is offered.
    pub fn allows_cookie(&self) -> bool {
        self.contains(AuthMethod::Cookie)
    }

    /// Whether password authentication is offered.
    pub fn allows_hashed_password(&self) -> bool {
        self.contains(AuthMethod::HashedPassword)
    }
}

/// Length Tor uses for control auth cookies.
const COOKIE_LEN: usize = 32;

/// Read an authentication cookie, insisting on the exact 32-byte length.
///
/// Anything else is rejected: a process squatting on what we think is the
/// control port must not be able to make us hex-dump an arbitrary file.
pub fn read_cookie_file(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path).map_err(|e| {
        Error::CookieUnreadable(format!("cannot open file {}: {e}", path.display()))
    })?;

    if data.len() != COOKIE_LEN {
        return Err(Error::CookieUnreadable(format!(
            "{} has unexpected size {} (expected {COOKIE_LEN})",
            path.display(),
            data.len()
        )));
    }

    Ok(data)
}

/// Byte count for Tor's fixed S2K count byte of 96.
const S2K_COUNT: usize = (16 + (96 & 15)) << ((96 >> 4) + 6);

/// Hash a control password into the `HashedControlPassword` torrc form,
/// `16:<SALT><60><SHA1>`, with a random 8-byte salt.
pub fn hashed_control_password(password: &[u8]) -> String {
    let mut salt = [0u8; 8];
    rand::rng().fill(&mut salt);
    hashed_control_password_with_salt(password, &salt)
}

/// Deterministic form of [`hashed_control_password`] with a caller-provided
/// salt.
pub fn hashed_control_password_with_salt(password: &[u8], salt: &[u8; 8]) -> String {
    let mut material = Vec::with_capacity(salt.len() + password.len());
    material.extend_from_slice(salt);
    material.extend_from_slice(password);

    let mut hasher = Sha1::new();
    let mut remaining = S2K_COUNT;
    while remaining > 0 {
        let take = remaining.min(material.len());
        hasher.update(&material[..take]);
        remaining -= take;
    }
    let digest = hasher.finalize();

    // 60 is the hex of 96, the count byte baked into Tor's scheme.
    format!("16:{}60{}", hex::encode_upper(salt), hex::encode_upper(digest))
}
