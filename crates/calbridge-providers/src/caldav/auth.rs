//! HTTP authentication for CalDAV requests.
//!
//! Credentials go out as Basic (RFC 7617) unless the server challenges for
//! Digest (RFC 7616, MD5 with `qop=auth`).

use base64::Engine;
use rand::Rng;
use std::collections::HashMap;

/// Account credentials for the remote store.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization` value for Basic auth.
    pub fn basic_header(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Authentication scheme requested by a `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Digest(DigestChallenge),
}

impl Challenge {
    /// Picks the scheme from a `WWW-Authenticate` value, preferring Digest.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        if let Some(params) = strip_scheme(header, "Digest") {
            return DigestChallenge::from_params(params).map(Self::Digest);
        }
        if strip_scheme(header, "Basic").is_some() {
            return Some(Self::Basic);
        }
        None
    }

    /// Builds the `Authorization` value for one request.
    pub fn authorize(&mut self, credentials: &Credentials, method: &str, uri: &str) -> String {
        match self {
            Self::Basic => credentials.basic_header(),
            Self::Digest(digest) => digest.respond(credentials, method, uri, &new_cnonce()),
        }
    }
}

fn strip_scheme<'a>(header: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = header.split_at_checked(scheme.len())?;
    if !head.eq_ignore_ascii_case(scheme) {
        return None;
    }
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Server parameters of a Digest challenge plus the running nonce count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Whether the server offered `qop=auth`.
    pub qop_auth: bool,
    pub algorithm: String,
    nonce_count: u32,
}

impl DigestChallenge {
    fn from_params(params: &str) -> Option<Self> {
        let mut params = parse_auth_params(params);
        let realm = params.remove("realm")?;
        let nonce = params.remove("nonce")?;
        let qop_auth = params
            .get("qop")
            .is_some_and(|qop| qop.split(',').any(|q| q.trim() == "auth"));
        Some(Self {
            realm,
            nonce,
            opaque: params.remove("opaque"),
            qop_auth,
            algorithm: params.remove("algorithm").unwrap_or_else(|| "MD5".into()),
            nonce_count: 0,
        })
    }

    /// Computes the `Authorization` value for one request.
    pub fn respond(
        &mut self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        self.nonce_count += 1;
        let nc = format!("{:08x}", self.nonce_count);

        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let response = if self.qop_auth {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\", algorithm={}",
            credentials.username, self.realm, self.nonce, self.algorithm
        );
        if self.qop_auth {
            header.push_str(&format!(", qop=auth, nc={nc}, cnonce=\"{cnonce}\""));
        }
        if let Some(ref opaque) = self.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

/// Splits `key=value, key="quoted value"` pairs; keys are lowercased.
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().to_ascii_lowercase();
        let after = after.trim_start();

        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = quoted.len();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            (value, &quoted[end.min(quoted.len())..])
        } else {
            let end = after.find(',').unwrap_or(after.len());
            (after[..end].trim().to_string(), &after[end..])
        };

        if !key.is_empty() {
            params.insert(key, value);
        }
        rest = remaining;
    }

    params
}

fn new_cnonce() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}
