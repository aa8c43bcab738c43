//! HTTP Digest access authentication (RFC 7616, with the RFC 2069 no-qop form).

use md5::Md5;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::client::{consts, Credentials, TransportError};

/// Hash algorithm announced by the server challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    fn parse(value: &str) -> Result<Self, TransportError> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "MD5-SESS" => Ok(Self::Md5Sess),
            "SHA-256" => Ok(Self::Sha256),
            "SHA-256-SESS" => Ok(Self::Sha256Sess),
            other => Err(TransportError::Auth(format!(
                "unsupported digest algorithm {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    pub(crate) fn hash(self, parts: &[&str]) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hash_parts::<Md5>(parts),
            Self::Sha256 | Self::Sha256Sess => hash_parts::<Sha256>(parts),
        }
    }
}

fn hash_parts<D: Digest>(parts: &[&str]) -> String {
    let mut hasher = D::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    /// Quality-of-protection options offered by the server, lower-cased.
    pub qop: Vec<String>,
}

impl DigestChallenge {
    /// Parse a header value. The `Digest` scheme token is required.
    pub fn parse(header: &str) -> Result<Self, TransportError> {
        let header = header.trim_start();
        let params = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
            _ => {
                return Err(TransportError::Auth(format!(
                    "not a Digest challenge: {header}"
                )))
            }
        };

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut algorithm = Algorithm::Md5;
        let mut qop = Vec::new();
        for (key, value) in parse_params(params)? {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Algorithm::parse(&value)?,
                "qop" => {
                    qop = value
                        .split(',')
                        .map(|q| q.trim().to_ascii_lowercase())
                        .filter(|q| !q.is_empty())
                        .collect();
                }
                other => trace!(param = other, "ignoring digest parameter"),
            }
        }

        let nonce = nonce.ok_or_else(|| TransportError::Auth("challenge without nonce".into()))?;
        Ok(Self {
            realm: realm.unwrap_or_default(),
            nonce,
            opaque,
            algorithm,
            qop,
        })
    }

    /// Build the `Authorization` header value answering this challenge.
    pub fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
    ) -> Result<String, TransportError> {
        let cnonce = format!("{:016x}", fastrand::u64(..));
        self.authorization_with_cnonce(credentials, method, uri, &cnonce)
    }

    pub(crate) fn authorization_with_cnonce(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> Result<String, TransportError> {
        let qop = self.select_qop()?;
        let response = self.response(credentials, method, uri, qop, cnonce);
        debug!(
            realm = %self.realm,
            algorithm = self.algorithm.as_str(),
            qop = qop.unwrap_or("none"),
            "answering digest challenge"
        );

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", algorithm={}, response="{response}""#,
            quote(&credentials.username),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            self.algorithm.as_str(),
        );
        if let Some(qop) = qop {
            header.push_str(&format!(
                r#", qop={qop}, nc={}, cnonce="{cnonce}""#,
                consts::NONCE_COUNT
            ));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, quote(opaque)));
        }
        Ok(header)
    }

    fn select_qop(&self) -> Result<Option<&'static str>, TransportError> {
        if self.qop.is_empty() {
            Ok(None)
        } else if self.qop.iter().any(|q| q == "auth") {
            Ok(Some("auth"))
        } else {
            Err(TransportError::Auth(format!(
                "unsupported qop options: {}",
                self.qop.join(",")
            )))
        }
    }

    pub(crate) fn response(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        qop: Option<&str>,
        cnonce: &str,
    ) -> String {
        let alg = self.algorithm;
        let mut ha1 = alg.hash(&[&credentials.username, &self.realm, &credentials.password]);
        if alg.is_session() {
            ha1 = alg.hash(&[&ha1, &self.nonce, cnonce]);
        }
        let ha2 = alg.hash(&[method, uri]);
        match qop {
            Some(qop) => alg.hash(&[&ha1, &self.nonce, consts::NONCE_COUNT, cnonce, qop, &ha2]),
            None => alg.hash(&[&ha1, &self.nonce, &ha2]),
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Split `key=value, key="quoted, value"` into lower-cased keys and unescaped values.
pub(crate) fn parse_params(input: &str) -> Result<Vec<(String, String)>, TransportError> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        let key = key.trim().to_ascii_lowercase();
        if chars.next_if_eq(&'=').is_none() {
            return Err(TransportError::Auth(format!(
                "digest parameter '{key}' has no value"
            )));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(TransportError::Auth(format!(
                    "unterminated quoted value for '{key}'"
                )));
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
            value = value.trim().to_string();
        }
        params.push((key, value));
    }

    Ok(params)
}
