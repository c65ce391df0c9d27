//! AWS Signature Version 4 request signing.
//!
//! Only the header-based flavour is implemented: the caller describes the
//! request, [`sign`] returns the headers to attach to it.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_FORMAT: &str = "%Y%m%d";

/// The parts of an HTTP request that go into the signature.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Host header value, including a non-default port.
    pub host: &'a str,
    /// Path exactly as sent on the wire (already percent-encoded).
    pub path: &'a str,
    /// Canonical query string (sorted, encoded). Empty for none.
    pub query: &'a str,
    /// Extra headers to sign. `host`, `x-amz-date` and the session token
    /// are added by the signer.
    pub headers: &'a [(&'a str, String)],
    /// Hex SHA-256 of the payload.
    pub payload_hash: &'a str,
}

/// Who is signing, where, and when.
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Sign a request. Returns `(name, value)` pairs to add to it, the
/// `authorization` header last.
pub fn sign(request: &SignableRequest<'_>, params: &SigningParams<'_>) -> Vec<(String, String)> {
    let amz_date = params.time.format(AMZ_DATE_FORMAT).to_string();
    let date = params.time.format(DATE_FORMAT).to_string();

    let mut added = vec![("x-amz-date".to_string(), amz_date.clone())];
    if let Some(token) = &params.credentials.session_token {
        added.push(("x-amz-security-token".to_string(), token.clone()));
    }

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), normalize_value(value)))
        .chain(std::iter::once(("host".to_string(), request.host.to_string())))
        .chain(added.iter().cloned())
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();

    let canonical_request = format!(
        "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload}",
        method = request.method,
        uri = canonical_uri(request.path, params.service),
        query = request.query,
        payload = request.payload_hash,
    );

    let scope = format!(
        "{date}/{region}/{service}/aws4_request",
        region = params.region,
        service = params.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    added.push((
        "authorization".to_string(),
        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            params.credentials.access_key_id
        ),
    ));
    added
}

/// Derive the per-day, per-service signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// S3 signs the path as sent; every other service signs it encoded twice.
fn canonical_uri(path: &str, service: &str) -> String {
    let path = if path.is_empty() { "/" } else { path };
    if service == "s3" {
        path.to_string()
    } else {
        uri_encode(path, false)
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
/// `/` is kept unless `encode_slash` is set.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Trim and collapse internal runs of spaces.
fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
