//! Selective-disclosure commitments over JSON payloads.
//!
//! A disclosure frame marks payload fields that are replaced by salted
//! digest commitments at issuance. Each committed field becomes an opaque
//! disclosure token — `base64url(JSON [salt, name, value])` — whose SHA-256
//! digest is stored in an `_sd` array at the field's nesting level. A holder
//! later reveals a subset of tokens; a verifier substitutes matching tokens
//! back into the payload to recover the original claims.

use std::collections::{HashMap, HashSet};

use rand::RngCore;
use serde_json::{Map, Value};

use jades_core::{b64url_decode_string, b64url_encode};

use crate::error::CryptoError;
use crate::hashing::disclosure_digest;

/// Claim name carrying digest commitments at a nesting level.
pub const SD_KEY: &str = "_sd";
/// Top-level claim naming the commitment digest algorithm.
pub const SD_ALG_KEY: &str = "_sd_alg";
const SD_ALG: &str = "sha-256";
const SALT_LEN: usize = 16;

/// A single disclosure: salt, claim name, and the hidden value, together
/// with its canonical encoded token form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub salt: String,
    pub name: String,
    pub value: Value,
    encoded: String,
}

impl Disclosure {
    /// Commit to a claim with a fresh random salt.
    pub fn new(name: &str, value: Value) -> Result<Self, CryptoError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        Self::with_salt(b64url_encode(salt_bytes), name, value)
    }

    /// Commit to a claim with a caller-chosen salt.
    pub fn with_salt(salt: String, name: &str, value: Value) -> Result<Self, CryptoError> {
        let array = Value::Array(vec![
            Value::String(salt.clone()),
            Value::String(name.to_string()),
            value.clone(),
        ]);
        let json = serde_json::to_string(&array)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(Self {
            salt,
            name: name.to_string(),
            value,
            encoded: b64url_encode(json),
        })
    }

    /// Decode an opaque disclosure token.
    pub fn parse(encoded: &str) -> Result<Self, CryptoError> {
        let json = b64url_decode_string(encoded)
            .map_err(|e| CryptoError::MalformedDisclosure(e.to_string()))?;
        let array: Vec<Value> = serde_json::from_str(&json)
            .map_err(|e| CryptoError::MalformedDisclosure(e.to_string()))?;
        let [salt, name, value]: [Value; 3] = array.try_into().map_err(|_| {
            CryptoError::MalformedDisclosure("token must be a [salt, name, value] triple".into())
        })?;
        let (Value::String(salt), Value::String(name)) = (salt, name) else {
            return Err(CryptoError::MalformedDisclosure(
                "salt and name must be strings".into(),
            ));
        };
        Ok(Self {
            encoded: encoded.to_string(),
            salt,
            name,
            value,
        })
    }

    /// The opaque token form carried in the unprotected header.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// The commitment digest stored in an `_sd` array.
    pub fn digest(&self) -> String {
        disclosure_digest(&self.encoded)
    }
}

/// Apply a disclosure frame to a payload, replacing selected fields with
/// digest commitments.
///
/// Returns the committed payload and the disclosure tokens for the hidden
/// fields. When `frame` is absent, every top-level field of the payload is
/// committed (whole-payload flat disclosure).
pub fn apply_disclosure_frame(
    payload: &Value,
    frame: Option<&Value>,
) -> Result<(Value, Vec<Disclosure>), CryptoError> {
    let obj = payload.as_object().ok_or_else(|| {
        CryptoError::InvalidDisclosureFrame("payload must be a JSON object".into())
    })?;

    let default_frame;
    let frame_obj = match frame {
        Some(value) => value.as_object().ok_or_else(|| {
            CryptoError::InvalidDisclosureFrame("disclosure frame must be a JSON object".into())
        })?,
        None => {
            let names: Vec<Value> = obj.keys().map(|k| Value::String(k.clone())).collect();
            let mut map = Map::new();
            map.insert(SD_KEY.to_string(), Value::Array(names));
            default_frame = map;
            &default_frame
        }
    };

    let (mut committed, disclosures) = commit_object(obj, frame_obj)?;
    if !disclosures.is_empty() {
        committed.insert(SD_ALG_KEY.to_string(), Value::String(SD_ALG.into()));
    }
    tracing::debug!(committed = disclosures.len(), "disclosure frame applied");
    Ok((Value::Object(committed), disclosures))
}

fn frame_sd_names(frame: &Map<String, Value>) -> Result<Vec<String>, CryptoError> {
    match frame.get(SD_KEY) {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry.as_str().map(String::from).ok_or_else(|| {
                    CryptoError::InvalidDisclosureFrame("_sd entries must be field names".into())
                })
            })
            .collect(),
        Some(_) => Err(CryptoError::InvalidDisclosureFrame(
            "_sd must be an array of field names".into(),
        )),
    }
}

fn commit_object(
    obj: &Map<String, Value>,
    frame: &Map<String, Value>,
) -> Result<(Map<String, Value>, Vec<Disclosure>), CryptoError> {
    let sd_names = frame_sd_names(frame)?;
    for name in &sd_names {
        if !obj.contains_key(name) {
            return Err(CryptoError::InvalidDisclosureFrame(format!(
                "frame selects field {} absent from payload",
                name
            )));
        }
    }

    let mut out = Map::new();
    let mut disclosures = Vec::new();

    for (key, value) in obj {
        if sd_names.contains(key) {
            continue;
        }
        match (frame.get(key), value) {
            (Some(Value::Object(sub_frame)), Value::Object(child)) => {
                let (committed, mut nested) = commit_object(child, sub_frame)?;
                out.insert(key.clone(), Value::Object(committed));
                disclosures.append(&mut nested);
            }
            (Some(Value::Object(_)), _) => {
                return Err(CryptoError::InvalidDisclosureFrame(format!(
                    "nested frame given for non-object field {}",
                    key
                )));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    let mut digests = Vec::with_capacity(sd_names.len());
    for name in &sd_names {
        let Some(value) = obj.get(name) else { continue };
        // A nested frame under a committed name first commits inside the
        // hidden value, so inner fields stay independently disclosable.
        let hidden = match (frame.get(name), value) {
            (Some(Value::Object(sub_frame)), Value::Object(child)) => {
                let (committed, mut nested) = commit_object(child, sub_frame)?;
                disclosures.append(&mut nested);
                Value::Object(committed)
            }
            _ => value.clone(),
        };
        let disclosure = Disclosure::new(name, hidden)?;
        digests.push(Value::String(disclosure.digest()));
        disclosures.push(disclosure);
    }
    if !digests.is_empty() {
        out.insert(SD_KEY.to_string(), Value::Array(digests));
    }

    Ok((out, disclosures))
}

/// Select the disclosure tokens to reveal for a presentation frame.
///
/// `payload` is the decoded committed payload, `disclosures` the full token
/// list from the unprotected header. An absent or empty frame reveals
/// nothing beyond what the payload discloses unconditionally.
pub fn select_disclosures(
    payload: &Value,
    disclosures: &[String],
    frame: Option<&Value>,
) -> Result<Vec<String>, CryptoError> {
    let frame_obj = match frame {
        Some(value) => value.as_object().ok_or_else(|| {
            CryptoError::InvalidDisclosureFrame("presentation frame must be a JSON object".into())
        })?,
        None => return Ok(Vec::new()),
    };
    if frame_obj.is_empty() {
        return Ok(Vec::new());
    }

    let by_digest = index_disclosures(disclosures)?;
    let mut keep = HashSet::new();
    if let Some(obj) = payload.as_object() {
        select_in_object(obj, frame_obj, &by_digest, &mut keep);
    }

    Ok(disclosures
        .iter()
        .filter(|token| keep.contains(token.as_str()))
        .cloned()
        .collect())
}

fn index_disclosures(disclosures: &[String]) -> Result<HashMap<String, Disclosure>, CryptoError> {
    let mut by_digest = HashMap::with_capacity(disclosures.len());
    for token in disclosures {
        let disclosure = Disclosure::parse(token)?;
        by_digest.insert(disclosure.digest(), disclosure);
    }
    Ok(by_digest)
}

fn sd_digests(obj: &Map<String, Value>) -> impl Iterator<Item = &str> {
    obj.get(SD_KEY)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn select_in_object<'a>(
    obj: &Map<String, Value>,
    frame: &Map<String, Value>,
    by_digest: &'a HashMap<String, Disclosure>,
    keep: &mut HashSet<&'a str>,
) {
    for digest in sd_digests(obj) {
        let Some(disclosure) = by_digest.get(digest) else { continue };
        match frame.get(&disclosure.name) {
            Some(Value::Bool(true)) => {
                keep.insert(disclosure.encoded());
                reveal_subtree(&disclosure.value, by_digest, keep);
            }
            Some(Value::Object(sub_frame)) => {
                keep.insert(disclosure.encoded());
                if let Some(child) = disclosure.value.as_object() {
                    select_in_object(child, sub_frame, by_digest, keep);
                }
            }
            _ => {}
        }
    }
    for (key, value) in obj {
        if key == SD_KEY {
            continue;
        }
        if let (Some(Value::Object(sub_frame)), Value::Object(child)) = (frame.get(key), value) {
            select_in_object(child, sub_frame, by_digest, keep);
        }
    }
}

/// Reveal every disclosure nested under a value (frame entry `true`).
fn reveal_subtree<'a>(
    value: &Value,
    by_digest: &'a HashMap<String, Disclosure>,
    keep: &mut HashSet<&'a str>,
) {
    match value {
        Value::Object(obj) => {
            for digest in sd_digests(obj) {
                if let Some(disclosure) = by_digest.get(digest) {
                    keep.insert(disclosure.encoded());
                    reveal_subtree(&disclosure.value, by_digest, keep);
                }
            }
            for (key, child) in obj {
                if key != SD_KEY {
                    reveal_subtree(child, by_digest, keep);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                reveal_subtree(item, by_digest, keep);
            }
        }
        _ => {}
    }
}

/// Reconstruct the claim set from a committed payload and revealed tokens.
///
/// Every token must match a commitment digest somewhere in the payload;
/// an unmatched token means the credential is structurally inconsistent.
pub fn reconstruct_claims(
    payload: &Value,
    disclosures: &[String],
) -> Result<Value, CryptoError> {
    let by_digest = index_disclosures(disclosures)?;
    let mut used = HashSet::new();
    let rebuilt = rebuild(payload, &by_digest, &mut used);
    for digest in by_digest.keys() {
        if !used.contains(digest.as_str()) {
            return Err(CryptoError::DisclosureMismatch(digest.clone()));
        }
    }
    Ok(rebuilt)
}

fn rebuild<'a>(
    value: &Value,
    by_digest: &'a HashMap<String, Disclosure>,
    used: &mut HashSet<&'a str>,
) -> Value {
    match value {
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                if key == SD_KEY || key == SD_ALG_KEY {
                    continue;
                }
                out.insert(key.clone(), rebuild(child, by_digest, used));
            }
            for digest in sd_digests(obj) {
                if let Some((stored, disclosure)) = by_digest.get_key_value(digest) {
                    used.insert(stored.as_str());
                    out.insert(
                        disclosure.name.clone(),
                        rebuild(&disclosure.value, by_digest, used),
                    );
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| rebuild(v, by_digest, used)).collect())
        }
        other => other.clone(),
    }
}
