//! Decoded token claims

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};

/// Claims of a verified token
///
/// Lives for one request: the gating middleware stores it in the request extensions
/// and handlers read it from there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    /// Subject (`sub`)
    pub subject: Option<String>,
    /// Issuer (`iss`)
    pub issuer: Option<String>,
    /// Audiences (`aud`), normalized from a string or an array
    pub audience: Vec<String>,
    /// Granted permissions, in the order the token lists them
    pub permissions: Vec<String>,
    /// Expiration (`exp`), Unix seconds
    pub expires_at: Option<u64>,
    /// Issued at (`iat`), Unix seconds
    pub issued_at: Option<u64>,
    /// Not before (`nbf`), Unix seconds
    pub not_before: Option<u64>,
    /// Every other claim, untouched
    pub additional: Map<String, Value>,
}

impl Claims {
    /// Split a decoded payload into registered claims and the rest
    ///
    /// `permissions_claim` names the claim holding granted permissions. It may be a
    /// space-delimited string (OAuth `scope` style) or an array of strings.
    pub fn from_payload(mut payload: Map<String, Value>, permissions_claim: &str) -> Self {
        let permissions = payload
            .remove(permissions_claim)
            .map(string_list)
            .unwrap_or_default();

        Self {
            subject: take_string(&mut payload, "sub"),
            issuer: take_string(&mut payload, "iss"),
            audience: payload.remove("aud").map(string_list).unwrap_or_default(),
            permissions,
            expires_at: take_timestamp(&mut payload, "exp"),
            issued_at: take_timestamp(&mut payload, "iat"),
            not_before: take_timestamp(&mut payload, "nbf"),
            additional: payload,
        }
    }

    /// Whether `permission` was granted (exact, case-sensitive)
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Expiration as a [`SystemTime`]
    pub fn expires_at_time(&self) -> Option<SystemTime> {
        self.expires_at
            .map(|exp| UNIX_EPOCH + Duration::from_secs(exp))
    }

    /// Issued-at as a [`SystemTime`]
    pub fn issued_at_time(&self) -> Option<SystemTime> {
        self.issued_at.map(|iat| UNIX_EPOCH + Duration::from_secs(iat))
    }

    /// Look up a non-registered claim
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.additional.get(claim)
    }
}

fn take_string(payload: &mut Map<String, Value>, claim: &str) -> Option<String> {
    match payload.remove(claim) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            payload.insert(claim.to_string(), other);
            None
        }
        None => None,
    }
}

fn take_timestamp(payload: &mut Map<String, Value>, claim: &str) -> Option<u64> {
    match payload.remove(claim) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(other) => {
            payload.insert(claim.to_string(), other);
            None
        }
        None => None,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
