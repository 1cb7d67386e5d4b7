//! Account and message models for Mail.tm.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A JSON object as returned by the Mail.tm API.
pub type JsonObject = serde_json::Map<String, Value>;

/// A temporary mailbox created through [`Client::create_account`](crate::Client::create_account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Full email address, e.g. `brave.otter42@example.com`.
    pub address: String,
    /// Password used to obtain bearer tokens.
    pub password: String,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.password)
    }
}

/// A sender or recipient of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// Email address.
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    /// Display name, empty when the service has none.
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
}

/// A fully fetched message from a Mail.tm inbox.
///
/// Decoding never fails on a JSON object: absent or mistyped keys fall back to
/// empty strings, `false`, zero, empty lists, and unparsable dates to the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Service-internal message id.
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    /// Protocol `Message-ID` header.
    #[serde(rename = "msgid", deserialize_with = "lenient::string")]
    pub message_id: String,
    /// Sender.
    #[serde(deserialize_with = "lenient::subject")]
    pub from: Subject,
    /// Primary recipients.
    #[serde(deserialize_with = "lenient::subjects")]
    pub to: Vec<Subject>,
    /// Carbon-copy recipients.
    #[serde(deserialize_with = "lenient::subjects")]
    pub cc: Vec<Subject>,
    /// Blind carbon-copy recipients.
    #[serde(deserialize_with = "lenient::subjects")]
    pub bcc: Vec<Subject>,
    /// Subject line.
    #[serde(deserialize_with = "lenient::string")]
    pub subject: String,
    /// Short preview of the body.
    #[serde(deserialize_with = "lenient::string")]
    pub intro: String,
    /// Whether the message was marked as read.
    #[serde(deserialize_with = "lenient::boolean")]
    pub seen: bool,
    /// Whether the message was flagged.
    #[serde(deserialize_with = "lenient::boolean")]
    pub flagged: bool,
    /// Whether the message was deleted.
    #[serde(rename = "isDeleted", deserialize_with = "lenient::boolean")]
    pub is_deleted: bool,
    /// Whether retention is enabled.
    #[serde(deserialize_with = "lenient::boolean")]
    pub retention: bool,
    /// When the message will be purged.
    #[serde(rename = "retentionDate", deserialize_with = "lenient::date")]
    pub retention_date: DateTime<Utc>,
    /// Plain-text body.
    #[serde(deserialize_with = "lenient::string")]
    pub text: String,
    /// HTML body parts.
    #[serde(deserialize_with = "lenient::html")]
    pub html: Vec<String>,
    /// Whether the message carries attachments.
    #[serde(rename = "hasAttachments", deserialize_with = "lenient::boolean")]
    pub has_attachments: bool,
    /// Size in bytes.
    #[serde(deserialize_with = "lenient::size")]
    pub size: u64,
    /// Creation timestamp.
    #[serde(rename = "createdAt", deserialize_with = "lenient::date")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    #[serde(rename = "updatedAt", deserialize_with = "lenient::date")]
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Decode a `/messages/{id}` payload.
    pub fn from_json(object: JsonObject) -> Self {
        serde_json::from_value(Value::Object(object)).unwrap_or_default()
    }
}

/// Render a wire id as a string; numeric ids keep their decimal form.
pub(crate) fn id_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse an ISO-8601 timestamp. Offset-less forms are taken as UTC and a bare
/// date as midnight.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
    .map(|naive| naive.and_utc())
}

/// Field decoders that accept any JSON value and fall back to a default.
mod lenient {
    use super::{DateTime, Subject, Utc, Value, id_field, parse_date};
    use serde::{Deserialize, Deserializer};

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(str::to_string).unwrap_or_default())
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(id_field(&Value::deserialize(deserializer)?))
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
    }

    pub fn size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .and_then(parse_date)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }

    pub fn html<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(parts) => parts
                .into_iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect(),
            Value::String(s) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        })
    }

    pub fn subject<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Subject, D::Error> {
        Ok(to_subject(Value::deserialize(deserializer)?))
    }

    pub fn subjects<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Subject>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().map(to_subject).collect(),
            _ => Vec::new(),
        })
    }

    fn to_subject(value: Value) -> Subject {
        Subject::deserialize(value).unwrap_or_default()
    }
}
