// protocol.rs - Wire codec: one JSON object per line in both directions
//
// Request/response envelope serde ile parse edilir; data ve query alanları
// RawValue olarak byte-for-byte taşınır ki handler insert payload'ını ve
// filtre metnini aynen görebilsin. Bilinmeyen alanlar sessizce yok sayılır.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::DatabaseError;

/// Client'tan server'a gönderilen istek.
///
/// `database` ve `operation` zorunludur; `data` (insert payload'ı: tek nesne
/// ya da nesne dizisi) ve `query` (filtre nesnesi) opsiyoneldir ve ham JSON
/// fragment'ları olarak saklanır.
#[derive(Debug, Deserialize)]
pub struct DatabaseRequest {
    pub database: String,
    pub operation: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
    #[serde(default)]
    pub query: Option<Box<RawValue>>,
}

impl DatabaseRequest {
    /// Verbatim `data` fragment, or the empty string when absent.
    pub fn data_text(&self) -> &str {
        self.data.as_deref().map(RawValue::get).unwrap_or("")
    }

    /// Verbatim `query` fragment, or the empty string when absent.
    pub fn query_text(&self) -> &str {
        self.query.as_deref().map(RawValue::get).unwrap_or("")
    }
}

/// Parses one request line. Anything serde rejects — malformed JSON, missing
/// `database`/`operation` — collapses into [`DatabaseError::InvalidRequest`],
/// whose message is the wire-visible `"Invalid request JSON format"`.
pub fn decode_request(line: &str) -> Result<DatabaseRequest, DatabaseError> {
    serde_json::from_str(line).map_err(|_| DatabaseError::InvalidRequest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Server'dan client'a dönen cevap: durum, okunabilir mesaj, etkilenen
/// döküman sayısı ve `data` fragment'ı (`[]` ya da find sonucu dizisi).
#[derive(Debug, Serialize)]
pub struct DatabaseResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub count: usize,
    pub data: Box<RawValue>,
}

impl DatabaseResponse {
    pub fn success(message: impl Into<String>, count: usize, data: String) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            count,
            data: raw_fragment(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            count: 0,
            data: raw_fragment("[]".to_string()),
        }
    }

    /// One `\n`-terminated response line. The message is JSON-escaped by the
    /// serializer (backslash, quote, CR, LF, TAB and the remaining control
    /// characters).
    pub fn encode(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("Response serialization failed: {}", e);
            r#"{"status":"error","message":"Response serialization failed","count":0,"data":[]}"#
                .to_string()
        });
        line.push('\n');
        line
    }
}

/// Wraps an already-rendered JSON fragment for verbatim output. A fragment
/// that is not valid JSON (possible only for documents carrying the
/// unsupported `"`/`\` bytes) is replaced by `[]` so the response line stays
/// well-formed.
fn raw_fragment(fragment: String) -> Box<RawValue> {
    RawValue::from_string(fragment).unwrap_or_else(|e| {
        log::warn!("Dropping non-JSON data fragment from response: {}", e);
        RawValue::from_string("[]".to_string()).expect("'[]' is valid JSON")
    })
}
