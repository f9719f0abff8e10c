// lib.rs - Şemasız döküman veritabanı: satır tabanlı TCP protokolü üzerinden
// insert/find/delete operasyonları sunan küçük bir NoSQL server

use thiserror::Error;

// Scan modülünü declare edin - parser'ların paylaştığı metin tarama yardımcıları
pub mod scan;

// Document modülünü declare edin - _id + sıralı text alan listesi
pub mod document;

// Store modülünü declare edin - zincirleme (separate chaining) hash tablosu
pub mod store;

// Query modülünü declare edin - filtre ifadeleri için predicate ağacı
pub mod query;

// Collection modülünü declare edin - store + disk dosyası + id sayacı
pub mod collection;

// Protocol modülünü declare edin - wire codec (request/response satırları)
pub mod protocol;

// Handler modülünü declare edin - request'leri collection operasyonlarına çevirir
pub mod handler;

// Network modülünü declare edin - TCP server implementation
pub mod network;

// Public export'lar
pub use collection::Collection;
pub use document::Document;
pub use handler::process_request;
pub use network::{CollectionRegistry, DatabaseServer, ServerConfig, ServerStats};
pub use protocol::{decode_request, DatabaseRequest, DatabaseResponse, ResponseStatus};
pub use query::Filter;
pub use store::DocumentStore;

/// Veritabanı işlemlerinde karşılaşılabilecek hata türleri
/// Request hataları connection'ı kapatmadan error response'a dönüşür;
/// dosya hataları loglanır ve in-memory state korunur.
#[derive(Error, Debug, PartialEq)]
pub enum DatabaseError {
    /// Bir döküman satırı parse edilemediğinde döndürülür
    #[error("Document parse error: {message}")]
    DocumentParse { message: String },

    /// Request satırı geçerli bir JSON nesnesi değilse ya da zorunlu
    /// database/operation alanları eksikse
    #[error("Invalid request JSON format")]
    InvalidRequest,

    /// Insert payload'ı ne nesne ne de nesne dizisi ise
    #[error("Invalid insert data (expected an object or an array of objects)")]
    InvalidInsertPayload,

    /// Insert için data ve query alanlarının ikisi de boşsa
    #[error("Empty insert data (data/query field is empty)")]
    EmptyInsertPayload,

    /// Bilinmeyen operation adları için
    #[error("Unknown operation: {operation}")]
    UnknownOperation { operation: String },

    /// Dosya sistemi hataları için
    #[error("File system error: {message}")]
    FileSystem { message: String },

    /// Socket kurulum hataları için
    #[error("Network error: {message}")]
    Network { message: String },
}

impl From<std::io::Error> for DatabaseError {
    fn from(error: std::io::Error) -> Self {
        DatabaseError::FileSystem {
            message: error.to_string(),
        }
    }
}
