// network.rs - TCP Database Server Implementation
// Bu modül satır tabanlı request/response protokolünün server tarafını implement eder:
// her connection için ayrı bir task, her database için ayrı bir serial lock.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::collection::Collection;
use crate::handler::process_request;
use crate::protocol::{decode_request, DatabaseResponse};
use crate::DatabaseError;

/// Server Configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on
    pub port: u16,

    /// Database eagerly materialized before the server accepts traffic
    pub default_database: String,

    /// Folder holding one `<name>.json` file per database
    pub data_folder: PathBuf,

    /// Listen backlog
    pub backlog: u32,

    /// Per-request debug logging
    pub verbose_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4444,
            default_database: "mydb".to_string(),
            data_folder: PathBuf::from("mydb"),
            backlog: 16,
            verbose_logging: false,
        }
    }
}

/// Process-wide database name → collection slot mapping.
///
/// Collections materialize lazily on first reference and live until process
/// exit. The registry lock covers only the lookup/insert step (plus the
/// one-time load of a new collection); each slot carries its own serial lock
/// that workers hold across a whole operation, so requests against the same
/// database serialize while different databases proceed in parallel.
pub struct CollectionRegistry {
    data_folder: PathBuf,
    collections: RwLock<AHashMap<String, Arc<Mutex<Collection>>>>,
}

impl CollectionRegistry {
    pub fn new(data_folder: PathBuf) -> Self {
        Self {
            data_folder,
            collections: RwLock::new(AHashMap::new()),
        }
    }

    /// Returns the slot for `name`, creating (and loading) the collection on
    /// first reference.
    pub async fn resolve(&self, name: &str) -> Arc<Mutex<Collection>> {
        if let Some(slot) = self.collections.read().await.get(name) {
            return Arc::clone(slot);
        }

        let mut collections = self.collections.write().await;
        Arc::clone(
            collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Collection::open(name, &self.data_folder)))),
        )
    }
}

/// Anlık server istatistikleri - monitoring için
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub started_at: DateTime<Utc>,
    pub active_connections: usize,
    pub total_requests: u64,
}

/// Database Server - Ana TCP server implementation
pub struct DatabaseServer {
    config: ServerConfig,
    registry: Arc<CollectionRegistry>,
    started_at: DateTime<Utc>,
    active_connections: Arc<AtomicUsize>,
    total_requests: Arc<AtomicU64>,
}

impl DatabaseServer {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(CollectionRegistry::new(config.data_folder.clone()));
        Self {
            config,
            registry,
            started_at: Utc::now(),
            active_connections: Arc::new(AtomicUsize::new(0)),
            total_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            started_at: self.started_at,
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }

    /// Binds the listening socket and runs the accept loop. Returns only on
    /// a bind/listen failure; accept failures are logged and the loop keeps
    /// going.
    pub async fn run(&self) -> Result<(), DatabaseError> {
        // Default database'i accept öncesi materialize et ki dosyası
        // trafikten önce yüklenmiş olsun
        self.registry.resolve(&self.config.default_database).await;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let socket = TcpSocket::new_v4().map_err(|e| DatabaseError::Network {
            message: format!("failed to create socket: {}", e),
        })?;
        socket.set_reuseaddr(true).map_err(|e| DatabaseError::Network {
            message: format!("failed to set SO_REUSEADDR: {}", e),
        })?;
        socket.bind(addr).map_err(|e| DatabaseError::Network {
            message: format!("failed to bind {}: {}", addr, e),
        })?;
        let listener = socket.listen(self.config.backlog).map_err(|e| {
            DatabaseError::Network {
                message: format!("failed to listen on {}: {}", addr, e),
            }
        })?;

        log::info!("Database server listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let connection_id = Uuid::new_v4();
                    log::info!("New connection {} from {}", connection_id, peer);

                    let registry = Arc::clone(&self.registry);
                    let total_requests = Arc::clone(&self.total_requests);
                    let active_connections = Arc::clone(&self.active_connections);
                    let verbose = self.config.verbose_logging;

                    active_connections.fetch_add(1, Ordering::Relaxed);
                    tokio::spawn(async move {
                        handle_connection(stream, connection_id, registry, total_requests, verbose)
                            .await;
                        active_connections.fetch_sub(1, Ordering::Relaxed);
                        log::info!("Connection {} closed", connection_id);
                    });
                }
                Err(e) => log::error!("Failed to accept connection: {}", e),
            }
        }
    }
}

/// Connection worker: reads `\n`-delimited request lines until end-of-stream
/// and answers each with exactly one response line, in order. A read or
/// write failure ends this worker only.
async fn handle_connection(
    stream: TcpStream,
    connection_id: Uuid,
    registry: Arc<CollectionRegistry>,
    total_requests: Arc<AtomicU64>,
    verbose: bool,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break, // client closed the connection
            Err(e) => {
                log::error!("Read failure on connection {}: {}", connection_id, e);
                break;
            }
        };

        let response = match decode_request(&line) {
            Ok(request) => {
                if verbose {
                    log::debug!(
                        "Connection {}: {} on '{}'",
                        connection_id,
                        request.operation,
                        request.database
                    );
                }
                let collection = registry.resolve(&request.database).await;
                // the slot lock serializes every operation on this database
                let mut guard = collection.lock().await;
                process_request(&request, &mut guard)
            }
            Err(e) => DatabaseResponse::error(e.to_string()),
        };

        total_requests.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = write_half.write_all(response.encode().as_bytes()).await {
            log::error!("Write failure on connection {}: {}", connection_id, e);
            break;
        }
    }
}
