// collection.rs - One named database: in-memory store + on-disk file + id counter

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::query::Filter;
use crate::scan;
use crate::store::DocumentStore;
use crate::DatabaseError;

/// Binds a database name to a [`DocumentStore`], a monotonic id counter and a
/// file path (`<folder>/<name>.json`, one serialized document per line).
///
/// New document ids are minted as decimal strings starting at 1. After
/// loading an existing file the counter resumes one past the largest numeric
/// id found, so ids are never recycled.
#[derive(Debug)]
pub struct Collection {
    name: String,
    folder: PathBuf,
    store: DocumentStore,
    next_id: i64,
}

impl Collection {
    /// Creates the collection and loads its file if one exists. A missing
    /// file is an empty collection; an unreadable file is logged and treated
    /// the same.
    pub fn open(name: &str, folder: &Path) -> Self {
        let mut collection = Self {
            name: name.to_string(),
            folder: folder.to_path_buf(),
            store: DocumentStore::new(),
            next_id: 1,
        };
        collection.load();
        collection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    fn collection_path(&self) -> PathBuf {
        self.folder.join(format!("{}.json", self.name))
    }

    fn generate_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn load(&mut self) {
        let path = self.collection_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "Collection file {} not found, starting with an empty database",
                    path.display()
                );
                return;
            }
            Err(e) => {
                log::error!(
                    "Could not open collection file {} for reading: {}",
                    path.display(),
                    e
                );
                return;
            }
        };

        let mut max_id: i64 = 0;
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Read failure while loading {}: {}", path.display(), e);
                    break;
                }
            };
            if line.is_empty() {
                continue;
            }
            match Document::deserialize(&line) {
                Ok(doc) => {
                    match scan::parse_int(doc.id()) {
                        Some(id) if id > max_id => max_id = id,
                        Some(_) => {}
                        // non-numeric ids stay valid keys but do not advance
                        // the counter
                        None => log::warn!(
                            "Could not parse id '{}' as an integer during load",
                            doc.id()
                        ),
                    }
                    let key = doc.id().to_string();
                    self.store.put(&key, doc);
                }
                Err(e) => log::error!("Skipping undecodable line in {}: {}", path.display(), e),
            }
        }

        self.next_id = max_id + 1;
        log::info!(
            "Database '{}' loaded. Documents: {}. Next id: {}",
            self.name,
            self.store.len(),
            self.next_id
        );
    }

    /// Rewrites the whole file from the current store contents, creating the
    /// containing folder on demand. Iteration order is whatever the bucket
    /// walk produces.
    pub fn save(&self) -> Result<(), DatabaseError> {
        fs::create_dir_all(&self.folder)?;
        let path = self.collection_path();
        let mut writer = BufWriter::new(File::create(&path)?);
        let mut count = 0usize;
        for entry in self.store.iter() {
            writer.write_all(entry.doc.serialize().as_bytes())?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        writer.flush()?;
        log::info!(
            "Database '{}' saved. Documents: {}. File: {}",
            self.name,
            count,
            path.display()
        );
        Ok(())
    }

    /// Mints the next id, splices it in right after the payload's opening
    /// brace and stores the parsed document. The id is consumed before the
    /// payload is validated, so a failed parse burns it.
    pub fn insert(&mut self, doc_json: &str) -> Result<String, DatabaseError> {
        let new_id = self.generate_id();
        let trimmed = scan::trim(doc_json);
        if !trimmed.starts_with('{') {
            return Err(DatabaseError::DocumentParse {
                message: format!("insert payload must be an object: {}", trimmed),
            });
        }

        // {"name":"Alice"} becomes {"_id":"1","name":"Alice"}
        let full_json = format!("{{\"_id\":\"{}\",{}", new_id, &trimmed[1..]);
        let doc = Document::deserialize(&full_json)?;
        let key = doc.id().to_string();
        self.store.put(&key, doc);
        Ok(new_id)
    }

    /// Full scan; returns the matches as one JSON array plus their count.
    pub fn find(&self, filter: &Filter) -> (String, usize) {
        let mut json_array = String::from("[");
        let mut count = 0usize;
        for entry in self.store.iter() {
            if filter.matches(&entry.doc) {
                if count > 0 {
                    json_array.push(',');
                }
                json_array.push_str(&entry.doc.serialize());
                count += 1;
            }
        }
        json_array.push(']');
        (json_array, count)
    }

    /// Two-phase delete: collect matching ids first, then remove them. The
    /// store must not be mutated while its buckets are being walked.
    pub fn delete(&mut self, filter: &Filter) -> usize {
        let mut ids_to_delete = Vec::new();
        for entry in self.store.iter() {
            if filter.matches(&entry.doc) {
                ids_to_delete.push(entry.key.clone());
            }
        }

        let mut deleted = 0usize;
        for id in &ids_to_delete {
            if self.store.remove(id).is_some() {
                deleted += 1;
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("doc-db-collection-{}", Uuid::new_v4())))
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let dir = ScratchDir::new();
        let mut collection = Collection::open("users", &dir.0);

        let a = collection.insert(r#"{"name":"Alice"}"#).expect("insert should succeed");
        let b = collection.insert(r#"{"name":"Bob"}"#).expect("insert should succeed");
        let c = collection.insert(r#"{"name":"Carol"}"#).expect("insert should succeed");

        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("1", "2", "3"));
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.next_id(), 4);
    }

    #[test]
    fn test_failed_insert_burns_an_id() {
        let dir = ScratchDir::new();
        let mut collection = Collection::open("users", &dir.0);

        assert!(collection.insert("not an object").is_err());
        let id = collection.insert(r#"{"name":"Alice"}"#).expect("insert should succeed");
        assert_eq!(id, "2");
    }

    #[test]
    fn test_client_supplied_id_is_ignored() {
        let dir = ScratchDir::new();
        let mut collection = Collection::open("users", &dir.0);

        let id = collection
            .insert(r#"{"_id":"99","name":"Alice"}"#)
            .expect("insert should succeed");
        assert_eq!(id, "1");
        let (_, count) = collection.find(&Filter::parse(r#"{"_id":"99"}"#));
        assert_eq!(count, 0);
    }

    #[test]
    fn test_find_and_delete() {
        let dir = ScratchDir::new();
        let mut collection = Collection::open("users", &dir.0);
        collection.insert(r#"{"name":"Alice","age":"25"}"#).expect("insert should succeed");
        collection.insert(r#"{"name":"Bob","age":"7"}"#).expect("insert should succeed");
        collection.insert(r#"{"name":"Carol","age":"100"}"#).expect("insert should succeed");

        let filter = Filter::parse(r#"{"age":{"$gt":"20"}}"#);
        let (json_array, count) = collection.find(&filter);
        assert_eq!(count, 2);
        assert!(json_array.starts_with('[') && json_array.ends_with(']'));
        assert!(json_array.contains(r#""name":"Alice""#));
        assert!(json_array.contains(r#""name":"Carol""#));

        // find has no side effects
        let (again, count_again) = collection.find(&filter);
        assert_eq!((json_array, count), (again, count_again));

        let deleted = collection.delete(&filter);
        assert_eq!(deleted, 2);
        assert_eq!(collection.len(), 1);
        let (_, remaining) = collection.find(&Filter::MatchAll);
        assert_eq!(remaining, 1);
    }

    #[test]
    fn test_save_and_reload_resumes_id_counter() {
        let dir = ScratchDir::new();
        {
            let mut collection = Collection::open("users", &dir.0);
            collection.insert(r#"{"name":"Alice"}"#).expect("insert should succeed");
            collection.insert(r#"{"name":"Bob"}"#).expect("insert should succeed");
            collection.insert(r#"{"name":"Carol"}"#).expect("insert should succeed");
            collection.delete(&Filter::parse(r#"{"_id":"2"}"#));
            collection.save().expect("save should succeed");
        }

        let mut reloaded = Collection::open("users", &dir.0);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.next_id(), 4); // ids are not recycled
        let id = reloaded.insert(r#"{"name":"Dave"}"#).expect("insert should succeed");
        assert_eq!(id, "4");
    }

    #[test]
    fn test_load_skips_non_numeric_ids_for_counter() {
        let dir = ScratchDir::new();
        fs::create_dir_all(&dir.0).expect("mkdir should succeed");
        fs::write(
            dir.0.join("users.json"),
            "{\"_id\":\"7\",\"name\":\"Alice\"}\n{\"_id\":\"zz\",\"name\":\"Bob\"}\n\n",
        )
        .expect("write should succeed");

        let collection = Collection::open("users", &dir.0);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.next_id(), 8);
        assert!(collection.store().get("zz").is_some());
    }

    #[test]
    fn test_load_skips_undecodable_lines() {
        let dir = ScratchDir::new();
        fs::create_dir_all(&dir.0).expect("mkdir should succeed");
        fs::write(
            dir.0.join("users.json"),
            "{\"_id\":\"1\",\"name\":\"Alice\"}\ngarbage\n{\"_id\":\"2\",\"name\":\"Bob\"}\n",
        )
        .expect("write should succeed");

        let collection = Collection::open("users", &dir.0);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.next_id(), 3);
    }
}
