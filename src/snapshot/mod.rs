//! Snapshot persistence for aerodoc
//!
//! A snapshot is a single checksummed file holding every collection, its
//! index definitions and its documents in insertion order. Index entries
//! are not stored; every index is rebuilt from its definition on load.
//!
//! # Guarantees
//!
//! - Save writes a temporary file, syncs it, then renames it over the target
//! - Load reads and verifies the entire file before touching the database
//! - Any checksum or framing error rejects the whole file
//!
//! Each collection is exported under its own read lock, so a save running
//! alongside writes captures every collection at a slightly different point.

mod checksum;
mod errors;
mod format;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub use errors::{SnapshotError, SnapshotResult};
pub use format::SnapshotRecord;

use crate::index::IndexDefinition;
use crate::observability::{log_event_with_fields, Event};
use crate::store::Database;
use crate::value::Document;
use format::{decode_records, encode_record, MAGIC};

/// What a verified snapshot file contains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub collections: usize,
    pub indexes: usize,
    pub documents: usize,
}

struct CollectionImage {
    name: String,
    indexes: Vec<IndexDefinition>,
    documents: Vec<Document>,
}

/// Writes every collection of `db` to `path`
pub fn save(db: &Database, path: &Path) -> SnapshotResult<()> {
    let mut image = MAGIC.to_vec();
    let mut count: u64 = 0;
    let mut summary = SnapshotSummary::default();

    for collection in db.all_collections() {
        let name = collection.name().to_string();
        let (indexes, documents) = collection.export();
        summary.collections += 1;
        summary.indexes += indexes.len();
        summary.documents += documents.len();

        encode_record(&SnapshotRecord::Collection { name: name.clone() }, &mut image)?;
        count += 1;
        for definition in indexes {
            encode_record(
                &SnapshotRecord::Index {
                    collection: name.clone(),
                    definition,
                },
                &mut image,
            )?;
            count += 1;
        }
        for document in documents {
            encode_record(
                &SnapshotRecord::Document {
                    collection: name.clone(),
                    document,
                },
                &mut image,
            )?;
            count += 1;
        }
    }
    encode_record(&SnapshotRecord::End { records: count }, &mut image)?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&image)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    db.metrics().increment_snapshots();
    log_event_with_fields(
        Event::SnapshotSaved,
        &[
            ("path", &path.display().to_string()),
            ("collections", &summary.collections.to_string()),
            ("documents", &summary.documents.to_string()),
            ("bytes", &image.len().to_string()),
        ],
    );
    Ok(())
}

fn read_images(path: &Path) -> SnapshotResult<Vec<CollectionImage>> {
    let data = fs::read(path)?;
    let records = match decode_records(&data) {
        Ok(records) => records,
        Err(err) => {
            log_event_with_fields(
                Event::SnapshotCorruption,
                &[("path", &path.display().to_string()), ("reason", &err.to_string())],
            );
            return Err(err);
        }
    };

    let mut images: Vec<CollectionImage> = Vec::new();
    for (position, record) in records.into_iter().enumerate() {
        match record {
            SnapshotRecord::Collection { name } => {
                if images.iter().any(|c| c.name == name) {
                    return Err(SnapshotError::Inconsistent(format!(
                        "collection '{}' appears twice",
                        name
                    )));
                }
                images.push(CollectionImage {
                    name,
                    indexes: Vec::new(),
                    documents: Vec::new(),
                });
            }
            SnapshotRecord::Index {
                collection,
                definition,
            } => image_for(&mut images, &collection, position)?
                .indexes
                .push(definition),
            SnapshotRecord::Document {
                collection,
                document,
            } => image_for(&mut images, &collection, position)?
                .documents
                .push(document),
            SnapshotRecord::End { .. } => {}
        }
    }
    Ok(images)
}

fn image_for<'a>(
    images: &'a mut [CollectionImage],
    name: &str,
    position: usize,
) -> SnapshotResult<&'a mut CollectionImage> {
    images
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            SnapshotError::Inconsistent(format!(
                "record {} belongs to undeclared collection '{}'",
                position, name
            ))
        })
}

/// Replaces the contents of `db` with the snapshot at `path`
pub fn load(db: &Database, path: &Path) -> SnapshotResult<()> {
    let images = read_images(path)?;

    let mut collections = Vec::with_capacity(images.len());
    let mut documents = 0;
    for image in images {
        let collection = db.empty_collection(&image.name);
        documents += image.documents.len();
        collection.restore(image.indexes, image.documents)?;
        collections.push(Arc::new(collection));
    }
    let count = collections.len();
    db.replace_collections(collections);

    log_event_with_fields(
        Event::SnapshotLoaded,
        &[
            ("path", &path.display().to_string()),
            ("collections", &count.to_string()),
            ("documents", &documents.to_string()),
        ],
    );
    Ok(())
}

/// Reads and verifies a snapshot without loading it
pub fn inspect(path: &Path) -> SnapshotResult<SnapshotSummary> {
    let images = read_images(path)?;
    Ok(SnapshotSummary {
        collections: images.len(),
        indexes: images.iter().map(|c| c.indexes.len()).sum(),
        documents: images.iter().map(|c| c.documents.len()).sum(),
    })
}
