//! # Collections
//!
//! A [`Collection`] is a directory of files, one record per file, all in the
//! same [`Format`]. Files are the only source of truth: there is no index, and
//! two collections opened on the same directory stay in agreement only by
//! scanning it.
//!
//! ## Records and paths
//!
//! Records are plain serde types. Serializing a record gives the payload that
//! is written; deserializing a payload read from disk is what validates it.
//! Callers hold records through [`Entry`] handles, and the collection keeps
//! two pieces of private state about them:
//!
//! - a **cache** from path to the last record loaded from or written to it;
//! - an **identity tracker** from record to path, which is how `update`,
//!   `delete` and `refresh` know where a record lives without any id field.
//!
//! The cache is never revalidated against the file's mtime: once a path is
//! loaded, queries return the cached record until it is refreshed or deleted.
//!
//! ## Naming
//!
//! `add` without an explicit path names the file after the record (see
//! [`crate::slug`]) and never overwrites an existing file. Adding the same
//! record again rewrites the file it already lives in.

use crate::config::CollectionConfig;
use crate::error::{Result, ShelfError};
use crate::handlers::{Format, Payload};
use crate::query::Query;
use crate::registry::{self, Inference};
use crate::slug;
use crate::tracker::{Entry, IdentityTracker};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What to delete: a tracked record, or a file by path.
pub enum Target<'a, T> {
    Record(&'a Entry<T>),
    Path(PathBuf),
}

impl<'a, T> From<&'a Entry<T>> for Target<'a, T> {
    fn from(entry: &'a Entry<T>) -> Self {
        Target::Record(entry)
    }
}

impl<T> From<PathBuf> for Target<'_, T> {
    fn from(path: PathBuf) -> Self {
        Target::Path(path)
    }
}

impl<T> From<&Path> for Target<'_, T> {
    fn from(path: &Path) -> Self {
        Target::Path(path.to_path_buf())
    }
}

impl<T> From<&str> for Target<'_, T> {
    fn from(path: &str) -> Self {
        Target::Path(PathBuf::from(path))
    }
}

impl<T> From<String> for Target<'_, T> {
    fn from(path: String) -> Self {
        Target::Path(PathBuf::from(path))
    }
}

pub struct Collection<T> {
    root: PathBuf,
    format: Format,
    body_field: Option<String>,
    recursive: bool,
    cache: RefCell<HashMap<PathBuf, Entry<T>>>,
    tracker: RefCell<IdentityTracker<T>>,
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("root", &self.root)
            .field("format", &self.format)
            .field("body_field", &self.body_field)
            .field("recursive", &self.recursive)
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl<T> Collection<T> {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn body_field(&self) -> Option<&str> {
        self.body_field.as_deref()
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open a collection, creating the directory if needed.
    ///
    /// Without a declared format, the format is inferred from the files
    /// already present: an empty directory is an [`ShelfError::UnknownFormat`]
    /// error, and a mix of formats an [`ShelfError::InconsistentFormat`] error.
    pub fn open(path: impl AsRef<Path>, config: &CollectionConfig) -> Result<Self> {
        Self::open_with(path.as_ref(), config, Inference::Strict)
    }

    /// Like [`Collection::open`], but an empty directory with no declared
    /// format opens as Markdown.
    pub fn open_or_default(path: impl AsRef<Path>, config: &CollectionConfig) -> Result<Self> {
        Self::open_with(path.as_ref(), config, Inference::Default)
    }

    fn open_with(path: &Path, config: &CollectionConfig, mode: Inference) -> Result<Self> {
        let root = if path.is_relative() {
            std::env::current_dir()?.join(path)
        } else {
            path.to_path_buf()
        };
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }

        let format = match config.resolved_format()? {
            Some(format) => format,
            None => registry::infer(&list_files(&root, config.recursive)?, mode)?,
        };
        tracing::debug!(root = %root.display(), format = format.name(), "opened collection");

        Ok(Self {
            root,
            format,
            body_field: config.body_field.clone(),
            recursive: config.recursive,
            cache: RefCell::new(HashMap::new()),
            tracker: RefCell::new(IdentityTracker::new()),
        })
    }

    // --- Queries ---

    /// An empty query over every record.
    pub fn query(&self) -> Query<'_, T> {
        Query::new(self)
    }

    pub fn filter<'c, F>(&'c self, predicate: F) -> Query<'c, T>
    where
        F: Fn(&T) -> bool + 'c,
    {
        self.query().filter(predicate)
    }

    pub fn order_by(&self, field: &str) -> Query<'_, T> {
        self.query().order_by(field)
    }

    pub fn head(&self, n: usize) -> Query<'_, T> {
        self.query().head(n)
    }

    pub fn tail(&self, n: usize) -> Query<'_, T> {
        self.query().tail(n)
    }

    pub fn to_list(&self) -> Result<Vec<Entry<T>>> {
        self.query().to_list()
    }

    pub fn iter(&self) -> Result<std::vec::IntoIter<Entry<T>>> {
        self.query().iter()
    }

    pub fn count(&self) -> Result<usize> {
        self.query().count()
    }

    pub fn first(&self) -> Result<Option<Entry<T>>> {
        self.query().first()
    }

    pub fn last(&self) -> Result<Option<Entry<T>>> {
        self.query().last()
    }

    /// Whether the collection holds at least one record.
    pub fn exists(&self) -> Result<bool> {
        self.query().exists()
    }

    /// Whether at least one record matches `predicate`.
    pub fn exists_where<'c, F>(&'c self, predicate: F) -> Result<bool>
    where
        F: Fn(&T) -> bool + 'c,
    {
        self.filter(predicate).exists()
    }

    // --- Single records ---

    /// Load one file by name (relative to the root) or absolute path.
    ///
    /// Returns `None` if the file does not exist, is not a regular file, or
    /// does not carry an extension of this collection's format.
    pub fn get(&self, name: impl AsRef<Path>) -> Result<Option<Entry<T>>> {
        let path = self.resolve(name.as_ref());
        if !path.is_file() || !self.format.matches_path(&path) {
            return Ok(None);
        }
        self.load(&path, false).map(Some)
    }

    /// Write a record and start tracking it.
    ///
    /// A record that is already tracked is rewritten where it lives. Otherwise
    /// a free file name is derived from the record. Returns the path written.
    pub fn add(&mut self, entry: &Entry<T>) -> Result<PathBuf> {
        let payload = dump(entry)?;
        let path = match self.tracked_path(entry) {
            Some(path) => path,
            None => slug::free_path(
                &self.root,
                &slug::stem_for(&payload),
                self.format.canonical_extension(),
            ),
        };
        self.store(entry, &path, &payload)?;
        Ok(path)
    }

    /// Write a record to an explicit path (relative to the root, or absolute).
    ///
    /// An existing file at that path is overwritten. If the record was tracked
    /// elsewhere, it now lives at `path`; the old file is left in place.
    pub fn add_at(&mut self, entry: &Entry<T>, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.resolve(path.as_ref());
        let payload = dump(entry)?;
        let previous = self.tracked_path(entry);

        self.store(entry, &path, &payload)?;

        if let Some(previous) = previous.filter(|p| *p != path) {
            let cache = self.cache.get_mut();
            if cache.get(&previous).is_some_and(|e| e.same_record(entry)) {
                cache.remove(&previous);
            }
        }
        Ok(path)
    }

    /// Rewrite a tracked record at the path it was loaded from or written to.
    pub fn update(&mut self, entry: &Entry<T>) -> Result<PathBuf> {
        let path = self.tracked_path(entry).ok_or_else(|| {
            ShelfError::MissingPath(
                "cannot update a record that was not loaded from or written to disk; \
                 use add() or upsert()"
                    .into(),
            )
        })?;
        let payload = dump(entry)?;
        self.store(entry, &path, &payload)?;
        Ok(path)
    }

    /// `update` if the record is tracked, `add` otherwise.
    pub fn upsert(&mut self, entry: &Entry<T>) -> Result<PathBuf> {
        if self.tracked_path(entry).is_some() {
            self.update(entry)
        } else {
            self.add(entry)
        }
    }

    /// Delete a tracked record or a file by path.
    ///
    /// The file is removed if it exists; a missing file is not an error. A
    /// record that is not tracked is a [`ShelfError::MissingPath`] error.
    /// Every record tracked at the deleted path stops being tracked.
    pub fn delete<'a>(&mut self, target: impl Into<Target<'a, T>>) -> Result<()>
    where
        T: 'a,
    {
        let path = match target.into() {
            Target::Record(entry) => self.tracked_path(entry).ok_or_else(|| {
                ShelfError::MissingPath("record has no associated path; cannot delete".into())
            })?,
            Target::Path(path) => self.resolve(&path),
        };

        // Handles superseded by refresh or add_at may still point here.
        self.cache.get_mut().remove(&path);
        self.tracker.get_mut().forget_path(&path);

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-read a tracked record from disk, bypassing the cache.
    ///
    /// Returns a new record, which replaces the old one in the cache. The
    /// handle passed in is left untouched and keeps its tracking until it is
    /// dropped.
    pub fn refresh(&mut self, entry: &Entry<T>) -> Result<Entry<T>> {
        let path = self.tracked_path(entry).ok_or_else(|| {
            ShelfError::MissingPath("record has no associated path; cannot refresh".into())
        })?;
        self.load(&path, true)
    }

    /// Path a record was loaded from or last written to.
    pub fn path_for(&self, entry: &Entry<T>) -> Option<PathBuf> {
        self.tracked_path(entry)
    }

    // --- Internals ---

    /// Every file of this collection's format, sorted by path.
    pub(crate) fn paths(&self) -> Result<Vec<PathBuf>> {
        let paths: Vec<PathBuf> = list_files(&self.root, self.recursive)?
            .into_iter()
            .filter(|p| self.format.matches_path(p))
            .collect();
        tracing::trace!(root = %self.root.display(), count = paths.len(), "enumerated files");
        Ok(paths)
    }

    /// Load a path, serving it from the cache unless `force` is set.
    pub(crate) fn load(&self, path: &Path, force: bool) -> Result<Entry<T>> {
        if !force {
            if let Some(entry) = self.cache.borrow().get(path) {
                tracing::trace!(path = %path.display(), "cache hit");
                return Ok(entry.clone());
            }
        }

        let payload = self.format.read(path, self.body_field.as_deref())?;
        let record: T = serde_json::from_value(Value::Object(payload))
            .map_err(|e| ShelfError::Validation(format!("{}: {}", path.display(), e)))?;

        let entry = Entry::new(record);
        self.tracker.borrow_mut().register(&entry, path);
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), entry.clone());
        tracing::debug!(path = %path.display(), forced = force, "loaded record");
        Ok(entry)
    }

    fn store(&mut self, entry: &Entry<T>, path: &Path, payload: &Payload) -> Result<()> {
        self.format
            .write(path, payload, self.body_field.as_deref())?;
        self.tracker.get_mut().register(entry, path);
        self.cache
            .get_mut()
            .insert(path.to_path_buf(), entry.clone());
        Ok(())
    }

    fn tracked_path(&self, entry: &Entry<T>) -> Option<PathBuf> {
        self.tracker.borrow_mut().lookup(entry)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Serialize a record into a payload.
fn dump<T: Serialize>(entry: &Entry<T>) -> Result<Payload> {
    match serde_json::to_value(&*entry.borrow())? {
        Value::Object(map) => Ok(map),
        _ => Err(ShelfError::Validation(
            "record does not serialize to a map of fields".into(),
        )),
    }
}

/// Regular, non-hidden files under `root`, sorted. Hidden directories are not
/// descended into.
fn list_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
