//! Named string lists with flat-file persistence.
//!
//! Moderation and bot features keep simple collections (user lists, command
//! decks) as comma/whitespace-separated files under a data directory. A
//! collection opens lists by lowercase name, creating them on first access,
//! and writes changes through to disk.

use crate::error::Result;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// An ordered list of lowercase strings backed by one flat file.
#[derive(Debug, Default, Clone)]
pub struct StringList {
    entries: Vec<String>,
}

impl StringList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read entries from `path`, splitting on commas and whitespace.
    /// Returns false (leaving the list unchanged) if the file is unreadable.
    pub fn read_file(&mut self, path: &Path) -> bool {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                self.entries = contents
                    .split([',', ' ', '\t', '\r', '\n'])
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_lowercase())
                    .collect();
                true
            }
            Err(_) => false,
        }
    }

    /// Write entries to `path`, comma-separated.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.entries.join(","))?;
        Ok(())
    }

    /// Add an entry unless it is already present.
    pub fn add(&mut self, entry: &str) -> bool {
        let entry = entry.to_lowercase();
        if self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, entry: &str) -> bool {
        let entry = entry.to_lowercase();
        match self.entries.iter().position(|e| *e == entry) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(&entry.to_lowercase())
    }

    /// Pick a random entry without removing it.
    pub fn random_entry(&self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.entries.len());
        Some(&self.entries[idx])
    }

    /// Remove and return a random entry, as from a deck of cards.
    pub fn draw_entry(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.entries.len());
        Some(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// A dictionary of named persistent lists. Accessing a list by name loads it
/// from disk or creates it.
#[derive(Debug)]
pub struct ListCollection {
    base_dir: PathBuf,
    lists: HashMap<String, StringList>,
}

impl ListCollection {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            lists: HashMap::new(),
        }
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Open a list, reading its file on first access. Missing files yield an
    /// empty list.
    pub fn open(&mut self, name: &str) -> &mut StringList {
        let key = name.to_lowercase();
        let path = self.file_path(&key);
        self.lists.entry(key).or_insert_with(|| {
            let mut list = StringList::new();
            list.read_file(&path);
            list
        })
    }

    /// Add an entry and write the list through to disk.
    pub fn add(&mut self, name: &str, entry: &str) -> Result<bool> {
        let path = self.file_path(&name.to_lowercase());
        let list = self.open(name);
        let added = list.add(entry);
        if added {
            list.write_file(&path)?;
        }
        Ok(added)
    }

    /// Remove an entry and write the list through to disk.
    pub fn remove(&mut self, name: &str, entry: &str) -> Result<bool> {
        let path = self.file_path(&name.to_lowercase());
        let list = self.open(name);
        let removed = list.remove(entry);
        if removed {
            list.write_file(&path)?;
        }
        Ok(removed)
    }

    pub fn contains(&mut self, name: &str, entry: &str) -> bool {
        self.open(name).contains(entry)
    }

    /// Draw a random entry from a list and write the removal through to disk.
    pub fn draw(&mut self, name: &str) -> Result<Option<String>> {
        let path = self.file_path(&name.to_lowercase());
        let list = self.open(name);
        let drawn = list.draw_entry();
        if drawn.is_some() {
            list.write_file(&path)?;
        }
        Ok(drawn)
    }

    /// Drop a list from memory without touching its file.
    pub fn unload(&mut self, name: &str) -> bool {
        self.lists.remove(&name.to_lowercase()).is_some()
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.lists.keys().map(|k| k.as_str()).collect()
    }
}
