//! Flat namespace store.
//!
//! Directories and files live in two independent, insertion-ordered lists
//! one level below the implicit root. An entry's identity is its name; every
//! lookup is an exact match against the single component of a `/name` path.
//! Removal compacts the list so positions stay dense.

use std::time::SystemTime;

use super::error::{VfsError, VfsResult};
use super::types::Timestamps;
use crate::config::FsConfig;

/// A directory directly below root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub times: Timestamps,
}

/// A file directly below root. Content travels with the entry, so
/// compaction can never misalign a name and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub content: Vec<u8>,
    pub times: Timestamps,
}

/// Strip the leading `/` and return the single path component.
///
/// Returns `None` for root and for multi-component paths, neither of which
/// can name a stored entry.
pub fn component(path: &str) -> Option<&str> {
    let name = path.strip_prefix('/').unwrap_or(path);
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some(name)
    }
}

/// Returns true for `/` (and the empty path).
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// Owner of every entry in one mounted namespace.
#[derive(Debug, Clone)]
pub struct NamespaceStore {
    directories: Vec<DirectoryEntry>,
    files: Vec<FileEntry>,
    root_times: Timestamps,
    config: FsConfig,
}

impl Default for NamespaceStore {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl NamespaceStore {
    /// Create an empty namespace.
    pub fn new(config: FsConfig) -> Self {
        Self {
            directories: Vec::new(),
            files: Vec::new(),
            root_times: Timestamps::now(),
            config,
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Timestamps reported for `/`.
    pub fn root_times(&self) -> Timestamps {
        self.root_times
    }

    fn validate_name(&self, name: &str) -> VfsResult<()> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(VfsError::invalid_path(name));
        }
        if name.contains('/') || name.contains('\0') {
            return Err(VfsError::invalid_path(name));
        }
        if name.len() > self.config.max_name_len {
            return Err(VfsError::NameTooLong(name.to_string()));
        }
        if self.config.strict_names
            && (self.position_of_directory(name).is_some() || self.position_of_file(name).is_some())
        {
            return Err(VfsError::already_exists(format!("/{name}")));
        }
        Ok(())
    }

    fn position_of_directory(&self, name: &str) -> Option<usize> {
        self.directories.iter().position(|d| d.name == name)
    }

    fn position_of_file(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Append a directory with all timestamps set to now.
    ///
    /// Returns the new entry's position.
    pub fn add_directory(&mut self, name: &str) -> VfsResult<usize> {
        self.validate_name(name)?;
        if let Some(max) = self.config.max_directories {
            if self.directories.len() >= max {
                return Err(VfsError::quota_exceeded(format!("{max} directories")));
            }
        }
        self.directories.push(DirectoryEntry {
            name: name.to_string(),
            times: Timestamps::now(),
        });
        self.root_times.changed();
        Ok(self.directories.len() - 1)
    }

    /// Append an empty file with all timestamps set to now.
    ///
    /// Returns the new entry's position.
    pub fn add_file(&mut self, name: &str) -> VfsResult<usize> {
        self.validate_name(name)?;
        if let Some(max) = self.config.max_files {
            if self.files.len() >= max {
                return Err(VfsError::quota_exceeded(format!("{max} files")));
            }
        }
        self.files.push(FileEntry {
            name: name.to_string(),
            content: Vec::new(),
            times: Timestamps::now(),
        });
        self.root_times.changed();
        Ok(self.files.len() - 1)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn is_directory(&self, path: &str) -> bool {
        self.find_directory_index(path).is_some()
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.find_file_index(path).is_some()
    }

    pub fn find_directory_index(&self, path: &str) -> Option<usize> {
        component(path).and_then(|name| self.position_of_directory(name))
    }

    pub fn find_file_index(&self, path: &str) -> Option<usize> {
        component(path).and_then(|name| self.position_of_file(name))
    }

    pub fn directory(&self, index: usize) -> Option<&DirectoryEntry> {
        self.directories.get(index)
    }

    pub fn file(&self, index: usize) -> Option<&FileEntry> {
        self.files.get(index)
    }

    /// Directories in creation order.
    pub fn directories(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directories.iter()
    }

    /// Files in creation order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    fn check_size(&self, path: &str, size: u64) -> VfsResult<()> {
        let max = self.config.max_file_size;
        if size > max {
            return Err(VfsError::FileTooLarge {
                path: path.to_string(),
                size,
                max,
            });
        }
        Ok(())
    }

    /// Replace a file's entire content and refresh atime+mtime.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> VfsResult<()> {
        let index = self
            .find_file_index(path)
            .ok_or_else(|| VfsError::not_found(path))?;
        self.check_size(path, content.len() as u64)?;

        let file = &mut self.files[index];
        file.content.clear();
        file.content.extend_from_slice(content);
        file.times.written();
        Ok(())
    }

    /// Resize a file's content, zero-filling any growth.
    pub fn truncate_file(&mut self, path: &str, size: u64) -> VfsResult<()> {
        let index = self
            .find_file_index(path)
            .ok_or_else(|| VfsError::not_found(path))?;
        self.check_size(path, size)?;

        let file = &mut self.files[index];
        file.content.resize(size as usize, 0);
        file.times.changed();
        Ok(())
    }

    /// Copy up to `size` bytes starting at `offset`, refreshing atime.
    ///
    /// Reads past the end return an empty buffer.
    pub fn read_file(&mut self, index: usize, offset: u64, size: u32) -> Option<Vec<u8>> {
        let file = self.files.get_mut(index)?;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(file.content.len());
        let end = start.saturating_add(size as usize).min(file.content.len());
        file.times.accessed();
        Some(file.content[start..end].to_vec())
    }

    /// Remove a directory, compacting the list.
    pub fn remove_directory(&mut self, path: &str) -> VfsResult<()> {
        let index = self
            .find_directory_index(path)
            .ok_or_else(|| VfsError::operation_failed(path))?;
        self.directories.remove(index);
        self.root_times.changed();
        Ok(())
    }

    /// Remove the file at `index`, compacting the list.
    pub fn remove_file(&mut self, index: usize) -> Option<FileEntry> {
        if index >= self.files.len() {
            return None;
        }
        let removed = self.files.remove(index);
        self.root_times.changed();
        Some(removed)
    }

    /// Timestamps of whichever entry `path` names, directory first.
    pub fn times_mut(&mut self, path: &str) -> Option<&mut Timestamps> {
        if is_root(path) {
            return Some(&mut self.root_times);
        }
        if let Some(index) = self.find_directory_index(path) {
            return Some(&mut self.directories[index].times);
        }
        let index = self.find_file_index(path)?;
        Some(&mut self.files[index].times)
    }

    /// Refresh every timestamp of the entry `path` names.
    pub fn touch(&mut self, path: &str) -> bool {
        match self.times_mut(path) {
            Some(times) => {
                let now = SystemTime::now();
                *times = Timestamps {
                    atime: now,
                    ctime: now,
                    mtime: now,
                };
                true
            }
            None => false,
        }
    }
}
