use crate::granule::matches_request;
use crate::request::GranuleRequest;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Granules already in the output directory, by filename, with their byte size.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalState {
    files: HashMap<String, u64>,
}

impl LocalState {
    pub fn scan(dir: &Path, request: &GranuleRequest) -> io::Result<Self> {
        if !dir.exists() {
            return Ok(Self::default());
        }

        let mut files = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if matches_request(&name, request) {
                files.insert(name, metadata.len());
            }
        }

        debug!("Found {} matching local files in {:?}", files.len(), dir);
        Ok(Self { files })
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    pub fn size_of(&self, filename: &str) -> Option<u64> {
        self.files.get(filename).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, u64)> for LocalState {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
