use crate::rank::{RankParams, RankVector, Strategy};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    pub strategy: Strategy,
    pub params: RankParams,
}

impl MetaFile {
    pub fn new(num_docs: u32, strategy: Strategy, params: RankParams) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { num_docs, created_at, version: META_VERSION, strategy, params }
    }
}

/// Layout of a data directory: the sled database plus the last computed rank vector.
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn db(&self) -> PathBuf { self.root.join("db") }
    fn ranks(&self) -> PathBuf { self.root.join("ranks.json") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_ranks(paths: &DataPaths, ranks: &RankVector, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.ranks())?);
    serde_json::to_writer(&mut f, ranks)?;
    f.flush()?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_ranks(paths: &DataPaths) -> Result<RankVector> {
    let f = File::open(paths.ranks())?;
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

pub fn load_meta(paths: &DataPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

/// The stored rank vector, or `None` when none has been written yet.
pub fn try_load_ranks(paths: &DataPaths) -> Result<Option<RankVector>> {
    if !paths.ranks().exists() {
        return Ok(None);
    }
    load_ranks(paths).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        assert!(try_load_ranks(&paths).unwrap().is_none());

        let mut ranks = RankVector::new();
        ranks.insert(1, 0.75);
        ranks.insert(2, 0.25);
        let meta = MetaFile::new(2, Strategy::Step, RankParams::default());
        save_ranks(&paths, &ranks, &meta).unwrap();

        assert_eq!(try_load_ranks(&paths).unwrap(), Some(ranks));
        let loaded = load_meta(&paths).unwrap();
        assert_eq!(loaded.strategy, Strategy::Step);
        assert_eq!(loaded.version, META_VERSION);
    }
}
