use super::{CorpusSink, GraphSource, IndexStore};
use crate::{DocId, Document, Link, Posting, Result, SearchError, TermId};
use std::path::Path;

/// Persistent store on sled. Values are bincode-encoded.
///
/// Postings are keyed `term_id ‖ doc_id` in big-endian so a prefix scan over a term id walks
/// its documents in ascending order.
pub struct SledStore {
    db: sled::Db,
    documents: sled::Tree,
    urls: sled::Tree,
    links: sled::Tree,
    terms: sled::Tree,
    postings: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Throwaway store that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            documents: db.open_tree("documents")?,
            urls: db.open_tree("urls")?,
            links: db.open_tree("links")?,
            terms: db.open_tree("terms")?,
            postings: db.open_tree("postings")?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u32> {
        // sled ids start at 0; keep 0 free so ids look like the usual autoincrement.
        let raw = self.db.generate_id()? + 1;
        u32::try_from(raw).map_err(|_| SearchError::storage(format!("id space exhausted at {raw}")))
    }

    fn put_document(&self, doc: &Document) -> Result<()> {
        self.documents.insert(doc.id.to_be_bytes(), bincode::serialize(doc)?)?;
        Ok(())
    }

    fn url_id(&self, url: &str) -> Result<Option<DocId>> {
        Ok(self.urls.get(url.as_bytes())?.map(|v| decode_u32(&v)).transpose()?)
    }

    fn term_id(&self, term: &str) -> Result<Option<TermId>> {
        Ok(self.terms.get(term.as_bytes())?.map(|v| decode_u32(&v)).transpose()?)
    }
}

fn decode_u32(bytes: &[u8]) -> Result<u32> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| SearchError::Serialization(format!("expected 4 bytes, found {}", bytes.len())))?;
    Ok(u32::from_be_bytes(arr))
}

fn posting_key(term_id: TermId, doc_id: DocId) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&term_id.to_be_bytes());
    key[4..].copy_from_slice(&doc_id.to_be_bytes());
    key
}

impl GraphSource for SledStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.documents.len());
        for entry in self.documents.iter() {
            let (key, value) = entry?;
            match bincode::deserialize::<Document>(&value) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(key = ?&key[..], error = %e, "skipping undecodable document row"),
            }
        }
        Ok(docs)
    }

    fn list_links(&self) -> Result<Vec<Link>> {
        let mut links = Vec::with_capacity(self.links.len());
        for entry in self.links.iter() {
            let (_, value) = entry?;
            match bincode::deserialize::<Link>(&value) {
                Ok(link) => links.push(link),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable link row"),
            }
        }
        Ok(links)
    }

    fn fetch_document(&self, id: DocId) -> Result<Option<Document>> {
        match self.documents.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }
}

impl IndexStore for SledStore {
    fn clear_postings_and_terms(&self) -> Result<()> {
        self.postings.clear()?;
        self.terms.clear()?;
        Ok(())
    }

    fn upsert_posting(&self, term: &str, doc_id: DocId, tf: u32) -> Result<()> {
        let tid = match self.term_id(term)? {
            Some(tid) => tid,
            None => {
                let tid = self.next_id()?;
                self.terms.insert(term.as_bytes(), tid.to_be_bytes().to_vec())?;
                tid
            }
        };
        self.postings.insert(posting_key(tid, doc_id), tf.to_be_bytes().to_vec())?;
        Ok(())
    }

    fn fetch_postings(&self, term: &str) -> Result<Vec<Posting>> {
        let Some(tid) = self.term_id(term)? else {
            return Ok(Vec::new());
        };
        let mut plist = Vec::new();
        for entry in self.postings.scan_prefix(tid.to_be_bytes()) {
            let (key, value) = entry?;
            plist.push(Posting { doc_id: decode_u32(&key[4..])?, tf: decode_u32(&value)? });
        }
        Ok(plist)
    }

    fn term_count(&self) -> Result<usize> {
        Ok(self.terms.len())
    }

    fn posting_count(&self) -> Result<usize> {
        Ok(self.postings.len())
    }
}

impl CorpusSink for SledStore {
    fn upsert_document(&self, url: &str, title: &str, content: &str) -> Result<DocId> {
        let id = match self.url_id(url)? {
            Some(id) => id,
            None => {
                let id = self.next_id()?;
                self.urls.insert(url.as_bytes(), id.to_be_bytes().to_vec())?;
                id
            }
        };
        self.put_document(&Document::new(id, url, title, content))?;
        Ok(id)
    }

    fn insert_links(&self, from: DocId, to_urls: &[String]) -> Result<usize> {
        let mut written = 0;
        for url in to_urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            let to = match self.url_id(url)? {
                Some(id) => id,
                None => {
                    let id = self.next_id()?;
                    self.urls.insert(url.as_bytes(), id.to_be_bytes().to_vec())?;
                    self.put_document(&Document::placeholder(id, url))?;
                    id
                }
            };
            let seq = self.db.generate_id()?;
            self.links.insert(seq.to_be_bytes(), bincode::serialize(&Link { from, to })?)?;
            written += 1;
        }
        Ok(written)
    }

    fn clear_corpus(&self) -> Result<()> {
        for tree in [&self.documents, &self.urls, &self.links, &self.terms, &self.postings] {
            tree.clear()?;
        }
        Ok(())
    }
}
