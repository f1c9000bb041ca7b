use super::{CorpusSink, GraphSource, IndexStore};
use crate::{DocId, Document, Link, Posting, Result, SearchError, TermId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocId, Document>,
    urls: HashMap<String, DocId>,
    next_doc_id: DocId,
    links: Vec<Link>,
    dictionary: HashMap<String, TermId>,
    next_term_id: TermId,
    postings: HashMap<TermId, BTreeMap<DocId, u32>>,
}

impl Inner {
    fn allocate_doc(&mut self, url: &str) -> DocId {
        self.next_doc_id += 1;
        let id = self.next_doc_id;
        self.urls.insert(url.to_string(), id);
        id
    }
}

/// In-process store. Document ids start at 1.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding one empty document per id and the given links, for graph-only work.
    pub fn with_graph(nodes: &[DocId], links: &[(DocId, DocId)]) -> Self {
        let store = Self::new();
        for &id in nodes {
            store.insert_document(Document::placeholder(id, format!("doc:{id}")));
        }
        for &(from, to) in links {
            store.insert_link(from, to);
        }
        store
    }

    /// Inserts a record verbatim, keeping its id. Records without a url are not reachable by
    /// url lookups.
    pub fn insert_document(&self, doc: Document) {
        let mut inner = self.inner.write();
        if let Some(url) = &doc.url {
            inner.urls.insert(url.clone(), doc.id);
        }
        inner.next_doc_id = inner.next_doc_id.max(doc.id);
        inner.docs.insert(doc.id, doc);
    }

    pub fn insert_link(&self, from: DocId, to: DocId) {
        self.inner.write().links.push(Link { from, to });
    }

    /// While offline every trait call fails with `StorageUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SearchError::storage("memory store is offline"));
        }
        Ok(())
    }
}

impl GraphSource for MemoryStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        self.check()?;
        Ok(self.inner.read().docs.values().cloned().collect())
    }

    fn list_links(&self) -> Result<Vec<Link>> {
        self.check()?;
        Ok(self.inner.read().links.clone())
    }

    fn fetch_document(&self, id: DocId) -> Result<Option<Document>> {
        self.check()?;
        Ok(self.inner.read().docs.get(&id).cloned())
    }
}

impl IndexStore for MemoryStore {
    fn clear_postings_and_terms(&self) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.write();
        inner.postings.clear();
        inner.dictionary.clear();
        Ok(())
    }

    fn upsert_posting(&self, term: &str, doc_id: DocId, tf: u32) -> Result<()> {
        self.check()?;
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let tid = match inner.dictionary.get(term) {
            Some(&tid) => tid,
            None => {
                let tid = inner.next_term_id;
                inner.next_term_id += 1;
                inner.dictionary.insert(term.to_string(), tid);
                tid
            }
        };
        inner.postings.entry(tid).or_default().insert(doc_id, tf);
        Ok(())
    }

    fn fetch_postings(&self, term: &str) -> Result<Vec<Posting>> {
        self.check()?;
        let inner = self.inner.read();
        let plist = inner
            .dictionary
            .get(term)
            .and_then(|tid| inner.postings.get(tid))
            .map(|docs| docs.iter().map(|(&doc_id, &tf)| Posting { doc_id, tf }).collect())
            .unwrap_or_default();
        Ok(plist)
    }

    fn term_count(&self) -> Result<usize> {
        self.check()?;
        Ok(self.inner.read().dictionary.len())
    }

    fn posting_count(&self) -> Result<usize> {
        self.check()?;
        Ok(self.inner.read().postings.values().map(BTreeMap::len).sum())
    }
}

impl CorpusSink for MemoryStore {
    fn upsert_document(&self, url: &str, title: &str, content: &str) -> Result<DocId> {
        self.check()?;
        let mut inner = self.inner.write();
        let id = match inner.urls.get(url) {
            Some(&id) => id,
            None => inner.allocate_doc(url),
        };
        inner.docs.insert(id, Document::new(id, url, title, content));
        Ok(id)
    }

    fn insert_links(&self, from: DocId, to_urls: &[String]) -> Result<usize> {
        self.check()?;
        let mut inner = self.inner.write();
        let mut written = 0;
        for url in to_urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            let to = match inner.urls.get(url) {
                Some(&id) => id,
                None => {
                    let id = inner.allocate_doc(url);
                    inner.docs.insert(id, Document::placeholder(id, url));
                    id
                }
            };
            inner.links.push(Link { from, to });
            written += 1;
        }
        Ok(written)
    }

    fn clear_corpus(&self) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.write();
        inner.docs.clear();
        inner.urls.clear();
        inner.links.clear();
        inner.postings.clear();
        inner.dictionary.clear();
        Ok(())
    }
}
