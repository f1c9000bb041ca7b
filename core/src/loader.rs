use crate::store::{CorpusSink, GraphSource};
use crate::{DocId, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One article of a dataset file. `links` name other articles by their key.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// Dataset file: a JSON object from article key to [`Article`].
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub articles: BTreeMap<String, Article>,
    /// Entries that were not article objects.
    pub rejected: Vec<String>,
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_reader(reader)?;
        let mut dataset = Dataset::default();
        for (key, value) in raw {
            match serde_json::from_value::<Article>(value) {
                Ok(article) => {
                    dataset.articles.insert(key, article);
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "rejecting dataset entry");
                    dataset.rejected.push(key);
                }
            }
        }
        Ok(dataset)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub documents: usize,
    pub skipped: usize,
    pub links: usize,
}

/// Writes every article as a document, then resolves article links into url links.
///
/// Links naming an unknown article are ignored. Articles without a url are skipped.
pub fn load_dataset<S: CorpusSink + ?Sized>(sink: &S, dataset: &Dataset) -> Result<LoadReport> {
    let mut report = LoadReport { skipped: dataset.rejected.len(), ..LoadReport::default() };
    let mut ids: HashMap<&str, DocId> = HashMap::with_capacity(dataset.articles.len());

    for (key, article) in &dataset.articles {
        let Some(url) = article.url.as_deref() else {
            tracing::warn!(%key, "article has no url, skipping");
            report.skipped += 1;
            continue;
        };
        let id = sink.upsert_document(url, &article.title, &article.content)?;
        ids.insert(key.as_str(), id);
        report.documents += 1;
    }

    for (key, article) in &dataset.articles {
        let Some(&from) = ids.get(key.as_str()) else { continue };
        let urls: Vec<String> = article
            .links
            .iter()
            .filter(|target| ids.contains_key(target.as_str()))
            .filter_map(|target| dataset.articles.get(target)?.url.clone())
            .collect();
        if !urls.is_empty() {
            report.links += sink.insert_links(from, &urls)?;
        }
    }

    tracing::info!(documents = report.documents, skipped = report.skipped, links = report.links, "dataset loaded");
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct DegreeEntry {
    pub doc_id: DocId,
    pub title: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub links: usize,
    pub top_outgoing: Vec<DegreeEntry>,
    pub top_incoming: Vec<DegreeEntry>,
}

pub fn corpus_stats<G: GraphSource + ?Sized>(source: &G, top_n: usize) -> Result<CorpusStats> {
    let docs = source.list_documents()?;
    let links = source.list_links()?;
    let titles: HashMap<DocId, &str> = docs.iter().map(|d| (d.id, d.title.as_str())).collect();

    let mut outgoing: HashMap<DocId, usize> = HashMap::new();
    let mut incoming: HashMap<DocId, usize> = HashMap::new();
    for link in &links {
        *outgoing.entry(link.from).or_insert(0) += 1;
        *incoming.entry(link.to).or_insert(0) += 1;
    }

    let top = |counts: HashMap<DocId, usize>| -> Vec<DegreeEntry> {
        let mut ranked: Vec<(DocId, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .filter_map(|(doc_id, count)| {
                let title = titles.get(&doc_id)?;
                Some(DegreeEntry { doc_id, title: title.to_string(), count })
            })
            .take(top_n)
            .collect()
    };

    Ok(CorpusStats {
        documents: docs.len(),
        links: links.len(),
        top_outgoing: top(outgoing),
        top_incoming: top(incoming),
    })
}
