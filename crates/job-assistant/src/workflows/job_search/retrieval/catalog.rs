use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{CandidatePosting, RetrieverError, SemanticRetriever};

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "failed to read posting catalogue: {}", err),
            CatalogError::Csv(err) => write!(f, "invalid posting catalogue data: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// In-memory posting index ranked by lexical overlap with the query.
///
/// Stands in for a vector index: ranking is deterministic and ties keep catalogue order.
#[derive(Debug, Clone, Default)]
pub struct PostingCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    posting: CandidatePosting,
    terms: HashSet<String>,
}

impl PostingCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut postings = Vec::new();

        for (index, record) in csv_reader.deserialize::<PostingRow>().enumerate() {
            let row = record?;
            postings.push(row.into_posting(index));
        }

        debug!(postings = postings.len(), "posting catalogue loaded");
        Ok(Self::from_postings(postings))
    }

    pub fn from_postings(postings: Vec<CandidatePosting>) -> Self {
        let entries = postings
            .into_iter()
            .map(|posting| {
                let searchable = ["job_title", "company_name", "location", "description"]
                    .iter()
                    .map(|key| posting.metadata_value(key))
                    .collect::<Vec<_>>()
                    .join(" ");
                CatalogEntry {
                    terms: terms(&searchable),
                    posting,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn postings(&self) -> impl Iterator<Item = &CandidatePosting> {
        self.entries.iter().map(|entry| &entry.posting)
    }

    /// Postings sharing at least one term with `query`, most overlapping first.
    pub fn rank(&self, query: &str, limit: usize) -> Vec<CandidatePosting> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &CandidatePosting)> = self
            .entries
            .iter()
            .map(|entry| {
                let overlap = query_terms
                    .iter()
                    .filter(|term| entry.terms.contains(*term))
                    .count();
                (overlap, &entry.posting)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, posting)| posting.clone())
            .collect()
    }
}

#[async_trait]
impl SemanticRetriever for PostingCatalog {
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidatePosting>, RetrieverError> {
        Ok(self.rank(query, limit))
    }
}

#[derive(Debug, Deserialize)]
struct PostingRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    job_title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    company_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    salary: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    education: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    experience: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
}

impl PostingRow {
    fn into_posting(self, index: usize) -> CandidatePosting {
        let mut metadata = BTreeMap::new();
        metadata.insert("job_title".to_string(), self.job_title);
        for (key, value) in [
            ("company_name", self.company_name),
            ("location", self.location),
            ("education", self.education),
            ("experience", self.experience),
            ("description", self.description),
        ] {
            if let Some(value) = value {
                metadata.insert(key.to_string(), value);
            }
        }

        CandidatePosting {
            id: self
                .id
                .unwrap_or_else(|| format!("posting-{:04}", index + 1)),
            raw_salary_text: self.salary.unwrap_or_default(),
            metadata,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Lowercased ASCII words plus CJK character bigrams (single characters for one-char runs).
fn terms(text: &str) -> HashSet<String> {
    let mut terms = HashSet::new();
    let mut word = String::new();
    let mut run: Vec<char> = Vec::new();

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            flush_run(&mut run, &mut terms);
            word.push(c);
        } else if is_cjk(c) {
            flush_word(&mut word, &mut terms);
            run.push(c);
        } else {
            flush_word(&mut word, &mut terms);
            flush_run(&mut run, &mut terms);
        }
    }
    flush_word(&mut word, &mut terms);
    flush_run(&mut run, &mut terms);
    terms
}

fn flush_word(word: &mut String, terms: &mut HashSet<String>) {
    if !word.is_empty() {
        terms.insert(std::mem::take(word));
    }
}

fn flush_run(run: &mut Vec<char>, terms: &mut HashSet<String>) {
    match run.len() {
        0 => {}
        1 => {
            terms.insert(run[0].to_string());
        }
        _ => {
            for pair in run.windows(2) {
                terms.insert(pair.iter().collect());
            }
        }
    }
    run.clear();
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
id,job_title,company_name,location,salary,education,experience,description
job-1,Python开发工程师,星云科技,深圳,15-25K,本科,3-5年,负责后端服务开发
job-2,前端开发工程师,蓝鲸互联,北京,12-18K,本科,1-3年,React 与 Vue 项目
,数据分析师,,深圳,面议,,,
";

    fn catalog() -> PostingCatalog {
        PostingCatalog::from_reader(CSV.as_bytes()).expect("catalogue parses")
    }

    #[test]
    fn rows_become_postings() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);

        let postings: Vec<_> = catalog.postings().collect();
        assert_eq!(postings[0].id, "job-1");
        assert_eq!(postings[0].raw_salary_text, "15-25K");
        assert_eq!(postings[0].company(), "星云科技");

        assert_eq!(postings[2].id, "posting-0003");
        assert_eq!(postings[2].company(), "");
        assert!(!postings[2].metadata.contains_key("company_name"));
    }

    #[test]
    fn ranking_prefers_overlap_and_keeps_ties_in_order() {
        let catalog = catalog();

        let ranked = catalog.rank("Python开发 深圳", 10);
        let ids: Vec<_> = ranked.iter().map(|posting| posting.id.as_str()).collect();
        assert_eq!(ids, vec!["job-1", "job-2", "posting-0003"]);

        let shenzhen = catalog.rank("深圳", 10);
        let ids: Vec<_> = shenzhen.iter().map(|posting| posting.id.as_str()).collect();
        assert_eq!(ids, vec!["job-1", "posting-0003"]);
    }

    #[test]
    fn ranking_respects_limit_and_ignores_unrelated_queries() {
        let catalog = catalog();
        assert_eq!(catalog.rank("开发", 1).len(), 1);
        assert!(catalog.rank("厨师 拉萨", 10).is_empty());
    }

    #[test]
    fn tokens_split_scripts() {
        let terms = terms("React前端开发, 深圳");
        for expected in ["react", "前端", "端开", "开发", "深圳"] {
            assert!(terms.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn malformed_csv_is_reported() {
        let err = PostingCatalog::from_reader("id,job_title\n\"unterminated".as_bytes())
            .err()
            .expect("malformed data fails");
        assert!(matches!(err, CatalogError::Csv(_)));
    }
}
