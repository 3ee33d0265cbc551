//! Article model representing one PubMed summary record.

use serde::{Deserialize, Serialize};

/// PubMed article page base URL
const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// An author entry as returned by the summary endpoint (name only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A PubMed article summary
///
/// Keyed by its PubMed identifier (`uid`). Optional fields are absent for
/// records the remote service only partially indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// PubMed identifier (PMID)
    pub uid: String,

    /// Article title
    #[serde(default)]
    pub title: String,

    /// Journal abbreviation
    #[serde(default)]
    pub source: String,

    /// Publication date as displayed by PubMed (e.g. "2024 Mar 12")
    #[serde(default)]
    pub pubdate: String,

    /// Ordered author list
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Electronic location id, usually carries the DOI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elocationid: Option<String>,

    /// Full journal name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulljournalname: Option<String>,

    /// Machine-sortable date ("YYYY/MM/DD HH:MM")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortdate: Option<String>,
}

impl Article {
    /// Create a new article with required fields
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            source: String::new(),
            pubdate: String::new(),
            authors: Vec::new(),
            elocationid: None,
            fulljournalname: None,
            sortdate: None,
        }
    }

    /// Link to the article page on pubmed.ncbi.nlm.nih.gov
    pub fn url(&self) -> String {
        format!("{}/{}/", PUBMED_ARTICLE_URL, self.uid)
    }

    /// DOI extracted from `elocationid` ("doi: 10.1000/xyz" -> "10.1000/xyz")
    pub fn doi(&self) -> Option<&str> {
        let eloc = self.elocationid.as_deref()?.trim();
        let rest = match eloc.find("doi:") {
            Some(pos) => eloc[pos + "doi:".len()..].trim_start(),
            None if eloc.starts_with("10.") => eloc,
            None => return None,
        };
        let doi = rest.split_whitespace().next()?;
        Some(doi.trim_end_matches(['.', ';', ',']))
    }

    /// Author names in order
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }

    /// Compact author line: "A, B, C" or "A, B, C, et al." past `max`
    pub fn author_line(&self, max: usize) -> String {
        let names = self.author_names();
        if names.len() <= max {
            return names.join(", ");
        }
        format!("{}, et al.", names[..max].join(", "))
    }

    /// Journal display name, preferring the full name
    pub fn journal(&self) -> &str {
        self.fulljournalname
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.source)
    }
}

/// Builder for constructing Article objects
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            article: Article::new(uid, title),
        }
    }

    /// Set the journal abbreviation
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.article.source = source.into();
        self
    }

    /// Set the publication date
    pub fn pubdate(mut self, pubdate: impl Into<String>) -> Self {
        self.article.pubdate = pubdate.into();
        self
    }

    /// Append an author
    pub fn author(mut self, name: impl Into<String>) -> Self {
        self.article.authors.push(Author::new(name));
        self
    }

    pub fn elocationid(mut self, eloc: impl Into<String>) -> Self {
        self.article.elocationid = Some(eloc.into());
        self
    }

    pub fn fulljournalname(mut self, name: impl Into<String>) -> Self {
        self.article.fulljournalname = Some(name.into());
        self
    }

    pub fn sortdate(mut self, date: impl Into<String>) -> Self {
        self.article.sortdate = Some(date.into());
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}
