//! Turning a PubMed web URL into a board.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::models::{Board, BoardList};

/// Host every importable URL must point at
pub const PUBMED_HOST: &str = "pubmed.ncbi.nlm.nih.gov";

/// Title used when nothing better can be derived
pub const FALLBACK_TITLE: &str = "Custom Search";

const MAX_TITLE_LEN: usize = 50;

/// What a PubMed URL refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPubMedUrl {
    /// A search results page; holds the `term` parameter
    Query(String),
    /// One or more articles by PMID
    Pmids(Vec<String>),
    /// Not usable; holds the reason
    Invalid(String),
}

/// Errors from [`import_board`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Invalid(String),

    #[error("Only search query URLs are supported at this time")]
    Unsupported,
}

/// A board ready to be added, as suggested from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedBoard {
    pub label: String,
    pub query: String,
    pub icon_id: String,
}

impl ImportedBoard {
    /// Append to `boards` under a fresh custom id
    pub fn add_to(self, boards: &mut BoardList) -> &Board {
        boards.add_custom(self.label, self.query, Some(self.icon_id))
    }
}

/// Classify a PubMed URL
pub fn parse_pubmed_url(input: &str) -> ParsedPubMedUrl {
    if !input.contains(PUBMED_HOST) {
        return ParsedPubMedUrl::Invalid(format!(
            "Invalid URL: Must be a PubMed URL ({})",
            PUBMED_HOST
        ));
    }

    let url = match Url::parse(input.trim()) {
        Ok(url) => url,
        Err(_) => return ParsedPubMedUrl::Invalid("Invalid URL format".to_string()),
    };

    if let Some((_, term)) = url.query_pairs().find(|(key, _)| key == "term") {
        if !term.is_empty() {
            return ParsedPubMedUrl::Query(term.into_owned());
        }
    }

    let last = url.path().trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let is_pmid = |id: &str| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
    if !last.is_empty() && last.split(',').all(is_pmid) {
        return ParsedPubMedUrl::Pmids(last.split(',').map(str::to_string).collect());
    }

    ParsedPubMedUrl::Invalid("Could not extract search query or PMIDs from URL".to_string())
}

fn journal_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)"([^"]+)"\[jo\]"#).ok())
        .as_ref()
}

fn clean_query(query: &str) -> String {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        [
            (r"(?i)\[jo\]", ""),
            (r#"["\[\]()]"#, ""),
            (r"(?i)\s+or\s+", ", "),
            (r"(?i)\s+and\s+", " & "),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    });

    let mut cleaned = query.to_string();
    for (re, replacement) in rules {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }
    cleaned.trim().to_string()
}

/// Human-readable board title for a query
pub fn generate_board_title(query: &str) -> String {
    let first_journal = journal_pattern()
        .and_then(|re| re.captures(query))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    if let Some(journal) = first_journal {
        let lower = query.to_lowercase();
        return if lower.contains("pediatr") || lower.contains("child") {
            "General Pediatrics".to_string()
        } else if lower.contains("vaccine") || lower.contains("immun") {
            "Vaccine Research".to_string()
        } else if lower.contains("infect") {
            "Infectious Disease".to_string()
        } else if lower.contains("travel") {
            "Travel Medicine".to_string()
        } else {
            let word = journal.split(' ').next().unwrap_or_default();
            format!("{} Journals", word)
        };
    }

    let cleaned = clean_query(query);
    if cleaned.chars().count() > MAX_TITLE_LEN {
        let head: String = cleaned.chars().take(MAX_TITLE_LEN - 3).collect();
        format!("{}...", head)
    } else if cleaned.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        cleaned
    }
}

/// Icon matching the board's topic; "general" when nothing matches
pub fn suggest_icon_id(title: &str, query: Option<&str>) -> &'static str {
    let text = format!("{} {}", title, query.unwrap_or_default()).to_lowercase();

    if text.contains("pediatr") || text.contains("child") {
        "pediatric"
    } else if text.contains("vaccine") || text.contains("immun") {
        "vaccine"
    } else if text.contains("travel") {
        "travel"
    } else {
        "general"
    }
}

/// Validate a URL and build the board it describes.
///
/// A blank `custom_title` falls back to the generated title.
pub fn import_board(url: &str, custom_title: Option<&str>) -> Result<ImportedBoard, ImportError> {
    let query = match parse_pubmed_url(url) {
        ParsedPubMedUrl::Query(query) => query,
        ParsedPubMedUrl::Pmids(_) => return Err(ImportError::Unsupported),
        ParsedPubMedUrl::Invalid(reason) => return Err(ImportError::Invalid(reason)),
    };

    let suggested = generate_board_title(&query);
    let icon_id = suggest_icon_id(&suggested, Some(&query)).to_string();
    let label = custom_title
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or(suggested);

    tracing::debug!("Imported board {:?} for query {:?}", label, query);
    Ok(ImportedBoard {
        label,
        query,
        icon_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_url() {
        let parsed = parse_pubmed_url(
            "https://pubmed.ncbi.nlm.nih.gov/?term=%22Vaccine%22%5Bjo%5D+OR+%22NPJ+Vaccines%22%5Bjo%5D&sort=date",
        );
        assert_eq!(
            parsed,
            ParsedPubMedUrl::Query(r#""Vaccine"[jo] OR "NPJ Vaccines"[jo]"#.to_string())
        );
    }

    #[test]
    fn test_parse_pmid_urls() {
        assert_eq!(
            parse_pubmed_url("https://pubmed.ncbi.nlm.nih.gov/38012345/"),
            ParsedPubMedUrl::Pmids(vec!["38012345".to_string()])
        );
        assert_eq!(
            parse_pubmed_url("https://pubmed.ncbi.nlm.nih.gov/1,22,333"),
            ParsedPubMedUrl::Pmids(vec!["1".into(), "22".into(), "333".into()])
        );
    }

    #[test]
    fn test_parse_invalid_urls() {
        assert!(matches!(
            parse_pubmed_url("https://example.org/?term=x"),
            ParsedPubMedUrl::Invalid(reason) if reason.contains("Must be a PubMed URL")
        ));
        assert_eq!(
            parse_pubmed_url("pubmed.ncbi.nlm.nih.gov/?term=x"),
            ParsedPubMedUrl::Invalid("Invalid URL format".to_string())
        );
        assert!(matches!(
            parse_pubmed_url("https://pubmed.ncbi.nlm.nih.gov/advanced/"),
            ParsedPubMedUrl::Invalid(_)
        ));
        assert!(matches!(
            parse_pubmed_url("https://pubmed.ncbi.nlm.nih.gov/12,,3/"),
            ParsedPubMedUrl::Invalid(_)
        ));
    }

    #[test]
    fn test_title_from_journals() {
        assert_eq!(
            generate_board_title(r#""Pediatr Infect Dis J"[jo] OR "Vaccine"[jo]"#),
            "General Pediatrics"
        );
        assert_eq!(generate_board_title(r#""NPJ Vaccines"[JO]"#), "Vaccine Research");
        assert_eq!(generate_board_title(r#""Clin Infect Dis"[jo]"#), "Infectious Disease");
        assert_eq!(generate_board_title(r#""J Travel Med"[jo]"#), "Travel Medicine");
        assert_eq!(
            generate_board_title(r#""Lancet"[jo] OR "BMJ"[jo]"#),
            "Lancet Journals"
        );
    }

    #[test]
    fn test_title_from_plain_query() {
        assert_eq!(
            generate_board_title("(malaria AND artemisinin) or quinine"),
            "malaria & artemisinin, quinine"
        );
        assert_eq!(generate_board_title("  \"\" () "), FALLBACK_TITLE);

        let long = "a".repeat(60);
        let title = generate_board_title(&long);
        assert_eq!(title.len(), 50);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_suggest_icon() {
        assert_eq!(suggest_icon_id("Child Health", None), "pediatric");
        assert_eq!(suggest_icon_id("Custom", Some("immunization")), "vaccine");
        assert_eq!(suggest_icon_id("Travel Medicine", None), "travel");
        assert_eq!(suggest_icon_id("Infectious Disease", None), "general");
        assert_eq!(suggest_icon_id("Cardiology", None), "general");
    }

    #[test]
    fn test_import_board() {
        let imported = import_board(
            "https://pubmed.ncbi.nlm.nih.gov/?term=%22J+Travel+Med%22%5Bjo%5D",
            Some("   "),
        )
        .unwrap();
        assert_eq!(imported.label, "Travel Medicine");
        assert_eq!(imported.icon_id, "travel");

        let titled =
            import_board("https://pubmed.ncbi.nlm.nih.gov/?term=dengue", Some("Dengue")).unwrap();
        assert_eq!(titled.label, "Dengue");
        assert_eq!(titled.query, "dengue");

        assert_eq!(
            import_board("https://pubmed.ncbi.nlm.nih.gov/123/", None),
            Err(ImportError::Unsupported)
        );
        assert!(matches!(
            import_board("not a url", None),
            Err(ImportError::Invalid(_))
        ));

        let mut boards = BoardList::default();
        let board = titled.add_to(&mut boards);
        assert!(board.id.starts_with("custom-"));
        assert_eq!(board.icon(), "general");
    }
}
