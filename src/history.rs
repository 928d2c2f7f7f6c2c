//! Historical changelog discovery and the wording-reuse ledger.
//!
//! Prior release documents are parsed into a ledger mapping pull request
//! numbers to the category and description they were published with, so
//! that recurring changes (backported fixes in particular) keep their
//! wording across releases. The raw text of the most recent documents is
//! retained separately as a style reference for the classification model.
use std::collections::HashMap;

use log::*;
use regex::Regex;

use crate::{
    error::{RelogError, Result},
    forge::traits::Forge,
    version::Version,
};

/// Filename prefix of historical changelog documents.
pub const CHANGELOG_FILE_PREFIX: &str = "CHANGELOG-";
/// Filename extension of historical changelog documents.
pub const CHANGELOG_FILE_EXT: &str = ".md";
/// Number of recent documents included in the prompt as a style reference.
pub const STYLE_EXCERPT_COUNT: usize = 3;
/// Marker prefixed to entries with borderline inclusion confidence.
pub const OPTIONAL_MARKER: &str = "*OPTIONAL* ";

/// Changelog category. Rendered sections appear in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Added,
    Changed,
    Fixed,
}

impl Category {
    pub const ALL: [Category; 3] =
        [Category::Added, Category::Changed, Category::Fixed];

    /// Case-insensitive parse. Anything but the three known categories is
    /// None.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_uppercase().as_str() {
            "ADDED" => Some(Category::Added),
            "CHANGED" => Some(Category::Changed),
            "FIXED" => Some(Category::Fixed),
            _ => None,
        }
    }

    /// Canonical upper-case name used in the ledger and the prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Added => "ADDED",
            Category::Changed => "CHANGED",
            Category::Fixed => "FIXED",
        }
    }

    /// Capitalized form used for rendered section headings.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Added => "Added",
            Category::Changed => "Changed",
            Category::Fixed => "Fixed",
        }
    }
}

/// A pull request entry recovered from a historical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalEntry {
    pub description: String,
    pub category: Category,
}

/// Ledger of historically published entries keyed by pull request number.
pub type Ledger = HashMap<u64, HistoricalEntry>;

/// A located historical document and the version embedded in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogDocument {
    pub name: String,
    pub version: Version,
}

/// Parser for the bullet/heading/link grammar of rendered changelogs.
///
/// The grammar must stay in sync with what the formatter emits: `### `
/// headings naming a category, and bullets of the shape
/// `- <description>. ([#<n>](<pull-base>/<n>), [@<author>])`.
pub struct DocumentParser {
    link_re: Regex,
}

impl DocumentParser {
    pub fn new(pull_link_base_url: &str) -> Result<Self> {
        let link_re = Regex::new(&format!(
            r"\[#(\d+)\]\({}/\d+\)",
            regex::escape(pull_link_base_url)
        ))?;

        Ok(Self { link_re })
    }

    /// Scan one document into the ledger. The first occurrence of a pull
    /// request number wins, so callers must feed documents most recent
    /// first. Malformed lines are skipped, not errors.
    pub fn scan(&self, content: &str, ledger: &mut Ledger) {
        let mut current: Option<Category> = None;

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(heading) = trimmed.strip_prefix("### ") {
                // A heading that is not a known category ends the
                // current section.
                current = Category::parse(heading);
                continue;
            }

            if !trimmed.starts_with("- ") {
                continue;
            }

            let Some(category) = current else {
                continue;
            };

            let Some(caps) = self.link_re.captures(trimmed) else {
                continue;
            };

            let Ok(number) = caps[1].parse::<u64>() else {
                continue;
            };

            let Some(desc_end) = trimmed.find("([#") else {
                continue;
            };

            if desc_end <= 2 {
                continue;
            }

            let mut description = trimmed[2..desc_end].trim();
            description = description.strip_suffix('.').unwrap_or(description);
            let description = description
                .strip_prefix(OPTIONAL_MARKER)
                .unwrap_or(description);

            ledger.entry(number).or_insert_with(|| HistoricalEntry {
                description: description.to_string(),
                category,
            });
        }
    }
}

/// Access to the historical changelog documents of a repository.
pub struct History<'a> {
    forge: &'a dyn Forge,
    changelog_dir: String,
    parser: DocumentParser,
}

impl<'a> History<'a> {
    pub fn new(
        forge: &'a dyn Forge,
        changelog_dir: impl Into<String>,
        pull_link_base_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            forge,
            changelog_dir: changelog_dir.into(),
            parser: DocumentParser::new(pull_link_base_url)?,
        })
    }

    /// Locate historical documents, most recent version first.
    ///
    /// Both the ledger and the style excerpt rely on this ordering: the
    /// first document mentioning a pull request number decides its
    /// wording, so the freshest document has to come first.
    pub async fn list_documents(&self) -> Result<Vec<ChangelogDocument>> {
        let entries = self.forge.list_directory(&self.changelog_dir).await?;

        let mut documents: Vec<ChangelogDocument> = entries
            .iter()
            .filter_map(|name| parse_document_name(name))
            .collect();

        documents.sort_by(|a, b| b.version.cmp(&a.version));

        debug!(
            "found {} historical documents in {}",
            documents.len(),
            self.changelog_dir
        );

        Ok(documents)
    }

    /// Build the reuse ledger from every located document.
    ///
    /// Any fetch failure aborts the run: a partially built ledger could
    /// silently reword entries that were published before.
    pub async fn build_ledger(
        &self,
        documents: &[ChangelogDocument],
    ) -> Result<Ledger> {
        let mut ledger = Ledger::new();

        for document in documents {
            let content = self.fetch_document(document).await?;
            self.parser.scan(&content, &mut ledger);
        }

        info!(
            "found {} unique historical entries across {} documents",
            ledger.len(),
            documents.len()
        );

        Ok(ledger)
    }

    /// Concatenated raw text of the `count` most recent documents, used
    /// as a tone and format example. Independent of the ledger, which is
    /// built from all documents.
    pub async fn style_excerpt(
        &self,
        documents: &[ChangelogDocument],
        count: usize,
    ) -> Result<String> {
        let mut excerpt = String::new();

        for document in documents.iter().take(count) {
            info!("including {} in prompt as style reference", document.name);

            let content = self.fetch_document(document).await?;

            excerpt.push_str(&format!("\n\n=== {} ===\n\n", document.name));
            excerpt.push_str(&content);
        }

        Ok(excerpt)
    }

    async fn fetch_document(
        &self,
        document: &ChangelogDocument,
    ) -> Result<String> {
        let path = format!("{}/{}", self.changelog_dir, document.name);

        self.forge.get_file_content(&path).await.map_err(|err| {
            RelogError::forge(format!(
                "failed to fetch historical document {}: {}",
                document.name, err
            ))
        })
    }
}

/// Parse `CHANGELOG-<major>.<minor>.md` into a document entry. The
/// embedded version has an implicit zero patch component.
fn parse_document_name(name: &str) -> Option<ChangelogDocument> {
    let stem = name
        .strip_prefix(CHANGELOG_FILE_PREFIX)?
        .strip_suffix(CHANGELOG_FILE_EXT)?;

    let version = Version::parse(&format!("{}.0", stem)).ok()?;

    Some(ChangelogDocument {
        name: name.to_string(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::traits::MockForge;

    const PULL_BASE: &str = "https://github.com/test/repo/pull";

    fn parser() -> DocumentParser {
        DocumentParser::new(PULL_BASE).unwrap()
    }

    fn bullet(number: u64, description: &str) -> String {
        format!(
            "- {}. ([#{}]({}/{}), [@alice])",
            description, number, PULL_BASE, number
        )
    }

    #[test]
    fn parses_document_names_with_implicit_patch() {
        let document = parse_document_name("CHANGELOG-1.15.md").unwrap();
        assert_eq!(document.version, Version::new(1, 15, 0));

        assert!(parse_document_name("CHANGELOG-1.15.2.md").is_none());
        assert!(parse_document_name("README.md").is_none());
        assert!(parse_document_name("CHANGELOG-1.15.txt").is_none());
    }

    #[test]
    fn scans_entries_under_known_categories() {
        let content = format!(
            "## 1.15.0 - 2025-01-01\n\n### Added\n\n{}\n\n### Fixed\n\n{}\n",
            bullet(100, "Add multicast support"),
            bullet(101, "Fix agent crash on restart"),
        );

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert_eq!(
            ledger.get(&100),
            Some(&HistoricalEntry {
                description: "Add multicast support".to_string(),
                category: Category::Added,
            })
        );
        assert_eq!(ledger.get(&101).unwrap().category, Category::Fixed);
    }

    #[test]
    fn category_headings_match_case_insensitively() {
        let content =
            format!("### ADDED\n\n{}\n", bullet(7, "Add something"));

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert_eq!(ledger.get(&7).unwrap().category, Category::Added);
    }

    #[test]
    fn unknown_heading_clears_category_tracking() {
        let content = format!(
            "### Added\n\n{}\n\n### Unreleased\n\n{}\n",
            bullet(1, "Tracked entry"),
            bullet(2, "Orphaned entry"),
        );

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert!(ledger.contains_key(&1));
        assert!(!ledger.contains_key(&2));
    }

    #[test]
    fn bullets_outside_any_category_are_ignored() {
        let content = bullet(3, "No category yet");

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert!(ledger.is_empty());
    }

    #[test]
    fn strips_optional_marker_and_trailing_period() {
        let content = format!(
            "### Changed\n\n- {}Change the default MTU. ([#55]({}/55), [@bob])\n",
            OPTIONAL_MARKER, PULL_BASE,
        );

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert_eq!(
            ledger.get(&55).unwrap().description,
            "Change the default MTU"
        );
    }

    #[test]
    fn first_occurrence_wins_within_a_document() {
        let content = format!(
            "### Added\n\n{}\n{}\n",
            bullet(9, "Fresh wording"),
            bullet(9, "Stale wording"),
        );

        let mut ledger = Ledger::new();
        parser().scan(&content, &mut ledger);

        assert_eq!(ledger.get(&9).unwrap().description, "Fresh wording");
    }

    #[test]
    fn malformed_bullets_are_skipped_silently() {
        let content = "### Added\n\n- A bullet without any link markup\n- ([#8](https://example.com/other/pull/8))\n";

        let mut ledger = Ledger::new();
        parser().scan(content, &mut ledger);

        assert!(ledger.is_empty());
    }

    #[test]
    fn scanning_is_idempotent() {
        let content = format!("### Added\n\n{}\n", bullet(4, "Some change"));

        let mut first = Ledger::new();
        parser().scan(&content, &mut first);
        let mut second = first.clone();
        parser().scan(&content, &mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn rendered_documents_round_trip_through_the_parser() {
        use crate::formatter::{self, FormatterConfig};
        use crate::oracle::types::{ChangeEntry, ModelResponse};

        let entry = |number: u64,
                     category: &str,
                     description: &str,
                     include_score: i64| ChangeEntry {
            pr_number: number,
            category: category.to_string(),
            description: description.to_string(),
            include_score,
            importance_score: 50,
            reused_from_history: false,
            author: "alice".to_string(),
        };

        let response = ModelResponse {
            changes: vec![
                entry(1, "ADDED", "Add BGP policy support", 90),
                entry(2, "CHANGED", "Raise the default log level", 35),
                entry(3, "FIXED", "Fix IPv6 route flapping", 70),
            ],
        };

        let config = FormatterConfig {
            pull_link_base_url: PULL_BASE.to_string(),
            author_link_base_url: "https://github.com".to_string(),
            include_uncategorized: false,
        };
        let rendered = formatter::render(
            &config,
            &Version::new(1, 15, 0),
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            &response,
        );

        let mut ledger = Ledger::new();
        parser().scan(&rendered, &mut ledger);

        let mut expected = Ledger::new();
        expected.insert(
            1,
            HistoricalEntry {
                description: "Add BGP policy support".to_string(),
                category: Category::Added,
            },
        );
        expected.insert(
            2,
            HistoricalEntry {
                description: "Raise the default log level".to_string(),
                category: Category::Changed,
            },
        );
        expected.insert(
            3,
            HistoricalEntry {
                description: "Fix IPv6 route flapping".to_string(),
                category: Category::Fixed,
            },
        );

        assert_eq!(ledger, expected);
    }

    #[tokio::test]
    async fn lists_documents_in_version_descending_order() {
        let mut forge = MockForge::new();
        forge
            .expect_list_directory()
            .withf(|path| path == "CHANGELOG")
            .returning(|_| {
                Ok(vec![
                    "CHANGELOG-1.2.md".to_string(),
                    "README.md".to_string(),
                    "CHANGELOG-1.10.md".to_string(),
                    "CHANGELOG-0.9.md".to_string(),
                ])
            });

        let history = History::new(&forge, "CHANGELOG", PULL_BASE).unwrap();
        let documents = history.list_documents().await.unwrap();

        let names: Vec<&str> =
            documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["CHANGELOG-1.10.md", "CHANGELOG-1.2.md", "CHANGELOG-0.9.md"]
        );
    }

    #[tokio::test]
    async fn most_recent_document_wording_wins_across_documents() {
        let mut forge = MockForge::new();
        forge
            .expect_get_file_content()
            .withf(|path| path == "CHANGELOG/CHANGELOG-1.10.md")
            .returning(|_| {
                Ok(format!(
                    "### Fixed\n\n- Fresh wording. ([#42]({}/42), [@alice])\n",
                    PULL_BASE
                ))
            });
        forge
            .expect_get_file_content()
            .withf(|path| path == "CHANGELOG/CHANGELOG-1.9.md")
            .returning(|_| {
                Ok(format!(
                    "### Changed\n\n- Stale wording. ([#42]({}/42), [@alice])\n",
                    PULL_BASE
                ))
            });

        let history = History::new(&forge, "CHANGELOG", PULL_BASE).unwrap();
        let documents = vec![
            ChangelogDocument {
                name: "CHANGELOG-1.10.md".to_string(),
                version: Version::new(1, 10, 0),
            },
            ChangelogDocument {
                name: "CHANGELOG-1.9.md".to_string(),
                version: Version::new(1, 9, 0),
            },
        ];

        let ledger = history.build_ledger(&documents).await.unwrap();

        let entry = ledger.get(&42).unwrap();
        assert_eq!(entry.description, "Fresh wording");
        assert_eq!(entry.category, Category::Fixed);
    }

    #[tokio::test]
    async fn document_fetch_failure_aborts_ledger_construction() {
        let mut forge = MockForge::new();
        forge
            .expect_get_file_content()
            .returning(|_| Err(RelogError::forge("boom")));

        let history = History::new(&forge, "CHANGELOG", PULL_BASE).unwrap();
        let documents = vec![ChangelogDocument {
            name: "CHANGELOG-1.9.md".to_string(),
            version: Version::new(1, 9, 0),
        }];

        let result = history.build_ledger(&documents).await;
        assert!(matches!(result, Err(RelogError::ForgeError(_))));
    }

    #[tokio::test]
    async fn style_excerpt_takes_only_most_recent_documents() {
        let mut forge = MockForge::new();
        forge
            .expect_get_file_content()
            .withf(|path| path == "CHANGELOG/CHANGELOG-1.10.md")
            .times(1)
            .returning(|_| Ok("newest".to_string()));
        forge
            .expect_get_file_content()
            .withf(|path| path == "CHANGELOG/CHANGELOG-1.9.md")
            .times(0)
            .returning(|_| Ok("older".to_string()));

        let history = History::new(&forge, "CHANGELOG", PULL_BASE).unwrap();
        let documents = vec![
            ChangelogDocument {
                name: "CHANGELOG-1.10.md".to_string(),
                version: Version::new(1, 10, 0),
            },
            ChangelogDocument {
                name: "CHANGELOG-1.9.md".to_string(),
                version: Version::new(1, 9, 0),
            },
        ];

        let excerpt = history.style_excerpt(&documents, 1).await.unwrap();

        assert!(excerpt.contains("=== CHANGELOG-1.10.md ==="));
        assert!(excerpt.contains("newest"));
        assert!(!excerpt.contains("older"));
    }
}
