//! Rendering of classified entries into the final changelog document.
//!
//! Joins the classifier output back to the collected records for
//! authorship, applies the inclusion thresholds, groups entries into the
//! three fixed categories, ranks them by importance, and renders the
//! document plus the trailing author index. The emitted shape is also the
//! input format of the historical-document parser, so the two must stay
//! in sync.
use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::{
    forge::types::PullRequestInfo,
    history::{Category, OPTIONAL_MARKER},
    oracle::types::{ChangeEntry, ModelResponse},
    version::Version,
};

/// Entries scoring below this are excluded from the document.
pub const INCLUDE_THRESHOLD: i64 = 25;
/// Entries scoring below this (but at or above the include threshold)
/// are rendered with the optional marker.
pub const OPTIONAL_THRESHOLD: i64 = 50;

/// Link bases and mode flags for rendering.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Base URL for pull request links.
    pub pull_link_base_url: String,
    /// Base URL for author profile links.
    pub author_link_base_url: String,
    /// Surface entries with unknown categories in a provisional section
    /// instead of dropping them. Enabled in broad collection mode.
    pub include_uncategorized: bool,
}

/// Copy each record's author onto the matching classifier entry. An
/// entry whose number matches no record keeps an empty author.
pub fn enrich_authors(
    response: &mut ModelResponse,
    records: &[PullRequestInfo],
) {
    for change in response.changes.iter_mut() {
        if let Some(record) =
            records.iter().find(|r| r.number == change.pr_number)
        {
            change.author = record.author.clone();
        }
    }
}

struct GroupedEntries<'a> {
    buckets: Vec<(Category, Vec<&'a ChangeEntry>)>,
    uncategorized: Vec<&'a ChangeEntry>,
}

/// Partition entries that pass the inclusion threshold into the three
/// category buckets, ranking each bucket by importance. The sort is
/// stable: equal scores keep the classifier-returned order.
fn group_and_rank(response: &ModelResponse) -> GroupedEntries<'_> {
    let mut buckets: Vec<(Category, Vec<&ChangeEntry>)> = Category::ALL
        .iter()
        .map(|category| (*category, vec![]))
        .collect();
    let mut uncategorized: Vec<&ChangeEntry> = vec![];

    for change in &response.changes {
        if change.include_score < INCLUDE_THRESHOLD {
            continue;
        }

        match Category::parse(&change.category) {
            Some(category) => {
                if let Some((_, entries)) =
                    buckets.iter_mut().find(|(c, _)| *c == category)
                {
                    entries.push(change);
                }
            }
            None => uncategorized.push(change),
        }
    }

    for (_, entries) in buckets.iter_mut() {
        entries.sort_by_key(|change| std::cmp::Reverse(change.importance_score));
    }
    uncategorized
        .sort_by_key(|change| std::cmp::Reverse(change.importance_score));

    GroupedEntries {
        buckets,
        uncategorized,
    }
}

fn render_bullet(config: &FormatterConfig, change: &ChangeEntry) -> String {
    let marker = if change.include_score < OPTIONAL_THRESHOLD {
        OPTIONAL_MARKER
    } else {
        ""
    };

    format!(
        "- {}{}. ([#{}]({}/{}), [@{}])\n",
        marker,
        change.description,
        change.pr_number,
        config.pull_link_base_url,
        change.pr_number,
        change.author
    )
}

/// Render the changelog document for `version` dated `date`.
///
/// The top-level title appears only for minor releases; the release
/// header always appears. The trailing author index is deduplicated and
/// alphabetically sorted; entries with no resolved author are skipped
/// there.
pub fn render(
    config: &FormatterConfig,
    version: &Version,
    date: NaiveDate,
    response: &ModelResponse,
) -> String {
    let mut out = String::new();

    if version.patch() == 0 {
        out.push_str(&format!(
            "# Changelog {}.{}\n\n",
            version.major(),
            version.minor()
        ));
    }

    out.push_str(&format!(
        "## {} - {}\n\n",
        version,
        date.format("%Y-%m-%d")
    ));

    let grouped = group_and_rank(response);
    let mut authors: BTreeSet<&str> = BTreeSet::new();

    for (category, entries) in &grouped.buckets {
        out.push_str(&format!("### {}\n\n", category.title()));

        for change in entries {
            out.push_str(&render_bullet(config, change));
            if !change.author.is_empty() {
                authors.insert(&change.author);
            }
        }

        out.push('\n');
    }

    if config.include_uncategorized && !grouped.uncategorized.is_empty() {
        out.push_str("### Uncategorized (needs manual triage)\n\n");

        for change in &grouped.uncategorized {
            out.push_str(&render_bullet(config, change));
            if !change.author.is_empty() {
                authors.insert(&change.author);
            }
        }

        out.push('\n');
    }

    out.push('\n');

    for author in authors {
        out.push_str(&format!(
            "[@{}]: {}/{}\n",
            author, config.author_link_base_url, author
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const PULL_BASE: &str = "https://github.com/test/repo/pull";

    fn config() -> FormatterConfig {
        FormatterConfig {
            pull_link_base_url: PULL_BASE.to_string(),
            author_link_base_url: "https://github.com".to_string(),
            include_uncategorized: false,
        }
    }

    fn entry(
        number: u64,
        category: &str,
        description: &str,
        include_score: i64,
        importance_score: i64,
        author: &str,
    ) -> ChangeEntry {
        ChangeEntry {
            pr_number: number,
            category: category.to_string(),
            description: description.to_string(),
            include_score,
            importance_score,
            reused_from_history: false,
            author: author.to_string(),
        }
    }

    fn record(number: u64, author: &str) -> PullRequestInfo {
        PullRequestInfo {
            number,
            title: "".to_string(),
            body: "".to_string(),
            author: author.to_string(),
            labels: vec![],
            merged_at: Some(Utc.timestamp_opt(1_000, 0).unwrap()),
            updated_at: Utc.timestamp_opt(1_100, 0).unwrap(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn enriches_authors_by_number_join() {
        let mut response = ModelResponse {
            changes: vec![
                entry(1, "ADDED", "A", 90, 50, ""),
                entry(2, "FIXED", "B", 90, 50, ""),
            ],
        };

        enrich_authors(&mut response, &[record(1, "alice")]);

        assert_eq!(response.changes[0].author, "alice");
        // No matching record leaves the author empty.
        assert_eq!(response.changes[1].author, "");
    }

    #[test]
    fn inclusion_thresholds_gate_rendering() {
        let response = ModelResponse {
            changes: vec![
                entry(1, "ADDED", "Excluded entry", 10, 50, "alice"),
                entry(2, "ADDED", "Borderline entry", 35, 50, "alice"),
                entry(3, "ADDED", "Solid entry", 80, 50, "alice"),
            ],
        };

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        assert!(!out.contains("Excluded entry"));
        assert!(out.contains("- *OPTIONAL* Borderline entry."));
        assert!(out.contains("- Solid entry."));
        assert!(!out.contains("*OPTIONAL* Solid entry"));
    }

    #[test]
    fn title_line_only_for_minor_releases() {
        let response = ModelResponse { changes: vec![] };

        let minor =
            render(&config(), &Version::new(1, 15, 0), date(), &response);
        assert!(minor.contains("# Changelog 1.15\n"));
        assert!(minor.contains("## 1.15.0 - 2025-06-01\n"));

        let patch =
            render(&config(), &Version::new(1, 15, 2), date(), &response);
        assert!(!patch.contains("# Changelog"));
        assert!(patch.contains("## 1.15.2 - 2025-06-01\n"));
    }

    #[test]
    fn categories_render_in_fixed_order_with_correct_grouping() {
        let response = ModelResponse {
            changes: vec![
                entry(1, "FIXED", "A fix", 100, 50, "alice"),
                entry(2, "ADDED", "A feature", 100, 50, "bob"),
                entry(3, "changed", "A change", 100, 50, "carol"),
            ],
        };

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        let added = out.find("### Added").unwrap();
        let changed = out.find("### Changed").unwrap();
        let fixed = out.find("### Fixed").unwrap();
        assert!(added < changed && changed < fixed);

        assert!(out.find("A feature").unwrap() > added);
        assert!(out.find("A feature").unwrap() < changed);
        assert!(out.find("A change").unwrap() < fixed);
        assert!(out.find("A fix").unwrap() > fixed);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let response = ModelResponse {
            changes: vec![
                entry(1, "ADDED", "Minor feature", 100, 10, "alice"),
                entry(2, "ADDED", "First tie", 100, 50, "alice"),
                entry(3, "ADDED", "Second tie", 100, 50, "alice"),
                entry(4, "ADDED", "Major feature", 100, 90, "alice"),
            ],
        };

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        let major = out.find("Major feature").unwrap();
        let first = out.find("First tie").unwrap();
        let second = out.find("Second tie").unwrap();
        let minor = out.find("Minor feature").unwrap();
        assert!(major < first && first < second && second < minor);
    }

    #[test]
    fn unknown_categories_are_dropped_in_narrow_mode() {
        let response = ModelResponse {
            changes: vec![entry(
                1,
                "DOCUMENTATION",
                "A docs change",
                100,
                50,
                "alice",
            )],
        };

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        assert!(!out.contains("A docs change"));
    }

    #[test]
    fn unknown_categories_surface_in_provisional_section_in_broad_mode() {
        let mut broad = config();
        broad.include_uncategorized = true;

        let response = ModelResponse {
            changes: vec![entry(
                1,
                "DOCUMENTATION",
                "A docs change",
                100,
                50,
                "alice",
            )],
        };

        let out = render(&broad, &Version::new(1, 15, 0), date(), &response);

        assert!(out.contains("### Uncategorized (needs manual triage)"));
        assert!(out.contains("A docs change"));
    }

    #[test]
    fn author_index_is_sorted_and_deduplicated() {
        let response = ModelResponse {
            changes: vec![
                entry(1, "ADDED", "A", 100, 50, "zoe"),
                entry(2, "FIXED", "B", 100, 50, "alice"),
                entry(3, "FIXED", "C", 100, 50, "zoe"),
                entry(4, "CHANGED", "D", 100, 50, ""),
            ],
        };

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        let alice = out.find("[@alice]: https://github.com/alice").unwrap();
        let zoe = out.find("[@zoe]: https://github.com/zoe").unwrap();
        assert!(alice < zoe);
        assert_eq!(out.matches("[@zoe]:").count(), 1);
        // Entries without a resolved author stay out of the index.
        assert!(!out.contains("[@]:"));
    }

    #[test]
    fn renders_both_entries_with_authors_in_index() {
        // Two labeled records merged inside the window, classified with
        // full confidence: both render under their headings.
        let mut response = ModelResponse {
            changes: vec![
                entry(101, "ADDED", "Add tunnel checksum offload", 100, 80, ""),
                entry(102, "FIXED", "Fix route reconciliation", 100, 70, ""),
            ],
        };
        enrich_authors(
            &mut response,
            &[record(101, "alice"), record(102, "bob")],
        );

        let out =
            render(&config(), &Version::new(1, 15, 0), date(), &response);

        let added = out.find("### Added").unwrap();
        let fixed = out.find("### Fixed").unwrap();
        let feature = out.find("Add tunnel checksum offload").unwrap();
        let fix = out.find("Fix route reconciliation").unwrap();
        assert!(added < feature && feature < fixed && fixed < fix);
        assert!(out.contains(&format!(
            "([#101]({}/101), [@alice])",
            PULL_BASE
        )));
        assert!(out.contains("[@alice]: https://github.com/alice"));
        assert!(out.contains("[@bob]: https://github.com/bob"));
    }
}
