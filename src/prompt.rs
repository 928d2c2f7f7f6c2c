//! Prompt assembly for the classification model.
//!
//! The prompt is one opaque text blob: a fixed instructional preamble,
//! the style excerpt from recent changelogs, then one block per collected
//! pull request. Assembly is deterministic and carries no retry or
//! validation logic.
use crate::{forge::types::PullRequestInfo, history::Ledger};

/// Instructional preamble describing the classification task and the
/// required JSON output shape.
pub const PROMPT_TEMPLATE: &str = r#"You are preparing the changelog for a software release.

Below you will find recent historical changelog documents, provided as a
reference for tone, wording, and formatting, followed by the list of pull
requests merged during the release window. Produce one changelog entry per
pull request.

For each entry, output:
- "pr_number": the pull request number.
- "category": one of "ADDED" (new feature or capability), "CHANGED"
  (behavior or default change, improvement, dependency bump) or "FIXED"
  (bug fix).
- "description": one sentence describing the change for end users, written
  in the style of the historical changelogs, without a trailing period.
- "include_score": integer 0-100 expressing how strongly this entry
  belongs in the published changelog. Internal refactors, test-only and
  CI-only changes score low; user-visible features and fixes score high.
- "importance_score": integer 0-100 ranking the entry's importance
  relative to the other entries in its category.
- "reused_from_history": true only when the entry reproduces a historical
  entry verbatim.

Some pull requests carry a HISTORICAL ENTRY (MUST REUSE) section. These
were already published in an earlier changelog: reuse the given category
and description verbatim and set "reused_from_history" to true.

Respond with JSON only, in the shape:
{"changes": [{"pr_number": ..., "category": ..., "description": ...,
"include_score": ..., "importance_score": ..., "reused_from_history": ...}]}"#;

/// Serialize the style excerpt, the reuse ledger, and the collected
/// records into the prompt text. Output is deterministic given identical
/// inputs.
pub fn assemble(
    style_excerpt: &str,
    ledger: &Ledger,
    records: &[PullRequestInfo],
) -> String {
    let mut out = String::new();

    out.push_str(PROMPT_TEMPLATE);
    out.push_str("\n\n");

    out.push_str("# HISTORICAL CHANGELOGS (for reference and consistency)\n\n");
    out.push_str(style_excerpt);
    out.push_str("\n\n");

    out.push_str("# PULL REQUESTS FOR THIS RELEASE\n\n");
    for record in records {
        out.push_str(&format!("## PR #{}\n", record.number));
        out.push_str(&format!("**Title:** {}\n", record.title));
        out.push_str(&format!("**Author:** {}\n", record.author));
        out.push_str(&format!("**Labels:** {}\n", record.labels.join(", ")));

        if let Some(historical) = ledger.get(&record.number) {
            out.push_str("**HISTORICAL ENTRY (MUST REUSE):**\n");
            out.push_str(&format!(
                "- Category: {}\n",
                historical.category.as_str()
            ));
            out.push_str(&format!(
                "- Description: {}\n",
                historical.description
            ));
        }

        out.push_str(&format!("**Body:**\n{}\n", record.body));
        out.push_str("\n---\n\n");
    }

    out
}
