//! Extraction policy: turns free-form agent responses into numbers and lists
//!
//! Response formats drift between models, so every parsing rule lives here
//! and nowhere else. Parsing never fails: text that matches nothing yields
//! a score of 0 and empty lists.

use crucible_core::{CrucibleError, Result};
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;
use tracing::error;

/// Score patterns in priority order: labeled score, labeled quality,
/// bare percentage, "x/100" fraction. Each captures one integer.
pub const STANDARD_SCORE_PATTERNS: [&str; 4] = [
    r"score[:\s]+(\d+)",
    r"quality[:\s]+(\d+)",
    r"(\d+)\s*%",
    r"(\d+)/100",
];

static STANDARD: OnceLock<ExtractionPolicy> = OnceLock::new();

/// Ordered, first-match-wins score patterns plus section parsing
#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    score_patterns: Vec<Regex>,
}

impl ExtractionPolicy {
    /// Build a policy from case-insensitive patterns, each with one capture group
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let score_patterns = patterns
            .into_iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CrucibleError::Pattern(format!("{}: {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { score_patterns })
    }

    /// The built-in policy
    pub fn standard() -> &'static ExtractionPolicy {
        STANDARD.get_or_init(|| {
            ExtractionPolicy::new(STANDARD_SCORE_PATTERNS).unwrap_or_else(|e| {
                // Unreachable with the literal patterns; scoring degrades to 0
                error!("Built-in score patterns failed to compile: {}", e);
                ExtractionPolicy {
                    score_patterns: Vec::new(),
                }
            })
        })
    }

    /// Extract a score in [0, 100]; 0 when no pattern matches
    pub fn score(&self, text: &str) -> f64 {
        for pattern in &self.score_patterns {
            let value = pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());

            if let Some(value) = value {
                return value.clamp(0.0, 100.0);
            }
        }
        0.0
    }

    /// Dash-bulleted items under `header`, up to the next capitalized header
    ///
    /// The header is matched case-insensitively at the start of a line,
    /// ignoring markdown decoration (`#`, `*`, `>`). Lines that start with a
    /// capital letter end the section; other non-bullet lines continue the
    /// current item.
    pub fn section(&self, text: &str, header: &str) -> Vec<String> {
        let header_re = match RegexBuilder::new(&format!(
            r"^[ \t#*>]*{}[^\n:]*:?[ \t*]*([^\n]*)",
            regex::escape(header)
        ))
        .case_insensitive(true)
        .multi_line(true)
        .build()
        {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        let Some(caps) = header_re.captures(text) else {
            return Vec::new();
        };
        let Some(whole) = caps.get(0) else {
            return Vec::new();
        };

        let mut items: Vec<String> = Vec::new();
        let mut current: Option<String> = None;

        // A bullet on the header line itself ("ISSUES: - x") opens the section
        let inline = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let body = &text[whole.end()..];
        let lines = std::iter::once(inline)
            .filter(|l| l.starts_with('-'))
            .chain(body.lines());

        for line in lines {
            if starts_header(line) {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(item) = trimmed.strip_prefix('-') {
                if let Some(done) = current.take() {
                    items.push(done);
                }
                current = Some(item.trim().to_string());
            } else if let Some(item) = current.as_mut() {
                item.push(' ');
                item.push_str(trimmed);
            }
        }

        if let Some(done) = current {
            items.push(done);
        }

        items.retain(|item| !item.is_empty());
        items
    }
}

/// Whether `line` opens a new section: a capital letter at column 0, or
/// right after markdown decoration (`## NAME`, `**NAME:**`, `> NAME`)
fn starts_header(line: &str) -> bool {
    let bare = if line.starts_with(['#', '*', '>']) {
        line.trim_start_matches(['#', '*', '>', ' ', '\t'])
    } else {
        line
    };
    bare.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self::standard().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_score() {
        let policy = ExtractionPolicy::standard();
        assert_eq!(policy.score("Overall score: 85"), 85.0);
        assert_eq!(policy.score("SCORE 72 after review"), 72.0);
    }

    #[test]
    fn test_no_pattern_is_zero() {
        assert_eq!(ExtractionPolicy::standard().score("looks fine to me"), 0.0);
        assert_eq!(ExtractionPolicy::standard().score(""), 0.0);
    }

    #[test]
    fn test_percentage_clamped() {
        assert_eq!(ExtractionPolicy::standard().score("coverage is 120%"), 100.0);
    }

    #[test]
    fn test_priority_order() {
        let policy = ExtractionPolicy::standard();
        // Labeled score beats an earlier percentage
        assert_eq!(policy.score("coverage 40%\nSCORE: 66"), 66.0);
        // Quality label beats a fraction
        assert_eq!(policy.score("7/100 items\nQuality: 81"), 81.0);
        assert_eq!(policy.score("rated 64/100"), 64.0);
    }

    #[test]
    fn test_custom_policy() {
        let policy = ExtractionPolicy::new([r"grade=(\d+)"]).unwrap();
        assert_eq!(policy.score("grade=42, score: 99"), 42.0);
        assert!(ExtractionPolicy::new(["(unclosed"]).is_err());
    }

    #[test]
    fn test_section_items() {
        let text = "SCORE: 80\n\
                    ISSUES:\n\
                    - missing error handling\n\
                    - no type hints on public functions\n\
                    \n\
                    RECOMMENDATIONS:\n\
                    - add a Result type\n\
                    - document the parser\n";
        let policy = ExtractionPolicy::standard();

        assert_eq!(
            policy.section(text, "ISSUES"),
            vec!["missing error handling", "no type hints on public functions"]
        );
        assert_eq!(
            policy.section(text, "recommendations"),
            vec!["add a Result type", "document the parser"]
        );
    }

    #[test]
    fn test_section_missing_is_empty() {
        let policy = ExtractionPolicy::standard();
        assert!(policy.section("SCORE: 10", "ISSUES").is_empty());
    }

    #[test]
    fn test_section_continuation_lines_and_decoration() {
        let text = "## **Vulnerabilities found:**\n\
                    - SQL injection in\n  the search endpoint\n\
                    -   hardcoded secret\n\
                    Fixes:\n\
                    - use bound parameters\n";
        let policy = ExtractionPolicy::standard();

        assert_eq!(
            policy.section(text, "VULNERABILITIES"),
            vec!["SQL injection in the search endpoint", "hardcoded secret"]
        );
        assert_eq!(policy.section(text, "FIXES"), vec!["use bound parameters"]);
    }

    #[test]
    fn test_section_inline_bullet() {
        let policy = ExtractionPolicy::standard();
        assert_eq!(
            policy.section("ISSUES: - only one\n", "ISSUES"),
            vec!["only one"]
        );
    }

    #[test]
    fn test_section_stops_at_decorated_header() {
        let policy = ExtractionPolicy::standard();

        let hashes = "SCORE: 80\n\
                      ## ISSUES\n\
                      - missing validation\n\
                      - magic numbers\n\
                      \n\
                      ## RECOMMENDATIONS\n\
                      - validate input\n";
        assert_eq!(
            policy.section(hashes, "ISSUES"),
            vec!["missing validation", "magic numbers"]
        );
        assert_eq!(
            policy.section(hashes, "RECOMMENDATIONS"),
            vec!["validate input"]
        );

        let bold = "**ISSUES:**\n\
                    - missing validation\n\
                    **RECOMMENDATIONS:**\n\
                    - validate input\n\
                    > Summary follows\n";
        assert_eq!(policy.section(bold, "ISSUES"), vec!["missing validation"]);
        assert_eq!(
            policy.section(bold, "RECOMMENDATIONS"),
            vec!["validate input"]
        );
    }

    #[test]
    fn test_indented_capitalized_line_continues_item() {
        let text = "ISSUES:\n- parser rejects\n  Unicode input\n";
        assert_eq!(
            ExtractionPolicy::standard().section(text, "ISSUES"),
            vec!["parser rejects Unicode input"]
        );
    }

    #[test]
    fn test_standard_policy_compiles_every_pattern() {
        let policy = ExtractionPolicy::standard();
        assert_eq!(policy.score_patterns.len(), STANDARD_SCORE_PATTERNS.len());
    }
}
