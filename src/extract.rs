//! Pattern based extraction of dependency bumps, issue identifiers and
//! release notes from patches and free text.
use color_eyre::eyre::Context;
use log::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{config::ExtractConfig, result::Result};

const OLD_REV_PATTERN: &str = r#"-[A-Z_]*SRCREV[+=? ]+"([a-f0-9]+)""#;
const NEW_REV_PATTERN: &str = r#"\+[A-Z_]*SRCREV[+=? ]+"([a-f0-9]+)""#;

// Evaluated in order; a later match replaces an earlier one.
const URI_PATTERNS: [&str; 3] = [
    r#"_URI[+=? ]+"([-a-zA-Z0-9/:\.]+)""#,
    r#"_URI[+=? ]+"([-a-zA-Z0-9/:\.@]+);"#,
    r#"\+SRC_URI[+=? ]+"([-a-zA-Z0-9/:\.@]+);"#,
];

/// Pinned revision change of a dependency found in one file patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpRecord {
    pub uri: String,
    pub old_rev: String,
    pub new_rev: String,
}

impl BumpRecord {
    /// True when the dependency URI starts with an allowed scheme prefix.
    pub fn qualifies(&self, schemes: &[String]) -> bool {
        schemes.iter().any(|s| self.uri.starts_with(s.as_str()))
    }
}

/// Append `item` unless an equal value is already present.
pub fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

struct IssueMatcher {
    name: String,
    regex: Regex,
}

/// Compiled extraction rules.
pub struct TextExtractor {
    issue_rules: Vec<IssueMatcher>,
    release_note: Regex,
    note_delimiter: String,
    old_rev: Regex,
    new_rev: Regex,
    uris: Vec<Regex>,
}

impl TextExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let mut issue_rules = vec![];

        for rule in config.issue_rules.iter() {
            let regex = Regex::new(&rule.pattern).wrap_err_with(|| {
                format!("invalid issue rule {}: {}", rule.name, rule.pattern)
            })?;
            issue_rules.push(IssueMatcher {
                name: rule.name.clone(),
                regex,
            });
        }

        let release_note = Regex::new(&config.release_note_pattern)
            .wrap_err("invalid release note pattern")?;

        let uris = URI_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            issue_rules,
            release_note,
            note_delimiter: config.note_delimiter.clone(),
            old_rev: Regex::new(OLD_REV_PATTERN)?,
            new_rev: Regex::new(NEW_REV_PATTERN)?,
            uris,
        })
    }

    /// Issue identifiers referenced in `text`, in rule order then position,
    /// without duplicates.
    pub fn issues(&self, text: &str) -> Vec<String> {
        let mut found = vec![];

        for rule in self.issue_rules.iter() {
            for caps in rule.regex.captures_iter(text) {
                let id = caps.name("id").or_else(|| caps.get(1));
                if let Some(id) = id {
                    debug!("issue rule {} matched {}", rule.name, id.as_str());
                    push_unique(&mut found, id.as_str().to_string());
                }
            }
        }

        found
    }

    /// Release note lines following the first release note marker. Lines
    /// are collected until one containing the delimiter, whose leading part
    /// is kept.
    pub fn release_notes(&self, text: &str) -> Vec<String> {
        let mut notes = vec![];

        let Some(caps) = self.release_note.captures(text) else {
            return notes;
        };

        let Some(body) = caps.get(1) else {
            return notes;
        };

        for line in body.as_str().lines() {
            let line = line.trim();

            if let Some((head, _)) = line.split_once(&self.note_delimiter) {
                let head = head.trim();
                if !head.is_empty() {
                    push_unique(&mut notes, head.to_string());
                }
                break;
            }

            if !line.is_empty() {
                push_unique(&mut notes, line.to_string());
            }
        }

        notes
    }

    /// Dependency bump described by a file patch, when the patch changes a
    /// pinned revision and names the dependency URI.
    pub fn bump(&self, patch: &str) -> Option<BumpRecord> {
        let old_rev = first_capture(&self.old_rev, patch)?;
        let new_rev = first_capture(&self.new_rev, patch)?;
        let uri = self
            .uris
            .iter()
            .filter_map(|re| first_capture(re, patch))
            .last()?;

        Some(BumpRecord {
            uri,
            old_rev,
            new_rev,
        })
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IssueRule;

    fn extractor() -> TextExtractor {
        TextExtractor::new(&ExtractConfig::default()).unwrap()
    }

    const BUMP_PATCH: &str = r#"@@ -1,6 +1,6 @@
 HOMEPAGE = "https://github.com/openbmc/phosphor-logging"
 LICENSE = "Apache-2.0"
 SRC_URI += "git://github.com/openbmc/phosphor-logging"
-SRCREV = "1111111111111111111111111111111111111111"
+SRCREV = "2222222222222222222222222222222222222222"
"#;

    #[test]
    fn duplicate_issue_mentions_collapse() {
        let ex = extractor();
        let ids = ex.issues("Fixes: SW123456 and also fixes SW123456 again");
        assert_eq!(ids, vec!["SW123456".to_string()]);
    }

    #[test]
    fn issue_extraction_is_idempotent() {
        let ex = extractor();
        let text = "fixes FW000123\nAlso fixes PE00042 and fixes #1234567";
        let first = ex.issues(text);
        let second = ex.issues(text);
        assert_eq!(first, second);
        assert_eq!(first, vec!["FW000123", "PE00042", "1234567"]);
    }

    #[test]
    fn issues_require_fixes_keyword() {
        let ex = extractor();
        assert!(ex.issues("Related to SW123456").is_empty());
    }

    #[test]
    fn issue_rule_named_group() {
        let config = ExtractConfig {
            issue_rules: vec![IssueRule {
                name: "jira".into(),
                pattern: r"(?i)(closes)\s+(?P<id>[A-Z]+-[0-9]+)".into(),
            }],
            ..ExtractConfig::default()
        };
        let ex = TextExtractor::new(&config).unwrap();
        assert_eq!(ex.issues("Closes BMC-12"), vec!["BMC-12"]);
    }

    #[test]
    fn invalid_issue_rule_is_rejected() {
        let config = ExtractConfig {
            issue_rules: vec![IssueRule {
                name: "broken".into(),
                pattern: "(unclosed".into(),
            }],
            ..ExtractConfig::default()
        };
        assert!(TextExtractor::new(&config).is_err());
    }

    #[test]
    fn release_notes_stop_at_delimiter() {
        let ex = extractor();
        let text = "Some change\n\nRelease note: first line\n\n  second line\nthird :: trailing\nnot included";
        assert_eq!(
            ex.release_notes(text),
            vec!["first line", "second line", "third"]
        );
    }

    #[test]
    fn release_notes_absent() {
        let ex = extractor();
        assert!(ex.release_notes("nothing here").is_empty());
    }

    #[test]
    fn release_note_marker_is_case_insensitive() {
        let ex = extractor();
        assert_eq!(ex.release_notes("RELEASE NOTE fan control ::"), vec![
            "fan control"
        ]);
    }

    #[test]
    fn detects_complete_bump() {
        let ex = extractor();
        let bump = ex.bump(BUMP_PATCH).unwrap();
        assert_eq!(bump.uri, "git://github.com/openbmc/phosphor-logging");
        assert_eq!(bump.old_rev, "1".repeat(40));
        assert_eq!(bump.new_rev, "2".repeat(40));
        assert!(bump.qualifies(&["git".to_string()]));
        assert!(!bump.qualifies(&["https".to_string()]));
    }

    #[test]
    fn later_uri_pattern_overrides() {
        let ex = extractor();
        let patch = r#" KSRC_URI = "git://old.example/linux"
+SRC_URI += "git://github.com/openbmc/linux;branch=dev-6.6"
-SRCREV = "abc"
+SRCREV = "def"
"#;
        let bump = ex.bump(patch).unwrap();
        assert_eq!(bump.uri, "git://github.com/openbmc/linux");
    }

    #[test]
    fn incomplete_bump_is_ignored() {
        let ex = extractor();
        let patch = "+SRCREV = \"2222\"\n SRC_URI = \"git://github.com/openbmc/foo\"\n";
        assert!(ex.bump(patch).is_none());

        let patch = "-SRCREV = \"1111\"\n+SRCREV = \"2222\"\n";
        assert!(ex.bump(patch).is_none());
    }

    #[test]
    fn push_unique_keeps_first_order() {
        let mut items = vec![];
        push_unique(&mut items, "b");
        push_unique(&mut items, "a");
        push_unique(&mut items, "b");
        assert_eq!(items, vec!["b", "a"]);
    }
}
