use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CLASSIC_SCHEME: &str = include_str!("../../assets/scheme_classic.json");
pub const LAUNCH_SCHEME: &str = include_str!("../../assets/scheme_launch.json");

pub fn builtin_scheme(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "classic" => Some(CLASSIC_SCHEME),
        "launch" => Some(LAUNCH_SCHEME),
        _ => None,
    }
}

/// Category vocabulary: ordered categories with the keywords that classify
/// entry text and the synonyms that match template section labels. Array
/// order is the classification priority order and the report emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScheme {
    pub name: String,
    pub default_category: String,
    pub categories: Vec<CategoryDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl CategoryScheme {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scheme file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid scheme file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let parsed: Self =
            serde_json::from_str(content).context("Failed to parse category scheme JSON")?;
        let scheme = parsed.normalized();
        scheme.validate()?;

        Ok(scheme)
    }

    /// First category (in scheme order) with any keyword occurring as a
    /// substring of the lower-cased text wins, not the one with most hits.
    pub fn categorize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();

        self.categories
            .iter()
            .find(|category| {
                category
                    .keywords
                    .iter()
                    .any(|keyword| lowered.contains(keyword.as_str()))
            })
            .map(|category| category.name.clone())
            .unwrap_or_else(|| self.default_category.clone())
    }

    /// Synonyms used to match a category against section labels. Unknown
    /// (custom) categories fall back to the category itself, so the result
    /// is never empty.
    pub fn synonyms_for(&self, category: &str) -> Vec<String> {
        let lowered = category.trim().to_lowercase();

        self.categories
            .iter()
            .find(|definition| definition.name == lowered)
            .map(|definition| definition.synonyms.clone())
            .filter(|synonyms| !synonyms.is_empty())
            .unwrap_or_else(|| vec![lowered])
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }

    fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            bail!("scheme declares no categories");
        }
        if self.default_category.is_empty() {
            bail!("scheme declares no default category");
        }

        let mut seen = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            if category.name.is_empty() {
                bail!("scheme contains a category with an empty name");
            }
            if seen.contains(&category.name.as_str()) {
                bail!("duplicate category in scheme: {}", category.name);
            }
            seen.push(category.name.as_str());
        }

        Ok(())
    }

    fn normalized(self) -> Self {
        let categories = self
            .categories
            .into_iter()
            .map(|category| CategoryDef {
                name: category.name.trim().to_lowercase(),
                keywords: normalize_terms(category.keywords),
                synonyms: normalize_terms(category.synonyms),
            })
            .collect::<Vec<_>>();

        Self {
            name: self.name.trim().to_lowercase(),
            default_category: self.default_category.trim().to_lowercase(),
            categories,
        }
    }
}

// Empty terms would match every text, so they are dropped outright.
fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryScheme, builtin_scheme, capitalize};

    fn classic() -> CategoryScheme {
        CategoryScheme::parse(super::CLASSIC_SCHEME).expect("classic scheme parses")
    }

    fn launch() -> CategoryScheme {
        CategoryScheme::parse(super::LAUNCH_SCHEME).expect("launch scheme parses")
    }

    #[test]
    fn fix_beats_bug_in_priority_order() {
        // "fix" is an achievement keyword checked before blocker's "bug".
        assert_eq!(classic().categorize("Fixed the login bug"), "achievement");
    }

    #[test]
    fn first_category_in_order_wins_not_most_hits() {
        // One achievement hit ("finish") against two blocker hits
        // ("cannot", "broken"): achievement is checked first.
        assert_eq!(
            classic().categorize("cannot finish, everything is broken"),
            "achievement"
        );
        assert_eq!(classic().categorize("blocked while working on the draft"), "blocker");
    }

    #[test]
    fn unmatched_text_falls_back_to_default() {
        assert_eq!(classic().categorize("lunch with the team"), "other");
        assert_eq!(classic().categorize(""), "other");
        assert_eq!(launch().categorize("nothing notable"), "general");
    }

    #[test]
    fn launch_scheme_checks_meeting_before_launch() {
        assert_eq!(launch().categorize("Shipped the new importer"), "launch");
        assert_eq!(launch().categorize("Demoed the shipped importer"), "meeting");
    }

    #[test]
    fn synonyms_match_case_insensitively_and_never_come_back_empty() {
        let scheme = classic();

        let blocker = scheme.synonyms_for("Blocker");
        assert_eq!(blocker.first().map(String::as_str), Some("blocker"));
        assert!(blocker.contains(&"impediment".to_string()));

        // Free-form custom category resolves to itself.
        assert_eq!(scheme.synonyms_for("Design Reviews"), vec!["design reviews"]);
        assert!(!scheme.synonyms_for("anything at all").is_empty());
        assert_eq!(scheme.category_names().count(), 5);
    }

    #[test]
    fn builtin_lookup_by_name() {
        assert!(builtin_scheme("classic").is_some());
        assert!(builtin_scheme("LAUNCH").is_some());
        assert!(builtin_scheme("unknown").is_none());
    }

    #[test]
    fn rejects_duplicate_categories() {
        let malformed = r#"{
            "name": "broken",
            "default_category": "other",
            "categories": [
                { "name": "a", "keywords": [], "synonyms": [] },
                { "name": "A", "keywords": [], "synonyms": [] }
            ]
        }"#;

        assert!(CategoryScheme::parse(malformed).is_err());
    }

    #[test]
    fn capitalizes_first_character_only() {
        assert_eq!(capitalize("progress"), "Progress");
        assert_eq!(capitalize("in progress"), "In progress");
        assert_eq!(capitalize(""), "");
    }
}
