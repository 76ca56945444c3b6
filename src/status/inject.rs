use crate::db::EntryRow;
use crate::status::GroupedEntries;
use crate::status::scheme::{CategoryScheme, capitalize};
use crate::status::sections::{Section, find_sections};
use regex::{NoExpand, Regex};
use std::sync::LazyLock;
use tracing::debug;

pub const EMPTY_RANGE_MESSAGE: &str =
    r#"<p class="empty-message">No entries found in the selected date range.</p>"#;

static DATE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{(?:date[_\s]range|date|period)\}").expect("date placeholder pattern")
});

// Bare wrappers produced by rich-text editors; attributed tags stay, and so
// do the closers paired with them.
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b([^>]*)>").expect("div tag pattern"));

/// Merges grouped entries into a template. Date placeholders are replaced
/// first; each category's bullet list then lands after the first section
/// whose label contains one of the category's synonyms, or gets appended
/// as a new section when no anchor matches. Categories whose content is
/// already present (the anchor is directly followed by a list) are left
/// alone, which keeps the rewrite idempotent.
pub fn inject(
    template: &str,
    grouped: &GroupedEntries,
    date_range: &str,
    scheme: &CategoryScheme,
) -> String {
    if grouped.is_empty() {
        return EMPTY_RANGE_MESSAGE.to_string();
    }

    let mut result = replace_date_placeholders(template, date_range);
    // Anchors come from the original template, not the partially rewritten
    // result, so earlier insertions never shift what later categories match.
    let sections: Vec<Section> = find_sections(template).collect();

    for (category, entries) in grouped.iter() {
        let bullets = bullet_list(entries);
        let synonyms = scheme.synonyms_for(category);

        let anchor = sections
            .iter()
            .find(|section| {
                synonyms
                    .iter()
                    .any(|synonym| section.label.contains(synonym.as_str()))
            })
            .and_then(|section| {
                result
                    .find(&section.text)
                    .map(|offset| (section, offset + section.text.len()))
            });

        match anchor {
            Some((section, insert_at)) => {
                if !starts_with_list(&result[insert_at..]) {
                    debug!(
                        category,
                        kind = ?section.kind,
                        offset = section.start,
                        "anchored bullet list"
                    );
                    result.insert_str(insert_at, &bullets);
                }
            }
            // No matching section, or placeholder replacement rewrote the
            // anchor text: append rather than drop the entries.
            None => {
                result.push_str(&format!("<h3>{}</h3>{bullets}", capitalize(category)));
            }
        }
    }

    result
}

/// Replaces every `{date_range}`/`{date range}`/`{date}`/`{period}` token
/// (case-insensitive) with the formatted range. Stable: the output contains
/// no tokens left to match.
pub fn replace_date_placeholders(template: &str, date_range: &str) -> String {
    DATE_PLACEHOLDER
        .replace_all(template, NoExpand(date_range))
        .into_owned()
}

/// Drops `<div>`/`</div>` pairs whose opener carries no attributes. Each
/// closer is kept or dropped to match its opener, so attributed wrappers
/// come out balanced.
pub fn strip_div_wrappers(content: &str) -> String {
    let mut removed = Vec::new();
    // Bareness of every open <div>, innermost last.
    let mut open = Vec::new();

    for caps in DIV_TAG.captures_iter(content) {
        let Some(tag) = caps.get(0) else { continue };

        let closer = caps.get(1).is_some_and(|slash| !slash.as_str().is_empty());
        if closer {
            // A stray closer counts as bare.
            if open.pop().unwrap_or(true) {
                removed.push(tag.range());
            }
        } else {
            let bare = caps
                .get(2)
                .is_some_and(|attrs| attrs.as_str().trim().is_empty());
            if bare {
                removed.push(tag.range());
            }
            open.push(bare);
        }
    }

    let mut result = String::with_capacity(content.len());
    let mut rest = 0;
    for range in removed {
        result.push_str(&content[rest..range.start]);
        rest = range.end;
    }
    result.push_str(&content[rest..]);
    result
}

fn bullet_list(entries: &[EntryRow]) -> String {
    let items = entries
        .iter()
        .map(|entry| format!("<li>{}</li>", strip_div_wrappers(&entry.content)))
        .collect::<String>();

    format!("<ul>{items}</ul>")
}

fn starts_with_list(rest: &str) -> bool {
    rest.trim_start().starts_with("<ul")
}

#[cfg(test)]
mod tests {
    use super::{EMPTY_RANGE_MESSAGE, inject, replace_date_placeholders};
    use crate::db::EntryRow;
    use crate::status::GroupedEntries;
    use crate::status::scheme::CategoryScheme;

    fn classic() -> CategoryScheme {
        CategoryScheme::parse(crate::status::scheme::CLASSIC_SCHEME).expect("classic scheme")
    }

    fn entry(content: &str, category: &str) -> EntryRow {
        EntryRow {
            id: "1755600000000".to_string(),
            content: content.to_string(),
            category: category.to_string(),
            logged_at: 0,
            updated_at: None,
        }
    }

    fn grouped(entries: &[EntryRow]) -> GroupedEntries {
        GroupedEntries::group(entries, &classic())
    }

    #[test]
    fn bullets_land_after_a_matching_heading() {
        let out = inject(
            "<h2>Blockers</h2>",
            &grouped(&[entry("API down", "blocker")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(out, "<h2>Blockers</h2><ul><li>API down</li></ul>");
    }

    #[test]
    fn unmatched_category_appends_a_new_section() {
        let out = inject(
            "<h2>Summary</h2>",
            &grouped(&[entry("Refactored module", "progress")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(
            out,
            "<h2>Summary</h2><h3>Progress</h3><ul><li>Refactored module</li></ul>"
        );
    }

    #[test]
    fn empty_range_returns_the_placeholder_message() {
        let out = inject(
            "<h2>Blockers</h2>",
            &grouped(&[]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(out, EMPTY_RANGE_MESSAGE);
    }

    #[test]
    fn all_date_placeholder_spellings_are_replaced() {
        let template = "<h1>{date_range}</h1><p>{date range}</p><p>{DATE}</p><p>{Period}</p>";
        let out = replace_date_placeholders(template, "01/01/2024 - 01/14/2024");

        assert_eq!(
            out,
            "<h1>01/01/2024 - 01/14/2024</h1><p>01/01/2024 - 01/14/2024</p>\
             <p>01/01/2024 - 01/14/2024</p><p>01/01/2024 - 01/14/2024</p>"
        );
    }

    #[test]
    fn placeholder_replacement_is_stable() {
        let once = replace_date_placeholders("{date_range} report", "01/01/2024 - 01/14/2024");
        let twice = replace_date_placeholders(&once, "02/02/2024 - 02/15/2024");

        assert_eq!(once, twice);
    }

    #[test]
    fn injection_into_dated_template() {
        let out = inject(
            "<h1>Status {date_range}</h1><h2>Blockers</h2>",
            &grouped(&[entry("API down", "blocker")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(
            out,
            "<h1>Status 01/01/2024 - 01/14/2024</h1><h2>Blockers</h2><ul><li>API down</li></ul>"
        );
    }

    #[test]
    fn double_injection_does_not_duplicate_lists() {
        let template = "<h2>Blockers</h2>🚀 Launches<br>";
        let group = grouped(&[
            entry("API down", "blocker"),
            entry("Refactored module", "progress"),
        ]);
        let scheme = classic();

        let once = inject(template, &group, "01/01/2024 - 01/14/2024", &scheme);
        let twice = inject(&once, &group, "01/01/2024 - 01/14/2024", &scheme);

        assert_eq!(once, twice);
    }

    #[test]
    fn bare_div_wrappers_are_stripped_from_items() {
        let out = inject(
            "<h2>Achievements</h2>",
            &grouped(&[entry("<div>Shipped <b>v2</b></div>", "achievement")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(
            out,
            "<h2>Achievements</h2><ul><li>Shipped <b>v2</b></li></ul>"
        );
    }

    #[test]
    fn attributed_divs_survive_item_stripping() {
        assert_eq!(
            super::strip_div_wrappers(r#"<div class="note">kept</div>"#),
            r#"<div class="note">kept</div>"#
        );
        assert_eq!(super::strip_div_wrappers("<div>gone</div>"), "gone");
    }

    #[test]
    fn closers_pair_with_their_openers() {
        assert_eq!(
            super::strip_div_wrappers(r#"<div class="note"><div>inner</div>tail</div>"#),
            r#"<div class="note">innertail</div>"#
        );
        assert_eq!(super::strip_div_wrappers("stray</div>"), "stray");
    }

    #[test]
    fn existing_list_after_anchor_blocks_injection() {
        let template = "<h2>Blockers</h2><ul><li>already here</li></ul>";
        let out = inject(
            template,
            &grouped(&[entry("API down", "blocker")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(out, template);
    }

    #[test]
    fn heading_anchors_outrank_earlier_bold_anchors() {
        let template = "<b>Blocker notes</b><h2>Blockers</h2>";
        let out = inject(
            template,
            &grouped(&[entry("API down", "blocker")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(
            out,
            "<b>Blocker notes</b><h2>Blockers</h2><ul><li>API down</li></ul>"
        );
    }

    #[test]
    fn synonym_containment_matches_decorated_labels() {
        let out = inject(
            "<h2>Current Blockers &amp; Risks</h2>",
            &grouped(&[entry("API down", "blocker")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert!(out.ends_with("<ul><li>API down</li></ul>"));
    }

    #[test]
    fn emoji_anchor_receives_bullets_before_boundary() {
        let out = inject(
            "✅ Achievements<br>tail",
            &grouped(&[entry("Shipped v2", "achievement")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(out, "✅ Achievements<ul><li>Shipped v2</li></ul><br>tail");
    }

    #[test]
    fn rewritten_anchor_falls_back_to_append() {
        // The only matching heading contains a placeholder, so its original
        // text no longer occurs once the date range is substituted.
        let out = inject(
            "<h2>Progress {date}</h2>",
            &grouped(&[entry("Refactored module", "progress")]),
            "01/01/2024 - 01/14/2024",
            &classic(),
        );

        assert_eq!(
            out,
            "<h2>Progress 01/01/2024 - 01/14/2024</h2>\
             <h3>Progress</h3><ul><li>Refactored module</li></ul>"
        );
    }

    #[test]
    fn categories_inject_in_scheme_order() {
        let group = grouped(&[
            entry("Daily sync", "meeting"),
            entry("Fixed the login bug", "achievement"),
        ]);
        let out = inject("<p>plain</p>", &group, "01/01/2024 - 01/14/2024", &classic());

        assert_eq!(
            out,
            "<p>plain</p><h3>Achievement</h3><ul><li>Fixed the login bug</li></ul>\
             <h3>Meeting</h3><ul><li>Daily sync</li></ul>"
        );
    }
}
