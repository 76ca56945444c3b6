use regex::{Captures, Regex};
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6][^>]*>(.*?)</h[1-6]>").expect("heading pattern"));

static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<strong>(.*?)</strong>").expect("strong pattern"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<b>(.*?)</b>").expect("bold pattern"));

// A status emoji starts the segment; the segment ends at the next tag or
// line break. A trailing segment with no boundary after it is not a section.
static EMOJI_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:✅|⚠️|⚠|🚀|📋|🗓️|🗓|🎯|🏆)[^<\r\n]*)[<\r\n]").expect("emoji line pattern")
});

/// A detected insertion anchor inside a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Lower-cased inner text, matched against category synonyms.
    pub label: String,
    pub kind: SectionKind,
    /// Byte offset of the construct in the scanned template.
    pub start: usize,
    /// Exact construct substring; generated content goes right after it.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Heading,
    Bold,
    EmojiLine,
}

/// Scans a template for section anchors. Candidates come out in matching
/// priority order: headings, then strong/bold text, then emoji lines, in
/// document order within each family. The scan never mutates the template
/// and re-running it yields the same sequence.
pub fn find_sections(template: &str) -> impl Iterator<Item = Section> + '_ {
    let headings = HEADING
        .captures_iter(template)
        .filter_map(|caps| tag_section(&caps, SectionKind::Heading));
    let strongs = STRONG
        .captures_iter(template)
        .filter_map(|caps| tag_section(&caps, SectionKind::Bold));
    let bolds = BOLD
        .captures_iter(template)
        .filter_map(|caps| tag_section(&caps, SectionKind::Bold));
    let emoji_lines = EMOJI_LINE.captures_iter(template).filter_map(|caps| {
        let segment = caps.get(1)?;

        Some(Section {
            label: segment.as_str().to_lowercase(),
            kind: SectionKind::EmojiLine,
            start: segment.start(),
            text: segment.as_str().to_string(),
        })
    });

    headings.chain(strongs).chain(bolds).chain(emoji_lines)
}

fn tag_section(caps: &Captures<'_>, kind: SectionKind) -> Option<Section> {
    let construct = caps.get(0)?;
    let label = caps.get(1)?.as_str().to_lowercase();

    Some(Section {
        label,
        kind,
        start: construct.start(),
        text: construct.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{Section, SectionKind, find_sections};

    fn sections(template: &str) -> Vec<Section> {
        find_sections(template).collect()
    }

    #[test]
    fn finds_headings_of_any_level_with_attributes() {
        let found = sections(r#"<h1>Weekly Status</h1><p>x</p><h6 class="sub">Blockers</h6>"#);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].label, "weekly status");
        assert_eq!(found[0].kind, SectionKind::Heading);
        assert_eq!(found[0].start, 0);
        assert_eq!(found[1].label, "blockers");
        assert_eq!(found[1].text, r#"<h6 class="sub">Blockers</h6>"#);
    }

    #[test]
    fn finds_strong_and_bold_text() {
        let found = sections("<strong>Achievements</strong> and <b>Notes</b>");

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|section| section.kind == SectionKind::Bold));
        assert_eq!(found[0].label, "achievements");
        assert_eq!(found[1].label, "notes");
    }

    #[test]
    fn finds_emoji_lines_bounded_by_tags_or_line_breaks() {
        let found = sections("✅ Achievements<br>🎯 Goals\nplain tail");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].label, "✅ achievements");
        assert_eq!(found[0].kind, SectionKind::EmojiLine);
        assert_eq!(found[0].text, "✅ Achievements");
        assert_eq!(found[1].label, "🎯 goals");
    }

    #[test]
    fn trailing_emoji_segment_without_boundary_is_not_a_section() {
        assert!(sections("🚀 Launches").is_empty());
        assert_eq!(sections("🚀 Launches<div>").len(), 1);
    }

    #[test]
    fn heading_candidates_come_before_bold_and_emoji_ones() {
        let template = "🗓️ Meetings<br><b>Blockers</b><h3>Progress</h3>";
        let found = sections(template);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind, SectionKind::Heading);
        assert_eq!(found[1].kind, SectionKind::Bold);
        assert_eq!(found[2].kind, SectionKind::EmojiLine);
    }

    #[test]
    fn repeated_labels_are_all_reported() {
        let found = sections("<h2>Notes</h2><h2>Notes</h2>");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].label, found[1].label);
        assert!(found[0].start < found[1].start);
    }

    #[test]
    fn rescan_is_idempotent() {
        let template = "<h2>Blockers</h2>⚠️ Risks<br>";

        assert_eq!(sections(template), sections(template));
    }

    #[test]
    fn markup_free_template_yields_nothing() {
        assert!(sections("just some plain text").is_empty());
    }
}
