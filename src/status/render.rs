use regex::Regex;
use std::sync::LazyLock;

static BACKGROUND_COLOR_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"background-color:[^;]+;").expect("background-color pattern"));

static BACKGROUND_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"background:[^;]+;").expect("background pattern"));

static STYLE_ATTR_WITH_BACKGROUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"style="[^"]*background[^"]*""#).expect("style attr pattern"));

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|ul|ol|blockquote|tr)>")
        .expect("line break pattern")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// Removes background styling so exported markup takes the destination's
/// colors instead of the editor's.
pub fn strip_background_styling(markup: &str) -> String {
    let markup = BACKGROUND_COLOR_DECL.replace_all(markup, "");
    let markup = BACKGROUND_DECL.replace_all(&markup, "");
    STYLE_ATTR_WITH_BACKGROUND.replace_all(&markup, "").into_owned()
}

/// Flattens markup to plain text: block closers and `<br>` become line
/// breaks, remaining tags are dropped, common entities are decoded, and
/// blank runs collapse to a single empty line.
pub fn text_content(markup: &str) -> String {
    let broken = LINE_BREAK.replace_all(markup, "\n");
    let stripped = TAG.replace_all(&broken, "");
    let decoded = decode_entities(&stripped);

    let mut lines: Vec<&str> = Vec::new();
    for line in decoded.lines().map(str::trim) {
        if line.is_empty() && lines.last().is_some_and(|last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim_matches('\n').to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::{strip_background_styling, text_content};

    #[test]
    fn background_declarations_are_removed() {
        let markup = r#"<p style="color:red;background-color:#fff;">a</p><span style="background:blue;">b</span>"#;
        let out = strip_background_styling(markup);

        assert!(!out.contains("background"));
        assert!(out.contains("color:red;"));
        assert!(out.contains(">a</p>"));
        assert!(out.contains(">b</span>"));
    }

    #[test]
    fn style_attributes_mentioning_background_are_dropped() {
        let markup = r#"<div style="background-image:url(x.png)">kept text</div>"#;
        let out = strip_background_styling(markup);

        assert_eq!(out, "<div >kept text</div>");
    }

    #[test]
    fn report_markup_flattens_to_lines() {
        let markup = "<h2>Blockers</h2><ul><li>API down</li><li>VPN flaky</li></ul>";

        assert_eq!(text_content(markup), "Blockers\nAPI down\nVPN flaky");
    }

    #[test]
    fn br_variants_become_line_breaks() {
        assert_eq!(text_content("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(
            text_content("&lt;b&gt; &amp; &quot;q&quot;&#39;s&nbsp;end"),
            "<b> & \"q\"'s end"
        );
        // A doubly escaped entity stays escaped once.
        assert_eq!(text_content("&amp;lt;"), "&lt;");
    }

    #[test]
    fn blank_runs_collapse() {
        let markup = "<p>one</p><p></p><p></p><p>two</p>";

        assert_eq!(text_content(markup), "one\n\ntwo");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(text_content("already plain"), "already plain");
    }
}
