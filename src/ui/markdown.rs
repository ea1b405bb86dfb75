//! Markdown rendering for evaluation feedback.
//!
//! Converts the backend's Markdown feedback into styled ratatui text. Covers
//! the elements the feedback actually uses: `#`/`##`/`###` headings,
//! `**bold**` emphasis, unordered and ordered list items, and paragraphs.
//! Anything else renders as plain text rather than failing.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

const HEADING_FG: Color = Color::Rgb(255, 255, 255);
const BOLD_FG: Color = Color::Rgb(244, 114, 132);
const BULLET_FG: Color = Color::Rgb(120, 120, 120);

/// Renders Markdown feedback as styled terminal text.
pub fn render(markdown: &str) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for raw in markdown.lines() {
        let trimmed = raw.trim_end();

        if trimmed.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }

        if let Some(heading) = trimmed.strip_prefix("### ") {
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().fg(HEADING_FG).add_modifier(Modifier::BOLD),
            )));
        } else if let Some(heading) = trimmed.strip_prefix("## ") {
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default()
                    .fg(HEADING_FG)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
        } else if let Some(heading) = trimmed.strip_prefix("# ") {
            lines.push(Line::from(Span::styled(
                heading.to_uppercase(),
                Style::default()
                    .fg(HEADING_FG)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
        } else if let Some(item) = list_item(trimmed) {
            let mut spans = vec![Span::styled("  • ", Style::default().fg(BULLET_FG))];
            spans.extend(inline_spans(&item));
            lines.push(Line::from(spans));
        } else if let Some((number, item)) = ordered_item(trimmed) {
            let mut spans = vec![Span::styled(
                format!("  {number}. "),
                Style::default().fg(BULLET_FG),
            )];
            spans.extend(inline_spans(&item));
            lines.push(Line::from(spans));
        } else {
            lines.push(Line::from(inline_spans(trimmed)));
        }
    }

    Text::from(lines)
}

/// Extracts the content of a `- ` or `* ` list item.
fn list_item(line: &str) -> Option<String> {
    let stripped = line.trim_start();
    stripped
        .strip_prefix("- ")
        .or_else(|| stripped.strip_prefix("* "))
        .map(String::from)
}

/// Extracts `(number, content)` from an ordered list item like `2. text`.
fn ordered_item(line: &str) -> Option<(String, String)> {
    let stripped = line.trim_start();
    let dot = stripped.find(". ")?;
    let number = &stripped[..dot];
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((number.to_string(), stripped[dot + 2..].to_string()))
}

/// Splits a line on `**` markers, alternating plain and bold spans.
fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let parts: Vec<&str> = text.split("**").collect();
    // An even number of parts means an unclosed `**`; the trailing part then
    // renders plain instead of leaking emphasis to the line end.
    let balanced = parts.len() % 2 == 1;
    let mut spans = Vec::new();

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        let is_last = i == parts.len() - 1;
        let bold = i % 2 == 1 && (balanced || !is_last);
        if bold {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().fg(BOLD_FG).add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }

    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn headings_render_without_markers() {
        let text = render("# Summary\n## Strengths\n### Detail");
        assert_eq!(line_text(&text.lines[0]), "SUMMARY");
        assert_eq!(line_text(&text.lines[1]), "Strengths");
        assert_eq!(line_text(&text.lines[2]), "Detail");
    }

    #[test]
    fn bold_spans_are_split_out() {
        let text = render("work on **database indexing** next");
        let line = &text.lines[0];
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content.as_ref(), "database indexing");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn list_items_get_bullets_and_numbers() {
        let text = render("- first\n* second\n2. third");
        assert_eq!(line_text(&text.lines[0]), "  • first");
        assert_eq!(line_text(&text.lines[1]), "  • second");
        assert_eq!(line_text(&text.lines[2]), "  2. third");
    }

    #[test]
    fn unterminated_bold_does_not_leak() {
        let text = render("oops **no closer");
        let line = &text.lines[0];
        assert_eq!(line_text(line), "oops no closer");
    }

    #[test]
    fn blank_lines_separate_paragraphs() {
        let text = render("one\n\ntwo");
        assert_eq!(text.lines.len(), 3);
        assert!(line_text(&text.lines[1]).is_empty());
    }
}
