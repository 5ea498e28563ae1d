//! Plain-text layout primitives for `--format table`.

use crate::ui;

/// Terminal settings a table is laid out for.
#[derive(Clone, Copy, Debug, Default)]
pub struct Style {
    pub color: bool,
    pub width: Option<usize>,
}

impl Style {
    /// Style resolved from the global flags at startup.
    #[must_use]
    pub fn current() -> Self {
        let prefs = ui::prefs();
        Self {
            color: prefs.table_color,
            width: prefs.term_width,
        }
    }
}

/// Semantic color of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Good,
    Warn,
    Bad,
}

impl Tone {
    const fn ansi(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Good => Some("32"),
            Self::Warn => Some("33"),
            Self::Bad => Some("31"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    text: String,
    tone: Tone,
    numeric: bool,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Plain,
            numeric: false,
        }
    }

    /// Right-aligned in grids.
    pub fn number(text: impl Into<String>) -> Self {
        Self {
            numeric: true,
            ..Self::text(text)
        }
    }

    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            tone,
            ..Self::text(text)
        }
    }
}

/// Wrap `text` in the tone's color when the style allows it.
#[must_use]
pub fn paint(text: &str, tone: Tone, style: Style) -> String {
    match tone.ansi() {
        Some(code) if style.color => format!("\u{1b}[{code}m{text}\u{1b}[0m"),
        _ => text.to_string(),
    }
}

/// Labelled block, one `label  value` pair per line.
///
/// Values are never truncated: hashes and paths must stay copyable.
#[must_use]
pub fn fields(rows: &[(&str, Cell)], style: Style) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(label, cell)| {
            format!(
                "{}  {}",
                pad(label, label_width, false),
                paint(&cell.text, cell.tone, style)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Column grid under a header and a divider.
///
/// When the style has a width, the widest columns give way first, never
/// below their header.
#[must_use]
pub fn grid(headers: &[&str], rows: &[Vec<Cell>], style: Style) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.text.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    if let Some(max) = style.width {
        shrink_to_fit(&mut widths, headers, max);
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(header, *width, false))
        .collect::<Vec<_>>()
        .join("  ");
    let mut lines = vec![
        header_line.trim_end().to_string(),
        "-".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 2),
    ];

    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(index, width)| match row.get(index) {
                Some(cell) => {
                    let text = pad(&truncate(&cell.text, *width), *width, cell.numeric);
                    paint(&text, cell.tone, style)
                }
                None => pad("-", *width, false),
            })
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

fn shrink_to_fit(widths: &mut [usize], headers: &[&str], max: usize) {
    let gaps = widths.len().saturating_sub(1) * 2;
    while widths.iter().sum::<usize>() + gaps > max {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| **width > headers[*index].chars().count().max(4))
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index);
        match widest {
            Some(index) => widths[index] -= 1,
            None => break,
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.chars().count()));
    if right_align {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}
