//! Row and cell formatting shared by the report sections.

/// One report line; cells are pre-padded text.
pub type ReportRow = Vec<String>;

/// Ordered report rows. Insertion order is output order.
pub type Report = Vec<ReportRow>;

pub const LINE_WIDTH: usize = 14;
pub const RAM_WIDTH: usize = 16;
pub const PID_WIDTH: usize = 5;
pub const NAME_WIDTH: usize = 20;
pub const KB_WIDTH: usize = 12;
pub const NAME_AND_PID_WIDTH: usize = 30;

pub const KB_UNIT: &str = " kB";
pub const BLANK: char = ' ';
pub const SEPARATOR: char = '-';

/// Text alignment inside a padded cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Pads `text` with `fill` to `width` characters. Longer text is kept whole.
pub fn set_width(text: &str, width: usize, fill: char, align: Align) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let padding: String = std::iter::repeat(fill).take(width - len).collect();
    match align {
        Align::Left => format!("{text}{padding}"),
        Align::Right => format!("{padding}{text}"),
    }
}

/// Right-aligned, blank-padded cell.
pub fn right(text: &str, width: usize) -> String {
    set_width(text, width, BLANK, Align::Right)
}

/// Left-aligned, blank-padded cell.
pub fn left(text: &str, width: usize) -> String {
    set_width(text, width, BLANK, Align::Left)
}

/// Separator cell of `width` dashes.
pub fn separator(width: usize) -> String {
    set_width("", width, SEPARATOR, Align::Right)
}

/// `value` followed by the kilobyte unit.
pub fn add_kb_unit(value: u64) -> String {
    format!("{value}{KB_UNIT}")
}

/// Single-cell row.
pub fn title_row(title: impl Into<String>) -> ReportRow {
    vec![title.into()]
}

/// Blank line between sections.
pub fn blank_row() -> ReportRow {
    vec!["\n".to_string()]
}

/// Returns true for rows produced by [`blank_row`].
pub fn is_blank_row(row: &[String]) -> bool {
    row.len() == 1 && row[0] == "\n"
}
