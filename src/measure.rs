use unicode_width::UnicodeWidthStr;

/// Terminal/editor display width of `text` (CJK counts as two cells).
pub fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Right-pad `text` with spaces to `width` display cells.
pub fn pad_right(text: &str, width: usize) -> String {
    let mut padded = String::from(text);
    let current = text_width(text);
    if current < width {
        padded.extend(std::iter::repeat_n(' ', width - current));
    }
    padded
}

/// Widest entry of `items`, in display cells.
pub fn max_width<'a>(items: impl IntoIterator<Item = &'a str>) -> usize {
    items.into_iter().map(text_width).max().unwrap_or(0)
}

/// Column widths for a text table: the widest cell of each column, header included.
pub fn column_widths(header: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let cells = rows.iter().filter_map(|r| r.get(i)).map(|s| s.as_str());
            text_width(h).max(max_width(cells))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_width() {
        assert_eq!(text_width("hello"), 5);
        assert_eq!(text_width("ユーザー"), 8);
    }

    #[test]
    fn test_pad_right() {
        assert_eq!(pad_right("id", 5), "id   ");
        assert_eq!(pad_right("名前", 6), "名前  ");
        assert_eq!(pad_right("toolong", 3), "toolong");
    }

    #[test]
    fn test_column_widths() {
        let rows = vec![
            vec!["id".to_string(), "uuid".to_string()],
            vec!["email".to_string(), "varchar(255)".to_string()],
        ];
        assert_eq!(column_widths(&["Name", "Type"], &rows), vec![5, 12]);
        assert_eq!(max_width(Vec::<&str>::new()), 0);
    }
}
