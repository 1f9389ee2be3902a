/// Length of `line` in UTF-16 code units (what LSP `Position.character`
/// counts), ignoring a trailing `\n` or `\r\n`.
pub fn line_length(line: &str) -> u32 {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.chars().map(|ch| ch.len_utf16() as u32).sum()
}

/// Char index inside `line` for a UTF-16 column. Columns past the end clamp
/// to the line length.
pub fn char_offset(line: &str, column: usize) -> usize {
    let mut units = 0;
    let mut chars = 0;
    for ch in line.chars() {
        if units >= column {
            return chars;
        }
        units += ch.len_utf16();
        chars += 1;
    }
    chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_length_strips_terminators() {
        assert_eq!(line_length("abc\n"), 3);
        assert_eq!(line_length("abc\r\n"), 3);
        assert_eq!(line_length("abc"), 3);
        assert_eq!(line_length(""), 0);
    }

    #[test]
    fn test_line_length_counts_utf16_units() {
        // U+1F600 needs a surrogate pair.
        assert_eq!(line_length("a\u{1F600}b"), 4);
        assert_eq!(line_length("é"), 1);
    }

    #[test]
    fn test_char_offset_skips_surrogate_pairs() {
        assert_eq!(char_offset("a\u{1F600}b", 0), 0);
        assert_eq!(char_offset("a\u{1F600}b", 1), 1);
        assert_eq!(char_offset("a\u{1F600}b", 3), 2);
        assert_eq!(char_offset("abc", 10), 3);
    }
}
