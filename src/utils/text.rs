//! Numbered-line rendering for file reads and literal-replacement edits.

/// Returned verbatim when a file exists but holds no content.
pub const EMPTY_FILE_REMINDER: &str = "System reminder: File exists but has empty contents";

/// Lines longer than this many characters are split into numbered chunks.
pub const LINE_CHUNK_SIZE: usize = 2000;

/// Render `lines[offset..offset + limit]` with right-aligned line numbers
/// (width 6, tab-separated). `offset` is 0-based; displayed numbers start at
/// `offset + 1`. Over-long lines split into chunks numbered `N.1`, `N.2`, …
///
/// A wholly empty file renders as [EMPTY_FILE_REMINDER]; an offset at or
/// past the end of the file is an error string.
pub fn render_numbered(lines: &[String], offset: usize, limit: usize) -> Result<String, String> {
    if lines.is_empty() || (lines.len() == 1 && lines[0].is_empty()) {
        return Ok(EMPTY_FILE_REMINDER.to_string());
    }
    if offset >= lines.len() {
        return Err(format!(
            "Error: Line offset {} exceeds file length ({} lines)",
            offset,
            lines.len()
        ));
    }
    let end = if limit == 0 {
        lines.len()
    } else {
        (offset + limit).min(lines.len())
    };
    let mut out = Vec::new();
    for (i, line) in lines[offset..end].iter().enumerate() {
        let number = offset + i + 1;
        let chunks = chunk_line(line);
        if chunks.len() == 1 {
            out.push(format!("{:>6}\t{}", number, chunks[0]));
        } else {
            for (j, chunk) in chunks.iter().enumerate() {
                out.push(format!("{:>6}\t{}", format!("{}.{}", number, j + 1), chunk));
            }
        }
    }
    Ok(out.join("\n"))
}

fn chunk_line(line: &str) -> Vec<&str> {
    if line.chars().count() <= LINE_CHUNK_SIZE {
        return vec![line];
    }
    let mut chunks = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let split_at = rest
            .char_indices()
            .nth(LINE_CHUNK_SIZE)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split_at);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// Literal (non-regex) replacement of `old` with `new` inside `text`.
///
/// With `replace_all` false the match must be unique; the error names the
/// actual occurrence count so the model can disambiguate or opt in.
pub fn replace_occurrences(
    text: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<(String, u32), String> {
    if old.is_empty() {
        return Err("Error: old_string cannot be empty".to_string());
    }
    let count = text.matches(old).count();
    if count == 0 {
        return Err(format!("Error: String not found in file: '{}'", old));
    }
    if !replace_all && count > 1 {
        return Err(format!(
            "Error: String '{}' appears {} times in the file. Provide a larger unique context or set replace_all to true.",
            old, count
        ));
    }
    let replaced = if replace_all {
        text.replace(old, new)
    } else {
        text.replacen(old, new, 1)
    };
    let applied = if replace_all { count as u32 } else { 1 };
    Ok((replaced, applied))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_numbered_basic() {
        let out = render_numbered(&lines(&["alpha", "beta"]), 0, 0).unwrap();
        assert_eq!(out, "     1\talpha\n     2\tbeta");
    }

    #[test]
    fn test_render_numbered_offset_and_limit() {
        let out = render_numbered(&lines(&["a", "b", "c", "d"]), 1, 2).unwrap();
        assert_eq!(out, "     2\tb\n     3\tc");
    }

    #[test]
    fn test_render_numbered_empty_file() {
        assert_eq!(
            render_numbered(&lines(&[""]), 0, 0).unwrap(),
            EMPTY_FILE_REMINDER
        );
    }

    #[test]
    fn test_render_numbered_offset_past_end() {
        let err = render_numbered(&lines(&["a"]), 5, 0).unwrap_err();
        assert!(err.contains("offset 5"));
    }

    #[test]
    fn test_render_numbered_splits_long_lines() {
        let long = "x".repeat(LINE_CHUNK_SIZE + 10);
        let out = render_numbered(&lines(&[&long]), 0, 0).unwrap();
        assert!(out.contains("   1.1\t"));
        assert!(out.contains("   1.2\t"));
    }

    #[test]
    fn test_replace_occurrences_unique() {
        let (out, n) = replace_occurrences("a b a", "b", "c", false).unwrap();
        assert_eq!(out, "a c a");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_replace_occurrences_ambiguous() {
        let err = replace_occurrences("a b a", "a", "c", false).unwrap_err();
        assert!(err.contains("appears 2 times"));
    }

    #[test]
    fn test_replace_occurrences_all() {
        let (out, n) = replace_occurrences("a b a", "a", "c", true).unwrap();
        assert_eq!(out, "c b c");
        assert_eq!(n, 2);
    }

    #[test]
    fn test_replace_occurrences_missing() {
        assert!(replace_occurrences("a", "z", "c", false).is_err());
    }
}
