//! Text normalization applied to extracted documents before chunking.

/// Light cleanup that keeps the document layout.
///
/// - CRLF / CR line endings become LF.
/// - NUL and other control characters (except `\n` and `\t`) are dropped.
/// - Trailing whitespace is trimmed on each line.
/// - Runs of blank lines collapse into a single blank line.
/// - Leading and trailing blank lines are removed.
pub fn normalize_document_text(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.lines() {
        let line: String = line
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        let line = line.trim_end();

        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }

        out.push_str(line);
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_runs_and_line_endings() {
        let raw = "\r\n\r\nTitle  \r\n\r\n\r\n\r\nBody\u{0}text\t \n\n";
        assert_eq!(normalize_document_text(raw), "Title\n\nBodytext");
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(normalize_document_text(" \n\t\n \r\n"), "");
    }
}
