//! Context block assembly with a character budget.

use rag_store::RagHit;

/// Visible separator between chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Joins hit texts in rank order.
///
/// Whole chunks are added while they fit in `max_chars` (separators count).
/// The first chunk that does not fit is cut at a char boundary and assembly
/// stops there. Blank texts are skipped. `max_chars == 0` means no cap.
///
/// # Example
/// ```
/// # use contextor::assembler::assemble_context;
/// let ctx = assemble_context(&[], 100);
/// assert!(ctx.is_empty());
/// ```
pub fn assemble_context(hits: &[RagHit], max_chars: usize) -> String {
    let sep_len = CONTEXT_SEPARATOR.chars().count();
    let mut out = String::new();
    let mut used = 0usize;

    for text in hits.iter().map(|h| h.text.trim()).filter(|t| !t.is_empty()) {
        let sep = if out.is_empty() { 0 } else { sep_len };
        let len = text.chars().count();

        if max_chars == 0 || used + sep + len <= max_chars {
            if sep > 0 {
                out.push_str(CONTEXT_SEPARATOR);
            }
            out.push_str(text);
            used += sep + len;
            continue;
        }

        let room = max_chars.saturating_sub(used + sep);
        if room > 0 {
            if sep > 0 {
                out.push_str(CONTEXT_SEPARATOR);
            }
            out.push_str(take_chars(text, room));
        }
        break;
    }
    out
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(score: f32, text: &str) -> RagHit {
        RagHit::from_payload(score, json!({ "text": text, "source": "doc.pdf" }))
    }

    #[test]
    fn keeps_rank_order_and_separator() {
        let hits = [hit(0.9, "first"), hit(0.5, "second"), hit(0.1, "third")];
        assert_eq!(
            assemble_context(&hits, 0),
            "first\n\n---\n\nsecond\n\n---\n\nthird"
        );

        let reordered = [hit(0.9, "third"), hit(0.5, "first"), hit(0.1, "second")];
        assert_eq!(
            assemble_context(&reordered, 0),
            "third\n\n---\n\nfirst\n\n---\n\nsecond"
        );
    }

    #[test]
    fn is_pure() {
        let hits = [hit(0.9, "a heap"), hit(0.8, "a stack")];
        assert_eq!(assemble_context(&hits, 50), assemble_context(&hits, 50));
    }

    #[test]
    fn skips_blank_chunks() {
        let hits = [hit(0.9, "  "), hit(0.8, "tree"), hit(0.7, "")];
        assert_eq!(assemble_context(&hits, 100), "tree");
    }

    #[test]
    fn budget_cuts_the_first_chunk_that_does_not_fit() {
        let hits = [hit(0.9, "0123456789"), hit(0.8, "abcdefghij"), hit(0.7, "never")];
        // 10 + 7 (separator) + 3 = 20
        let ctx = assemble_context(&hits, 20);
        assert_eq!(ctx, "0123456789\n\n---\n\nabc");
        assert_eq!(ctx.chars().count(), 20);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let hits = [hit(0.9, "ёжик в тумане")];
        assert_eq!(assemble_context(&hits, 4), "ёжик");
    }

    #[test]
    fn no_hits_means_empty_context() {
        assert_eq!(assemble_context(&[], 16_000), "");
    }
}
