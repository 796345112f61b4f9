//! Recursive character splitter.
//!
//! Splits on the coarsest separator present in the text (`"\n\n"`, then
//! `"\n"`, then `" "`, then single characters), recursing into pieces that are
//! still too long, and merges small pieces back into windows of at most
//! `chunk_size` characters that overlap by up to `chunk_overlap` characters.
//! Lengths are counted in Unicode scalar values.

use crate::errors::RagError;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Clone, Debug)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// # Errors
    /// [`RagError::Config`] when `chunk_size == 0` or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Splits `text` into trimmed, non-empty chunks in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut rest: &[String] = &[];
        for (i, s) in separators.iter().enumerate() {
            if s.is_empty() {
                separator = "";
                break;
            }
            if text.contains(s.as_str()) {
                separator = s;
                rest = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut out = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                out.extend(self.merge(&good, separator));
                good.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                out.extend(self.split_with(piece, rest));
            }
        }
        if !good.is_empty() {
            out.extend(self.merge(&good, separator));
        }
        out
    }

    /// Greedily packs pieces into windows, keeping a tail of up to
    /// `chunk_overlap` characters as the start of the next window.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined = |cur: &std::collections::VecDeque<&str>| if cur.is_empty() { 0 } else { sep_len };

            if total + len + joined(&current) > self.chunk_size {
                if !current.is_empty() {
                    if let Some(doc) = join(&current, separator) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (total + len + joined(&current) > self.chunk_size && total > 0)
                    {
                        let Some(first) = current.pop_front() else { break };
                        total -= char_len(first) + if current.is_empty() { 0 } else { sep_len };
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn join(parts: &std::collections::VecDeque<&str>, separator: &str) -> Option<String> {
    let s = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
