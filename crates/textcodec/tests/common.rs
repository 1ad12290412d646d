#![allow(dead_code)]

use std::io;

use textcodec::TextSource;

/// Feeds its payload in predetermined chunks, to exercise decoding the way
/// a slow or adversarially partitioned stream would.
pub struct ChunkSource {
    chunks: Vec<String>,
    next: usize,
}

impl ChunkSource {
    /// Splits `text` into UTF-8-safe chunks with sizes derived from
    /// `splits`; leftover text becomes one final chunk.
    pub fn new(text: &str, splits: &[usize]) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut idx = 0;
        let mut remaining = chars.len();
        for split in splits {
            if remaining == 0 {
                break;
            }
            let size = 1 + (split % remaining);
            chunks.push(chars[idx..idx + size].iter().collect());
            idx += size;
            remaining -= size;
        }
        if remaining > 0 {
            chunks.push(chars[idx..].iter().collect());
        }
        Self { chunks, next: 0 }
    }

    /// One character per pull.
    pub fn trickle(text: &str) -> Self {
        Self {
            chunks: text.chars().map(String::from).collect(),
            next: 0,
        }
    }
}

impl TextSource for ChunkSource {
    fn pull(&mut self, out: &mut String) -> io::Result<usize> {
        let Some(chunk) = self.chunks.get(self.next) else {
            return Ok(0);
        };
        self.next += 1;
        out.push_str(chunk);
        Ok(chunk.len())
    }
}
