use crate::models::Chunk;
use regex::Regex;
use tracing::warn;

const SENTENCE_BOUNDARY: &str = r#"[.!?]["')\]]*\s+"#;

/// Splits `text` into sentence-respecting chunks of at most `max_chars`
/// characters. A single sentence longer than `max_chars` is kept whole, so
/// chunk length may exceed the bound in that one case. Empty or
/// whitespace-only input yields no chunks.
pub fn chunk(text: &str, max_chars: usize) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let pieces = match split_sentences(text) {
        Ok(sentences) => accumulate_sentences(sentences, max_chars),
        Err(error) => {
            warn!(%error, "sentence segmentation failed, slicing fixed-width windows");
            slice_fixed_width(text, max_chars)
        }
    };

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Sentence boundaries are terminal punctuation, optionally followed by a
/// closing quote or bracket, then whitespace. The trailing unterminated run
/// counts as a sentence of its own.
fn split_sentences(text: &str) -> Result<Vec<String>, regex::Error> {
    let boundary = Regex::new(SENTENCE_BOUNDARY)?;

    let mut sentences = Vec::new();
    let mut start = 0;

    for found in boundary.find_iter(text) {
        let sentence = text[start..found.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = found.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    Ok(sentences)
}

fn accumulate_sentences(sentences: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        let appended = if current.is_empty() {
            char_count(&sentence)
        } else {
            char_count(&current) + 1 + char_count(&sentence)
        };

        if appended > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current = sentence;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn slice_fixed_width(text: &str, max_chars: usize) -> Vec<String> {
    let window = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + window).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        start = end;
    }

    pieces
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_document_becomes_a_single_chunk() {
        let text = "First sentence. Second sentence. Third sentence.";
        let chunks = chunk(text, 10_000);

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text,
            "First sentence. Second sentence. Third sentence."
        );
    }

    #[test]
    fn buffer_flushes_before_exceeding_the_bound() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let chunks = chunk(text, 40);

        assert!(chunks.len() > 1);
        for piece in &chunks {
            assert!(piece.text.chars().count() <= 40, "chunk too long: {}", piece.text);
        }
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let long = "a".repeat(80);
        let text = format!("Short one. {long}. Short two.");
        let chunks = chunk(&text, 30);

        assert!(chunks.iter().any(|piece| piece.text.chars().count() > 30));
        assert!(chunks.iter().any(|piece| piece.text.contains(&long)));
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        assert!(chunk("", 100).is_empty());
        assert!(chunk("   \n\t  ", 100).is_empty());
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let text = "One. Two. Three. Four. Five. Six. Seven. Eight.";
        let chunks = chunk(text, 12);

        for (expected, piece) in chunks.iter().enumerate() {
            assert_eq!(piece.index, expected);
        }
    }

    #[test]
    fn content_survives_chunking_modulo_whitespace() {
        let text = "The pump was inspected. The seal had worn through! Replacement was scheduled?  Done.";
        let chunks = chunk(text, 35);

        let rebuilt = chunks
            .iter()
            .map(|piece| piece.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let normalize = |value: &str| value.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rebuilt), normalize(text));
    }

    #[test]
    fn fixed_width_slicing_covers_the_whole_text() {
        let text = "abcdefghij";
        let pieces = slice_fixed_width(text, 4);

        assert_eq!(pieces, vec!["abcd", "efgh", "ij"]);
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn sentence_split_respects_closing_quotes() {
        let sentences = split_sentences("He said \"stop.\" Then he left.").unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "He said \"stop.\"");
        assert_eq!(sentences[1], "Then he left.");
    }
}
