//! Text chunking and language heuristics shared by TTS and translation

/// Characters per minute of synthesized speech, used when probing fails
pub const SPEECH_CHARS_PER_MINUTE: u64 = 900;

/// Split `text` into chunks of at most `max_chars` at sentence boundaries
///
/// A sentence ends at `.`, `!`, `?` or a newline. A sentence longer than
/// `max_chars` is split between words, and a single word longer than that
/// is cut by characters, so no chunk ever exceeds the cap.
pub fn split_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '\n') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    let mut units = Vec::new();
    for sentence in sentences.iter().map(|s| s.trim()) {
        if sentence.chars().count() <= max_chars {
            units.push(sentence.to_string());
        } else {
            units.extend(split_words(sentence, max_chars));
        }
    }

    pack(units.iter().map(String::as_str), max_chars, " ")
}

/// Split `text` into chunks of at most `max_chars` at paragraph boundaries (`\n\n`)
///
/// Paragraphs longer than the cap (a subtitle transcript has none) are
/// split further with [`split_sentences`].
pub fn split_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut units = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim) {
        if paragraph.chars().count() <= max_chars {
            units.push(paragraph.to_string());
        } else {
            units.extend(split_sentences(paragraph, max_chars));
        }
    }

    pack(units.iter().map(String::as_str), max_chars, "\n\n")
}

/// Words of `sentence`, with words over `max_chars` cut into pieces
fn split_words(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for word in sentence.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        pieces.extend(chars.chunks(max_chars).map(|piece| piece.iter().collect::<String>()));
    }
    pieces
}

/// Greedily join non-empty `parts` with `sep` while staying under `max_chars`
fn pack<'a>(parts: impl Iterator<Item = &'a str>, max_chars: usize, sep: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let sep_len = sep.chars().count();

    for part in parts.filter(|p| !p.is_empty()) {
        let len = part.chars().count();
        if current_len > 0 && current_len + sep_len + len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str(sep);
            current_len += sep_len;
        }
        current.push_str(part);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Cheap language guess: `ru` when Cyrillic makes up over 30% of letters, else `en`
pub fn detect_language(text: &str) -> &'static str {
    let (mut cyrillic, mut latin) = (0usize, 0usize);
    for c in text.chars() {
        if ('\u{0400}'..='\u{04FF}').contains(&c) {
            cyrillic += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    let total = cyrillic + latin;
    if total > 0 && cyrillic * 10 > total * 3 {
        "ru"
    } else {
        "en"
    }
}

/// Rough spoken length of `text` in seconds
pub fn estimate_speech_secs(text: &str) -> u64 {
    text.chars().count() as u64 * 60 / SPEECH_CHARS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_sentences("  Hello there.  ", 100), vec!["Hello there."]);
        assert!(split_sentences("   ", 100).is_empty());
    }

    #[test]
    fn test_sentences_are_packed_under_limit() {
        let chunks = split_sentences("One two. Three four! Five six? Seven.", 20);
        assert_eq!(chunks, vec!["One two. Three four!", "Five six? Seven."]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_oversized_sentence_is_split_between_words() {
        let text = "Short. This sentence is far too long for the cap. End.";
        let chunks = split_sentences(text, 12);
        assert_eq!(
            chunks,
            vec!["Short. This", "sentence is", "far too long", "for the cap.", "End."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_overlong_word_is_cut() {
        let chunks = split_sentences("abcdefghij klm", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij", "klm"]);
    }

    #[test]
    fn test_limit_counts_chars_not_bytes() {
        let chunks = split_sentences("Привет мир. Как дела?", 12);
        assert_eq!(chunks, vec!["Привет мир.", "Как дела?"]);
    }

    #[test]
    fn test_paragraph_split_keeps_order() {
        let text = "aaaa aaaa\n\nbbbb\n\ncccc cccc cccc";
        let chunks = split_paragraphs(text, 16);
        assert_eq!(chunks, vec!["aaaa aaaa\n\nbbbb", "cccc cccc cccc"]);
    }

    #[test]
    fn test_single_long_paragraph_respects_cap() {
        // subtitle transcripts are one paragraph joined with spaces
        let transcript = "word word word. ".repeat(2000);
        let chunks = split_paragraphs(&transcript, 5000);

        assert!(chunks.len() >= 7, "got {} chunks", chunks.len());
        assert!(chunks.iter().all(|c| c.chars().count() <= 5000));
        let words: usize = chunks.iter().map(|c| c.split_whitespace().count()).sum();
        assert_eq!(words, 6000);
    }

    #[test]
    fn test_unpunctuated_paragraph_respects_cap() {
        let transcript = "no punctuation at all ".repeat(500);
        let chunks = split_paragraphs(&transcript, 300);
        assert!(chunks.iter().all(|c| c.chars().count() <= 300));
        assert_eq!(chunks.join(" ").split_whitespace().count(), 2000);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Hello, how are you?"), "en");
        assert_eq!(detect_language("Привет, как дела?"), "ru");
        assert_eq!(detect_language("Rust: язык"), "ru");
        assert_eq!(detect_language("Some English text with one слово"), "en");
        assert_eq!(detect_language("12345 !!!"), "en");
        assert_eq!(detect_language(""), "en");
    }

    #[test]
    fn test_estimate_speech_secs() {
        assert_eq!(estimate_speech_secs(&"a".repeat(900)), 60);
        assert_eq!(estimate_speech_secs(""), 0);
    }
}
