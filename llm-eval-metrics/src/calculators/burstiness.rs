use statrs::statistics::Statistics;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const TRAILING_CLOSERS: [char; 5] = ['"', '\'', ')', ']', '\u{201D}'];

/// Coefficient of variation of words-per-sentence.
///
/// Returns 0 for texts with fewer than two sentences. Higher values mean more
/// uneven sentence lengths.
pub fn burstiness(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return 0.0;
    }

    let word_counts: Vec<f64> = sentences
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect();

    let mean = word_counts.iter().mean();
    if mean == 0.0 {
        return 0.0;
    }
    word_counts.iter().population_std_dev() / mean
}

/// Splits on `.`, `!` or `?` runs that are followed by whitespace or the end of
/// the text. Closing quotes and brackets stay with the sentence they close.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }
        while let Some(&(_, next)) = chars.peek() {
            if SENTENCE_TERMINATORS.contains(&next) || TRAILING_CLOSERS.contains(&next) {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}
