//! Spoken-duration estimate used to end talking mode automatically.

use std::time::Duration;

const WORDS_PER_SECOND: f64 = 2.5;
const PAUSE_PER_SENTENCE_MS: u64 = 600;
const MIN_TALK_MS: u64 = 1_500;
const MAX_TALK_MS: u64 = 30_000;

/// Estimate how long the agent needs to say `text`.
///
/// Word count at 2.5 words/s plus 600 ms per sentence end, clamped to
/// [1.5 s, 30 s]. A run of terminal punctuation (`?!`, `...`) is one pause.
pub fn estimate_talk_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count() as f64;
    let speaking_ms = (words / WORDS_PER_SECOND * 1000.0).round() as u64;
    let pause_ms = sentence_ends(text) as u64 * PAUSE_PER_SENTENCE_MS;

    Duration::from_millis((speaking_ms + pause_ms).clamp(MIN_TALK_MS, MAX_TALK_MS))
}

fn sentence_ends(text: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;
    for c in text.chars() {
        let terminal = matches!(c, '.' | '!' | '?');
        if terminal && !in_run {
            count += 1;
        }
        in_run = terminal;
    }
    count
}
