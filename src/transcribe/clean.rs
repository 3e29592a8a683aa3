//! Post-processing filter for engine output.
//!
//! Whisper hallucinates on silence and background chatter: runaway word
//! loops, punctuation-only lines, single syllables repeated for minutes.
//! This pass strips those artifacts before the text is persisted.

use regex::Regex;
use std::sync::OnceLock;

static DOTS_ONLY: OnceLock<Regex> = OnceLock::new();
static SYMBOLS_ONLY: OnceLock<Regex> = OnceLock::new();
static TOKENS: OnceLock<Regex> = OnceLock::new();

/// Clean a raw transcript: normalize newlines, collapse runaway
/// repetitions, drop noise-only lines and cap blank-line runs.
pub fn clean_transcript(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let raw = line.trim();
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }

        if is_noise_line(raw) {
            continue;
        }
        lines.push(collapse_repetitions(raw));
    }

    // Allow at most two consecutive blank lines
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut blanks = 0;
    for line in lines {
        if line.is_empty() {
            blanks += 1;
            if blanks > 2 {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push(line);
    }

    out.join("\n").trim().to_string()
}

/// Collapse a word or a 2-5 word phrase repeated five or more times in a
/// row down to a single occurrence.
fn collapse_repetitions(line: &str) -> String {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < 5 {
        return words.join(" ");
    }
    let words = collapse_word_runs(words);
    let words = collapse_phrase_runs(words);
    words.join(" ")
}

fn collapse_word_runs(words: Vec<&str>) -> Vec<&str> {
    let mut out = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let mut run = 1;
        while i + run < words.len() && same_word(words[i + run], words[i]) {
            run += 1;
        }
        if run >= 5 {
            out.push(words[i]);
        } else {
            out.extend_from_slice(&words[i..i + run]);
        }
        i += run;
    }
    out
}

fn collapse_phrase_runs(mut words: Vec<&str>) -> Vec<&str> {
    for len in 2..=5 {
        let mut out: Vec<&str> = Vec::with_capacity(words.len());
        let mut i = 0;
        while i < words.len() {
            if i + len <= words.len() {
                let mut repeats = 1;
                while i + (repeats + 1) * len <= words.len()
                    && phrase_eq(
                        &words[i..i + len],
                        &words[i + repeats * len..i + (repeats + 1) * len],
                    )
                {
                    repeats += 1;
                }
                if repeats >= 5 {
                    out.extend_from_slice(&words[i..i + len]);
                    i += repeats * len;
                    continue;
                }
            }
            out.push(words[i]);
            i += 1;
        }
        words = out;
    }
    words
}

fn same_word(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn phrase_eq(a: &[&str], b: &[&str]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| same_word(x, y))
}

/// Whether a non-empty line is hallucination noise rather than speech.
fn is_noise_line(line: &str) -> bool {
    let dots_only = DOTS_ONLY.get_or_init(|| Regex::new(r"^[.\s…]+$").unwrap());
    let symbols_only = SYMBOLS_ONLY.get_or_init(|| Regex::new(r"^\W+$").unwrap());
    let token_re = TOKENS.get_or_init(|| Regex::new(r"\p{L}+").unwrap());

    if dots_only.is_match(line) || symbols_only.is_match(line) {
        return true;
    }

    let lowered = line.to_lowercase();
    let tokens: Vec<&str> = token_re.find_iter(&lowered).map(|m| m.as_str()).collect();

    // One syllable stuttered across the whole line
    if tokens.len() >= 2 && tokens.iter().all(|t| *t == tokens[0]) {
        return true;
    }

    // Any single character held for five or more positions
    let mut prev = None;
    let mut run = 0;
    for ch in line.chars() {
        if Some(ch) == prev {
            run += 1;
            if run >= 5 {
                return true;
            }
        } else {
            prev = Some(ch);
            run = 1;
        }
    }

    // A short filler word repeated five or more times in a row
    let mut run = 1;
    for pair in tokens.windows(2) {
        if pair[0] == pair[1] && pair[0].chars().count() <= 3 {
            run += 1;
            if run >= 5 {
                return true;
            }
        } else {
            run = 1;
        }
    }

    // Mostly punctuation with a stray letter or two
    let total = line.chars().count();
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    letters > 0 && (letters as f32 / total.max(1) as f32) < 0.25
}
