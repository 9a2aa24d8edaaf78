use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parser::html::strip_tags;

/// 明显带有 AI 腔的措辞
pub const CLICHE_PHRASES: &[&str] = &[
    "elevate",
    "unleash",
    "delve",
    "unlock",
    "harness",
    "in conclusion",
    "furthermore",
    "moreover",
    "consequently",
    "significantly",
    "meticulously",
    "crafted",
    "engineered",
];

const MAX_WORDS_BETWEEN_HEADINGS: usize = 200;

/// 描述性质量信号，不作为拒绝条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub no_ai_phrases: bool,
    pub varied_sentence_length: bool,
    pub specific_examples: bool,
    pub conversational_tone: bool,
    pub benefit_focused_headings: bool,
    pub proper_heading_spacing: bool,
}

impl QualityFlags {
    pub fn evaluate(title: &str, content_html: &str) -> Self {
        let lower = content_html.to_lowercase();
        let text = strip_tags(&lower);

        let found_phrase = CLICHE_PHRASES.iter().find(|p| lower.contains(*p));
        if let Some(phrase) = found_phrase {
            warn!("发现 AI 腔措辞: \"{}\"", phrase);
        }
        if title.contains(':') {
            warn!("标题使用了 \":\" 而不是 \"-\": {}", title);
        }

        Self {
            no_ai_phrases: found_phrase.is_none(),
            varied_sentence_length: has_varied_sentences(&text),
            specific_examples: text.chars().any(|c| c.is_ascii_digit()),
            conversational_tone: is_conversational(&text),
            benefit_focused_headings: !title.contains(':') && !has_descriptive_headings(&lower),
            proper_heading_spacing: heading_gaps_within(&lower, MAX_WORDS_BETWEEN_HEADINGS),
        }
    }
}

fn sentence_lengths(text: &str) -> Vec<usize> {
    text.split(['.', '!', '?'])
        .map(|s| s.split_whitespace().count())
        .filter(|&n| n > 0)
        .collect()
}

/// 不允许连续三句长度几乎相同（相差不超过 1 个词）
fn has_varied_sentences(text: &str) -> bool {
    sentence_lengths(text).windows(3).all(|w| {
        let max = w.iter().max().copied().unwrap_or(0);
        let min = w.iter().min().copied().unwrap_or(0);
        max - min > 1
    })
}

fn is_conversational(text: &str) -> bool {
    let has_contraction = ["'s ", "'re ", "n't ", "'ll ", "'ve ", "’s ", "n’t "]
        .iter()
        .any(|c| text.contains(c));
    let addresses_reader = text.split_whitespace().any(|w| w == "you" || w == "your");
    has_contraction || addresses_reader
}

fn has_descriptive_headings(lower_html: &str) -> bool {
    ["<h2>what is ", "<h2>introduction", "<h2>conclusion", "<h3>what is "]
        .iter()
        .any(|h| lower_html.contains(h))
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<h[1-6]\b[^>]*>.*?</h[1-6]>").unwrap())
}

/// 任意两个标题之间（含首个标题之前）的正文词数不超过上限
fn heading_gaps_within(html: &str, max_words: usize) -> bool {
    heading_pattern()
        .split(html)
        .all(|segment| strip_tags(segment).split_whitespace().count() <= max_words)
}
