//! Offline segmentation: one sentence per reconstructed line.

use super::{SentenceCandidate, SentenceSegmenter};
use crate::ocr::heuristics::SENTENCE_TERMINATORS;
use crate::ocr::OcrLine;
use unicode_segmentation::UnicodeSegmentation;

/// Common words a per-character boundary scan splits apart.
const COMMON_WORDS: &[&str] = &[
    "你好", "谢谢", "再见", "什么", "怎么", "为什么", "没有", "我们", "你们", "他们",
    "现在", "今天", "明天", "昨天", "中国", "可以", "知道", "喜欢", "对不起", "没关系",
    "不客气", "早上好", "晚安",
];

/// Longest entry in `COMMON_WORDS`, in scan units.
const MAX_WORD_UNITS: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSegmenter;

impl LocalSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceSegmenter for LocalSegmenter {
    async fn segment(&self, lines: &[OcrLine]) -> Vec<SentenceCandidate> {
        lines_as_sentences(lines)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}

/// Line passthrough. Line reconstruction already cuts at sentence punctuation.
pub fn lines_as_sentences(lines: &[OcrLine]) -> Vec<SentenceCandidate> {
    lines
        .iter()
        .filter(|line| !line.is_no_text())
        .filter_map(|line| {
            let text = line.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(SentenceCandidate {
                text: text.to_string(),
                bbox: line.bbox,
                tokens: line.words.clone(),
            })
        })
        .collect()
}

/// Word-boundary scan, then greedy longest-match re-merge against
/// `COMMON_WORDS`. Punctuation and whitespace are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let units: Vec<&str> = text.unicode_words().collect();
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let longest = (2..=MAX_WORD_UNITS.min(units.len() - i))
            .rev()
            .find(|&n| COMMON_WORDS.contains(&units[i..i + n].concat().as_str()));
        match longest {
            Some(n) => {
                out.push(units[i..i + n].concat());
                i += n;
            }
            None => {
                out.push(units[i].to_string());
                i += 1;
            }
        }
    }
    out
}

/// Split on `。！？`, keeping each terminator with its sentence. Empty
/// fragments are discarded.
pub fn split_on_terminators(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = SENTENCE_TERMINATORS.contains(&c)
            && !chars.peek().is_some_and(|next| SENTENCE_TERMINATORS.contains(next));
        if at_boundary {
            push_fragment(&mut out, &mut current);
        }
    }
    push_fragment(&mut out, &mut current);
    out
}

fn push_fragment(out: &mut Vec<String>, current: &mut String) {
    let fragment = std::mem::take(current);
    let trimmed = fragment.trim();
    // A run of bare terminators is not a sentence.
    if !trimmed.is_empty() && !trimmed.chars().all(|c| SENTENCE_TERMINATORS.contains(&c)) {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Rect, Token};

    #[test]
    fn tokenizer_merges_known_words() {
        assert_eq!(tokenize("你好，我们走吧"), vec!["你好", "我们", "走", "吧"]);
        assert_eq!(tokenize("对不起！"), vec!["对不起"]);
    }

    #[test]
    fn tokenizer_keeps_latin_words_whole() {
        assert_eq!(tokenize("我喜欢 Rust 语言"), vec!["我", "喜欢", "Rust", "语", "言"]);
    }

    #[test]
    fn terminator_split_discards_empties() {
        assert_eq!(split_on_terminators("你好。再见！"), vec!["你好。", "再见！"]);
        assert_eq!(split_on_terminators("真的吗？！好"), vec!["真的吗？！", "好"]);
        assert!(split_on_terminators("。。  ").is_empty());
        assert_eq!(split_on_terminators("没有标点"), vec!["没有标点"]);
    }

    #[tokio::test]
    async fn passthrough_skips_sentinel_and_keeps_order() {
        let mut first = OcrLine::new("你好。", Rect::new(0.0, 0.0, 40.0, 20.0));
        first.words.push(Token::new("你好。", first.bbox));
        let lines = vec![
            first,
            OcrLine::new("  再见  ", Rect::new(0.0, 40.0, 40.0, 60.0)),
            OcrLine::no_text(100.0, 100.0),
        ];
        let out = LocalSegmenter::new().segment(&lines).await;
        let texts: Vec<&str> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["你好。", "再见"]);
        assert_eq!(out[0].tokens.len(), 1);
        assert_eq!(out[1].bbox, Rect::new(0.0, 40.0, 40.0, 60.0));
    }
}
