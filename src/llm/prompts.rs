//! Prompt constants: the contract between the decoder and the model.
//!
//! The streaming decoder relies on the exact output format requested
//! here (one single-line JSON object per input, in order). Change the
//! two together.

use crate::document::Script;

pub const TRANSLATION_TEMPERATURE: f32 = 0.3;
pub const SEGMENTATION_TEMPERATURE: f32 = 0.1;

/// Output budget: a fixed allowance plus a per-sentence share, capped.
pub fn translation_max_tokens(sentences: usize) -> u32 {
    120u32
        .saturating_mul(sentences as u32)
        .saturating_add(200)
        .min(4096)
}

pub fn segmentation_max_tokens(text_chars: usize) -> u32 {
    3u32
        .saturating_mul(text_chars as u32)
        .saturating_add(256)
        .min(4096)
}

pub const TRANSLATION_SYSTEM_PROMPT: &str = r#"You are a Chinese language assistant. The user sends numbered lines of Chinese text.

For EVERY input line, in the same order, output exactly one JSON object on a single line:
{"pinyin": "<pinyin with tone marks, syllables separated by single spaces>", "english": "<natural English translation>"}

Rules:
1. Exactly one JSON object per input line, one object per output line (JSON Lines).
2. Keep the input order. Never skip, merge or split lines.
3. Do not echo the line numbers or the Chinese text.
4. No surrounding array brackets, no markdown, no commentary, no blank lines.
5. Punctuation is not transcribed in pinyin.
6. If a line is not Chinese, put its original text in "pinyin" and translate it if needed."#;

pub const SEGMENTATION_SYSTEM_PROMPT: &str = r#"You split OCR text into sentences. The text was recognized from an image and may contain line breaks in the middle of sentences or several sentences on one line.

Return ONLY a JSON array of strings, one string per sentence, in reading order.
Do not translate, correct or rephrase anything. Keep every character of the original text, except that line breaks inside a sentence are removed.
No markdown, no commentary."#;

/// Numbered user message for a translation batch.
pub fn build_translation_message(texts: &[String], script: Script) -> String {
    let script_note = match script {
        Script::Simplified => "simplified",
        Script::Traditional => "traditional",
    };
    let mut message = format!(
        "Translate these {} lines ({} Chinese). Output {} JSON lines.\n\n",
        texts.len(),
        script_note,
        texts.len()
    );
    for (i, text) in texts.iter().enumerate() {
        // Embedded newlines would break the one-line-per-input numbering.
        let flat = text.replace(['\n', '\r'], " ");
        message.push_str(&format!("{}. {}\n", i + 1, flat.trim()));
    }
    message
}

pub fn build_segmentation_message(text: &str) -> String {
    format!("<ocr_text>\n{}\n</ocr_text>", text)
}
