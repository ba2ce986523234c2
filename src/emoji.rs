//! Static glyph table for the emoji span markup embedded in text events.
//!
//! The remote side encodes emoji as `<span class="emoji emoji<id>"></span>`
//! where `<id>` is a hex code from a fixed table. Unknown ids are dropped to
//! the empty string rather than left as raw markup.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref EMOJI_TABLE: HashMap<&'static str, &'static str> = {
        let mut table = HashMap::new();
        for line in include_str!("emoji.txt").lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((code, glyph)) = line.split_once(',') {
                table.insert(code, glyph);
            }
        }
        table
    };
    static ref EMOJI_SPAN: Regex =
        Regex::new(r#"<span class="emoji emoji([a-zA-Z0-9]+)"></span>"#).unwrap();
}

/// Replace every emoji span in `text` with its unicode glyph.
pub fn replace_emoji(text: &str) -> String {
    EMOJI_SPAN
        .replace_all(text, |caps: &Captures| {
            EMOJI_TABLE
                .get(&caps[1])
                .copied()
                .unwrap_or_default()
                .to_string()
        })
        .into_owned()
}
