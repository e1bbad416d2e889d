//! Parser for ffmpeg's `ffmetadata` text format
//!
//! Only the global section (before the first `[SECTION]` header) is read.
//! Backslash escapes `=`, `;`, `#`, `\` and newlines.

use std::collections::BTreeMap;

pub fn parse_global_tags(text: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    let mut pending = String::new();

    for raw in text.lines() {
        if pending.is_empty() {
            let trimmed = raw.trim_start();
            if trimmed.starts_with('[') {
                break;
            }
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
        }

        // A trailing unescaped backslash continues the entry on the next line.
        if ends_with_escape(raw) {
            pending.push_str(&raw[..raw.len() - 1]);
            pending.push('\n');
            continue;
        }
        pending.push_str(raw);

        if let Some((key, value)) = split_entry(&pending) {
            if !key.is_empty() {
                tags.insert(key, value);
            }
        }
        pending.clear();
    }

    tags
}

fn ends_with_escape(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_entry(entry: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = entry.chars();

    while let Some(c) = chars.next() {
        let target = if in_value { &mut value } else { &mut key };
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    target.push(escaped);
                }
            }
            '=' if !in_value => in_value = true,
            _ => target.push(c),
        }
    }

    in_value.then_some((key, value))
}
