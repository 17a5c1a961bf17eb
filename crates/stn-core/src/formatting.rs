//! Formatting utilities (Telegram MarkdownV2 / HTML escaping).

/// Reserved punctuation escaped for delivered Markdown messages.
///
/// `*` and `` ` `` are left alone so senders keep bold and code spans, and
/// `\` is not in the set, so escaped output never gains extra backslashes.
pub const MARKDOWN_V2_RESERVED: [char; 16] = [
    '_', '[', ']', '(', ')', '~', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape delivered text for MarkdownV2 by backslash-prefixing each reserved character.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape arbitrary text (chat titles, names) embedded in our own MarkdownV2 replies.
///
/// Unlike [`escape_markdown_v2`] this covers every character Telegram treats specially.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if c == '\\' || c == '*' || c == '`' || MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inline code span for MarkdownV2; only `` ` `` and `\` need escaping inside.
pub fn code_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('`');
    for c in text.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
    out
}
