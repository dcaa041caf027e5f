//! Whitespace and markup normalization for raw input text.
//!
//! [`normalize`] produces the canonical form everything downstream consumes:
//! the fingerprint is computed from it, the strategy selector measures it,
//! and the prompt embeds it. Pure and total — malformed markup never fails,
//! it degrades to keeping the text as-is.

/// Clean raw input text into its canonical normalized form.
///
/// - strips HTML-style tags (unclosed tags are kept as literal text rather
///   than dropping content)
/// - decodes the common HTML entities
/// - strips markdown structure: heading hashes, blockquote markers, bullet
///   markers, code-fence delimiter lines, emphasis/backtick characters, and
///   link syntax (keeping the link text)
/// - collapses runs of spaces and tabs to a single space
/// - collapses 3+ consecutive line breaks to exactly 2
/// - trims every line and the whole string
pub fn normalize(raw: &str) -> String {
    let text = strip_tags(raw);
    let text = decode_entities(&text);
    let text = strip_markdown(&text);
    collapse_whitespace(&text)
}

/// Remove `<tag>` spans. A `<` that doesn't open a plausible tag, or a tag
/// that never closes, is kept as literal text so nothing semantic is lost.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        let Some(pos) = rest.find('<') else {
            out.push_str(rest);
            break;
        };
        let (before, from_lt) = rest.split_at(pos);
        out.push_str(before);
        let after_lt = from_lt.strip_prefix('<').unwrap_or(from_lt);
        let plausible = after_lt
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        if plausible && let Some(end) = after_lt.find('>') {
            // Tags separate words in rendered text; keep that separation.
            out.push(' ');
            let (_, after_tag) = after_lt.split_at(end);
            rest = after_tag.strip_prefix('>').unwrap_or(after_tag);
        } else {
            out.push('<');
            rest = after_lt;
        }
    }
    out
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// If `line` is a markdown heading (`#` through `######` plus a space),
/// return the heading text.
fn heading_text(line: &str) -> Option<&str> {
    let body = line.trim_start_matches('#');
    let hashes = line.len() - body.len();
    if (1..=6).contains(&hashes) {
        body.strip_prefix(' ')
    } else {
        None
    }
}

/// Strip markdown line structure, keeping the semantic text on each line.
fn strip_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Code-fence delimiter lines carry no content; the fenced code
        // itself survives as ordinary lines.
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            out.push('\n');
            continue;
        }

        let mut body = trimmed;
        if let Some(heading) = heading_text(body) {
            body = heading;
        }
        while let Some(quoted) = body.strip_prefix('>') {
            body = quoted.trim_start();
        }
        for marker in ["- ", "* ", "+ "] {
            if let Some(item) = body.strip_prefix(marker) {
                body = item;
                break;
            }
        }

        let linkless = strip_links(body);
        for ch in linkless.chars() {
            if ch != '*' && ch != '`' {
                out.push(ch);
            }
        }
        out.push('\n');
    }
    out
}

/// Replace `[text](url)` and `![alt](url)` spans with their text. Brackets
/// that are not link syntax are kept verbatim.
fn strip_links(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('[') {
        let (before, from_bracket) = rest.split_at(start);
        out.push_str(before);
        let inner = from_bracket.strip_prefix('[').unwrap_or(from_bracket);

        let link = inner.find(']').and_then(|close| {
            let (text, after) = inner.split_at(close);
            let after = after.strip_prefix(']')?;
            let url_rest = after.strip_prefix('(')?;
            let url_end = url_rest.find(')')?;
            let (_, after_url) = url_rest.split_at(url_end);
            Some((text, after_url.strip_prefix(')').unwrap_or(after_url)))
        });

        match link {
            Some((text, after_url)) => {
                // Drop the image bang that precedes `![alt](url)`.
                if out.ends_with('!') {
                    out.pop();
                }
                out.push_str(text);
                rest = after_url;
            }
            None => {
                out.push('[');
                rest = inner;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse horizontal whitespace runs, trim lines, and limit vertical
/// whitespace to a single blank line.
fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_blank = false;
    for line in input.lines() {
        let mut collapsed = String::with_capacity(line.len());
        let mut prev_space = false;
        for ch in line.chars() {
            if ch == ' ' || ch == '\t' {
                if !prev_space {
                    collapsed.push(' ');
                }
                prev_space = true;
            } else {
                collapsed.push(ch);
                prev_space = false;
            }
        }
        let trimmed = collapsed.trim();
        if trimmed.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(trimmed);
    }
    out
}
