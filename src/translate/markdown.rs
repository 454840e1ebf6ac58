/// Rewrite common GitHub-flavored markdown into the subset chat transports
/// render: headers and `**bold**` become `*bold*`, links become `text (url)`,
/// blockquotes get a `│ ` gutter and `-`/`*` list items become `•` bullets.
pub fn sanitize_markdown(text: &str) -> String {
    text.split('\n')
        .map(sanitize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_line(line: &str) -> String {
    let line = match header_text(line) {
        Some(title) => format!("*{title}*"),
        None => line.to_string(),
    };
    let line = collapse_double_bold(&line);
    let line = flatten_links(&line);
    let line = match line.strip_prefix('>') {
        Some(quoted) => {
            let quoted = quoted
                .strip_prefix(|ch: char| ch.is_whitespace())
                .unwrap_or(quoted);
            format!("│ {quoted}")
        }
        None => line,
    };
    bulletize(&line)
}

fn header_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|ch| *ch == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let title = rest.trim_start();
    if title.len() == rest.len() || title.is_empty() {
        return None;
    }
    Some(title)
}

fn collapse_double_bold(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let close = after_open
            .char_indices()
            .skip(1)
            .find(|(idx, _)| after_open[*idx..].starts_with("**"))
            .map(|(idx, _)| idx);
        let Some(close) = close else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push('*');
        out.push_str(&after_open[..close]);
        out.push('*');
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);
    out
}

fn flatten_links(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        let Some(open) = rest.find('[') else {
            break;
        };
        let candidate = &rest[open + 1..];
        let parsed = candidate.find(']').and_then(|close| {
            let label = &candidate[..close];
            let target = candidate[close + 1..].strip_prefix('(')?;
            let end = target.find(')')?;
            let url = &target[..end];
            if label.is_empty() || url.is_empty() {
                return None;
            }
            let consumed = close + 2 + end + 1;
            Some((label, url, consumed))
        });
        match parsed {
            Some((label, url, consumed)) => {
                out.push_str(&rest[..open]);
                out.push_str(label);
                out.push_str(" (");
                out.push_str(url);
                out.push(')');
                rest = &candidate[consumed..];
            }
            None => {
                out.push_str(&rest[..=open]);
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn bulletize(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let mut chars = body.chars();
    match (chars.next(), chars.next()) {
        (Some('-' | '*'), Some(next)) if next.is_whitespace() => {
            let item = body[1..].trim_start();
            format!("{indent}• {item}")
        }
        _ => line.to_string(),
    }
}
