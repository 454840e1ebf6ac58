pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4096;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Boundaries are tried in order: paragraph break, line break, sentence end,
/// space. A boundary only counts when it sits past 30% of the window, so
/// chunks never degenerate into tiny fragments. Whitespace at split points is
/// trimmed and empty chunks are never returned.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some(window_end) = char_boundary(remaining, max_chars) else {
            push_non_empty(&mut chunks, remaining);
            break;
        };
        let window = &remaining[..window_end];
        let floor = char_boundary(window, max_chars * 3 / 10).unwrap_or(0);
        let split = preferred_boundary(window, floor).unwrap_or(window_end);

        push_non_empty(&mut chunks, remaining[..split].trim_end());
        remaining = remaining[split..].trim_start();
    }

    chunks
}

/// Byte offset of the `nth` char, or `None` when `text` has no more than `nth` chars.
fn char_boundary(text: &str, nth: usize) -> Option<usize> {
    text.char_indices().nth(nth).map(|(idx, _)| idx)
}

fn preferred_boundary(window: &str, floor: usize) -> Option<usize> {
    let past_floor = |idx: Option<usize>| idx.filter(|idx| *idx > floor);

    if let Some(idx) = past_floor(window.rfind("\n\n")) {
        return Some(idx);
    }
    if let Some(idx) = past_floor(window.rfind('\n')) {
        return Some(idx);
    }
    let sentence_end = [". ", "! ", "? "]
        .iter()
        .filter_map(|marker| window.rfind(marker))
        .max();
    if let Some(idx) = past_floor(sentence_end) {
        return Some(idx + 1);
    }
    past_floor(window.rfind([' ', '\t']))
}

fn push_non_empty(chunks: &mut Vec<String>, chunk: &str) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(text: &str) -> String {
        text.chars().filter(|ch| !ch.is_whitespace()).collect()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(split_message("", 10).is_empty());
        assert!(split_message("   \n ", 10).is_empty());
    }

    #[test]
    fn long_prose_splits_within_limit_and_keeps_content() {
        let sentence = "The quick brown fox jumps over the lazy dog. ";
        let text = sentence.repeat(200);
        assert_eq!(text.chars().count(), 9000);

        let chunks = split_message(&text, DEFAULT_MAX_MESSAGE_CHARS);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DEFAULT_MAX_MESSAGE_CHARS);
            assert!(!chunk.is_empty());
        }
        assert_eq!(squash(&chunks.concat()), squash(&text));
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn paragraph_boundary_wins_over_line_boundary() {
        let text = format!("{}\n\n{}\n{}", "a".repeat(40), "b".repeat(20), "c".repeat(20));
        let chunks = split_message(&text, 70);
        assert_eq!(chunks[0], "a".repeat(40));
        assert_eq!(chunks[1], format!("{}\n{}", "b".repeat(20), "c".repeat(20)));
    }

    #[test]
    fn boundary_too_close_to_start_is_ignored() {
        let text = format!("ab {}", "x".repeat(30));
        let chunks = split_message(&text, 20);
        assert_eq!(chunks[0], format!("ab {}", "x".repeat(17)));
        assert_eq!(squash(&chunks.concat()), squash(&text));
    }

    #[test]
    fn hard_cut_respects_multibyte_chars() {
        let text = "é".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[2].chars().count(), 5);
        assert_eq!(chunks.concat(), text);
    }
}
