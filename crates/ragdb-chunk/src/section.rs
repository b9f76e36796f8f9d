/// Markdown-style section headers with their character offsets.
///
/// Recognizes ATX headers (`# ...` through `###### ...`) at line starts.
pub fn section_headers(text: &str) -> Vec<(usize, String)> {
    let mut headers = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) {
            let rest = &trimmed[hashes..];
            if let Some(title) = rest.strip_prefix(' ') {
                let title = title.trim();
                if !title.is_empty() {
                    headers.push((offset, title.to_string()));
                }
            }
        }
        offset += line.chars().count() + 1; // account for the newline
    }
    headers
}

pub fn has_section_headers(text: &str) -> bool {
    !section_headers(text).is_empty()
}

/// The nearest header at or before `offset`, if any.
pub fn section_for_offset(headers: &[(usize, String)], offset: usize) -> Option<String> {
    headers
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .map(|(_, title)| title.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_headers_with_offsets() {
        let text = "# Intro\nbody\n## Details\nmore body\n";
        let headers = section_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], (0, "Intro".to_string()));
        assert_eq!(headers[1].1, "Details");
    }

    #[test]
    fn offset_maps_to_nearest_preceding_header() {
        let text = "# A\naaaa\n# B\nbbbb\n";
        let headers = section_headers(text);
        assert_eq!(section_for_offset(&headers, 0).as_deref(), Some("A"));
        assert_eq!(section_for_offset(&headers, 6).as_deref(), Some("A"));
        assert_eq!(section_for_offset(&headers, 12).as_deref(), Some("B"));
    }

    #[test]
    fn plain_text_has_no_headers() {
        assert!(!has_section_headers("just a paragraph\nwith lines"));
        assert!(!has_section_headers("#hashtag is not a header"));
    }
}
