//! Minimal scanner for `<img src=...>` attributes in comment HTML.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Location of one `src` value inside an HTML fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImgSource<'a> {
    pub src: &'a str,
    pub span: Range<usize>,
}

/// All `<img>` sources in document order, duplicates included.
pub fn img_sources(html: &str) -> Vec<ImgSource<'_>> {
    let bytes = html.as_bytes();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find_tag(&bytes[pos..]) {
        let mut i = pos + offset + 4;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() || bytes[i] == b'>' {
                break;
            }
            if bytes[i] == b'/' {
                i += 1;
                continue;
            }

            let name_start = i;
            while i < bytes.len() && !is_name_end(bytes[i]) {
                i += 1;
            }
            let name = &html[name_start..i];

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() || bytes[i] != b'=' {
                continue;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let span = match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    let end = bytes[start..]
                        .iter()
                        .position(|&b| b == quote)
                        .map_or(bytes.len(), |p| start + p);
                    i = (end + 1).min(bytes.len());
                    start..end
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    start..i
                }
            };

            if name.eq_ignore_ascii_case("src") && !span.is_empty() {
                found.push(ImgSource {
                    src: &html[span.clone()],
                    span,
                });
            }
        }
        pos = i;
    }
    found
}

/// Sources containing `prefix`, deduplicated in document order.
pub fn sources_with_prefix(html: &str, prefix: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    img_sources(html)
        .into_iter()
        .filter(|s| s.src.contains(prefix))
        .filter(|s| seen.insert(s.src))
        .map(|s| s.src.to_string())
        .collect()
}

/// Rewrite every `<img>` source found in `replacements`.
pub fn replace_sources(html: &str, replacements: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for source in img_sources(html) {
        if let Some(new_src) = replacements.get(source.src) {
            out.push_str(&html[last..source.span.start]);
            out.push_str(new_src);
            last = source.span.end;
        }
    }
    out.push_str(&html[last..]);
    out
}

fn find_tag(bytes: &[u8]) -> Option<usize> {
    bytes.windows(5).position(|w| {
        w[0] == b'<'
            && w[1..4].eq_ignore_ascii_case(b"img")
            && (w[4].is_ascii_whitespace() || w[4] == b'/' || w[4] == b'>')
    })
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quoted_and_bare_sources() {
        let html = r#"<p>hi <IMG alt="x" SRC="/api/v1/picture/u/a.png"> and <img src='b.gif'/> <img src=c.jpg></p>"#;
        let srcs: Vec<_> = img_sources(html).into_iter().map(|s| s.src).collect();
        assert_eq!(srcs, vec!["/api/v1/picture/u/a.png", "b.gif", "c.jpg"]);
    }

    #[test]
    fn ignores_other_tags_and_attributes() {
        let html = r#"<image src="no.png"><iframe src="x"></iframe><img data-src="skip" alt=">">"#;
        assert!(img_sources(html).is_empty());
    }

    #[test]
    fn prefix_filter_dedups_in_order() {
        let html = concat!(
            r#"<img src="https://host/api/v1/picture/u/2.png">"#,
            r#"<img src="https://other/x.png">"#,
            r#"<img src="https://host/api/v1/picture/u/1.png">"#,
            r#"<img src="https://host/api/v1/picture/u/2.png">"#,
        );
        assert_eq!(
            sources_with_prefix(html, "/api/v1/picture/"),
            vec![
                "https://host/api/v1/picture/u/2.png",
                "https://host/api/v1/picture/u/1.png",
            ]
        );
    }

    #[test]
    fn replaces_only_known_sources() {
        let html = r#"<img src="a.png"> <img src='b.png'> <img src="a.png">"#;
        let map = HashMap::from([("a.png".to_string(), "/pic/u/1.png".to_string())]);
        assert_eq!(
            replace_sources(html, &map),
            r#"<img src="/pic/u/1.png"> <img src='b.png'> <img src="/pic/u/1.png">"#
        );
    }
}
