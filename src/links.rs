//! Link previews for posts.
//!
//! Metadata is derived from the URL alone; no network fetch is made.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::errors::AppError;
use crate::models::LinkPreview;

const DEFAULT_DESCRIPTION: &str = "Check out this link";
const GENERIC_IMAGE: &str = "https://img.icons8.com/fluency/480/link.png";

/// Platform-specific preview images, matched against the host.
const PLATFORM_IMAGES: &[(&[&str], &str)] = &[
    (
        &["youtube.com", "youtu.be"],
        "https://img.icons8.com/color/480/youtube-play.png",
    ),
    (
        &["facebook.com", "fb.com"],
        "https://img.icons8.com/fluency/480/facebook-new.png",
    ),
    (
        &["twitter.com", "x.com"],
        "https://img.icons8.com/fluency/480/twitter.png",
    ),
    (
        &["instagram.com"],
        "https://img.icons8.com/fluency/480/instagram-new.png",
    ),
    (
        &["linkedin.com"],
        "https://img.icons8.com/fluency/480/linkedin.png",
    ),
    (&["github.com"], "https://img.icons8.com/fluency/480/github.png"),
    (&["reddit.com"], "https://img.icons8.com/fluency/480/reddit.png"),
];

/// Parse an http(s) URL, rejecting anything else.
pub fn parse_web_url(raw: &str) -> Result<Url, AppError> {
    let invalid = || AppError::Validation("Please enter a valid URL".to_string());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// Build a preview for `raw`.
pub fn extract_link_metadata(raw: &str) -> Result<LinkPreview, AppError> {
    let url = parse_web_url(raw)?;
    let host = url.host_str().unwrap_or_default().to_string();

    Ok(LinkPreview {
        url: url.to_string(),
        title: title_from_url(&url),
        description: DEFAULT_DESCRIPTION.to_string(),
        image: platform_image(&host).to_string(),
        domain: host,
    })
}

fn title_from_url(url: &Url) -> String {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    let Some(segment) = last_segment else {
        return strip_www(url.host_str().unwrap_or("Link")).to_string();
    };

    let decoded = percent_decode_str(segment)
        .decode_utf8_lossy()
        .replace(['-', '_'], " ");
    let stem = match decoded.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem.to_string(),
        _ => decoded,
    };

    stem.split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn platform_image(host: &str) -> &'static str {
    let host = host.to_lowercase();
    PLATFORM_IMAGES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| host.contains(n)))
        .map(|(_, image)| *image)
        .unwrap_or(GENERIC_IMAGE)
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Host of `raw` without a leading `www.`; empty for invalid URLs.
pub fn extract_domain(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| strip_www(h).to_string()))
        .unwrap_or_default()
}

/// Every http(s) URL appearing in `text`, in order.
pub fn extract_urls(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

/// Video id of a YouTube watch or short link.
pub fn youtube_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;

    if host.contains("youtube.com") {
        url.query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
    } else if host.contains("youtu.be") {
        url.path_segments()?
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_path() {
        let preview =
            extract_link_metadata("https://www.example.com/blog/rust-async_intro.html").unwrap();
        assert_eq!(preview.title, "Rust Async Intro");
        assert_eq!(preview.domain, "www.example.com");
        assert_eq!(preview.description, "Check out this link");
        assert_eq!(preview.image, GENERIC_IMAGE);
    }

    #[test]
    fn test_metadata_without_path_uses_host() {
        let preview = extract_link_metadata("https://www.github.com/").unwrap();
        assert_eq!(preview.title, "github.com");
        assert!(preview.image.contains("github"));
    }

    #[test]
    fn test_percent_encoded_title() {
        let preview = extract_link_metadata("https://example.com/hello%20world").unwrap();
        assert_eq!(preview.title, "Hello World");

        let broken = extract_link_metadata("https://example.com/100%zz-club").unwrap();
        assert_eq!(broken.title, "100%zz Club");
    }

    #[test]
    fn test_rejects_non_web_urls() {
        assert!(matches!(
            extract_link_metadata("ftp://example.com/file"),
            Err(AppError::Validation(_))
        ));
        assert!(extract_link_metadata("not a url").is_err());
    }

    #[test]
    fn test_extract_urls() {
        let urls = extract_urls("see https://a.com and http://b.org/x now");
        assert_eq!(urls, vec!["https://a.com", "http://b.org/x"]);
    }

    #[test]
    fn test_youtube_id() {
        assert_eq!(
            youtube_id("https://www.youtube.com/watch?v=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(youtube_id("https://youtu.be/xyz"), Some("xyz".to_string()));
        assert_eq!(youtube_id("https://example.com/watch?v=1"), None);
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.reddit.com/r/rust"), "reddit.com");
        assert_eq!(extract_domain("garbage"), "");
    }
}
