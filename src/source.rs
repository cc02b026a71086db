use serde::{Deserialize, Serialize};
use url::Url;

/// Source type for an input URL, driving which fetch strategy runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    Youtube,
    Instagram,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::Youtube => "youtube",
            SourceType::Instagram => "instagram",
        }
    }
}

/// Instagram content kinds that carry a shortcode in the URL path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstagramKind {
    Post,
    Reel,
    Tv,
}

impl InstagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstagramKind::Post => "post",
            InstagramKind::Reel => "reel",
            InstagramKind::Tv => "tv",
        }
    }
}

/// Parsed Instagram target: `/p/{code}/`, `/reel/{code}/` or `/tv/{code}/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramTarget {
    pub kind: InstagramKind,
    pub shortcode: String,
}

/// Classify a URL by source. Total and deterministic: anything that is not
/// recognizably YouTube or Instagram falls back to `Web`, including URLs
/// that fail to parse at all.
pub fn classify(raw_url: &str) -> SourceType {
    let parsed = match Url::parse(raw_url) {
        Ok(u) => u,
        Err(_) => return SourceType::Web,
    };

    let host = match parsed.host_str() {
        Some(h) => h.trim_start_matches("www.").trim_start_matches("m.").to_lowercase(),
        None => return SourceType::Web,
    };

    if host == "youtube.com" || host == "youtu.be" {
        return SourceType::Youtube;
    }

    if host == "instagram.com" || host == "instagr.am" {
        if parse_instagram_target(&parsed).is_some() {
            return SourceType::Instagram;
        }
        // Profile pages etc. carry no extractable media; treat as web
        return SourceType::Web;
    }

    SourceType::Web
}

/// Extract a YouTube video id from the supported URL forms:
/// `youtube.com/watch?v=ID`, `youtu.be/ID`, `youtube.com/shorts/ID`,
/// `youtube.com/embed/ID`.
pub fn extract_video_id(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.").to_lowercase();

    if host == "youtu.be" {
        let id = parsed.path_segments()?.next()?.to_string();
        return valid_video_id(id);
    }

    if host == "youtube.com" {
        // Standard watch URL: the v query parameter
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            return valid_video_id(v.to_string());
        }
        // Shorts and embeds carry the id as a path segment
        let mut segments = parsed.path_segments()?;
        if let Some(first) = segments.next() {
            if first == "shorts" || first == "embed" {
                return valid_video_id(segments.next()?.to_string());
            }
        }
    }

    None
}

/// Extract the Instagram content kind and shortcode from a URL path
pub fn parse_instagram_url(raw_url: &str) -> Option<InstagramTarget> {
    let parsed = Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").to_lowercase();
    if host != "instagram.com" && host != "instagr.am" {
        return None;
    }
    parse_instagram_target(&parsed)
}

fn parse_instagram_target(parsed: &Url) -> Option<InstagramTarget> {
    let mut segments = parsed.path_segments()?;
    let kind = match segments.next()? {
        "p" => InstagramKind::Post,
        "reel" | "reels" => InstagramKind::Reel,
        "tv" => InstagramKind::Tv,
        _ => return None,
    };
    let shortcode = segments.next()?.trim().to_string();
    if shortcode.is_empty() || !shortcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return None;
    }
    Some(InstagramTarget { kind, shortcode })
}

fn valid_video_id(id: String) -> Option<String> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Some(id)
    } else {
        None
    }
}
