//! Video URL normalization.

use std::collections::HashSet;

use crate::result::{Video, VideoKind};

use super::unescape_script_url;

/// Container format implied by a URL: `.m3u8` streams are HLS, everything
/// else is treated as a progressive download.
#[must_use]
pub fn video_kind(url: &str) -> VideoKind {
    if url.to_ascii_lowercase().contains(".m3u8") {
        VideoKind::Hls
    } else {
        VideoKind::Mp4
    }
}

/// Unescape, absolutize protocol-relative URLs, drop non-http ones,
/// deduplicate by URL and cap.
#[must_use]
pub fn collect_videos<I>(urls: I, platform: &str, cap: usize) -> Vec<Video>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|raw| {
            let url = unescape_script_url(raw.trim());
            let url = match url.strip_prefix("//") {
                Some(rest) => format!("https://{rest}"),
                None => url,
            };
            (url.starts_with("http://") || url.starts_with("https://")).then_some(url)
        })
        .filter(|url| seen.insert(url.clone()))
        .take(cap)
        .map(|url| Video {
            kind: video_kind(&url),
            url,
            platform: platform.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(video_kind("https://cdn.example.com/a/master.M3U8?x=1"), VideoKind::Hls);
        assert_eq!(video_kind("https://cdn.example.com/a/clip.mp4"), VideoKind::Mp4);
    }

    #[test]
    fn test_collect_dedups_and_caps() {
        let urls = vec![
            r"https:\/\/cdn.example.com\/a.mp4".to_string(),
            "https://cdn.example.com/a.mp4".to_string(),
            "//cdn.example.com/b.m3u8".to_string(),
            "blob:https://example.com/123".to_string(),
            "https://cdn.example.com/c.mp4".to_string(),
        ];

        let videos = collect_videos(urls, "amazon", 2);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].url, "https://cdn.example.com/a.mp4");
        assert_eq!(videos[1].kind, VideoKind::Hls);
        assert_eq!(videos[1].platform, "amazon");
    }
}
