//! Embeddable providers: host allow-list, URL normalization at classification
//! time, and frame resolution at display time.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::types::EmbedProvider;

/// Hosts whose links become embeds. The platform's own domain is appended
/// by the classifier.
pub const DEFAULT_EMBED_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "open.spotify.com",
    "spotify.com",
    "x.com",
    "twitter.com",
];

static X_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:x|twitter)\.com/([^/]+)/status/(\d+)").unwrap());

static SPOTIFY_INTL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/intl-[a-z]+").unwrap());

/// Host without a leading `www.`, lower-cased.
pub fn bare_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
}

/// True when `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Provider family for a host that already passed the allow-list. Anything
/// outside the known third-party families is the platform itself.
pub fn provider_for(host: &str) -> EmbedProvider {
    if host_matches(host, "youtube.com") || host_matches(host, "youtu.be") {
        EmbedProvider::YouTube
    } else if host_matches(host, "spotify.com") {
        EmbedProvider::Spotify
    } else if host_matches(host, "x.com") || host_matches(host, "twitter.com") {
        EmbedProvider::X
    } else {
        EmbedProvider::Platform
    }
}

/// Video id of a YouTube short link or `watch?v=` link.
pub fn youtube_id(url: &Url) -> Option<String> {
    let host = bare_host(url)?;
    if host_matches(&host, "youtu.be") {
        return url
            .path_segments()?
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }
    if url.path() == "/watch" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
    }
    None
}

/// Canonical URL stored in the embed atom.
///
/// YouTube links collapse to their embed form. Every other provider keeps
/// the https-normalized URL; its frame is worked out by [`EmbedFrame`].
pub fn normalize(url: &Url, provider: EmbedProvider) -> String {
    match provider {
        EmbedProvider::YouTube => match youtube_id(url) {
            Some(id) => format!("https://www.youtube.com/embed/{id}"),
            None => url.to_string(),
        },
        _ => url.to_string(),
    }
}

/// How an embed atom is displayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbedFrame {
    Iframe { src: String, height: u32 },
    /// Provider without an iframe form: show a status card instead.
    StatusCard { author: String, status_id: String },
    /// Unrecognized path: show the plain link.
    Link { href: String },
}

impl EmbedFrame {
    pub fn resolve(normalized_url: &str, provider: EmbedProvider) -> Self {
        let link = || EmbedFrame::Link {
            href: normalized_url.to_string(),
        };
        let Ok(url) = Url::parse(normalized_url) else {
            return link();
        };
        match provider {
            EmbedProvider::YouTube => {
                if url.path().starts_with("/embed/") {
                    EmbedFrame::Iframe {
                        src: normalized_url.to_string(),
                        height: 315,
                    }
                } else {
                    match youtube_id(&url) {
                        Some(id) => EmbedFrame::Iframe {
                            src: format!("https://www.youtube.com/embed/{id}"),
                            height: 315,
                        },
                        None => link(),
                    }
                }
            }
            EmbedProvider::Spotify => {
                let path = SPOTIFY_INTL_RE.replace(url.path(), "").into_owned();
                let kind = path.trim_start_matches('/').split('/').next().unwrap_or("");
                let height = match kind {
                    "track" => 82,
                    "episode" => 152,
                    "album" | "playlist" | "show" | "artist" => 380,
                    _ => return link(),
                };
                EmbedFrame::Iframe {
                    src: format!("https://open.spotify.com/embed{path}"),
                    height,
                }
            }
            EmbedProvider::X => match X_STATUS_RE.captures(normalized_url) {
                Some(caps) => EmbedFrame::StatusCard {
                    author: caps[1].to_string(),
                    status_id: caps[2].to_string(),
                },
                None => link(),
            },
            EmbedProvider::Platform => link(),
        }
    }
}
