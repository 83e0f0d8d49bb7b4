use serde::{Deserialize, Serialize};

/// Media payload handed through to the player untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub year: Option<u16>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            year: None,
            season: None,
            episode: None,
        }
    }
}

/// Everything a host provides when it opens the loading screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub stream_url: String,
    pub media: Option<MediaItem>,
    pub quality: Option<String>,
    pub subtitle_language: Option<String>,
}

impl SessionParams {
    pub fn new(stream_url: impl Into<String>, media: MediaItem) -> Self {
        Self {
            stream_url: stream_url.into(),
            media: Some(media),
            quality: None,
            subtitle_language: None,
        }
    }

    /// A session opened straight from a link: no payload, no subtitles.
    /// Decoded as form data, so `+` becomes a space.
    pub fn from_view_url(url: &str) -> Self {
        let stream_url = match urlencoding::decode(&url.replace('+', " ")) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                log::warn!("Could not decode stream url {}: {}, using it as-is", url, e);
                url.to_string()
            }
        };

        Self {
            stream_url,
            media: None,
            quality: None,
            subtitle_language: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_subtitles(mut self, language: impl Into<String>) -> Self {
        self.subtitle_language = Some(language.into());
        self
    }

    pub fn media_id(&self) -> &str {
        self.media.as_ref().map(|m| m.id.as_str()).unwrap_or(&self.stream_url)
    }
}

/// The one-shot handoff to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub media: Option<MediaItem>,
    pub quality: Option<String>,
    pub subtitle_language: Option<String>,
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_url_is_percent_decoded() {
        let params = SessionParams::from_view_url("magnet:?xt=urn:btih:abc&dn=Big%20Buck%20Bunny");
        assert_eq!(params.stream_url, "magnet:?xt=urn:btih:abc&dn=Big Buck Bunny");
        assert!(params.media.is_none());
        assert!(params.subtitle_language.is_none());
    }

    #[test]
    fn test_view_url_plus_sign_is_space() {
        let params = SessionParams::from_view_url("http://host/a+b.torrent");
        assert_eq!(params.stream_url, "http://host/a b.torrent");

        let params = SessionParams::from_view_url("magnet:?xt=urn:btih:abc&dn=Big+Buck+Bunny");
        assert_eq!(params.stream_url, "magnet:?xt=urn:btih:abc&dn=Big Buck Bunny");
    }

    #[test]
    fn test_view_url_encoded_plus_survives() {
        let params = SessionParams::from_view_url("magnet:?dn=C%2B%2B+Primer");
        assert_eq!(params.stream_url, "magnet:?dn=C++ Primer");
    }

    #[test]
    fn test_invalid_utf8_url_used_as_is() {
        let params = SessionParams::from_view_url("http://host/%FF%FE");
        assert_eq!(params.stream_url, "http://host/%FF%FE");
    }

    #[test]
    fn test_media_id_falls_back_to_url() {
        let with_media = SessionParams::new("magnet:x", MediaItem::new("tt0111161", "The Shawshank Redemption"));
        assert_eq!(with_media.media_id(), "tt0111161");

        let without_media = SessionParams::from_view_url("magnet:y");
        assert_eq!(without_media.media_id(), "magnet:y");
    }

    #[test]
    fn test_builder_sets_quality_and_subtitles() {
        let params = SessionParams::new("magnet:x", MediaItem::new("tt1", "Film"))
            .with_quality("1080p")
            .with_subtitles("nl");
        assert_eq!(params.quality.as_deref(), Some("1080p"));
        assert_eq!(params.subtitle_language.as_deref(), Some("nl"));
    }
}
