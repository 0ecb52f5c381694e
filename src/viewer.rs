use crossterm::event::KeyCode;
use once_cell::sync::Lazy;
use ratatui::layout::Rect;
use regex::Regex;

use crate::apod::Item;
use crate::keys::{KeyRouter, Overlay};

static VIDEO_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com|youtu\.be|vimeo\.com").expect("video host regex"));
static YOUTUBE_WATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/watch\?(?:.*&)?v=([A-Za-z0-9_-]+)").expect("youtube watch regex")
});
static YOUTUBE_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtu\.be/([A-Za-z0-9_-]+)").expect("youtu.be regex"));
static YOUTUBE_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube(?:-nocookie)?\.com/embed/[A-Za-z0-9_-]+").expect("youtube embed regex")
});
static VIMEO_PLAYER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"player\.vimeo\.com/video/\d+").expect("vimeo player regex"));
static VIMEO_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("vimeo regex"));
static IMAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|bmp|tiff|tif|svg)(\?|$)").expect("image regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    /// Embeddable player URL plus the page it came from.
    Embed { src: String, source: String },
    /// A video we could not turn into a player URL.
    VideoLink { url: String },
    Image { src: String, fallback: String },
    /// The image probe failed; only the link is left.
    ImageFailed { link: String },
    Link { url: String },
}

impl Media {
    pub fn link(&self) -> &str {
        match self {
            Media::Embed { src, .. } => src,
            Media::VideoLink { url } | Media::Link { url } => url,
            Media::Image { src, .. } => src,
            Media::ImageFailed { link } => link,
        }
    }
}

pub fn is_video_host(url: &str) -> bool {
    VIDEO_HOST.is_match(url)
}

pub fn looks_like_image(url: &str) -> bool {
    IMAGE_EXTENSION.is_match(url)
}

/// Player URL for a YouTube or Vimeo link, if the link has a known shape.
pub fn embed_url(url: &str) -> Option<String> {
    if YOUTUBE_EMBED.is_match(url) || VIMEO_PLAYER.is_match(url) {
        return Some(url.to_string());
    }
    if let Some(caps) = YOUTUBE_WATCH.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &caps[1]));
    }
    if let Some(caps) = YOUTUBE_SHORT.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &caps[1]));
    }
    VIMEO_NUMERIC
        .captures(url)
        .map(|caps| format!("https://player.vimeo.com/video/{}", &caps[1]))
}

pub fn resolve_media(item: &Item) -> Media {
    let media_url = item.hdurl().or_else(|| item.url()).unwrap_or_default();
    let source = item.url().unwrap_or(media_url).to_string();

    if item.is_video() || is_video_host(media_url) {
        return match embed_url(media_url) {
            Some(src) => Media::Embed {
                src,
                source: media_url.to_string(),
            },
            None => Media::VideoLink {
                url: if media_url.is_empty() {
                    source
                } else {
                    media_url.to_string()
                },
            },
        };
    }

    if item.is_image() || looks_like_image(media_url) {
        return Media::Image {
            src: media_url.to_string(),
            fallback: source,
        };
    }

    Media::Link {
        url: if media_url.is_empty() {
            source
        } else {
            media_url.to_string()
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    CloseAction,
    OutsideClick,
    CancelKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerAction {
    None,
    Dismiss(Dismissal),
    OpenLink(String),
    Play(String),
    Scroll(i32),
}

pub struct Viewer {
    item: Item,
    media: Media,
    scroll: u16,
}

impl Viewer {
    pub fn open(item: Item, keys: &mut KeyRouter) -> Self {
        let media = resolve_media(&item);
        tracing::debug!(date = ?item.date, ?media, "Opening viewer");
        keys.grab(Overlay::Viewer);
        Self {
            item,
            media,
            scroll: 0,
        }
    }

    /// Closes the viewer and hands keyboard input back to the grid.
    pub fn dismiss(self, reason: Dismissal, keys: &mut KeyRouter) -> Dismissal {
        keys.release(Overlay::Viewer);
        tracing::debug!(?reason, "Viewer dismissed");
        reason
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn media(&self) -> &Media {
        &self.media
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll) + delta;
        self.scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
    }

    /// Image URL awaiting a load check, if any.
    pub fn pending_image(&self) -> Option<&str> {
        match &self.media {
            Media::Image { src, .. } if !src.is_empty() => Some(src),
            _ => None,
        }
    }

    pub fn image_failed(&mut self, src: &str) {
        if let Media::Image { src: current, fallback } = &self.media {
            if current == src {
                tracing::warn!(url = %src, "Image failed to load");
                self.media = Media::ImageFailed {
                    link: fallback.clone(),
                };
            }
        }
    }

    pub fn handle_key(&self, code: KeyCode) -> ViewerAction {
        match code {
            KeyCode::Esc => ViewerAction::Dismiss(Dismissal::CancelKey),
            KeyCode::Char('x') | KeyCode::Char('q') => ViewerAction::Dismiss(Dismissal::CloseAction),
            KeyCode::Char('o') | KeyCode::Enter => self.open_target(),
            KeyCode::Char('m') => match &self.media {
                Media::Embed { source, .. } => ViewerAction::Play(source.clone()),
                Media::VideoLink { url } if !url.is_empty() => ViewerAction::Play(url.clone()),
                _ => ViewerAction::None,
            },
            KeyCode::Char('j') | KeyCode::Down => ViewerAction::Scroll(1),
            KeyCode::Char('k') | KeyCode::Up => ViewerAction::Scroll(-1),
            KeyCode::PageDown => ViewerAction::Scroll(10),
            KeyCode::PageUp => ViewerAction::Scroll(-10),
            _ => ViewerAction::None,
        }
    }

    pub fn handle_click(&self, column: u16, row: u16, content: Rect) -> ViewerAction {
        if rect_contains(content, column, row) {
            ViewerAction::None
        } else {
            ViewerAction::Dismiss(Dismissal::OutsideClick)
        }
    }

    fn open_target(&self) -> ViewerAction {
        let link = self.media.link();
        if link.is_empty() {
            ViewerAction::None
        } else {
            ViewerAction::OpenLink(link.to_string())
        }
    }
}

pub fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::MediaType;

    fn item(media_type: Option<MediaType>, url: &str) -> Item {
        Item {
            date: Some("2024-06-01".into()),
            title: "Test".into(),
            media_type,
            url: Some(url.into()),
            ..Item::default()
        }
    }

    #[test]
    fn youtube_and_vimeo_links_become_embeds() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc_123-x"),
            Some("https://www.youtube.com/embed/abc_123-x".into())
        );
        assert_eq!(
            embed_url("https://youtu.be/abc123"),
            Some("https://www.youtube.com/embed/abc123".into())
        );
        assert_eq!(
            embed_url("https://vimeo.com/123456"),
            Some("https://player.vimeo.com/video/123456".into())
        );
        assert_eq!(
            embed_url("https://www.youtube.com/embed/xyz?rel=0"),
            Some("https://www.youtube.com/embed/xyz?rel=0".into())
        );
        assert_eq!(embed_url("https://vimeo.com/channels/staff"), None);
    }

    #[test]
    fn video_without_known_pattern_falls_back_to_link() {
        let media = resolve_media(&item(Some(MediaType::Video), "https://example.org/clip.mp4"));
        assert_eq!(
            media,
            Media::VideoLink {
                url: "https://example.org/clip.mp4".into()
            }
        );
    }

    #[test]
    fn video_host_wins_without_media_type() {
        let media = resolve_media(&item(None, "https://youtu.be/abc123"));
        assert!(matches!(media, Media::Embed { .. }));
    }

    #[test]
    fn images_prefer_hd_url_and_keep_fallback() {
        let mut apod = item(Some(MediaType::Image), "https://apod.nasa.gov/image/std.jpg");
        apod.hdurl = Some("https://apod.nasa.gov/image/hd.jpg".into());
        assert_eq!(
            resolve_media(&apod),
            Media::Image {
                src: "https://apod.nasa.gov/image/hd.jpg".into(),
                fallback: "https://apod.nasa.gov/image/std.jpg".into(),
            }
        );
    }

    #[test]
    fn image_extension_detects_untyped_images() {
        assert!(looks_like_image("https://x.org/a.PNG"));
        assert!(looks_like_image("https://x.org/a.tif?size=2"));
        assert!(!looks_like_image("https://x.org/page.html"));
        let media = resolve_media(&item(None, "https://x.org/a.webp"));
        assert!(matches!(media, Media::Image { .. }));
    }

    #[test]
    fn anything_else_is_a_link() {
        let media = resolve_media(&item(Some(MediaType::Other), "https://x.org/interactive"));
        assert_eq!(
            media,
            Media::Link {
                url: "https://x.org/interactive".into()
            }
        );
    }

    #[test]
    fn failed_image_switches_to_link() {
        let mut keys = KeyRouter::default();
        let mut viewer = Viewer::open(item(Some(MediaType::Image), "https://x.org/a.jpg"), &mut keys);
        assert_eq!(viewer.pending_image(), Some("https://x.org/a.jpg"));
        viewer.image_failed("https://x.org/other.jpg");
        assert!(matches!(viewer.media(), Media::Image { .. }));
        viewer.image_failed("https://x.org/a.jpg");
        assert_eq!(
            viewer.media(),
            &Media::ImageFailed {
                link: "https://x.org/a.jpg".into()
            }
        );
        assert_eq!(viewer.pending_image(), None);
    }

    #[test]
    fn every_dismissal_path_releases_the_key_grab() {
        let mut keys = KeyRouter::default();
        let content = Rect::new(10, 5, 40, 20);

        for _ in 0..3 {
            let viewer = Viewer::open(item(None, "https://x.org/a.jpg"), &mut keys);
            assert_eq!(keys.active(), Some(Overlay::Viewer));
            let ViewerAction::Dismiss(reason) = viewer.handle_key(KeyCode::Esc) else {
                panic!("escape should dismiss");
            };
            assert_eq!(viewer.dismiss(reason, &mut keys), Dismissal::CancelKey);
            assert!(keys.is_empty());

            let viewer = Viewer::open(item(None, "https://x.org/a.jpg"), &mut keys);
            assert_eq!(viewer.handle_click(20, 10, content), ViewerAction::None);
            let ViewerAction::Dismiss(reason) = viewer.handle_click(0, 0, content) else {
                panic!("outside click should dismiss");
            };
            assert_eq!(viewer.dismiss(reason, &mut keys), Dismissal::OutsideClick);
            assert!(keys.is_empty());

            let viewer = Viewer::open(item(None, "https://x.org/a.jpg"), &mut keys);
            let ViewerAction::Dismiss(reason) = viewer.handle_key(KeyCode::Char('x')) else {
                panic!("close should dismiss");
            };
            assert_eq!(viewer.dismiss(reason, &mut keys), Dismissal::CloseAction);
            assert!(keys.is_empty());
        }
    }

    #[test]
    fn play_only_offered_for_videos() {
        let mut keys = KeyRouter::default();
        let video = Viewer::open(item(Some(MediaType::Video), "https://youtu.be/abc"), &mut keys);
        assert_eq!(
            video.handle_key(KeyCode::Char('m')),
            ViewerAction::Play("https://youtu.be/abc".into())
        );
        let image = Viewer::open(item(Some(MediaType::Image), "https://x.org/a.jpg"), &mut keys);
        assert_eq!(image.handle_key(KeyCode::Char('m')), ViewerAction::None);
        assert_eq!(
            image.handle_key(KeyCode::Char('o')),
            ViewerAction::OpenLink("https://x.org/a.jpg".into())
        );
    }
}
