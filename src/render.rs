//! Display model for the gallery. Everything here is plain data so the
//! terminal layer only has to lay it out.

use crate::apod::Item;
use crate::gallery::{EmptyState, Gallery, Phase};

pub const MSG_IDLE: &str = "Pick a date range and press g to get images.";
pub const MSG_LOADING: &str = "Loading images...";
pub const MSG_NO_IMAGES: &str = "No images found for that date range.";
pub const MSG_NO_MATCHES: &str = "No images match the selected filter.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Image,
    Video,
}

impl PlaceholderKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlaceholderKind::Image => "Image",
            PlaceholderKind::Video => "Video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Url(String),
    Placeholder(PlaceholderKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub item: Item,
    pub caption: String,
    pub thumbnail: Thumbnail,
    pub favorited: bool,
    pub play_marker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Prev,
    Next,
    Select(usize),
}

impl PageControl {
    /// Page number this control asks for. The gallery clamps it.
    pub fn target(self, current_page: usize) -> usize {
        match self {
            PageControl::Prev => current_page.saturating_sub(1),
            PageControl::Next => current_page + 1,
            PageControl::Select(page) => page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOption {
    pub number: usize,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub options: Vec<PageOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Message(String),
    Error(String),
    Cards(Vec<Card>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub body: Body,
    pub pagination: Option<Pagination>,
    pub status: Option<String>,
}

/// First non-empty of `hdurl`, `url`, `thumbnail_url`.
pub fn thumbnail_for(item: &Item) -> Thumbnail {
    item.hdurl()
        .or_else(|| item.url())
        .or_else(|| item.thumbnail_url())
        .map(|url| Thumbnail::Url(url.to_string()))
        .unwrap_or_else(|| {
            Thumbnail::Placeholder(if item.is_video() {
                PlaceholderKind::Video
            } else {
                PlaceholderKind::Image
            })
        })
}

pub fn caption_for(item: &Item) -> String {
    format!("{} — {}", item.date.as_deref().unwrap_or(""), item.title)
}

pub fn pagination(total_pages: usize, current_page: usize) -> Pagination {
    let total_pages = total_pages.max(1);
    let current_page = current_page.clamp(1, total_pages);
    Pagination {
        current_page,
        total_pages,
        prev_enabled: current_page > 1,
        next_enabled: current_page < total_pages,
        options: (1..=total_pages)
            .map(|number| PageOption {
                number,
                label: format!("Page {number} of {total_pages}"),
                selected: number == current_page,
            })
            .collect(),
    }
}

pub fn project_page<F>(
    page_items: &[Item],
    total_pages: usize,
    current_page: usize,
    is_favorited: F,
) -> (Vec<Card>, Pagination)
where
    F: Fn(&Item) -> bool,
{
    let cards = page_items
        .iter()
        .map(|item| Card {
            item: item.clone(),
            caption: caption_for(item),
            thumbnail: thumbnail_for(item),
            favorited: is_favorited(item),
            play_marker: item.is_video(),
        })
        .collect();
    (cards, pagination(total_pages, current_page))
}

pub fn project(gallery: &Gallery) -> Display {
    match gallery.phase() {
        Phase::Idle => message(MSG_IDLE),
        Phase::Loading => message(MSG_LOADING),
        Phase::Failed(cause) => Display {
            body: Body::Error(format!("Failed to load images: {cause}")),
            pagination: None,
            status: None,
        },
        Phase::Loaded => {
            let status = Some(format!(
                "{} items matched filters (from {} unique items)",
                gallery.filtered_len(),
                gallery.unique_len()
            ));
            match gallery.empty_state() {
                Some(EmptyState::NoImagesInRange) => Display {
                    status: None,
                    ..message(MSG_NO_IMAGES)
                },
                Some(EmptyState::NoMatches) => Display {
                    status,
                    ..message(MSG_NO_MATCHES)
                },
                None => {
                    let favorites = gallery.favorites();
                    let (cards, pagination) = project_page(
                        gallery.page_items(),
                        gallery.total_pages(),
                        gallery.current_page(),
                        |item| favorites.is_favorited(item),
                    );
                    Display {
                        body: Body::Cards(cards),
                        pagination: Some(pagination),
                        status,
                    }
                }
            }
        }
    }
}

fn message(text: &str) -> Display {
    Display {
        body: Body::Message(text.to_string()),
        pagination: None,
        status: None,
    }
}
