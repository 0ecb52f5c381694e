use std::collections::{BTreeMap, HashSet};

use crate::apod::Item;
use crate::favorites::FavoritesStore;

pub const PAGE_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    All,
    Nebula,
    Galaxy,
    Planet,
    Star,
}

pub const CATEGORIES: [Category; 5] = [
    Category::All,
    Category::Nebula,
    Category::Galaxy,
    Category::Planet,
    Category::Star,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Nebula => "nebula",
            Category::Galaxy => "galaxy",
            Category::Planet => "planet",
            Category::Star => "star",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::All => "All",
            Category::Nebula => "Nebulae",
            Category::Galaxy => "Galaxies",
            Category::Planet => "Planets",
            Category::Star => "Stars & Sun",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        CATEGORIES
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(key.trim()))
    }

    pub fn next(self) -> Self {
        let index = CATEGORIES.iter().position(|c| *c == self).unwrap_or(0);
        CATEGORIES[(index + 1) % CATEGORIES.len()]
    }

    pub fn previous(self) -> Self {
        let index = CATEGORIES.iter().position(|c| *c == self).unwrap_or(0);
        CATEGORIES[(index + CATEGORIES.len() - 1) % CATEGORIES.len()]
    }
}

const DEFAULT_KEYWORDS: [(Category, &[&str]); 4] = [
    (
        Category::Nebula,
        &["nebula", "nebulae", "pillars", "emission", "reflection", "dark nebula"],
    ),
    (
        Category::Galaxy,
        &["galaxy", "andromeda", "milky way", "m31", "m33", "spiral", "elliptical"],
    ),
    (
        Category::Planet,
        &[
            "planet", "mars", "jupiter", "saturn", "venus", "mercury", "neptune", "uranus",
            "earth",
        ],
    ),
    (
        Category::Star,
        &["star", "supernova", "pulsar", "sun", "solar"],
    ),
];

/// Keyword lists backing each category. Matching is a case-insensitive
/// substring test against the title and explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    keywords: Vec<(Category, Vec<String>)>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS
                .iter()
                .map(|(category, words)| {
                    (*category, words.iter().map(|w| w.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl Taxonomy {
    /// Replaces the keyword list of every category named in `overrides`.
    /// Unknown names are skipped.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut taxonomy = Self::default();
        for (name, words) in overrides {
            match Category::from_key(name) {
                Some(Category::All) | None => {
                    tracing::warn!(category = %name, "Ignoring keywords for unknown category");
                }
                Some(category) => taxonomy.set_keywords(category, words),
            }
        }
        taxonomy
    }

    fn set_keywords(&mut self, category: Category, words: &[String]) {
        let words: Vec<String> = words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        match self.keywords.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = words,
            None => self.keywords.push((category, words)),
        }
    }

    pub fn keywords(&self, category: Category) -> &[String] {
        self.keywords
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, words)| words.as_slice())
            .unwrap_or(&[])
    }

    pub fn matches(&self, item: &Item, category: Category) -> bool {
        if category == Category::All {
            return true;
        }
        let text = format!("{} {}", item.title, item.explanation).to_lowercase();
        self.keywords(category)
            .iter()
            .any(|keyword| text.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The fetch returned nothing for the selected range.
    NoImagesInRange,
    /// Items exist but the active filters removed all of them.
    NoMatches,
}

/// Owns the fetched items and every input that shapes the visible page.
pub struct Gallery {
    raw: Vec<Item>,
    unique_count: usize,
    filtered: Vec<Item>,
    category: Category,
    favorites_only: bool,
    current_page: usize,
    total_pages: usize,
    page_size: usize,
    taxonomy: Taxonomy,
    favorites: FavoritesStore,
    phase: Phase,
}

impl Gallery {
    pub fn new(favorites: FavoritesStore, taxonomy: Taxonomy, page_size: usize) -> Self {
        Self {
            raw: Vec::new(),
            unique_count: 0,
            filtered: Vec::new(),
            category: Category::All,
            favorites_only: false,
            current_page: 1,
            total_pages: 1,
            page_size: page_size.max(1),
            taxonomy,
            favorites,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Marks a fetch as in flight. Refuses while another one is pending.
    pub fn begin_fetch(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.phase = Phase::Loading;
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = Phase::Failed(message.into());
    }

    /// Replaces the raw items wholesale, newest first.
    pub fn ingest(&mut self, mut items: Vec<Item>) {
        items.sort_by(|a, b| b.day().cmp(&a.day()));
        self.raw = items;
        self.current_page = 1;
        self.phase = Phase::Loaded;
        self.recompute();
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.current_page = 1;
        self.recompute();
    }

    pub fn set_favorites_only(&mut self, favorites_only: bool) {
        self.favorites_only = favorites_only;
        self.current_page = 1;
        self.recompute();
    }

    pub fn toggle_favorite(&mut self, item: &Item) -> bool {
        let favorited = self.favorites.toggle(item);
        self.recompute();
        favorited
    }

    /// Moves to page `n`, clamped into range. Returns whether the page changed.
    pub fn set_page(&mut self, n: usize) -> bool {
        let target = n.clamp(1, self.total_pages);
        if target == self.current_page {
            return false;
        }
        self.current_page = target;
        true
    }

    fn recompute(&mut self) {
        let mut seen = HashSet::new();
        let unique: Vec<&Item> = self
            .raw
            .iter()
            .filter(|item| seen.insert(item.date.as_deref()))
            .collect();
        self.unique_count = unique.len();

        self.filtered = unique
            .into_iter()
            .filter(|item| !self.favorites_only || self.favorites.is_favorited(item))
            .filter(|item| self.taxonomy.matches(item, self.category))
            .cloned()
            .collect();

        self.total_pages = total_pages(self.filtered.len(), self.page_size);
        self.current_page = self.current_page.clamp(1, self.total_pages);
    }

    pub fn page_items(&self) -> &[Item] {
        let start = (self.current_page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.filtered.len());
        self.filtered.get(start..end).unwrap_or(&[])
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.raw.is_empty() {
            Some(EmptyState::NoImagesInRange)
        } else if self.filtered.is_empty() {
            Some(EmptyState::NoMatches)
        } else {
            None
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn unique_len(&self) -> usize {
        self.unique_count
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}
