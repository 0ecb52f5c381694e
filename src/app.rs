use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::apod::{self, DatasetService};
use crate::config;
use crate::dates::{format_day, parse_day, DateRange};
use crate::favorites::{FavoritesBackend, FavoritesStore, FileBackend, MemoryBackend};
use crate::gallery::{Category, Gallery, Taxonomy};
use crate::logging;
use crate::render::{self, Body, Display, Thumbnail};
use crate::ui;

/// Settings taken from the command line. Anything left unset falls back to
/// the config file and the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub dataset_url: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub category: Option<String>,
    pub favorites_only: bool,
    pub page: Option<usize>,
    pub print: bool,
}

impl RunOptions {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut opts = RunOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} requires a value"))
            };
            match arg.as_str() {
                "--config" => opts.config_file = Some(PathBuf::from(value("--config")?)),
                "--dataset" => opts.dataset_url = Some(value("--dataset")?),
                "--start" => opts.start = Some(value("--start")?),
                "--end" => opts.end = Some(value("--end")?),
                "--category" => opts.category = Some(value("--category")?),
                "--page" => {
                    let raw = value("--page")?;
                    let page = raw
                        .parse::<usize>()
                        .with_context(|| format!("--page expects a number, got '{raw}'"))?;
                    opts.page = Some(page);
                }
                "--favorites-only" => opts.favorites_only = true,
                "--print" => opts.print = true,
                other => bail!("unknown argument '{other}' (see --help)"),
            }
        }
        Ok(opts)
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        ..config::LoadOptions::default()
    })
    .context("load config")?;
    if let Some(url) = opts.dataset_url.as_ref() {
        cfg.dataset.url = url.clone();
    }

    let target = if opts.print {
        logging::Target::Stderr
    } else {
        logging::Target::File
    };
    logging::init(&cfg.log, target).context("init logging")?;
    tracing::info!(version = crate::VERSION, dataset = %cfg.dataset.url, "Starting apod-tui");

    let dates = date_range(&opts)?;
    let category = match opts.category.as_deref() {
        Some(name) => Category::from_key(name)
            .ok_or_else(|| anyhow!("unknown category '{name}'"))?,
        None => Category::All,
    };

    let backend: Box<dyn FavoritesBackend> = match cfg.favorites.path.clone() {
        Some(path) => Box::new(FileBackend::new(path)),
        None => {
            tracing::warn!("No data directory; favorites last for this session only");
            Box::new(MemoryBackend::default())
        }
    };
    let favorites = FavoritesStore::load(backend);
    let taxonomy = Taxonomy::with_overrides(&cfg.gallery.categories);
    let mut gallery = Gallery::new(favorites, taxonomy, cfg.gallery.page_size);
    gallery.set_category(category);
    gallery.set_favorites_only(opts.favorites_only);

    let client = apod::Client::new(apod::ClientConfig {
        dataset_url: cfg.dataset.url.clone(),
        user_agent: cfg.dataset.user_agent.clone(),
        timeout: cfg.dataset.timeout,
        http_client: None,
    })
    .context("create dataset client")?;
    let dataset: Arc<dyn DatasetService> = Arc::new(client);

    if opts.print {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        return print_page(dataset.as_ref(), &mut gallery, &dates, opts.page, &mut out);
    }

    let mut model = ui::Model::new(ui::Options {
        dataset,
        gallery,
        dates,
        player_command: cfg.player.video_command.clone(),
        status_message: format!(
            "Range {} to {}",
            format_day(dates.start()),
            format_day(dates.end())
        ),
        fetch_on_start: true,
    });
    model.run()
}

fn date_range(opts: &RunOptions) -> Result<DateRange> {
    let mut dates = DateRange::from_system_clock();
    if let Some(raw) = opts.start.as_deref() {
        let day = parse_day(raw).ok_or_else(|| anyhow!("invalid --start date '{raw}'"))?;
        dates.on_start_changed(day);
    }
    if let Some(raw) = opts.end.as_deref() {
        let day = parse_day(raw).ok_or_else(|| anyhow!("invalid --end date '{raw}'"))?;
        dates.set_end(day);
    }
    Ok(dates)
}

/// Fetches the window once and writes the projected page as plain text.
pub fn print_page<W: Write>(
    dataset: &dyn DatasetService,
    gallery: &mut Gallery,
    dates: &DateRange,
    page: Option<usize>,
    out: &mut W,
) -> Result<()> {
    if !gallery.begin_fetch() {
        bail!("a fetch is already in progress");
    }
    match dataset.fetch_range(Some(dates.start()), Some(dates.end())) {
        Ok(items) => gallery.ingest(items),
        Err(err) => {
            tracing::error!(error = %err, "Fetch failed");
            gallery.fail(err.to_string());
        }
    }
    if let Some(page) = page {
        gallery.set_page(page);
    }

    let display = render::project(gallery);
    write_display(&display, out)?;
    match display.body {
        Body::Error(message) => Err(anyhow!(message)),
        _ => Ok(()),
    }
}

fn write_display<W: Write>(display: &Display, out: &mut W) -> Result<()> {
    if let Some(status) = display.status.as_deref() {
        writeln!(out, "{status}")?;
    }
    match &display.body {
        Body::Message(message) | Body::Error(message) => writeln!(out, "{message}")?,
        Body::Cards(cards) => {
            for card in cards {
                let mut line = card.caption.clone();
                if card.play_marker {
                    line.push_str(" [video]");
                }
                if card.favorited {
                    line.push_str(" ♥");
                }
                writeln!(out, "{line}")?;
                match &card.thumbnail {
                    Thumbnail::Url(url) => writeln!(out, "  {url}")?,
                    Thumbnail::Placeholder(kind) => writeln!(out, "  [{}]", kind.label())?,
                }
            }
        }
    }
    if let Some(pagination) = display.pagination.as_ref() {
        writeln!(out, "Page {} of {}", pagination.current_page, pagination.total_pages)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::{FetchError, Item, MediaType};
    use crate::gallery::PAGE_SIZE;
    use chrono::NaiveDate;

    struct Fixed(Result<Vec<Item>, String>);

    impl DatasetService for Fixed {
        fn fetch_range(
            &self,
            start: Option<NaiveDate>,
            end: Option<NaiveDate>,
        ) -> Result<Vec<Item>, FetchError> {
            match &self.0 {
                Ok(items) => Ok(apod::filter_range(items.clone(), start, end)),
                Err(cause) => Err(FetchError::Network(cause.clone())),
            }
        }

        fn probe_image(&self, _url: &str) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn window(start: &str) -> DateRange {
        let mut dates = DateRange::new(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        dates.on_start_changed(parse_day(start).unwrap());
        dates
    }

    fn gallery() -> Gallery {
        Gallery::new(FavoritesStore::in_memory(), Taxonomy::default(), PAGE_SIZE)
    }

    #[test]
    fn parses_flags() {
        let opts = RunOptions::parse(args(&[
            "--dataset",
            "file:///tmp/a.json",
            "--start",
            "2024-06-03",
            "--category",
            "galaxy",
            "--favorites-only",
            "--page",
            "2",
            "--print",
        ]))
        .unwrap();
        assert_eq!(opts.dataset_url.as_deref(), Some("file:///tmp/a.json"));
        assert_eq!(opts.start.as_deref(), Some("2024-06-03"));
        assert_eq!(opts.category.as_deref(), Some("galaxy"));
        assert!(opts.favorites_only);
        assert_eq!(opts.page, Some(2));
        assert!(opts.print);
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(RunOptions::parse(args(&["--bogus"])).is_err());
        assert!(RunOptions::parse(args(&["--page"])).is_err());
        assert!(RunOptions::parse(args(&["--page", "two"])).is_err());
    }

    #[test]
    fn prints_cards_in_window() {
        let items = vec![
            Item {
                date: Some("2024-06-04".into()),
                title: "Whirlpool".into(),
                url: Some("https://apod.nasa.gov/m51.jpg".into()),
                ..Item::default()
            },
            Item {
                date: Some("2024-06-05".into()),
                title: "Launch".into(),
                media_type: Some(MediaType::Video),
                url: Some("https://youtube.com/embed/x".into()),
                ..Item::default()
            },
            Item {
                date: Some("2024-07-01".into()),
                title: "Outside".into(),
                ..Item::default()
            },
        ];
        let mut out = Vec::new();
        print_page(
            &Fixed(Ok(items)),
            &mut gallery(),
            &window("2024-06-01"),
            None,
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("2 items matched filters (from 2 unique items)"));
        assert!(text.contains("2024-06-05 — Launch [video]"));
        assert!(text.contains("2024-06-04 — Whirlpool"));
        assert!(!text.contains("Outside"));
        assert!(text.contains("Page 1 of 1"));
    }

    #[test]
    fn refuses_to_print_while_a_fetch_is_pending() {
        let mut gallery = gallery();
        assert!(gallery.begin_fetch());
        let mut out = Vec::new();
        let result = print_page(
            &Fixed(Ok(Vec::new())),
            &mut gallery,
            &window("2024-06-01"),
            None,
            &mut out,
        );
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn fetch_failure_is_reported_and_returned() {
        let mut out = Vec::new();
        let result = print_page(
            &Fixed(Err("request aborted/timed out".into())),
            &mut gallery(),
            &window("2024-06-01"),
            None,
            &mut out,
        );
        assert!(result.is_err());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Failed to load images:"));
    }
}
