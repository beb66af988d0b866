use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use jellify_core::config::DEFAULT_CONFIG_PATH;
use jellify_core::controller::{LibraryView, PageRequest};
use jellify_core::model::formatting::{format_artist_names, is_explicit};
use jellify_core::model::lyrics::current_line;
use jellify_core::model::{Item, ItemSortBy, JellyfinClient, LibraryTab, QueueRef, SearchSection};
use jellify_core::storage::JsonFileStore;
use jellify_core::{AppController, AppModel, Config, MemoryPlayer, logging};

#[derive(Parser)]
#[command(name = "jellify", about = "Browse and queue a Jellyfin music library")]
struct Cli {
    /// Path to the client config
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tracks with the saved sort and filters
    Tracks {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Page back this many times after loading
        #[arg(long, default_value_t = 0)]
        back: usize,
        /// Print only the section that `letter` jumps to
        #[arg(long)]
        letter: Option<char>,
    },
    Albums {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    Artists {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    Genres {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Most played tracks and their artists
    Frequent,
    /// Production years present in the library
    Years,
    Search { term: String },
    Lyrics {
        item_id: String,
        /// Highlight the line at this position (seconds)
        #[arg(long)]
        at: Option<f64>,
    },
    /// Toggle an item's favorite state
    Favorite { item_id: String },
    /// Replace the queue with a random batch from the library
    ShuffleLibrary,
    /// Shuffle the saved queue
    Shuffle,
    /// Restore the saved queue's original order
    Deshuffle,
    /// Print the saved queue
    Queue,
    /// Play the first page of tracks, starting at `start`
    Play {
        #[arg(long, default_value_t = 0)]
        start: usize,
    },
    /// Jump to a position in the saved queue
    Skip { index: usize },
    /// Save the sort for a library tab
    Sort {
        tab: LibraryTab,
        by: ItemSortBy,
        #[arg(long)]
        descending: bool,
    },
    /// Show or change app settings
    Settings {
        #[arg(long)]
        hide_run_times: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = match logging::init_logging(logging::LOG_DIR) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        }
    };

    tracing::info!("=== Jellify Client Starting ===");

    let config = Config::load(&cli.config)?;
    let store = Arc::new(JsonFileStore::new(config.cache_dir()));
    let model = Arc::new(AppModel::load(store).await);

    let client = JellyfinClient::from_config(&config)?;
    model.set_api(client.into_shared()).await;

    // The player picks up where the saved queue left off
    let player = MemoryPlayer::new();
    {
        let state = model.queue.lock().await;
        player
            .load(state.queue().to_vec(), state.current_index(), 0.0)
            .await;
    }

    let controller = AppController::new(model.clone(), Arc::new(player), config.limits);

    let result = run(&controller, cli.command).await;
    if let Some(notice) = model.notice().await {
        eprintln!("{}", notice.text);
    }
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    tracing::info!("=== Jellify Client Exiting ===");
    result
}

async fn load_pages<F, Fut>(pages: usize, back: usize, load: F) -> Result<LibraryView>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = Result<LibraryView>>,
{
    let mut view = load(PageRequest::Current).await?;
    for _ in 1..pages {
        if !view.has_next_page {
            break;
        }
        view = load(PageRequest::Next).await?;
    }
    for _ in 0..back {
        if !view.has_previous_page {
            break;
        }
        view = load(PageRequest::Previous).await?;
    }
    Ok(view)
}

async fn run(controller: &AppController, command: Command) -> Result<()> {
    let out = Output {
        hide_run_times: controller.model().settings.read().await.hide_run_times,
    };
    match command {
        Command::Tracks { pages, back, letter } => {
            let view = load_pages(pages, back, |request| controller.load_tracks(request)).await?;
            let start = letter.and_then(|letter| view.jump_to(letter)).unwrap_or(0);
            out.print_view(&view, start, letter.is_some());
        }
        Command::Albums { pages } => {
            let view = load_pages(pages, 0, |request| controller.load_albums(request)).await?;
            out.print_view(&view, 0, false);
        }
        Command::Artists { pages } => {
            let view = load_pages(pages, 0, |request| controller.load_artists(request)).await?;
            out.print_view(&view, 0, false);
        }
        Command::Genres { pages } => {
            let view = load_pages(pages, 0, |request| controller.load_genres(request)).await?;
            out.print_view(&view, 0, false);
        }
        Command::Frequent => {
            let view = controller.load_frequently_played(PageRequest::Current).await?;
            out.print_view(&view, 0, false);
            let artists = controller.frequent_artists().await?;
            println!();
            for artist in artists {
                println!("{}", artist.name.as_deref().unwrap_or("Unknown Artist"));
            }
        }
        Command::Years => {
            let years = controller.library_years().await?;
            let years: Vec<String> = years.iter().map(ToString::to_string).collect();
            println!("{}", years.join(", "));
        }
        Command::Search { term } => {
            let results = controller.search(&term).await?;
            if results.is_empty() {
                println!("No results for \"{term}\"");
                return Ok(());
            }
            let sections = [
                (SearchSection::Tracks, "Tracks", &results.tracks),
                (SearchSection::Artists, "Artists", &results.artists),
                (SearchSection::Albums, "Albums", &results.albums),
                (SearchSection::Playlists, "Playlists", &results.playlists),
            ];
            for (section, title, items) in sections {
                if items.is_empty() {
                    continue;
                }
                let marker = if section == results.best_match { " (best match)" } else { "" };
                println!("{title}{marker}");
                for item in items {
                    println!("  {}", out.describe(item));
                }
            }
        }
        Command::Lyrics { item_id, at } => {
            let lines = controller.lyrics(&item_id).await?;
            if lines.is_empty() {
                println!("No lyrics");
                return Ok(());
            }
            let active = at.and_then(|position| current_line(&lines, position));
            for (index, line) in lines.iter().enumerate() {
                let marker = if Some(index) == active { ">" } else { " " };
                println!("{marker} [{:>7.2}] {}", line.start, line.text);
            }
        }
        Command::Favorite { item_id } => {
            let item = Item {
                id: item_id.clone(),
                ..Default::default()
            };
            let favorite = controller.toggle_favorite(&item).await?;
            println!("{item_id}: {}", if favorite { "favorite" } else { "not favorite" });
        }
        Command::ShuffleLibrary => {
            controller.model().queue.lock().await.set_queue_ref(QueueRef::Library);
            controller.shuffle(false).await?;
            out.print_queue(controller).await;
        }
        Command::Shuffle => {
            controller.shuffle(true).await?;
            out.print_queue(controller).await;
        }
        Command::Deshuffle => {
            controller.deshuffle().await?;
            out.print_queue(controller).await;
        }
        Command::Queue => out.print_queue(controller).await,
        Command::Play { start } => {
            let view = controller.load_tracks(PageRequest::Current).await?;
            let items: Vec<Item> = view
                .entries
                .iter()
                .filter_map(|entry| entry.as_item())
                .cloned()
                .collect();
            controller.play_items(QueueRef::Library, items, start).await?;
            out.print_queue(controller).await;
        }
        Command::Skip { index } => {
            controller.skip_to(index).await?;
            out.print_queue(controller).await;
        }
        Command::Sort { tab, by, descending } => {
            controller.set_sort(tab, by, descending).await?;
            let order = if descending { "descending" } else { "ascending" };
            println!("{tab:?} sorted by {by}, {order}");
        }
        Command::Settings { hide_run_times } => {
            let model = controller.model();
            if let Some(hide) = hide_run_times {
                model.settings.write().await.hide_run_times = hide;
                model.save_settings().await?;
            }
            let settings = model.settings.read().await;
            println!("hide run times: {}", settings.hide_run_times);
            println!("theme: {:?}", settings.theme);
        }
    }
    Ok(())
}

/// Plain-text rendering of views, honoring the display settings
struct Output {
    hide_run_times: bool,
}

impl Output {
    fn describe(&self, item: &Item) -> String {
        let mut line = item.display_name().to_string();
        if is_explicit(item) {
            line.push_str(" [E]");
        }
        if !item.artists.is_empty() {
            line.push_str(&format!(" - {}", format_artist_names(&item.artists)));
        }
        if let Some(secs) = item.duration_secs().filter(|_| !self.hide_run_times) {
            let secs = secs.round() as u64;
            line.push_str(&format!(" ({}:{:02})", secs / 60, secs % 60));
        }
        line
    }

    fn print_view(&self, view: &LibraryView, start: usize, single_section: bool) {
        if view.has_previous_page {
            println!("...");
        }
        let mut seen_section = false;
        for entry in view.entries.iter().skip(start) {
            match entry.as_item() {
                Some(item) => println!("  {}", self.describe(item)),
                None => {
                    if single_section && seen_section {
                        break;
                    }
                    seen_section = true;
                    if let Some(letter) = entry.as_section() {
                        println!("{letter}");
                    }
                }
            }
        }
        if view.has_next_page {
            println!("...");
        }
    }

    async fn print_queue(&self, controller: &AppController) {
        let state = controller.model().queue.lock().await;
        let shuffled = if state.is_shuffled() { " (shuffled)" } else { "" };
        println!("Queue{shuffled}: {:?}", state.queue_ref());
        if let Some(track) = state.current_track() {
            println!("Now playing: {}", self.describe(&track.item));
        }
        for (index, track) in state.queue().iter().enumerate() {
            let marker = if Some(index) == state.current_index() { ">" } else { " " };
            println!("{marker} {}", self.describe(&track.item));
        }
    }
}
