use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use tracing::warn;

use app_settings::AppSettings;
use gallery::{Event, Filters, GalleryDb, PageInfo, Photo, EVENT_SORT_SAFELIST, PHOTO_SORT_SAFELIST};
use ingest::{ContentStore, ExiftoolExtractor, Ingestor, MagickThumbnailer};

#[derive(Parser)]
#[command(name = "gala", version, about = "Event-organized media gallery")]
struct Cli {
    /// Storage root holding originals and thumbnails.
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Path to the gallery database.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new event.
    CreateEvent {
        name: String,
        /// Day of the event (YYYY-MM-DD).
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Rename an event or change its day.
    UpdateEvent {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Delete an event, its photos, and their stored files.
    DeleteEvent { name: String },
    /// Ingest a file or a directory tree.
    Ingest {
        path: PathBuf,
        /// Event name to file the media under.
        #[arg(long)]
        event: Option<String>,
        /// exiftool command used for metadata extraction.
        #[arg(long, default_value = "exiftool")]
        exiftool: PathBuf,
        /// mogrify command used for still-image thumbnails.
        #[arg(long, default_value = "mogrify")]
        mogrify: PathBuf,
        /// magick command used for video thumbnails.
        #[arg(long, default_value = "magick")]
        magick: PathBuf,
    },
    /// Delete a single photo by file name (e.g. 12.jpg).
    DeletePhoto { file: String },
    /// List events.
    ListEvents {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
        #[arg(long, default_value = "day")]
        sort: String,
    },
    /// List photos, optionally restricted to one event.
    ListPhotos {
        #[arg(long)]
        event: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 10)]
        page_size: i64,
        #[arg(long, default_value = "taken_at")]
        sort: String,
    },
    /// Show the first photos of every event, in event-day order.
    Summary {
        #[arg(long, default_value_t = 3)]
        per_event: i64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = AppSettings::load().unwrap_or_default();
    let storage_root = cli
        .storage_root
        .clone()
        .or_else(|| settings.get_storage_root())
        .unwrap_or_else(|| PathBuf::from("storage"));
    let database = cli
        .database
        .clone()
        .or_else(|| settings.get_database_path())
        .unwrap_or_else(|| PathBuf::from("gala.db"));

    settings.set_storage_root(storage_root.clone());
    settings.set_database_path(database.clone());
    if let Err(err) = settings.save() {
        warn!(error = %err, "could not persist settings");
    }

    let db = GalleryDb::open(&database)
        .with_context(|| format!("failed to open gallery database at {}", database.display()))?;
    let content = ContentStore::new(storage_root);

    match cli.command {
        Command::CreateEvent { name, day } => create_event(&db, &name, day),
        Command::UpdateEvent { name, rename, day } => update_event(&db, &name, rename, day),
        Command::DeleteEvent { name } => delete_event(&db, &content, &name),
        Command::Ingest {
            path,
            event,
            exiftool,
            mogrify,
            magick,
        } => {
            let extractor = ExiftoolExtractor::new(exiftool);
            let thumbnailer = MagickThumbnailer::new(mogrify, magick);
            let ingestor = Ingestor::new(&db, &content, &extractor, &thumbnailer);
            ingest(&ingestor, &path, event.as_deref())
        }
        Command::DeletePhoto { file } => delete_photo(&db, &content, &file),
        Command::ListEvents {
            page,
            page_size,
            sort,
        } => list_events(&db, page, page_size, &sort),
        Command::ListPhotos {
            event,
            page,
            page_size,
            sort,
        } => list_photos(&db, event.as_deref(), page, page_size, &sort),
        Command::Summary { per_event } => summary(&db, per_event),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn create_event(db: &GalleryDb, name: &str, day: Option<NaiveDate>) -> Result<()> {
    if name.contains("..") {
        bail!("event names must not contain '..'");
    }
    let event = Event::insert(db, name, day.map(day_to_utc))?;
    println!("created event {} ({})", event.name, event.id);
    Ok(())
}

fn update_event(
    db: &GalleryDb,
    name: &str,
    rename: Option<String>,
    day: Option<NaiveDate>,
) -> Result<()> {
    let mut event = Event::get_by_name(db, name)
        .with_context(|| format!("no event named {name:?}"))?;
    if let Some(rename) = rename {
        if rename.contains("..") {
            bail!("event names must not contain '..'");
        }
        event.name = rename;
    }
    if let Some(day) = day {
        event.day = Some(day_to_utc(day));
    }
    event.update(db)?;
    println!("updated event {} (version {})", event.name, event.version);
    Ok(())
}

fn delete_event(db: &GalleryDb, content: &ContentStore, name: &str) -> Result<()> {
    let event = Event::get_by_name(db, name)
        .with_context(|| format!("no event named {name:?}"))?;
    let extractor = ExiftoolExtractor::default();
    let thumbnailer = MagickThumbnailer::default();
    let ingestor = Ingestor::new(db, content, &extractor, &thumbnailer);
    ingestor.delete_event(event.id)?;
    println!("deleted event {}", event.name);
    Ok(())
}

fn ingest(ingestor: &Ingestor<'_>, path: &Path, event: Option<&str>) -> Result<()> {
    if path.is_dir() {
        let report = ingestor.ingest_directory(path, event)?;
        println!(
            "ingested {} file(s), skipped {}, failed {}",
            report.ingested.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for (file, err) in &report.failed {
            println!("  failed {}: {err}", file.display());
        }
    } else {
        let photo = ingestor.ingest_file(path, event)?;
        println!("ingested {}", photo.file_name());
    }
    Ok(())
}

fn delete_photo(db: &GalleryDb, content: &ContentStore, file: &str) -> Result<()> {
    let photo = Photo::get_by_file(db, file)
        .with_context(|| format!("no photo stored as {file:?}"))?;
    let extractor = ExiftoolExtractor::default();
    let thumbnailer = MagickThumbnailer::default();
    let ingestor = Ingestor::new(db, content, &extractor, &thumbnailer);
    ingestor.delete_photo(photo.id)?;
    println!("deleted {}", photo.file_name());
    Ok(())
}

fn list_events(db: &GalleryDb, page: i64, page_size: i64, sort: &str) -> Result<()> {
    let filters = Filters::new(page, page_size, sort, EVENT_SORT_SAFELIST)?;
    for event in Event::list(db, &filters)? {
        println!(
            "{:>6}  {:<30}  {}",
            event.id,
            event.name,
            fmt_opt_day(event.day)
        );
    }
    Ok(())
}

fn list_photos(
    db: &GalleryDb,
    event: Option<&str>,
    page: i64,
    page_size: i64,
    sort: &str,
) -> Result<()> {
    let event_id = match event {
        Some(name) => Some(
            Event::get_by_name(db, name)
                .with_context(|| format!("no event named {name:?}"))?
                .id,
        ),
        None => None,
    };
    let filters = Filters::new(page, page_size, sort, PHOTO_SORT_SAFELIST)?;
    let (photos, info) = Photo::get_filtered(db, event_id, &filters)?;
    print_photos(&photos);
    print_page_info(&info);
    Ok(())
}

fn summary(db: &GalleryDb, per_event: i64) -> Result<()> {
    let photos = Photo::summary(db, per_event)?;
    print_photos(&photos);
    Ok(())
}

fn print_photos(photos: &[Photo]) {
    for photo in photos {
        let coords = match (photo.latitude, photo.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:+.5},{lon:+.5}"),
            _ => "-".to_string(),
        };
        println!(
            "{:<16}  {:<20}  {:<22}  event {}",
            photo.file_name(),
            fmt_opt_time(photo.taken_at),
            coords,
            photo
                .event
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_page_info(info: &PageInfo) {
    if info.total_records > 0 {
        println!(
            "page {}/{} ({} record(s))",
            info.current_page, info.last_page, info.total_records
        );
    }
}

fn day_to_utc(day: NaiveDate) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(day.and_time(NaiveTime::MIN), Utc)
}

fn fmt_opt_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_day(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
