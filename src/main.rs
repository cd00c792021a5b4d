use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use post_ingest::{crawl, db, export, parser};

#[derive(Parser)]
#[command(name = "post_ingest", about = "Scraped blog posts to structured block documents")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = db::DEFAULT_DB_PATH)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import blog pages from a crawl result JSON file
    Import {
        /// Crawl output (plain or wrapped as [{"type":"text","text":...}])
        crawl: PathBuf,
    },
    /// Extract article bodies and convert them to block documents
    Process {
        /// Max posts to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Convert a single scraped file and print the document as JSON
    Convert {
        /// Input file, or "-" for stdin
        input: PathBuf,
        /// Post title, used to find where the article starts
        #[arg(short, long)]
        title: Option<String>,
        /// Input is already clean markdown; skip body extraction
        #[arg(long)]
        raw: bool,
    },
    /// Write processed documents to a JSON file for content-store import
    Export {
        /// Output path
        out: PathBuf,
    },
    /// Show import/processing statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { crawl: path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let pages = crawl::parse_crawl(&raw)?;
            let conn = open_db(&cli.db)?;
            let inserted = db::insert_posts(&conn, &pages)?;
            println!("Imported {} new posts ({} blog pages in crawl)", inserted, pages.len());
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = open_db(&cli.db)?;
            let posts = db::fetch_unprocessed(&conn, limit)?;
            if posts.is_empty() {
                println!("No unprocessed posts. Run 'import' first.");
                return Ok(());
            }
            println!("Processing {} posts...", posts.len());
            let counts = process_posts(&conn, &posts)?;
            counts.print();
            Ok(())
        }
        Commands::Convert { input, title, raw } => {
            let text = read_input(&input)?;
            let doc = parser::convert_text(&text, title.as_deref(), !raw);
            if doc.is_empty() {
                warn!("No blocks produced from {}", input.display());
            }
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        Commands::Export { out } => {
            let conn = open_db(&cli.db)?;
            let rows = db::fetch_documents(&conn)?;
            let data = export::build_export(rows, chrono::Utc::now())?;
            export::write_export(&out, &data)?;
            println!(
                "Exported {} posts ({} excerpt only) to {}",
                data.total_posts,
                data.with_excerpt_only,
                out.display()
            );
            Ok(())
        }
        Commands::Stats => {
            let conn = open_db(&cli.db)?;
            let s = db::get_stats(&conn)?;
            println!("Imported:     {}", s.imported);
            println!("Processed:    {}", s.processed);
            println!("Unprocessed:  {}", s.unprocessed);
            println!("Full content: {}", s.full_content);
            println!("Excerpt only: {}", s.excerpt_only);
            println!("Blocks:       {}", s.blocks);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_db(path: &Path) -> anyhow::Result<rusqlite::Connection> {
    let conn = db::connect(path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn read_input(input: &Path) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

struct ProcessCounts {
    posts: usize,
    full: usize,
    excerpt_only: usize,
    blocks: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} posts: {} with full content, {} excerpt only, {} blocks.",
            self.posts, self.full, self.excerpt_only, self.blocks,
        );
    }
}

fn process_posts(
    conn: &rusqlite::Connection,
    posts: &[db::StoredPost],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(posts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        posts: 0,
        full: 0,
        excerpt_only: 0,
        blocks: 0,
    };

    for chunk in posts.chunks(500) {
        let results: Vec<_> = chunk.par_iter().map(parser::process_post).collect();

        for p in &results {
            if p.has_full_content() {
                counts.full += 1;
                counts.blocks += p.block_count();
            } else {
                counts.excerpt_only += 1;
                info!("{}: body too short, keeping as excerpt", p.slug);
            }
        }
        counts.posts += results.len();

        db::save_documents(conn, &results)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
