use std::path::{Path, PathBuf};

use feed_reconciler::sync::{FeedRefreshResult, RefreshStatus};
use feed_reconciler::{App, Config, Result};

const USAGE: &str = "\
usage: feed-reconciler [COMMAND]

  --refresh               refresh all feeds (respects refresh_limit_minutes)
  --force-refresh         refresh all feeds now
  --add <url> [category]  subscribe to a feed
  --remove <feed-id>      unsubscribe and drop its articles
  --import <file>         import subscriptions (.json export or .opml)
  --export <file>         export subscriptions as JSON
  --heal                  recompute unread counters
  --list                  list feeds (default)";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Initialize app
    let mut app = App::new(&config).await?;

    match args.get(1).map(String::as_str) {
        Some("--refresh") => {
            let results = app.refresh(false).await?;
            print_results(&results);
        }
        Some("--force-refresh") => {
            let results = app.refresh(true).await?;
            print_results(&results);
        }
        Some("--add") if args.len() >= 3 => {
            let category = args.get(3).cloned();
            let result = app.subscribe(&args[2], category).await?;
            println!("Subscribed to {} ({})", result.feed.title, result.feed.id);
            print_results(std::slice::from_ref(&result));
        }
        Some("--remove") if args.len() >= 3 => {
            app.unsubscribe(&args[2]).await?;
            println!("Unsubscribed {}", args[2]);
        }
        Some("--import") if args.len() >= 3 => {
            let path = PathBuf::from(&args[2]);
            let results = if is_opml(&path) {
                app.import_opml(&path).await?
            } else {
                app.import_json(&path).await?
            };
            println!("Imported {} feeds from {:?}", results.len(), path);
            print_results(&results);
        }
        Some("--export") if args.len() >= 3 => {
            let count = app.export_json(Path::new(&args[2])).await?;
            println!("Exported {} feeds to {}", count, args[2]);
        }
        Some("--heal") => {
            let corrected = app.heal_unread_counts().await?;
            println!("Corrected {} unread counters", corrected);
        }
        None | Some("--list") => list_feeds(&app),
        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn is_opml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("opml") || e.eq_ignore_ascii_case("xml"))
}

fn list_feeds(app: &App) {
    if app.feeds.is_empty() {
        println!("No feeds subscribed. Use `feed-reconciler --add <url>` to add one.");
        return;
    }

    for f in &app.feeds {
        let fetched = f
            .last_fetch_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{} | {} | {} unread | {} | last fetched: {}",
            f.id, f.title, f.unread_count, f.url, fetched
        );
    }
}

fn print_results(results: &[FeedRefreshResult]) {
    for r in results {
        match (r.status, &r.error) {
            (RefreshStatus::Failed, Some(err)) => println!("{}: ERROR {}", r.feed.title, err),
            (RefreshStatus::Throttled, _) => println!("{}: skipped (refresh limit)", r.feed.title),
            (RefreshStatus::Skipped, _) => println!("{}: skipped by upstream", r.feed.title),
            _ => println!(
                "{}: {} new, {} removed, {} unread",
                r.feed.title,
                r.new_articles.len(),
                r.evicted,
                r.feed.unread_count
            ),
        }
    }
}
