//! Feed commands: `radar feed`, `radar bookmark`, and `radar bookmarks`.

use anyhow::{bail, Result};
use newsradar_core::feed::FeedOutcome;
use newsradar_core::models::{ContentId, ViewContentItem};

use crate::app;
use crate::config::Config;

pub async fn run_feed(
    config: &Config,
    group: Option<&str>,
    topic: Option<&str>,
    pages: usize,
    json: bool,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    app::select(&dashboard, group, topic).await?;

    for _ in 1..pages.max(1) {
        match dashboard.load_more().await {
            FeedOutcome::Committed { .. } => {}
            FeedOutcome::Failed(message) => bail!("{}", message),
            FeedOutcome::Stale | FeedOutcome::Skipped => break,
        }
    }

    let snapshot = dashboard.snapshot();
    if let Some(error) = &snapshot.feed.error {
        bail!("{}", error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.feed.items)?);
        return Ok(());
    }

    if !snapshot.auth.is_authenticated() {
        println!("Sign in to see the content feed.");
        return Ok(());
    }

    let scope = snapshot
        .selection
        .topic_id
        .as_deref()
        .and_then(|id| snapshot.topics.iter().find(|t| t.id == id))
        .map(|t| t.term().to_string())
        .unwrap_or(snapshot.group_name);
    println!("{} ({} items)", scope, snapshot.feed.items.len());
    println!();
    for item in &snapshot.feed.items {
        print_item(item);
    }
    if snapshot.feed.has_more {
        println!("More available: rerun with --pages {}", pages.max(1) + 1);
    }
    Ok(())
}

fn print_item(item: &ViewContentItem) {
    let star = if item.is_bookmarked { "★" } else { " " };
    println!(
        "{} [{:>3}] {}  {}",
        star,
        item.relevance,
        item.timestamp.format("%Y-%m-%d"),
        item.title
    );
    let term = item.topic_term.as_deref().unwrap_or("");
    println!("        {}  #{}  {}  {}", item.source, item.id, term, item.url);
}

pub async fn run_bookmark(
    config: &Config,
    content_id: ContentId,
    group: Option<&str>,
    topic: Option<&str>,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    app::select(&dashboard, group, topic).await?;
    // Page forward until the item is loaded or the feed runs out.
    while dashboard.feed().item(content_id).is_none() {
        if !matches!(dashboard.load_more().await, FeedOutcome::Committed { .. }) {
            break;
        }
    }
    let bookmarked = dashboard.toggle_bookmark(content_id).await?;
    if bookmarked {
        println!("Bookmarked #{}.", content_id);
    } else {
        println!("Removed bookmark #{}.", content_id);
    }
    Ok(())
}

pub async fn run_bookmarks(config: &Config, json: bool) -> Result<()> {
    let dashboard = app::open(config).await?;
    let bookmarks = dashboard.bookmarks().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&bookmarks)?);
        return Ok(());
    }

    if bookmarks.is_empty() {
        println!("No bookmarks.");
        return Ok(());
    }
    for bookmark in &bookmarks {
        println!(
            "★ {}  #{}  {}",
            bookmark.created_at.format("%Y-%m-%d"),
            bookmark.content_id,
            bookmark.title
        );
        println!("        {}  {}", bookmark.topic_term(), bookmark.url);
    }
    Ok(())
}
