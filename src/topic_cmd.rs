//! Topic commands: `radar topics`, `radar topic create|edit|delete|run|sources`,
//! and `radar executions`.

use anyhow::Result;
use newsradar_core::backend::ExecutionQuery;
use newsradar_core::models::{
    Execution, ExecutionStatus, Initiator, Topic, TopicDraft, TopicFilters, TopicPatch,
};

use crate::app;
use crate::config::Config;

/// List the group's topics, or only those with a query equal to `search`.
pub async fn run_list(
    config: &Config,
    group: Option<&str>,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    app::select(&dashboard, group, None).await?;
    let snapshot = dashboard.snapshot();
    let topics = match search {
        Some(term) => dashboard.search_topics(term).await?,
        None => snapshot.topics,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&topics)?);
        return Ok(());
    }

    println!("{}", snapshot.group_name);
    if topics.is_empty() {
        println!("  (no topics)");
        return Ok(());
    }
    for topic in &topics {
        print_topic(topic);
    }
    Ok(())
}

fn print_topic(topic: &Topic) {
    let status = if topic.is_active { "active" } else { "paused" };
    println!("  {}  {}  [{}]", topic.id, topic.term(), status);
    if topic.queries.len() > 1 {
        println!("      also: {}", topic.queries[1..].join(", "));
    }
    if let Some(fetched) = topic.last_fetched_at {
        println!(
            "      last fetched {}, {} sources",
            fetched.format("%Y-%m-%d %H:%M"),
            topic.content_source_count
        );
    }
}

pub async fn run_create(
    config: &Config,
    queries: Vec<String>,
    group: Option<&str>,
    filters: TopicFilters,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    let group_id = match group {
        Some(g) => Some(app::resolve_group(&dashboard, g)?),
        None => None,
    };
    let draft = TopicDraft {
        queries,
        group_id,
        filters,
    };
    let topic = dashboard.create_topic(&draft).await?;
    println!("Created topic {} ({}).", topic.term(), topic.id);
    Ok(())
}

pub async fn run_edit(config: &Config, id: &str, patch: TopicPatch) -> Result<()> {
    let dashboard = app::open(config).await?;
    let topic = dashboard.update_topic(id, &patch).await?;
    print_topic(&topic);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let dashboard = app::open(config).await?;
    dashboard.delete_topic(id).await?;
    println!("Deleted topic {}.", id);
    Ok(())
}

/// Run a web search for a topic now.
pub async fn run_search(config: &Config, id: &str, json: bool) -> Result<()> {
    let dashboard = app::open(config).await?;
    let run = dashboard.run_topic(id, Initiator::Cli).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }
    match run.content_item_id {
        Some(item) => println!("Search run {} added content #{}.", run.execution_id, item),
        None => println!("Search run {} found nothing new.", run.execution_id),
    }
    Ok(())
}

pub async fn run_sources(config: &Config, id: &str, json: bool) -> Result<()> {
    let dashboard = app::open(config).await?;
    let sources = dashboard.topic_sources(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    let term = sources.queries.first().map(String::as_str).unwrap_or(id);
    println!("{} ({} sources)", term, sources.sources.len());
    for source in &sources.sources {
        let seen = source
            .last_seen
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>3}x  {}  {}", source.content_item_count, seen, source.url);
        if !source.title.is_empty() {
            println!("        {}", source.title);
        }
    }
    Ok(())
}

pub async fn run_executions(
    config: &Config,
    status: Option<ExecutionStatus>,
    initiator: Option<Initiator>,
    json: bool,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    let executions = dashboard
        .executions(&ExecutionQuery { status, initiator })
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("No search runs.");
        return Ok(());
    }
    for execution in &executions {
        print_execution(execution);
    }
    Ok(())
}

fn print_execution(execution: &Execution) {
    let produced = execution
        .content_item_id
        .map(|id| format!("#{}", id))
        .unwrap_or_default();
    println!(
        "{:>5}  {}  {:<9}  {:<8}  {}",
        execution.id,
        execution.created_at.format("%Y-%m-%d %H:%M"),
        execution.status.as_str(),
        execution.initiator.as_str(),
        produced
    );
    if let Some(error) = &execution.error_message {
        println!("       {}", error);
    }
}
