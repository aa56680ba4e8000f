//! Shared setup for CLI commands: build a [`Dashboard`] over the HTTP
//! backend, resolve the session, and apply an explicit selection.

use std::sync::Arc;

use anyhow::{bail, Result};
use newsradar_core::Dashboard;

use crate::client::HttpBackend;
use crate::config::Config;
use crate::logging::LogObserver;

/// Connect, check the session, and load groups, topics, and the feed.
pub async fn open(config: &Config) -> Result<Dashboard> {
    let backend = HttpBackend::new(&config.api)?;
    let dashboard = Dashboard::new(Arc::new(backend), config.feed.page_size);
    dashboard.subscribe(Arc::new(LogObserver));
    dashboard.refresh_session().await;
    dashboard.sync().await?;
    Ok(dashboard)
}

/// Find a group by id or, failing that, by case-insensitive name.
pub fn resolve_group(dashboard: &Dashboard, needle: &str) -> Result<String> {
    let groups = dashboard.groups().groups();
    if let Some(g) = groups.iter().find(|g| g.id == needle) {
        return Ok(g.id.clone());
    }
    let matches: Vec<_> = groups
        .iter()
        .filter(|g| g.name.eq_ignore_ascii_case(needle))
        .collect();
    match matches.as_slice() {
        [g] => Ok(g.id.clone()),
        [] => bail!("No topic group matches '{}'", needle),
        _ => bail!("'{}' matches more than one group; use its id", needle),
    }
}

/// Select `group` and then `topic`. A topic given without a group selects
/// the topic's own group first; an ungrouped topic clears the group.
pub async fn select(dashboard: &Dashboard, group: Option<&str>, topic: Option<&str>) -> Result<()> {
    match (group, topic) {
        (Some(g), _) => {
            let id = resolve_group(dashboard, g)?;
            dashboard.select_group(Some(&id)).await?;
        }
        (None, Some(t)) => match dashboard.topics().get(t) {
            Some(found) => {
                dashboard.select_group(found.group_id.as_deref()).await?;
            }
            None => bail!("Topic not found: {}", t),
        },
        (None, None) => {}
    }
    if let Some(t) = topic {
        dashboard.select_topic(Some(t)).await?;
    }
    Ok(())
}
