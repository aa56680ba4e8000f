//! Topic group commands: `radar groups` and `radar group create|edit|delete`.

use anyhow::Result;
use newsradar_core::models::{GroupDraft, GroupPatch, TopicGroup, Visibility};

use crate::app;
use crate::config::Config;

pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let dashboard = app::open(config).await?;
    let snapshot = dashboard.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.groups)?);
        return Ok(());
    }

    if snapshot.groups.is_empty() {
        println!("No topic groups.");
        return Ok(());
    }
    for group in &snapshot.groups {
        let marker = if snapshot.selection.group_id.as_ref() == Some(&group.id) {
            "*"
        } else {
            " "
        };
        print_group(marker, group);
    }
    Ok(())
}

fn print_group(marker: &str, group: &TopicGroup) {
    let visibility = match group.visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
    };
    println!("{} {}  {}  [{}]", marker, group.id, group.name, visibility);
    if !group.description.is_empty() {
        println!("      {}", group.description);
    }
}

pub async fn run_create(
    config: &Config,
    name: &str,
    description: Option<String>,
    public: bool,
) -> Result<()> {
    let dashboard = app::open(config).await?;
    let draft = GroupDraft {
        name: name.to_string(),
        description: description.unwrap_or_default(),
        visibility: if public {
            Visibility::Public
        } else {
            Visibility::Private
        },
    };
    let group = dashboard.create_group(&draft).await?;
    println!("Created group {} ({}).", group.name, group.id);
    Ok(())
}

pub async fn run_edit(config: &Config, group: &str, patch: GroupPatch) -> Result<()> {
    let dashboard = app::open(config).await?;
    let id = app::resolve_group(&dashboard, group)?;
    let updated = dashboard.edit_group(&id, &patch).await?;
    print_group(" ", &updated);
    Ok(())
}

pub async fn run_delete(config: &Config, group: &str) -> Result<()> {
    let dashboard = app::open(config).await?;
    let id = app::resolve_group(&dashboard, group)?;
    dashboard.delete_group(&id).await?;
    println!("Deleted group {}.", id);
    Ok(())
}
