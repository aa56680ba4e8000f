//! Session commands: `radar whoami`, `radar login`, `radar logout`.

use anyhow::Result;
use newsradar_core::models::AuthStatus;

use crate::app;
use crate::config::Config;

pub async fn run_whoami(config: &Config, json: bool) -> Result<()> {
    let dashboard = app::open(config).await?;
    let user = dashboard.session().current_user();

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }
    match user {
        Some(u) => println!("Signed in as {} <{}> (id {})", u.username, u.email, u.id),
        None => println!("Not signed in. Browsing public topic groups."),
    }
    Ok(())
}

pub async fn run_login(config: &Config, email: &str) -> Result<()> {
    let backend = crate::client::HttpBackend::new(&config.api)?;
    let session = newsradar_core::session::SessionGate::new();
    session
        .request_magic_link(&backend, email, config.auth.redirect_url.as_deref())
        .await?;
    println!("Sign-in link sent to {}.", email.trim());
    Ok(())
}

pub async fn run_logout(config: &Config) -> Result<()> {
    let dashboard = app::open(config).await?;
    if dashboard.auth() != AuthStatus::Authenticated {
        println!("Not signed in.");
        return Ok(());
    }
    dashboard.logout().await?;
    println!("Signed out.");
    Ok(())
}
