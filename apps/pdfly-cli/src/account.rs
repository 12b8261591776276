//! Session commands backed by a credential file in the user config directory

use crate::Command;
use anyhow::{bail, Context, Result};
use pdfly_session::{
    ClientConfig, CookieAttributes, FileCredentialStore, HttpAuthBackend, SessionManager,
};
use std::path::PathBuf;
use std::sync::Arc;

const CREDENTIAL_FILE: &str = "credentials.json";

pub async fn run(command: Command) -> Result<()> {
    let manager = session_manager()?;

    match command {
        Command::Signup {
            username,
            email,
            password,
        } => {
            if !manager.register(&username, &email, &password).await {
                bail!("signup failed");
            }
            println!("Account created for {}; run `pdfly login` to sign in", email);
        }
        Command::Login { email, password } => {
            if !manager.login(&email, &password).await {
                bail!("login failed");
            }
            if let Some(user) = manager.session().user {
                println!("Signed in as {} <{}>", user.username, user.email);
            }
        }
        Command::Logout => {
            manager.logout();
            println!("Signed out");
        }
        Command::Status => {
            if manager.start().await {
                if let Some(user) = manager.session().user {
                    println!("Signed in as {} <{}>", user.username, user.email);
                }
            } else {
                println!("Not signed in");
            }
        }
        other => bail!("not a session command: {:?}", other),
    }
    Ok(())
}

fn session_manager() -> Result<SessionManager> {
    let config = ClientConfig::from_env();
    let store = FileCredentialStore::new(
        credential_path()?,
        CookieAttributes::for_config(&config),
    );
    let backend = HttpAuthBackend::new(&config).context("building HTTP client")?;
    Ok(SessionManager::new(
        Arc::new(backend),
        Arc::new(store),
        config,
    ))
}

fn credential_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("no config directory for this platform")?;
    Ok(dir.join("pdfly").join(CREDENTIAL_FILE))
}
