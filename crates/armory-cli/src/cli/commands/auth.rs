//! Auth command handlers.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use armory_core::client::ApiClient;
use armory_core::config::CoreConfig;
use armory_core::csrf::CsrfCache;
use armory_core::error::AuthError;
use armory_core::navigation::Navigation;
use armory_core::session::SessionManager;

/// Set to skip opening the browser for the Google flow (tests, headless).
pub const NO_BROWSER_ENV: &str = "ARMORY_NO_BROWSER";

fn build_session() -> Result<SessionManager> {
    let config = CoreConfig::from_env()?;
    let csrf = Arc::new(CsrfCache::new(&config));
    Ok(SessionManager::new(ApiClient::new(&config, csrf)))
}

/// Turns a classified auth error into the copy the taxonomy prescribes.
fn display_error(err: &AuthError) -> anyhow::Error {
    let display = err.kind.display();
    anyhow::anyhow!("{}: {}", display.title, display.message)
}

fn read_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}

pub async fn login(username: Option<String>, google: bool) -> Result<()> {
    if google {
        return login_google().await;
    }
    let Some(username) = username else {
        anyhow::bail!("Please provide --username (or use --google)");
    };

    let password = read_password()?;
    let mut session = build_session()?;
    let nav = session
        .login(&username, &password)
        .await
        .map_err(|e| display_error(&e))?;

    println!("✓ Logged in as {username}");
    println!("  Next: {}", nav.to_path());
    Ok(())
}

async fn login_google() -> Result<()> {
    let mut session = build_session()?;
    let nav = session
        .login_with_google()
        .await
        .map_err(|e| display_error(&e))?;
    let Navigation::External(url) = nav else {
        anyhow::bail!("Backend did not issue a redirect URL");
    };

    println!("To continue, sign in with Google:");
    println!("  {url}");

    // Best effort; the URL above always works as a fallback.
    if std::env::var(NO_BROWSER_ENV).is_err() {
        let _ = open::that(&url);
    }
    Ok(())
}

pub async fn signup(username: &str, email: &str, captcha: Option<&str>) -> Result<()> {
    let password = read_password()?;
    let mut session = build_session()?;
    let nav = session
        .signup(username, email, &password, captcha)
        .await
        .map_err(|e| display_error(&e))?;

    println!("✓ Account created for {username}");
    println!("  Next: {}", nav.to_path());
    Ok(())
}

pub async fn logout() -> Result<()> {
    let mut session = build_session()?;
    let nav = session.logout().await;

    println!("✓ Logged out");
    println!("  Next: {}", nav.to_path());
    Ok(())
}

pub async fn status() -> Result<()> {
    let mut session = build_session()?;
    let state = session.check_auth().await;

    if state.is_authenticated() {
        match &state.user {
            Some(user) => println!("Logged in as {}", user.username),
            None => println!("Logged in"),
        }
    } else {
        println!("Not logged in");
    }
    Ok(())
}
