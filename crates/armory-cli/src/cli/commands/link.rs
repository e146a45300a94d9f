//! Account-link callback command handler.

use std::sync::Arc;

use anyhow::Result;
use armory_core::caches::CacheRegistry;
use armory_core::callback::{CallbackOutcome, CallbackParams, CallbackReconciler};
use armory_core::client::ApiClient;
use armory_core::config::CoreConfig;
use armory_core::csrf::CsrfCache;

pub async fn process(url: &str) -> Result<()> {
    let config = CoreConfig::from_env()?;
    let csrf = Arc::new(CsrfCache::new(&config));
    let client = ApiClient::new(&config, csrf);
    let caches = Arc::new(CacheRegistry::new());
    let mut reconciler = CallbackReconciler::new(client, caches);

    let params = CallbackParams::from_url(url);
    match reconciler.process(&params).await {
        CallbackOutcome::AlreadyProcessed => println!("Callback already processed."),
        CallbackOutcome::Completed(result) => {
            if result.link_success {
                match result.battle_tag.as_deref() {
                    Some(tag) => println!("✓ Account linked ({tag})"),
                    None => println!("✓ Account linked"),
                }
                if result.auto_sync_triggered {
                    println!("  Character sync started.");
                }
                if result.show_onboarding {
                    println!("  Visit your profile to pick your main character.");
                }
            } else {
                println!("✗ Account linking failed");
            }
            println!("  Next: {}", result.navigation.to_path());
        }
    }
    Ok(())
}
