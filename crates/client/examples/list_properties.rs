//! Example: listing properties through the resilient API client
//!
//! Wires the client against the platform keychain, logs in when no
//! session is stored, and fetches the property list. Rate limiting and
//! token refresh happen transparently inside the client.
//!
//! Run with:
//! ```bash
//! TENORA_EMAIL=you@example.com TENORA_PASSWORD=secret \
//!     cargo run --example list_properties
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tenora_client::{ApiClient, ApiClientConfig, AuthService};
use tenora_common::auth::KeychainCredentialStore;
use tenora_common::security::KeychainProvider;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Property {
    id: String,
    name: String,
    city: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let store = KeychainCredentialStore::new(KeychainProvider::new("Tenora.api"));
    let client = ApiClient::builder()
        .config(ApiClientConfig::default())
        .credential_store(Arc::new(store))
        .build()?;

    let auth = AuthService::new(client.clone());

    if !auth.is_authenticated().await {
        let email = std::env::var("TENORA_EMAIL")?;
        let password = std::env::var("TENORA_PASSWORD")?;
        let user = auth.login(&email, &password).await?;
        println!("Logged in as {} {}", user.first_name, user.last_name);
    }

    let properties: Vec<Property> = client.get("/properties", &[("page", "1")], &[]).await?;

    println!("{} properties:", properties.len());
    for property in properties {
        println!("  {} - {} ({})", property.id, property.name, property.city);
    }

    Ok(())
}
