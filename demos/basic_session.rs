//! Basic Marionette session.
//!
//! Demonstrates:
//! - Connecting to a running Firefox (`firefox --marionette`)
//! - Navigation, element lookup, scripts
//! - Subscribing to pushed events
//!
//! Usage:
//!   cargo run --example basic_session
//!   cargo run --example basic_session -- --debug
//!   cargo run --example basic_session -- --port 2829

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use firefox_marionette::{By, Driver, Event, Listener, Result, Script};

// ============================================================================
// Constants
// ============================================================================

const URL: &str = "https://example.com";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    port: Option<u16>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let port = args
            .iter()
            .position(|a| a == "--port")
            .and_then(|i| args.get(i + 1))
            .and_then(|p| p.parse().ok());

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            port,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "firefox_marionette=debug"
    } else {
        "firefox_marionette=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Basic Marionette session ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    println!("[Setup] Connecting...");

    let mut builder = Driver::builder().implicit_wait(Duration::from_secs(2));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let browser = builder.build()?.connect().await?;
    let session = browser.session();

    println!(
        "        ✓ Session {} (event channel: {})\n",
        session.session_id().unwrap_or_default(),
        if browser.event_channel().is_some() { "open" } else { "unavailable" }
    );

    let listener = Listener::new(|event: &Event| {
        println!("    [event] {}", event.payload);
    });
    browser.subscribe("demo", &listener);

    // ========================================================================
    // Navigate
    // ========================================================================

    println!("[1] Navigate to {URL}...");
    session.navigate(URL).await?;
    println!("    Title: {}", session.title().await?);

    // ========================================================================
    // Find element
    // ========================================================================

    println!("\n[2] Find heading...");
    let heading = session.find_element(By::tag("h1")).await?;
    println!("    Text: {}", heading.text().await?);

    // ========================================================================
    // Script
    // ========================================================================

    println!("\n[3] Execute script...");
    let links = session
        .execute_script(&Script::new("return document.links.length"))
        .await?;
    println!("    Links: {links}");

    // ========================================================================
    // Cleanup
    // ========================================================================

    browser.unsubscribe(&listener);
    browser.close().await;
    println!("\n=== Done ===");

    Ok(())
}
