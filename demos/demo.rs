//! End-to-end demo of the Mail.tm client.
//!
//! Features demonstrated:
//! - Creating a client with diagnostics routed through `tracing`
//! - Creating a temporary mailbox with a generated login and password
//! - Listening for incoming messages until one arrives or the timeout passes
//!
//! Run with `RUST_LOG=mailtm_client=info cargo run --example demo`.

use mailtm_client::Client;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("📧 Mail.tm Rust Client - Demo");
    println!("{}", "=".repeat(50));

    println!("\n🔌 Creating client...");
    let mut client = Client::builder().verbose(true).build()?;

    println!("\n📬 Creating temporary mailbox...");
    let account = client.create_account(None, None).await?;
    println!("   ✅ Created: {}", account.address);
    println!("   🔑 Credentials: {account}");

    println!("\n⏳ Waiting for messages (2 minutes max)...");
    println!("   Send an email to: {}", account.address);

    let received = client
        .listen_messages_for(
            |message| {
                println!("\n   📨 From: {} <{}>", message.from.name, message.from.address);
                println!("      Subject: {}", message.subject);
                println!("      Received: {}", message.created_at);
                println!("      Preview: {}", message.intro);
                Some(message)
            },
            Duration::from_secs(120),
            Duration::from_secs(5),
        )
        .await?;

    match received {
        Some(message) => {
            println!("\n📄 Body ({} bytes):", message.size);
            println!("{}", message.text);
        }
        None => println!("\n⚠️  Timeout: no messages received after 2 minutes"),
    }

    println!("\n{}", "=".repeat(50));
    println!("🎉 Demo complete!");

    Ok(())
}
