//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run a scripted sign-in and notes flow against the in-memory backend.
//! - Keep output deterministic apart from generated ids.

use quillnote_core::{QuillClient, Route};
use std::process::ExitCode;

const DEMO_EMAIL: &str = "demo@quillnote.dev";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    println!("quillnote_core ping={}", quillnote_core::ping());
    println!("quillnote_core version={}", quillnote_core::core_version());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("smoke flow failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), quillnote_core::CoreError> {
    let (client, backend) = QuillClient::in_memory();
    backend.seed_account(DEMO_EMAIL, DEMO_PASSWORD, "Demo");

    let route = client.start().await;
    println!("launch route={}", route.as_str());

    let identity = client.session().login(DEMO_EMAIL, DEMO_PASSWORD).await?;
    println!(
        "signed in as {} route={}",
        identity.display_name(),
        client.route(Route::Auth).as_str()
    );

    let first = client.notes().create("Groceries", "eggs, milk").await?;
    let second = client.notes().create("Ideas", "write a CLI").await?;
    client
        .notes()
        .update(&first.id, "Groceries", "eggs, milk, bread")
        .await?;
    client.notes().delete(&second.id).await?;

    for note in client.notes().fetch_all().await? {
        println!("note {} | {}", note.title_or_untitled(), note.preview(40));
    }

    client.session().logout().await?;
    println!(
        "signed out state={} notes={}",
        client.session().state().label(),
        client.notes().notes().len()
    );
    Ok(())
}
