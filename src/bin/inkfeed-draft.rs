use std::sync::Arc;

use inkfeed::{
    client::{AUTOSAVE_INTERVAL, ApiClient, DraftSync, LocalStore, spawn_autosave},
    error::Result,
};
use tokio::sync::watch;

const DEFAULT_SERVER: &str = "http://localhost:9080";
const DEFAULT_DIR: &str = ".inkfeed";

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: inkfeed-draft <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  register <username> <password>");
    eprintln!("  login <username> <password>");
    eprintln!("  logout");
    eprintln!("  load                    reconcile local and remote draft, print it");
    eprintln!("  edit <title> <file>     save <file> as the draft body, then sync");
    eprintln!("  sync                    push unsynced local changes");
    eprintln!("  watch                   sync every 30s until Ctrl-C");
    eprintln!("  publish                 publish the draft as an article");
    eprintln!();
    eprintln!("Env: INKFEED_SERVER (default {DEFAULT_SERVER}), INKFEED_DRAFT_DIR (default {DEFAULT_DIR})");
    std::process::exit(1);
}

fn arg(args: &mut impl Iterator<Item = String>, name: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("Missing <{name}>");
        print_usage_and_exit();
    })
}

#[tokio::main]
async fn main() {
    inkfeed::init_tracing();

    if let Err(e) = run().await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| print_usage_and_exit());

    let server = std::env::var("INKFEED_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
    let dir = std::env::var("INKFEED_DRAFT_DIR").unwrap_or_else(|_| DEFAULT_DIR.to_string());

    let store = LocalStore::open(dir)?;
    let client = ApiClient::new(server, store.clone())?;
    let sync = DraftSync::new(store, client.clone(), true);

    match command.as_str() {
        "register" => {
            let username = arg(&mut args, "username");
            let password = arg(&mut args, "password");
            let view = client.register(&username, &password).await?;
            println!("✅ {} (id {})", view.msg, view.user_id);
        }
        "login" => {
            let username = arg(&mut args, "username");
            let password = arg(&mut args, "password");
            let view = client.login(&username, &password).await?;
            println!("✅ logged in as {}", view.user.username);
        }
        "logout" => {
            client.logout().await?;
            println!("✅ logged out");
        }
        "load" => match sync.load().await? {
            Some(draft) => {
                println!("# {} ({:?})", draft.title, draft.source);
                println!("{}", draft.content);
            }
            None => println!("ℹ️ no draft"),
        },
        "edit" => {
            let title = arg(&mut args, "title");
            let file = arg(&mut args, "file");
            let content = tokio::fs::read_to_string(file).await?;
            sync.record_edit(&title, &content)?;
            if sync.sync_now().await {
                println!("✅ saved and synced");
            } else {
                println!("ℹ️ saved locally");
            }
        }
        "sync" => {
            if sync.sync_now().await {
                println!("✅ synced");
            } else {
                println!("ℹ️ nothing synced");
            }
        }
        "watch" => {
            sync.load().await?;
            let sync = Arc::new(sync);
            let (tx, rx) = watch::channel(false);
            let handle = spawn_autosave(sync.clone(), AUTOSAVE_INTERVAL, rx);

            println!("ℹ️ syncing every {}s, Ctrl-C to stop", AUTOSAVE_INTERVAL.as_secs());
            tokio::signal::ctrl_c().await?;

            let _ = tx.send(true);
            let _ = handle.await;
        }
        "publish" => {
            let Some(draft) = sync.local().draft()? else {
                println!("ℹ️ no draft to publish");
                return Ok(());
            };
            let article = client.publish(&draft.title, &draft.content).await?;
            sync.on_published().await?;

            let tags: Vec<&str> = article.tags.iter().map(|t| t.name.as_str()).collect();
            println!("✅ published #{} tags: [{}]", article.id, tags.join(", "));
        }
        _ => print_usage_and_exit(),
    }

    Ok(())
}
