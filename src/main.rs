use std::net::SocketAddr;
use std::sync::Arc;

use todo_backend::api;
use todo_backend::store::memory::MemoryStore;
use todo_backend::store::sqlite::SqliteStore;
use todo_backend::store::SharedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut bind_addr: Option<SocketAddr> = None;
    let mut backend = "memory".to_string();
    let mut db_path = "todos.db".to_string();
    let mut base_url: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--backend" => {
                backend = args[i + 1].clone();
                i += 2;
            }
            "--db" => {
                db_path = args[i + 1].clone();
                i += 2;
            }
            "--base-url" => {
                base_url = Some(args[i + 1].trim_end_matches('/').to_string());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(bind_addr) = bind_addr else {
        eprintln!(
            "Usage: {} --bind <addr:port> [--backend memory|sqlite] [--db <path>] [--base-url <url>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:8081", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:8081 --backend sqlite --db todos.db",
            args[0]
        );
        std::process::exit(1);
    };

    let base_url = base_url.unwrap_or_else(|| format!("http://{}", bind_addr));

    let store: SharedStore = match backend.as_str() {
        "memory" => Arc::new(MemoryStore::new(base_url.clone())),
        "sqlite" => Arc::new(SqliteStore::open(&db_path, base_url.clone())?),
        other => {
            eprintln!("Unknown backend {:?}, expected memory or sqlite", other);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting todo-backend on {}", bind_addr);
    tracing::info!("Backend: {}", backend);
    if backend == "sqlite" {
        tracing::info!("Database file: {}", db_path);
    }
    tracing::info!("Base URL: {}", base_url);

    let app = api::router(store);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");
    axum::serve(listener, app).await?;

    Ok(())
}
