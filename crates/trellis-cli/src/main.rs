//! CLI entry point for the Trellis graph store.
//!
//! Pure pass-through to trellis-store: each subcommand maps onto one engine
//! operation, with no business logic beyond parameter parsing.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use trellis_core::NodeId;
use trellis_store::{GraphStore, StoreConfig};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Rooted typed-graph store over SQLite")]
struct Cli {
    /// Config file prefix (default: trellis).
    #[arg(short, long, default_value = "trellis")]
    config: String,

    /// Database URL override (e.g. sqlite://trellis.db).
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert a node and print its id.
    Insert {
        /// Type tag for the new node.
        #[arg(short = 't', long, default_value = "generic")]
        node_type: String,

        /// Opaque JSON properties payload.
        #[arg(short, long)]
        properties: Option<String>,
    },

    /// Delete a node. The root (id 1) is protected; children of the
    /// deleted node are not re-parented.
    Delete { node: i64 },

    /// Link child under parent with an adjacent edge (idempotent).
    Link { parent: i64, child: i64 },

    /// Remove the exact parent→child edge if present.
    Unlink { parent: i64, child: i64 },

    /// Delete every node except the root.
    DeleteAll,

    /// List all nodes.
    Nodes,

    /// List all edges.
    Edges,

    /// Transitive ancestors of a node, the node itself included.
    Ancestors {
        node: i64,

        /// Restrict to these type tags (comma-separated).
        #[arg(short = 't', long, value_delimiter = ',')]
        types: Vec<String>,
    },

    /// Transitive descendants of a node, the node itself included.
    Descendants {
        node: i64,

        /// Restrict to these type tags (comma-separated).
        #[arg(short = 't', long, value_delimiter = ',')]
        types: Vec<String>,
    },

    /// Populate a demo graph under the root.
    Seed {
        #[arg(long, default_value_t = 1000)]
        nodes: u32,

        #[arg(long, default_value_t = 1000)]
        edges: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let mut store_config = load_store_config(&cli.config)?;
    if let Some(url) = &cli.url {
        store_config.url = url.clone();
    }

    let store = GraphStore::connect(&store_config).await?;

    match cli.command {
        Command::Insert {
            node_type,
            properties,
        } => {
            let payload = properties
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?;
            let id = store.insert_node(&node_type, payload.as_ref()).await?;
            println!("{}", serde_json::json!({ "id": id }));
        }
        Command::Delete { node } => {
            store.delete_node(NodeId(node)).await?;
            println!("{}", serde_json::json!({ "ok": true }));
        }
        Command::Link { parent, child } => {
            store.link_child(NodeId(parent), NodeId(child)).await?;
            println!("{}", serde_json::json!({ "ok": true }));
        }
        Command::Unlink { parent, child } => {
            store.unlink_child(NodeId(parent), NodeId(child)).await?;
            println!("{}", serde_json::json!({ "ok": true }));
        }
        Command::DeleteAll => {
            store.delete_all().await?;
            println!("{}", serde_json::json!({ "ok": true }));
        }
        Command::Nodes => {
            let nodes = store.list_nodes().await?;
            println!("{}", serde_json::to_string(&nodes)?);
        }
        Command::Edges => {
            let edges = store.list_edges().await?;
            println!("{}", serde_json::to_string(&edges)?);
        }
        Command::Ancestors { node, types } => {
            let nodes = store.ancestors_of(NodeId(node), &types).await?;
            println!("{}", serde_json::to_string(&nodes)?);
        }
        Command::Descendants { node, types } => {
            let nodes = store.descendants_of(NodeId(node), &types).await?;
            println!("{}", serde_json::to_string(&nodes)?);
        }
        Command::Seed { nodes, edges } => {
            store.seed_graph(nodes, edges).await?;
            println!("{}", serde_json::json!({ "ok": true }));
        }
    }

    Ok(())
}

/// Load store configuration from `<prefix>.toml` and `TRELLIS__`-prefixed
/// environment variables, falling back to a file-backed default database.
fn load_store_config(file_prefix: &str) -> anyhow::Result<StoreConfig> {
    let defaults = StoreConfig::default();
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("TRELLIS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(StoreConfig {
        // The CLI is invocation-per-operation, so the library's in-memory
        // default would lose the graph between commands.
        url: cfg
            .get_string("store.url")
            .unwrap_or_else(|_| "sqlite://trellis.db".to_string()),
        max_connections: cfg
            .get_int("store.max_connections")
            .map(|v| v as u32)
            .unwrap_or(defaults.max_connections),
        acquire_timeout_secs: cfg
            .get_int("store.acquire_timeout_secs")
            .map(|v| v as u64)
            .unwrap_or(defaults.acquire_timeout_secs),
        busy_warn_secs: cfg
            .get_int("store.busy_warn_secs")
            .map(|v| v as u64)
            .unwrap_or(defaults.busy_warn_secs),
    })
}
