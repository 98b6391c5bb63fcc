//! docrelay - CRUD relay from HTTP to a document database
//!
//! Serves `/read`, `/insert`, `/update` and `/delete` against MongoDB, or against an
//! in-memory store for local development.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use docrelay::{
    backend::ConnectorBuilder,
    memory::InMemoryStore,
    mongodb::MongoDbConnector,
};
use docrelay_server::{DocRelayServer, ServerConfig};

#[derive(Parser)]
#[command(name = "docrelay")]
#[command(author, version, about = "docrelay - CRUD relay to a document database", long_about = None)]
struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "DOCRELAY_HOST")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value_t = 3000, env = "DOCRELAY_PORT")]
    port: u16,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", required_unless_present = "in_memory")]
    mongodb_uri: Option<String>,

    /// Application name reported to MongoDB
    #[arg(long, env = "DOCRELAY_APP_NAME")]
    app_name: Option<String>,

    /// Serve from an in-memory store instead of MongoDB
    #[arg(long)]
    in_memory: bool,

    /// Collection to create in the in-memory store, as DATABASE.COLLECTION (repeatable)
    #[arg(long = "collection", value_name = "DATABASE.COLLECTION", requires = "in_memory")]
    collections: Vec<String>,
}

impl Cli {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            mongodb_uri: self.mongodb_uri.clone(),
            app_name: self.app_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docrelay=info".parse()?)
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    if cli.in_memory {
        let mut builder = InMemoryStore::builder();

        for namespace in &cli.collections {
            let Some((database, collection)) = namespace.split_once('.') else {
                bail!("invalid collection \"{namespace}\", expected DATABASE.COLLECTION");
            };
            builder = builder.with_collection(database, collection);
        }

        info!(collections = cli.collections.len(), "Serving from an in-memory store");

        return Ok(DocRelayServer::new(config, builder.build().await?).run().await?);
    }

    let uri = config
        .mongodb_uri
        .as_deref()
        .context("MONGODB_URI must be set unless --in-memory is given")?;

    let mut builder = MongoDbConnector::builder(uri);

    if let Some(app_name) = &config.app_name {
        builder = builder.app_name(app_name.clone());
    }

    let connector = builder
        .build()
        .await
        .context("invalid MongoDB connection string")?;

    info!("Relaying to MongoDB");

    DocRelayServer::new(config, connector).run().await?;

    Ok(())
}
