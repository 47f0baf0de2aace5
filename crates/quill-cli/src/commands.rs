use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use quill_client::{RemoteEngine, RpcClient, RpcClientConfig};
use quill_image::{DiskImageStore, ImageService};
use quill_server::RpcServer;
use quill_store::{DiskEngine, Engine, InMemoryEngine};
use quill_types::{InfoRequest, PostInfo};
use tokio::sync::watch;

use crate::cli::*;
use crate::config::{Backend, QuillConfig};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = QuillConfig::load(&cli.config)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Posts(args) => cmd_posts(&config, args, &cli.format),
    }
}

fn cmd_serve(mut config: QuillConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind}"))?;
    }
    if args.memory {
        config.store.backend = Backend::Memory;
    }
    let runtime = tokio::runtime::Runtime::new().context("can't start async runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: QuillConfig) -> anyhow::Result<()> {
    let engine = open_engine(&config)?;
    let store = Arc::new(
        DiskImageStore::open(&config.image.path)
            .with_context(|| format!("can't open image store {}", config.image.path.display()))?,
    );
    let images = Arc::new(ImageService::new(store.clone(), config.image_service_config()));

    let server = Arc::new(RpcServer::new(config.server_config()));
    server.register_engine(Arc::clone(&engine));
    server.register_admin(Arc::new(config.admin_store()));
    server.register_images(store);

    let (stop_cleanup, cleanup_rx) = watch::channel(false);
    let cleanup = {
        let images = Arc::clone(&images);
        tokio::spawn(async move { images.run_cleanup(cleanup_rx).await })
    };
    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "can't listen for interrupt");
                return;
            }
            tracing::info!("interrupt received, shutting down");
            if let Err(err) = server.shutdown().await {
                tracing::warn!(error = %err, "shutdown failed");
            }
        });
    }

    println!(
        "{} Quill storage on {} ({:?} backend, {} methods)",
        "✓".green().bold(),
        config.endpoint_url().bold(),
        config.store.backend,
        server.method_names().len(),
    );
    let served = server.run().await;

    stop_cleanup.send_replace(true);
    if let Err(err) = cleanup.await {
        tracing::warn!(error = %err, "image cleanup task failed");
    }
    images.shutdown().await;
    engine.close().context("can't close comment store")?;
    served.context("rpc server failed")?;
    println!("{} Stopped.", "✓".green());
    Ok(())
}

fn open_engine(config: &QuillConfig) -> anyhow::Result<Arc<dyn Engine>> {
    let engine: Arc<dyn Engine> = match config.store.backend {
        Backend::Disk => Arc::new(
            DiskEngine::open(config.disk_engine_config())
                .with_context(|| format!("can't open comment store {}", config.store.path.display()))?,
        ),
        Backend::Memory => {
            let mut engine = InMemoryEngine::with_sites(config.store.sites.clone());
            if let Some(age) = config.read_only_age() {
                engine = engine.with_read_only_age(age);
            }
            Arc::new(engine)
        }
    };
    Ok(engine)
}

fn cmd_posts(config: &QuillConfig, args: PostsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let engine: Arc<dyn Engine> = if args.remote {
        let mut client = RpcClientConfig::new(config.endpoint_url());
        client.auth = config.server.auth.clone();
        Arc::new(RemoteEngine::new(Arc::new(RpcClient::new(client)?)))
    } else {
        open_engine(config).context("is the server running? try --remote")?
    };

    let posts = engine
        .info(&InfoRequest::for_site(&args.site, args.limit, args.skip))
        .with_context(|| format!("can't list posts of {}", args.site))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&posts)?),
        OutputFormat::Text => print_posts(&args.site, &posts),
    }

    if !args.remote {
        engine.close()?;
    }
    Ok(())
}

fn print_posts(site: &str, posts: &[PostInfo]) {
    if posts.is_empty() {
        println!("No posts on {}.", site.bold());
        return;
    }
    for post in posts {
        let read_only = if post.read_only {
            format!(" {}", "read-only".red())
        } else {
            String::new()
        };
        println!(
            "{}  {} comments  {} .. {}{}",
            post.url.blue(),
            post.count.to_string().bold(),
            post.first_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            post.last_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            read_only,
        );
    }
}
