//! Development Seed Binary
//!
//! Opens (or creates) a DocSpace store, seeds a demo space with a small page
//! tree in two languages, and prints the resulting forest.
//!
//! # Usage
//!
//! ```bash
//! # Seed the default database (./data/docspace.db)
//! cargo run --bin dev-seed
//!
//! # Custom database, verbose store logging
//! DOCSPACE_DATABASE_PATH=/tmp/demo.db RUST_LOG=docspace_core=trace cargo run --bin dev-seed
//! ```
//!
//! # Environment Variables
//!
//! - `DOCSPACE_DATABASE_PATH`: Database file (default: ./data/docspace.db)
//! - `DOCSPACE_BUSY_TIMEOUT_MS`: Lock wait before failing (default: 5000)
//! - `DOCSPACE_PAGE_SIZE`: Default listing page size (default: 20)
//! - `RUST_LOG`: Logging filter (default: "dev_seed=info,docspace_core=debug")
//!
//! Running it twice is harmless: an existing demo space is reused and only
//! printed.

use anyhow::Context;
use docspace_core::{
    ContentDraft, CreatePageParams, CreateSpaceParams, DescribePagesParams, DocSpace, Page,
    PageRequest, PageStatus, Space, SpaceStatus, StoreConfig,
};

const DEMO_KEY: &str = "demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("dev_seed=info,docspace_core=debug")
            }),
        )
        .init();

    let config = StoreConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Invalid store configuration: {}", e))?;
    tracing::info!("Database: {}", config.database_path.display());

    let docspace = DocSpace::open(config)
        .await
        .context("Failed to open store")?;

    let space = match docspace.spaces.get_space_by_key(DEMO_KEY).await {
        Ok(space) => {
            tracing::info!("Space '{}' already exists, skipping seed", DEMO_KEY);
            space
        }
        Err(e) if e.is_not_found() => seed(&docspace).await?,
        Err(e) => return Err(e.into()),
    };

    for lang in ["en", "fr"] {
        let forest = docspace
            .pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                lang: Some(lang.to_string()),
                ..Default::default()
            })
            .await?;

        println!("\n{} [{}]", space.name, lang);
        print_forest(&forest, 1);
    }

    let hits = docspace
        .search
        .search("en", "install", PageRequest::default())
        .await?;
    println!("\nSearch 'install' (en): {} hit(s)", hits.total);
    for hit in &hits.items {
        println!("  - {}", hit.page.title().unwrap_or("(untitled)"));
    }

    Ok(())
}

async fn seed(docspace: &DocSpace) -> anyhow::Result<Space> {
    let space = docspace
        .spaces
        .create_space(CreateSpaceParams {
            name: "Demo Documentation".to_string(),
            key: DEMO_KEY.to_string(),
            default_lang: "en".to_string(),
            fallback_lang: "en".to_string(),
            description: "# Demo\n\nA seeded space for local development.".to_string(),
            avatar: String::new(),
            status: SpaceStatus::Online,
            creator_id: 1,
        })
        .await
        .context("Failed to create demo space")?;

    let guide = add_page(
        docspace,
        &space,
        Some(space.homepage_id),
        "Getting Started",
        "Start here.",
    )
    .await?;
    let install = add_page(
        docspace,
        &space,
        Some(guide.id()),
        "Installation",
        "Install the CLI:\n\n```sh\ncurl -sSf https://example.com/install.sh | sh\n```",
    )
    .await?;
    add_page(
        docspace,
        &space,
        Some(guide.id()),
        "Configuration",
        "| key | default |\n|---|---|\n| `page_size` | 20 |",
    )
    .await?;
    add_page(
        docspace,
        &space,
        Some(space.homepage_id),
        "Reference",
        "- [x] CLI\n- [ ] HTTP API",
    )
    .await?;

    // French-only page: listed under "fr", absent from the "en" forest
    docspace
        .pages
        .create_page(CreatePageParams {
            space_id: space.id,
            parent_id: Some(install.id()),
            draft: ContentDraft::new(PageStatus::Published, "Dépannage", "Problèmes courants.")
                .with_lang("fr")
                .with_creator(1),
        })
        .await
        .context("Failed to create French page")?;

    tracing::info!("Seeded space '{}' ({})", space.key, space.id);
    Ok(space)
}

async fn add_page(
    docspace: &DocSpace,
    space: &Space,
    parent_id: Option<i64>,
    title: &str,
    body: &str,
) -> anyhow::Result<Page> {
    let page = docspace
        .pages
        .create_page(CreatePageParams {
            space_id: space.id,
            parent_id,
            draft: ContentDraft::new(PageStatus::Published, title, body).with_creator(1),
        })
        .await
        .with_context(|| format!("Failed to create page '{}'", title))?;
    Ok(page)
}

fn print_forest(pages: &[Page], level: usize) {
    for page in pages {
        let (title, lang) = page
            .content
            .as_ref()
            .map(|c| (c.title.as_str(), c.lang.as_str()))
            .unwrap_or(("(no content)", "-"));
        println!("{}{} ({}, #{})", "  ".repeat(level), title, lang, page.id());
        print_forest(&page.children, level + 1);
    }
}
