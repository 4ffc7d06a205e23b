//! Content Resolver Integration Tests
//!
//! Exact and fallback-language resolution, bulk resolution, in-place updates
//! and soft deletion.

mod common;

#[cfg(test)]
mod content_resolver_tests {
    use super::common;
    use anyhow::Result;
    use docspace_core::utils::MarkdownRenderer;
    use docspace_core::{
        ContentDraft, ContentPatch, ContentQuery, ContentResolver, PageStatus, SpaceServiceError,
        TreeStore,
    };
    use std::sync::Arc;

    fn resolver(store: &common::TestStore) -> ContentResolver {
        ContentResolver::new(store.db.clone(), Arc::new(MarkdownRenderer::new()))
    }

    #[tokio::test]
    async fn test_exact_match_is_returned_unmodified() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let tree = TreeStore::new(store.db.clone());
        let node = tree.insert_child(space.id, space.homepage_id).await?;

        let attached = resolver
            .attach(
                &space,
                &node,
                ContentDraft::new(PageStatus::Draft, "Install", "Run **it**.").with_lang("de"),
            )
            .await?;
        assert_eq!(attached.short_title, "Install");
        assert_eq!(attached.html, "<p>Run <strong>it</strong>.</p>\n");

        let resolved = resolver.resolve(&node, &ContentQuery::new("de", "")).await?;
        assert_eq!(resolved, attached);
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_defaults_to_space_language() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let node = TreeStore::new(store.db.clone())
            .insert_child(space.id, space.homepage_id)
            .await?;

        let content = resolver(&store)
            .attach(&space, &node, ContentDraft::new(PageStatus::Published, "Intro", ""))
            .await?;
        assert_eq!(content.lang, "en");
        assert_eq!(content.version, "");
        assert_eq!(content.space_id, space.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_targets_space_fallback_language() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;

        // Only "en" exists: a "de" request falls back to "fr", which is absent
        let err = resolver
            .resolve(&homepage, &space.content_query(Some("de"), None))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        resolver
            .attach(
                &space,
                &homepage,
                ContentDraft::new(PageStatus::Published, "Accueil", "").with_lang("fr"),
            )
            .await?;
        let content = resolver
            .resolve(&homepage, &space.content_query(Some("de"), None))
            .await?;
        assert_eq!(content.lang, "fr");
        assert_eq!(content.title, "Accueil");
        Ok(())
    }

    #[tokio::test]
    async fn test_version_is_never_substituted() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;

        resolver
            .attach(
                &space,
                &homepage,
                ContentDraft::new(PageStatus::Published, "Accueil v2", "")
                    .with_lang("fr")
                    .with_version("v2"),
            )
            .await?;

        let err = resolver
            .resolve(&homepage, &space.content_query(Some("de"), Some("")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let v2 = resolver
            .resolve(&homepage, &space.content_query(Some("de"), Some("v2")))
            .await?;
        assert_eq!(v2.title, "Accueil v2");

        // "en" has only the default version
        let err = resolver
            .resolve(&homepage, &ContentQuery::new("en", "v2"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_default_version_alias() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;

        let content = resolver(&store)
            .resolve(&homepage, &ContentQuery::new("en", "default"))
            .await?;
        assert_eq!(content.title, space.name);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_many_prefers_exact_language() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let tree = TreeStore::new(store.db.clone());

        let both = tree.insert_child(space.id, space.homepage_id).await?;
        let fallback_only = tree.insert_child(space.id, space.homepage_id).await?;
        let neither = tree.insert_child(space.id, space.homepage_id).await?;

        for (node, lang, title) in [
            (&both, "de", "Beide"),
            (&both, "fr", "Les deux"),
            (&fallback_only, "fr", "Seulement"),
            (&neither, "en", "Only English"),
        ] {
            resolver
                .attach(
                    &space,
                    node,
                    ContentDraft::new(PageStatus::Published, title, "").with_lang(lang),
                )
                .await?;
        }

        let nodes = vec![both.clone(), fallback_only.clone(), neither.clone()];
        let resolved = resolver
            .resolve_many(&nodes, &space.content_query(Some("de"), None))
            .await?;

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[&both.id].title, "Beide");
        assert_eq!(resolved[&fallback_only.id].lang, "fr");
        assert!(!resolved.contains_key(&neither.id));

        assert!(resolver
            .resolve_many(&[], &ContentQuery::new("en", ""))
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_attach_conflicts() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;

        let err = resolver(&store)
            .attach(
                &space,
                &homepage,
                ContentDraft::new(PageStatus::Draft, "Again", "").with_version("default"),
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_rejects_node_of_other_space() -> Result<()> {
        let store = common::open_store().await?;
        let docs = common::create_space(&store, "docs").await?;
        let blog = common::create_space(&store, "blog").await?;
        let blog_home = TreeStore::new(store.db.clone())
            .get_node(blog.homepage_id)
            .await?;

        let err = resolver(&store)
            .attach(
                &docs,
                &blog_home,
                ContentDraft::new(PageStatus::Draft, "Wrong", "").with_lang("de"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceServiceError::ScopeMismatch { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_applies_only_provided_fields() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;
        let original = resolver
            .resolve(&homepage, &ContentQuery::new("en", ""))
            .await?;

        let retitled = resolver
            .update(&original, ContentPatch::new().with_title("Home"))
            .await?;
        assert_eq!(retitled.id, original.id);
        assert_eq!(retitled.title, "Home");
        assert_eq!(retitled.body, original.body);
        assert_eq!(retitled.html, original.html);
        assert_eq!(retitled.status, PageStatus::Published);

        let rebodied = resolver
            .update(
                &retitled,
                ContentPatch::new()
                    .with_body("~~old~~")
                    .with_status(PageStatus::Deprecated),
            )
            .await?;
        assert_eq!(rebodied.html, "<p><del>old</del></p>\n");
        assert_eq!(rebodied.status, PageStatus::Deprecated);
        assert_eq!(rebodied.title, "Home");

        let rows = common::count(&store.db, "SELECT COUNT(*) FROM page_contents").await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_soft_deleted_content_is_invisible() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;
        let content = resolver
            .resolve(&homepage, &ContentQuery::new("en", ""))
            .await?;

        resolver.soft_delete(&content).await?;

        assert!(resolver
            .resolve(&homepage, &ContentQuery::new("en", ""))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(resolver.find_exact(homepage.id, "en", "").await?.is_none());
        assert!(resolver
            .resolve_many(&[homepage.clone()], &ContentQuery::new("en", ""))
            .await?
            .is_empty());

        // The row is kept and still holds its key
        let rows = common::count(&store.db, "SELECT COUNT(*) FROM page_contents").await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_of_deleted_content_is_not_found() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let resolver = resolver(&store);
        let homepage = TreeStore::new(store.db.clone())
            .get_node(space.homepage_id)
            .await?;
        let stale = resolver
            .resolve(&homepage, &ContentQuery::new("en", ""))
            .await?;

        resolver.soft_delete(&stale).await?;

        let err = resolver
            .update(&stale, ContentPatch::new().with_title("Revived"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceServiceError::NotFound { entity: "content", .. }));

        let revived = common::count(
            &store.db,
            "SELECT COUNT(*) FROM page_contents WHERE title = 'Revived'",
        )
        .await?;
        assert_eq!(revived, 0);
        Ok(())
    }
}
