//! Page Service Integration Tests
//!
//! Page creation, forest listing, detail views with ancestor chains and
//! content edits, all through the `DocSpace` facade.

mod common;

#[cfg(test)]
mod page_service_tests {
    use super::common;
    use anyhow::Result;
    use docspace_core::{
        flatten, ContentDraft, ContentPatch, CreatePageParams, DescribePagesParams, Page,
        PageStatus, PageService, Space, SpaceServiceError, TreeStore, UpdatePageParams,
    };

    async fn create(
        pages: &PageService,
        space: &Space,
        parent_id: Option<i64>,
        title: &str,
    ) -> Result<Page> {
        Ok(pages
            .create_page(CreatePageParams {
                space_id: space.id,
                parent_id,
                draft: ContentDraft::new(PageStatus::Published, title, format!("About {}", title)),
            })
            .await?)
    }

    fn titles(pages: &[Page]) -> Vec<String> {
        pages
            .iter()
            .map(|p| p.title().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_forest_follows_document_order() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;

        let c1 = create(pages, &space, Some(space.homepage_id), "Guide").await?;
        create(pages, &space, Some(space.homepage_id), "Reference").await?;
        create(pages, &space, Some(c1.id()), "Install").await?;

        let forest = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                ..Default::default()
            })
            .await?;

        assert_eq!(forest.len(), 1);
        let root = &forest[0];
        assert_eq!(root.id(), space.homepage_id);
        assert_eq!(titles(&root.children), vec!["Guide", "Reference"]);
        assert_eq!(titles(&root.children[0].children), vec!["Install"]);
        assert_eq!(flatten(&forest).len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_created_page_content_defaults() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;

        let page = create(&store.docspace.pages, &space, Some(space.homepage_id), "Guide").await?;
        let content = page.content.as_ref().expect("content");
        assert_eq!(content.lang, "en");
        assert_eq!(content.short_title, "Guide");
        assert_eq!(content.html, "<p>About Guide</p>\n");
        assert_eq!(page.node.depth, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_describe_pages_max_depth_and_parent() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;

        let guide = create(pages, &space, Some(space.homepage_id), "Guide").await?;
        let install = create(pages, &space, Some(guide.id()), "Install").await?;
        create(pages, &space, Some(install.id()), "Linux").await?;
        create(pages, &space, Some(guide.id()), "Configure").await?;

        let shallow = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                max_depth: Some(1),
                ..Default::default()
            })
            .await?;
        assert_eq!(flatten(&shallow).len(), 2);

        let subtree = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                parent_id: Some(guide.id()),
                ..Default::default()
            })
            .await?;
        assert_eq!(titles(&subtree), vec!["Install", "Configure"]);
        assert_eq!(titles(&subtree[0].children), vec!["Linux"]);

        let nested = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                parent_id: Some(install.id()),
                ..Default::default()
            })
            .await?;
        assert_eq!(titles(&nested), vec!["Linux"]);
        assert!(nested[0].children.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_omits_pages_without_content() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;

        create(pages, &space, Some(space.homepage_id), "Guide").await?;
        let german = pages
            .create_page(CreatePageParams {
                space_id: space.id,
                parent_id: Some(space.homepage_id),
                draft: ContentDraft::new(PageStatus::Published, "Anleitung", "").with_lang("de"),
            })
            .await?;

        let forest = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                lang: Some("de".to_string()),
                ..Default::default()
            })
            .await?;
        // The "en" homepage has no "de"/"fr" row, so its subtree is not listed
        assert!(forest.is_empty());

        let subtree = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                lang: Some("de".to_string()),
                parent_id: Some(space.homepage_id),
                ..Default::default()
            })
            .await?;
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].id(), german.id());
        Ok(())
    }

    #[tokio::test]
    async fn test_describe_page_with_parents() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;

        let guide = create(pages, &space, Some(space.homepage_id), "Guide").await?;
        let install = create(pages, &space, Some(guide.id()), "Install").await?;

        let page = pages
            .describe_page(space.id, install.id(), None, None)
            .await?;
        assert_eq!(page.title(), Some("Install"));
        assert_eq!(titles(&page.parents), vec!["Space docs", "Guide"]);

        let root = pages
            .describe_page(space.id, space.homepage_id, None, None)
            .await?;
        assert!(root.parents.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_describe_page_scoped_to_space() -> Result<()> {
        let store = common::open_store().await?;
        let docs = common::create_space(&store, "docs").await?;
        let blog = common::create_space(&store, "blog").await?;

        let err = store
            .docspace
            .pages
            .describe_page(docs.id, blog.homepage_id, None, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_page_targets_exact_row() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;
        let guide = create(pages, &space, Some(space.homepage_id), "Guide").await?;

        let updated = pages
            .update_page(
                guide.id(),
                UpdatePageParams {
                    patch: ContentPatch::new().with_title("User Guide"),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(updated.title(), Some("User Guide"));

        // No "fr" row: no fallback for updates
        let err = pages
            .update_page(
                guide.id(),
                UpdatePageParams {
                    lang: Some("fr".to_string()),
                    patch: ContentPatch::new().with_title("Guide"),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_content_disappears_from_reads() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;
        let guide = create(pages, &space, Some(space.homepage_id), "Guide").await?;

        pages.delete_page_content(guide.id(), None, None).await?;

        let err = pages
            .describe_page(space.id, guide.id(), None, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let forest = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                ..Default::default()
            })
            .await?;
        assert!(forest[0].children.is_empty());

        // The node stays in the tree
        let tree = TreeStore::new(store.db.clone());
        assert_eq!(tree.get_node(guide.id()).await?.parent_id, Some(space.homepage_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_render_leaves_tree_untouched() -> Result<()> {
        let store = common::open_store_with(common::failing_renderer()).await?;
        let space = common::create_space(&store, "docs").await?;
        let tree = TreeStore::new(store.db.clone());
        let root_before = tree.get_node(space.homepage_id).await?;

        let err = store
            .docspace
            .pages
            .create_page(CreatePageParams {
                space_id: space.id,
                parent_id: Some(space.homepage_id),
                draft: ContentDraft::new(PageStatus::Draft, "Broken", "boom"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceServiceError::RenderFailed(_)));

        let root_after = tree.get_node(space.homepage_id).await?;
        assert_eq!(root_after, root_before);
        assert_eq!(tree.list_nodes(space.id, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_page_checks_scope() -> Result<()> {
        let store = common::open_store().await?;
        let docs = common::create_space(&store, "docs").await?;
        let blog = common::create_space(&store, "blog").await?;
        let pages = &store.docspace.pages;

        let err = create(pages, &docs, Some(blog.homepage_id), "Stray")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpaceServiceError>(),
            Some(SpaceServiceError::ScopeMismatch { .. })
        ));

        let err = pages
            .create_page(CreatePageParams {
                space_id: 999,
                parent_id: None,
                draft: ContentDraft::new(PageStatus::Draft, "Nowhere", ""),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceServiceError::NotFound { entity: "space", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_additional_root_page() -> Result<()> {
        let store = common::open_store().await?;
        let space = common::create_space(&store, "docs").await?;
        let pages = &store.docspace.pages;

        let extra = create(pages, &space, None, "Archive").await?;
        assert!(extra.node.is_root());

        let forest = pages
            .describe_pages(DescribePagesParams {
                space_id: space.id,
                ..Default::default()
            })
            .await?;
        assert_eq!(titles(&forest), vec!["Space docs", "Archive"]);
        Ok(())
    }
}
