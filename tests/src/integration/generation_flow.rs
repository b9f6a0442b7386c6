//! # Generation Flow Tests
//!
//! Several cycles against JSON files: a base, a stash chain on top of it,
//! a quiet cycle and a rebuild that clears the collection.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mlbf_blocklist::{Metrics, Publication};
    use mlbf_runtime::orchestrator;
    use serde_json::json;

    use crate::integration::fixtures::{addon, Workspace};

    // 20 add-ons fully blocked out of 30, two versions each
    fn initial_workspace() -> Workspace {
        let ws = Workspace::new();
        ws.write_versions(30);
        ws.write_full_blocks(0..20);
        ws
    }

    #[tokio::test]
    async fn test_first_cycle_publishes_base() {
        let ws = initial_workspace();
        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();

        let outcome = orch.run_once(1_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::Base);
        assert_eq!(outcome.blocked_count, 40);
        assert_eq!(outcome.not_blocked_count, 20);

        assert_eq!(ws.published_times(), (Some(1_000), vec![]));
        assert!(ws.config.paths.state.exists());
        assert!(ws.config.paths.snapshots.join("snapshot-1000.json").exists());

        let client = ws.load_client();
        for i in 0..20 {
            assert!(client.is_blocked(&addon(i), "1.0"));
            assert!(client.is_blocked(&addon(i), "2.0"));
        }
        // Every corpus entry outside the blocked set is exact
        for i in 20..30 {
            assert!(!client.is_blocked(&addon(i), "1.0"));
            assert!(!client.is_blocked(&addon(i), "2.0"));
        }
    }

    #[tokio::test]
    async fn test_small_changes_extend_stash_chain() {
        let ws = initial_workspace();
        let metrics = Arc::new(Metrics::new());
        let orch = orchestrator::from_config(&ws.config, Arc::clone(&metrics)).await.unwrap();
        orch.run_once(1_000).await.unwrap();

        let mut blocks = ws.read_blocks();
        blocks.push(json!({ "guid": addon(20), "min_version": "1.0", "max_version": "1.0" }));
        ws.write_blocks(serde_json::Value::Array(blocks.clone()));
        let outcome = orch.run_once(2_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::Stash);
        let stash = outcome.stash.unwrap();
        assert_eq!(stash.parent_time, 1_000);
        assert_eq!(stash.added.len(), 1);

        blocks.retain(|b| b["guid"] != addon(0));
        ws.write_blocks(serde_json::Value::Array(blocks));
        let outcome = orch.run_once(3_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::Stash);
        assert_eq!(outcome.stash.unwrap().removed.len(), 2);

        assert_eq!(ws.published_times(), (Some(1_000), vec![2_000, 3_000]));
        let client = ws.load_client();
        assert_eq!(client.stash_count(), 2);
        assert_eq!(client.head_time(), 3_000);
        assert!(client.is_blocked(&addon(20), "1.0"));
        assert!(!client.is_blocked(&addon(20), "2.0"));
        assert!(!client.is_blocked(&addon(0), "1.0"));
        assert!(client.is_blocked(&addon(1), "2.0"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bases_built, 1);
        assert_eq!(snapshot.stashes_published, 2);
    }

    #[tokio::test]
    async fn test_quiet_cycle_publishes_nothing() {
        let ws = initial_workspace();
        let metrics = Arc::new(Metrics::new());
        let orch = orchestrator::from_config(&ws.config, Arc::clone(&metrics)).await.unwrap();
        orch.run_once(1_000).await.unwrap();

        let outcome = orch.run_once(2_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::NoChange);
        assert_eq!(ws.published_times(), (Some(1_000), vec![]));
        assert_eq!(orch.state().await.last_generation_time, Some(1_000));
        assert_eq!(metrics.snapshot().cycles_skipped, 1);
    }

    #[tokio::test]
    async fn test_large_change_replaces_collection() {
        let ws = initial_workspace();
        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();
        orch.run_once(1_000).await.unwrap();
        let mut blocks = ws.read_blocks();
        blocks.push(json!({ "guid": addon(20), "min_version": "2.0" }));
        ws.write_blocks(serde_json::Value::Array(blocks));
        assert_eq!(orch.run_once(2_000).await.unwrap().publication, Publication::Stash);

        ws.write_full_blocks(0..30);
        let outcome = orch.run_once(3_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::Base);
        assert_eq!(ws.published_times(), (Some(3_000), vec![]));

        let client = ws.load_client();
        assert_eq!(client.base_time(), 3_000);
        assert!(client.is_blocked(&addon(29), "1.0"));
    }

    #[tokio::test]
    async fn test_restart_continues_chain() {
        let ws = initial_workspace();
        {
            let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();
            orch.run_once(1_000).await.unwrap();
        }

        let mut blocks = ws.read_blocks();
        blocks.push(json!({ "guid": addon(25) }));
        ws.write_blocks(serde_json::Value::Array(blocks));

        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();
        let outcome = orch.run_once(2_000).await.unwrap();
        assert_eq!(outcome.publication, Publication::Stash);
        assert!(ws.load_client().is_blocked(&addon(25), "2.0"));
    }

    #[tokio::test]
    async fn test_missing_version_file_is_retryable() {
        let ws = Workspace::new();
        ws.write_full_blocks(0..5);
        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();

        let err = orch.run_once(1_000).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(orch.state().await.last_generation_time, None);
        assert!(!ws.config.paths.state.exists());
    }
}
