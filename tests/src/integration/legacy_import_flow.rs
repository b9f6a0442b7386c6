//! # Legacy Import Flow Tests
//!
//! A legacy blocklist file is imported into the block file, then published
//! through a normal generation cycle.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mlbf_blocklist::domain::FIREFOX_GUID;
    use mlbf_blocklist::Metrics;
    use mlbf_runtime::orchestrator;
    use serde_json::{json, Value};

    use crate::integration::fixtures::{addon, Workspace};

    fn firefox_range(min: &str, max: &str) -> Value {
        json!([{
            "minVersion": min,
            "maxVersion": max,
            "targetApplication": [{ "guid": FIREFOX_GUID }]
        }])
    }

    fn legacy_records() -> Value {
        json!([
            {
                "id": "legacy-regex",
                "guid": "/^((ext0@test)|(ext1@test)|(ext2@test))$/",
                "versionRange": firefox_range("0", "*")
            },
            {
                "id": "legacy-pattern",
                "guid": r"/^ext1\d@test$/",
                "versionRange": firefox_range("2.0", "*")
            },
            {
                "id": "legacy-single",
                "guid": "ext25@test",
                "versionRange": [{ "maxVersion": "1.0" }]
            },
            {
                "id": "legacy-other-app",
                "guid": "ext26@test",
                "versionRange": [{ "targetApplication": [{ "guid": "{other-app}" }] }]
            },
            { "id": "legacy-no-guid" },
            { "id": "legacy-unmatched", "guid": "/^((gone@test))$/" }
        ])
    }

    fn workspace_with_legacy(records: &Value) -> Workspace {
        let mut ws = Workspace::new();
        ws.write_versions(30);
        let legacy = ws.dir.path().join("legacy.json");
        std::fs::write(&legacy, records.to_string()).unwrap();
        ws.config.paths.legacy = Some(legacy);
        ws
    }

    fn block_guids(ws: &Workspace) -> Vec<String> {
        let mut guids: Vec<String> = ws
            .read_blocks()
            .iter()
            .map(|b| b["guid"].as_str().unwrap().to_string())
            .collect();
        guids.sort();
        guids
    }

    #[tokio::test]
    async fn test_imported_blocks_are_published() {
        let ws = workspace_with_legacy(&legacy_records());
        orchestrator::import_legacy(&ws.config).await.unwrap();

        let mut expected: Vec<String> = [0, 1, 2, 25].into_iter().chain(10..20).map(addon).collect();
        expected.sort();
        assert_eq!(block_guids(&ws), expected);

        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();
        orch.run_once(1_000).await.unwrap();
        let client = ws.load_client();

        assert!(client.is_blocked(&addon(0), "1.0"));
        assert!(client.is_blocked(&addon(2), "2.0"));
        assert!(!client.is_blocked(&addon(10), "1.0"));
        assert!(client.is_blocked(&addon(10), "2.0"));
        assert!(client.is_blocked(&addon(25), "1.0"));
        assert!(!client.is_blocked(&addon(25), "2.0"));
        assert!(!client.is_blocked(&addon(26), "1.0"));
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let ws = workspace_with_legacy(&legacy_records());
        orchestrator::import_legacy(&ws.config).await.unwrap();
        let first = ws.read_blocks();
        orchestrator::import_legacy(&ws.config).await.unwrap();
        assert_eq!(ws.read_blocks(), first);
    }

    #[tokio::test]
    async fn test_narrowed_regex_drops_stale_records() {
        let ws = workspace_with_legacy(&legacy_records());
        orchestrator::import_legacy(&ws.config).await.unwrap();

        let mut narrowed = legacy_records();
        narrowed[0]["guid"] = json!("/^((ext0@test)|(ext1@test))$/");
        std::fs::write(ws.config.paths.legacy.as_ref().unwrap(), narrowed.to_string()).unwrap();
        let summary = orchestrator::import_legacy(&ws.config).await.unwrap();
        assert!(summary.retired.is_empty());

        let guids = block_guids(&ws);
        assert!(guids.contains(&addon(0)));
        assert!(!guids.contains(&addon(2)));
        // Records from other legacy entries are untouched
        assert!(guids.contains(&addon(25)));
    }

    #[tokio::test]
    async fn test_removed_legacy_records_are_unblocked() {
        let ws = workspace_with_legacy(&legacy_records());
        orchestrator::import_legacy(&ws.config).await.unwrap();
        let orch = orchestrator::from_config(&ws.config, Arc::new(Metrics::new())).await.unwrap();
        orch.run_once(1_000).await.unwrap();

        // Drop the decomposable regex and the single-guid record
        let remaining: Vec<Value> = legacy_records()
            .as_array()
            .unwrap()
            .iter()
            .filter(|r| r["id"] != "legacy-regex" && r["id"] != "legacy-single")
            .cloned()
            .collect();
        std::fs::write(ws.config.paths.legacy.as_ref().unwrap(), Value::from(remaining).to_string()).unwrap();
        let summary = orchestrator::import_legacy(&ws.config).await.unwrap();

        assert_eq!(summary.retired.len(), 2);
        assert_eq!(summary.retired["legacy-single"], vec![addon(25)]);
        assert_eq!(summary.retired_count(), 4);
        let mut expected: Vec<String> = (10..20).map(addon).collect();
        expected.sort();
        assert_eq!(block_guids(&ws), expected);

        orch.run_once(2_000).await.unwrap();
        let client = ws.load_client();
        assert!(!client.is_blocked(&addon(0), "1.0"));
        assert!(!client.is_blocked(&addon(25), "1.0"));
        assert!(client.is_blocked(&addon(10), "2.0"));
    }

    #[tokio::test]
    async fn test_regex_derived_block_not_overwritten() {
        let records = json!([
            {
                "id": "legacy-regex",
                "guid": "/^((ext0@test)|(ext1@test))$/",
                "versionRange": firefox_range("0", "*")
            },
            {
                "id": "legacy-later",
                "guid": "ext0@test",
                "versionRange": firefox_range("5.0", "*")
            }
        ]);
        let ws = workspace_with_legacy(&records);
        orchestrator::import_legacy(&ws.config).await.unwrap();

        let blocks = ws.read_blocks();
        let ext0 = blocks.iter().find(|b| b["guid"] == "ext0@test").unwrap();
        assert_eq!(ext0["min_version"], "0");
        assert_eq!(ext0["origin"]["kind"], "regex_derived");
        assert_eq!(ext0["origin"]["source_id"], "legacy-regex");
    }

    #[tokio::test]
    async fn test_no_legacy_path_is_noop() {
        let ws = Workspace::new();
        orchestrator::import_legacy(&ws.config).await.unwrap();
        assert!(!ws.config.paths.blocks.exists());
    }
}
