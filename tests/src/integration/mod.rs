//! # Integration Tests
//!
//! End-to-end runs through the runtime with the JSON file adapters. Clients
//! are rebuilt from the published files only, the way a browser would see
//! them.

pub mod generation_flow;
pub mod legacy_import_flow;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::PathBuf;

    use mlbf_blocklist::domain::{BaseFilterRecord, StashRecord};
    use mlbf_blocklist::{ClientBlocklist, Mlbf};
    use mlbf_runtime::config::{PathsConfig, RuntimeConfig};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    /// Guid of the `i`th test add-on
    pub fn addon(i: usize) -> String {
        format!("ext{i}@test")
    }

    /// A runtime config rooted in a fresh temporary directory
    pub struct Workspace {
        pub dir: TempDir,
        pub config: RuntimeConfig,
    }

    impl Workspace {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let config = RuntimeConfig {
                paths: PathsConfig {
                    blocks: root.join("blocks.json"),
                    versions: root.join("versions.json"),
                    legacy: None,
                    output: root.join("out"),
                    snapshots: root.join("snapshots"),
                    state: root.join("state.json"),
                },
                ..RuntimeConfig::default()
            };
            Self { dir, config }
        }

        /// `count` add-ons, each with versions 1.0 and 2.0
        pub fn write_versions(&self, count: usize) {
            let versions: serde_json::Map<String, Value> =
                (0..count).map(|i| (addon(i), json!(["1.0", "2.0"]))).collect();
            std::fs::write(&self.config.paths.versions, Value::Object(versions).to_string()).unwrap();
        }

        pub fn write_blocks(&self, blocks: Value) {
            std::fs::write(&self.config.paths.blocks, blocks.to_string()).unwrap();
        }

        /// Block add-ons `range` for every version
        pub fn write_full_blocks(&self, range: std::ops::Range<usize>) {
            let blocks: Vec<Value> = range.map(|i| json!({ "guid": addon(i) })).collect();
            self.write_blocks(Value::Array(blocks));
        }

        pub fn read_blocks(&self) -> Vec<Value> {
            serde_json::from_slice(&std::fs::read(&self.config.paths.blocks).unwrap()).unwrap()
        }

        pub fn collection_dir(&self) -> PathBuf {
            self.config.paths.output.join(&self.config.collection)
        }

        /// Published base time and stash times, oldest first
        pub fn published_times(&self) -> (Option<u64>, Vec<u64>) {
            let mut base = None;
            let mut stashes = Vec::new();
            for entry in std::fs::read_dir(self.collection_dir()).unwrap() {
                let name = entry.unwrap().file_name().to_string_lossy().into_owned();
                if let Some(time) = name.strip_suffix("-base.json") {
                    assert!(base.is_none(), "more than one base in the collection");
                    base = Some(time.parse().unwrap());
                } else if let Some(time) = name.strip_suffix("-stash.json") {
                    stashes.push(time.parse().unwrap());
                }
            }
            stashes.sort_unstable();
            (base, stashes)
        }

        /// Rebuild a client from the published base and its stashes
        pub fn load_client(&self) -> ClientBlocklist {
            let dir = self.collection_dir();
            let (base, stashes) = self.published_times();
            let base = base.expect("no base published");

            let record: BaseFilterRecord =
                serde_json::from_slice(&std::fs::read(dir.join(format!("{base}-base.json"))).unwrap()).unwrap();
            let filter = Mlbf::from_bytes(&std::fs::read(dir.join(format!("{base}-filter.bin"))).unwrap()).unwrap();
            assert_eq!(record.key_format, filter.key_format());
            assert_eq!(record.generation_time, filter.generation_time());

            let mut client = ClientBlocklist::new(filter);
            let mut head = base;
            for time in stashes {
                let stash: StashRecord =
                    serde_json::from_slice(&std::fs::read(dir.join(format!("{time}-stash.json"))).unwrap()).unwrap();
                client.apply_stash(head, &stash).unwrap();
                head = stash.stash_time;
            }
            client
        }
    }
}
