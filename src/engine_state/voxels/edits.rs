//! # World Edits
//!
//! Sparse log of voxel overrides, keyed by the chunk that owns the voxel.
//!
//! User edits and cross-chunk vegetation writes both land here. Every chunk
//! consults the log for its own coordinates at the end of its terrain pass, so
//! an override always wins over freshly generated terrain and neighbouring
//! chunks never depend on each other's generation order.
//!
//! Vegetation writes go to a separate staged layer: it is never persisted, it
//! is regenerated whenever the source chunk generates, and it is dropped when
//! the terrain parameters change. Staged leaves only fill empty voxels, user
//! edits replace whatever is there.
//!
//! ## Persistence
//!
//! The log serializes as one flat JSON object, `"cx|cz|x|y|z" -> "blockType"`.
//! Writes are debounced: `record` marks the log dirty and `flush_if_due`
//! writes once no edit has arrived for `FLUSH_DEBOUNCE`. Storage failures are
//! logged and never fatal; the log stays dirty and the write is retried after
//! another debounce period.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use anyhow::{anyhow, Context};
use cgmath::{Point2, Point3};
use log::{debug, error, warn};
use web_time::{Duration, Instant};

use crate::core::StResource;
use crate::engine_state::voxels::block::{block_type::BlockType, BlockTypeSize};

/// Quiet period after the last edit before the log is written out.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Storage slot holding the edit log of worlds with chunks `width` wide.
///
/// Local coordinates in the log only make sense for one chunk width, so the
/// width is part of the slot name.
pub fn edit_slot_name(width: usize) -> String {
    format!("world-edits-w{width}")
}

/// Address of one voxel in the edit log: chunk coordinates plus the
/// chunk-local voxel position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditKey {
    /// Chunk X coordinate
    pub cx: i32,
    /// Chunk Z coordinate
    pub cz: i32,
    /// Local X
    pub x: i32,
    /// Y
    pub y: i32,
    /// Local Z
    pub z: i32,
}

impl EditKey {
    /// Creates a key from chunk coordinates and a local position.
    pub fn new(chunk: Point2<i32>, local: Point3<i32>) -> Self {
        EditKey {
            cx: chunk.x,
            cz: chunk.y,
            x: local.x,
            y: local.y,
            z: local.z,
        }
    }

    /// Owning chunk coordinates.
    pub fn chunk(&self) -> Point2<i32> {
        Point2::new(self.cx, self.cz)
    }

    /// Chunk-local voxel position.
    pub fn local(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }
}

impl fmt::Display for EditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}|{}|{}", self.cx, self.cz, self.x, self.y, self.z)
    }
}

impl FromStr for EditKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('|')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("edit key {s:?} has a non-integer part"))?;
        match parts.as_slice() {
            [cx, cz, x, y, z] => Ok(EditKey {
                cx: *cx,
                cz: *cz,
                x: *x,
                y: *y,
                z: *z,
            }),
            _ => Err(anyhow!("edit key {s:?} must have five parts")),
        }
    }
}

/// A write that generation of one chunk wants to make into another.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StagedWrite {
    /// Target voxel, addressed in the target chunk
    pub key: EditKey,
    /// Block to place there
    pub block_type: BlockType,
}

/// Overrides recorded for one chunk, ordered by local position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkEdits {
    /// Vegetation staged by neighbouring chunks; fills empty voxels only
    pub staged: Vec<(Point3<i32>, BlockType)>,
    /// User edits; replace the generated voxel
    pub edits: Vec<(Point3<i32>, BlockType)>,
}

/// Where the serialized edit log lives.
pub trait EditStorage {
    /// Reads the stored log, `None` when nothing was stored yet.
    fn load(&self) -> anyhow::Result<Option<String>>;

    /// Replaces the stored log.
    fn save(&self, contents: &str) -> anyhow::Result<()>;
}

/// In-memory storage, shared through an `StResource` so hosts and tests can
/// inspect the slot.
#[derive(Clone)]
pub struct MemoryEditStorage {
    slot: StResource<Option<String>>,
}

impl Default for MemoryEditStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEditStorage {
    /// An empty slot.
    pub fn new() -> Self {
        MemoryEditStorage {
            slot: StResource::new(None),
        }
    }

    /// A slot that already holds `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        MemoryEditStorage {
            slot: StResource::new(Some(contents.into())),
        }
    }

    /// Handle to the underlying slot.
    pub fn slot(&self) -> StResource<Option<String>> {
        self.slot.clone()
    }
}

impl EditStorage for MemoryEditStorage {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.slot.get().clone())
    }

    fn save(&self, contents: &str) -> anyhow::Result<()> {
        *self.slot.get_mut() = Some(contents.to_owned());
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_family = "wasm")] {
        /// Storage backed by `window.localStorage`.
        pub struct LocalEditStorage {
            key: String,
        }

        impl LocalEditStorage {
            /// Storage under the given localStorage key.
            pub fn new(key: impl Into<String>) -> Self {
                LocalEditStorage { key: key.into() }
            }

            fn storage() -> anyhow::Result<web_sys::Storage> {
                let window = web_sys::window().context("no window")?;
                window
                    .local_storage()
                    .map_err(|e| anyhow!("localStorage unavailable: {e:?}"))?
                    .context("localStorage disabled")
            }
        }

        impl EditStorage for LocalEditStorage {
            fn load(&self) -> anyhow::Result<Option<String>> {
                Self::storage()?
                    .get_item(&self.key)
                    .map_err(|e| anyhow!("reading {}: {e:?}", self.key))
            }

            fn save(&self, contents: &str) -> anyhow::Result<()> {
                Self::storage()?
                    .set_item(&self.key, contents)
                    .map_err(|e| anyhow!("writing {}: {e:?}", self.key))
            }
        }
    } else {
        use std::{fs, path::PathBuf};

        /// Storage backed by a JSON file.
        pub struct FileEditStorage {
            path: PathBuf,
        }

        impl FileEditStorage {
            /// Storage at `path`. The file is created on first save.
            pub fn new(path: impl Into<PathBuf>) -> Self {
                FileEditStorage { path: path.into() }
            }
        }

        impl EditStorage for FileEditStorage {
            fn load(&self) -> anyhow::Result<Option<String>> {
                if !self.path.exists() {
                    return Ok(None);
                }
                let contents = fs::read_to_string(&self.path)
                    .with_context(|| format!("reading {}", self.path.display()))?;
                Ok(Some(contents))
            }

            fn save(&self, contents: &str) -> anyhow::Result<()> {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                fs::write(&self.path, contents)
                    .with_context(|| format!("writing {}", self.path.display()))
            }
        }
    }
}

/// The edit log, loaded lazily from its storage on first access.
pub struct WorldEditsStore {
    storage: Box<dyn EditStorage>,
    chunks: HashMap<Point2<i32>, HashMap<Point3<i32>, BlockType>>,
    staged: HashMap<Point2<i32>, HashMap<Point3<i32>, BlockType>>,
    loaded: bool,
    last_edit: Option<Instant>,
}

impl WorldEditsStore {
    /// Creates a store over `storage`. Nothing is read until first access.
    pub fn new(storage: Box<dyn EditStorage>) -> Self {
        WorldEditsStore {
            storage,
            chunks: HashMap::new(),
            staged: HashMap::new(),
            loaded: false,
            last_edit: None,
        }
    }

    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let contents = match self.storage.load() {
            Ok(Some(contents)) => contents,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to load world edits: {e:#}");
                return;
            }
        };

        let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Discarding unreadable world edits: {e}");
                return;
            }
        };

        for (key, value) in entries {
            let key = match key.parse::<EditKey>() {
                Ok(key) => key,
                Err(e) => {
                    warn!("Skipping edit: {e:#}");
                    continue;
                }
            };
            match parse_block_type(value) {
                Ok(block_type) => self.insert(key, block_type),
                Err(e) => warn!("Skipping edit {key}: {e:#}"),
            }
        }
        debug!("Loaded {} world edits", self.len_loaded());
    }

    fn insert(&mut self, key: EditKey, block_type: BlockType) {
        self.chunks
            .entry(key.chunk())
            .or_default()
            .insert(key.local(), block_type);
    }

    fn len_loaded(&self) -> usize {
        self.chunks.values().map(HashMap::len).sum()
    }

    /// Records an override, replacing any earlier one at the same voxel.
    pub fn record(&mut self, key: EditKey, block_type: BlockType) {
        self.ensure_loaded();
        self.insert(key, block_type);
        self.last_edit = Some(Instant::now());
    }

    /// Stages a vegetation write for another chunk, unless one is staged at
    /// that voxel already. Returns whether the write was staged.
    pub fn stage(&mut self, write: StagedWrite) -> bool {
        let edits = self.staged.entry(write.key.chunk()).or_default();
        if edits.contains_key(&write.key.local()) {
            return false;
        }
        edits.insert(write.key.local(), write.block_type);
        true
    }

    /// Drops every staged vegetation write.
    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    /// Keeps only the staged writes whose target chunk satisfies `keep`.
    /// Returns how many writes were dropped.
    pub fn retain_staged(&mut self, mut keep: impl FnMut(Point2<i32>) -> bool) -> usize {
        let before = self.staged_len();
        self.staged.retain(|chunk, _| keep(*chunk));
        before - self.staged_len()
    }

    /// Number of staged vegetation writes.
    pub fn staged_len(&self) -> usize {
        self.staged.values().map(HashMap::len).sum()
    }

    /// Override at `key`, if any.
    pub fn get(&mut self, key: EditKey) -> Option<BlockType> {
        self.ensure_loaded();
        self.chunks
            .get(&key.chunk())
            .and_then(|edits| edits.get(&key.local()))
            .copied()
    }

    /// Every override inside chunk `(cx, cz)`.
    pub fn edits_for_chunk(&mut self, cx: i32, cz: i32) -> ChunkEdits {
        self.ensure_loaded();
        let position = Point2::new(cx, cz);
        ChunkEdits {
            staged: sorted_entries(self.staged.get(&position)),
            edits: sorted_entries(self.chunks.get(&position)),
        }
    }

    /// Number of overrides.
    pub fn len(&mut self) -> usize {
        self.ensure_loaded();
        self.len_loaded()
    }

    /// Whether the log holds no overrides.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Drops every override. The empty log is written on the next flush.
    pub fn clear(&mut self) {
        self.loaded = true;
        self.chunks.clear();
        self.last_edit = Some(Instant::now());
    }

    /// Whether edits are waiting to be written.
    pub fn is_dirty(&self) -> bool {
        self.last_edit.is_some()
    }

    /// The log in its persisted form.
    pub fn to_json(&mut self) -> anyhow::Result<String> {
        self.ensure_loaded();
        let entries: BTreeMap<String, BlockType> = self
            .chunks
            .iter()
            .flat_map(|(chunk, edits)| {
                edits
                    .iter()
                    .map(move |(local, block_type)| (EditKey::new(*chunk, *local).to_string(), *block_type))
            })
            .collect();
        serde_json::to_string(&entries).context("serializing world edits")
    }

    /// Writes the log if it is dirty and the debounce period has passed.
    /// Returns whether a write was attempted.
    pub fn flush_if_due(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(last) if now.saturating_duration_since(last) >= FLUSH_DEBOUNCE => {
                self.flush();
                true
            }
            _ => false,
        }
    }

    /// Writes the log now if it is dirty. Failures are logged, the edits stay
    /// in memory and the log stays dirty so a later flush retries.
    pub fn flush(&mut self) {
        if self.last_edit.is_none() {
            return;
        }
        let result = self
            .to_json()
            .and_then(|json| self.storage.save(&json));
        match result {
            Ok(()) => {
                self.last_edit = None;
                debug!("Flushed {} world edits", self.len_loaded());
            }
            Err(e) => {
                self.last_edit = Some(Instant::now());
                error!("Failed to persist world edits: {e:#}");
            }
        }
    }
}

/// Block types are stored by name; bare numeric ids are accepted too.
fn parse_block_type(value: serde_json::Value) -> anyhow::Result<BlockType> {
    if let Some(id) = value.as_u64() {
        return BlockTypeSize::try_from(id)
            .ok()
            .and_then(BlockType::from_id)
            .with_context(|| format!("unknown block id {id}"));
    }
    serde_json::from_value(value).context("unknown block type")
}

fn sorted_entries(edits: Option<&HashMap<Point3<i32>, BlockType>>) -> Vec<(Point3<i32>, BlockType)> {
    let mut entries: Vec<_> = edits
        .map(|edits| edits.iter().map(|(p, t)| (*p, *t)).collect())
        .unwrap_or_default();
    entries.sort_by_key(|(p, _)| (p.x, p.y, p.z));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    struct FailingStorage;

    impl EditStorage for FailingStorage {
        fn load(&self) -> anyhow::Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }

        fn save(&self, _contents: &str) -> anyhow::Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    fn key(cx: i32, cz: i32, x: i32, y: i32, z: i32) -> EditKey {
        EditKey { cx, cz, x, y, z }
    }

    #[test]
    fn key_text_form() {
        let k = key(-1, 2, 3, 40, 31);
        assert_eq!(k.to_string(), "-1|2|3|40|31");
        assert_eq!("-1|2|3|40|31".parse::<EditKey>().unwrap(), k);
    }

    #[test_case("1|2|3|4" ; "too few parts")]
    #[test_case("1|2|3|4|5|6" ; "too many parts")]
    #[test_case("1|2|x|4|5" ; "non integer")]
    #[test_case("" ; "empty")]
    fn malformed_keys_are_rejected(text: &str) {
        assert!(text.parse::<EditKey>().is_err());
    }

    #[test]
    fn slot_name_carries_width() {
        assert_eq!(edit_slot_name(32), "world-edits-w32");
    }

    #[test]
    fn loads_lazily_and_skips_bad_entries() {
        let storage = MemoryEditStorage::with_contents(
            r#"{ "0|0|1|2|3": "stone", "bad": "dirt", "1|1|0|0|0": "notABlock", "-1|0|4|5|6": "oakLeaves" }"#,
        );
        let mut store = WorldEditsStore::new(Box::new(storage));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(key(0, 0, 1, 2, 3)), Some(BlockType::Stone));
        assert_eq!(store.get(key(-1, 0, 4, 5, 6)), Some(BlockType::OakLeaves));
        assert!(!store.is_dirty());
    }

    #[test]
    fn failed_load_yields_an_empty_store() {
        let mut store = WorldEditsStore::new(Box::new(FailingStorage));
        assert!(store.is_empty());
        store.record(key(0, 0, 0, 0, 0), BlockType::Dirt);
        store.flush();
        assert_eq!(store.len(), 1);
    }

    /// Refuses the first `failures` saves, then writes into `slot`.
    struct FlakyStorage {
        failures: StResource<usize>,
        slot: StResource<Option<String>>,
    }

    impl EditStorage for FlakyStorage {
        fn load(&self) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, contents: &str) -> anyhow::Result<()> {
            let mut failures = self.failures.get_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(anyhow!("quota exceeded"));
            }
            *self.slot.get_mut() = Some(contents.to_owned());
            Ok(())
        }
    }

    #[test]
    fn failed_flush_keeps_the_log_dirty_and_retries() {
        let slot = StResource::new(None);
        let storage = FlakyStorage {
            failures: StResource::new(1),
            slot: slot.clone(),
        };
        let mut store = WorldEditsStore::new(Box::new(storage));
        store.record(key(0, 0, 1, 1, 1), BlockType::Gravel);

        store.flush();
        assert!(store.is_dirty());
        assert!(slot.get().is_none());

        let failed_at = Instant::now();
        assert!(!store.flush_if_due(failed_at));
        assert!(store.flush_if_due(failed_at + FLUSH_DEBOUNCE * 2));
        assert!(!store.is_dirty());
        assert_eq!(slot.get().as_deref(), Some(r#"{"0|0|1|1|1":"gravel"}"#));
    }

    #[test]
    fn numeric_block_ids_are_accepted_on_load() {
        let stone = BlockType::Stone.id();
        let storage = MemoryEditStorage::with_contents(format!(
            r#"{{ "0|0|1|2|3": {stone}, "0|0|1|2|4": 250, "0|0|1|2|5": -1 }}"#
        ));
        let mut store = WorldEditsStore::new(Box::new(storage));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(key(0, 0, 1, 2, 3)), Some(BlockType::Stone));
        assert_eq!(store.to_json().unwrap(), r#"{"0|0|1|2|3":"stone"}"#);
    }

    #[test]
    fn unreadable_json_yields_an_empty_store() {
        let storage = MemoryEditStorage::with_contents("[1, 2");
        let mut store = WorldEditsStore::new(Box::new(storage));
        assert!(store.is_empty());
    }

    #[test]
    fn staged_writes_stay_out_of_storage() {
        let storage = MemoryEditStorage::new();
        let slot = storage.slot();
        let mut store = WorldEditsStore::new(Box::new(storage));
        let write = StagedWrite {
            key: key(1, 0, 0, 30, 4),
            block_type: BlockType::OakLeaves,
        };
        assert!(store.stage(write));
        assert!(!store.stage(StagedWrite {
            block_type: BlockType::BirchLeaves,
            ..write
        }));
        assert!(!store.is_dirty());
        store.flush();
        assert!(slot.get().is_none());

        let edits = store.edits_for_chunk(1, 0);
        assert_eq!(edits.staged, vec![(Point3::new(0, 30, 4), BlockType::OakLeaves)]);
        assert!(edits.edits.is_empty());

        store.clear_staged();
        assert_eq!(store.edits_for_chunk(1, 0), ChunkEdits::default());
    }

    #[test]
    fn retain_staged_drops_rejected_chunks() {
        let mut store = WorldEditsStore::new(Box::new(MemoryEditStorage::new()));
        for (cx, y) in [(0, 30), (0, 31), (5, 30)] {
            store.stage(StagedWrite {
                key: key(cx, 0, 0, y, 0),
                block_type: BlockType::OakLeaves,
            });
        }
        assert_eq!(store.staged_len(), 3);
        assert_eq!(store.retain_staged(|chunk| chunk.x < 2), 1);
        assert_eq!(store.staged_len(), 2);
        assert!(store.edits_for_chunk(5, 0).staged.is_empty());
        assert_eq!(store.edits_for_chunk(0, 0).staged.len(), 2);
    }

    #[test]
    fn edits_for_chunk_only_returns_that_chunk() {
        let mut store = WorldEditsStore::new(Box::new(MemoryEditStorage::new()));
        store.record(key(0, 0, 2, 0, 0), BlockType::Stone);
        store.record(key(0, 0, 1, 0, 0), BlockType::Dirt);
        store.record(key(1, 0, 1, 0, 0), BlockType::Sand);
        let edits = store.edits_for_chunk(0, 0);
        assert!(edits.staged.is_empty());
        assert_eq!(
            edits.edits,
            vec![
                (Point3::new(1, 0, 0), BlockType::Dirt),
                (Point3::new(2, 0, 0), BlockType::Stone),
            ]
        );
    }

    #[test]
    fn flush_is_debounced() {
        let storage = MemoryEditStorage::new();
        let slot = storage.slot();
        let mut store = WorldEditsStore::new(Box::new(storage));

        store.record(key(0, 0, 5, 6, 5), BlockType::Stone);
        let recorded = Instant::now();
        assert!(!store.flush_if_due(recorded));
        assert!(slot.get().is_none());

        assert!(store.flush_if_due(recorded + FLUSH_DEBOUNCE * 2));
        assert_eq!(slot.get().as_deref(), Some(r#"{"0|0|5|6|5":"stone"}"#));
        assert!(!store.flush_if_due(recorded + FLUSH_DEBOUNCE * 4));
    }

    #[test]
    fn persisted_log_round_trips_through_storage() {
        let storage = MemoryEditStorage::new();
        let slot = storage.slot();
        let mut store = WorldEditsStore::new(Box::new(storage));
        store.record(key(2, -3, 0, 10, 31), BlockType::MossyCobblestone);
        store.record(key(2, -3, 0, 11, 31), BlockType::Empty);
        store.flush();

        let contents = slot.get().clone().unwrap();
        let mut reloaded = WorldEditsStore::new(Box::new(MemoryEditStorage::with_contents(contents)));
        assert_eq!(reloaded.get(key(2, -3, 0, 10, 31)), Some(BlockType::MossyCobblestone));
        assert_eq!(reloaded.get(key(2, -3, 0, 11, 31)), Some(BlockType::Empty));
    }

    #[cfg(not(target_family = "wasm"))]
    #[test]
    fn file_storage_missing_file_is_empty() {
        let path = std::env::temp_dir().join(format!("voxel-world-missing-{}.json", fastrand::u64(..)));
        let storage = FileEditStorage::new(&path);
        assert!(storage.load().unwrap().is_none());
        storage.save("{}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
        std::fs::remove_file(&path).unwrap();
    }
}
