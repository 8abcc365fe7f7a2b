use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{File, OpenOptions, create_dir_all, read};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use super::error::StoreError;
use super::types::{RecordId, ReportEntry, ReportKind, SeoRecord, SiteId, Stored, UptimeRecord};

/// Append-only persistence for check results.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn record_uptime(
        &self,
        site_id: SiteId,
        record: UptimeRecord,
    ) -> Result<RecordId, StoreError>;

    async fn record_seo(&self, site_id: SiteId, record: SeoRecord) -> Result<RecordId, StoreError>;

    async fn latest_seo(&self, site_id: SiteId) -> Result<Option<Stored<SeoRecord>>, StoreError>;

    /// Newest first, at most `limit` entries.
    async fn recent(
        &self,
        site_id: SiteId,
        kind: ReportKind,
        limit: usize,
    ) -> Result<Vec<ReportEntry>, StoreError>;
}

fn newest_first(entries: &mut [ReportEntry]) {
    entries.sort_by(|a, b| {
        b.checked_at()
            .cmp(&a.checked_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}

fn latest_of(records: &[Stored<SeoRecord>], site_id: SiteId) -> Option<Stored<SeoRecord>> {
    records
        .iter()
        .filter(|stored| stored.site_id == site_id)
        .max_by(|a, b| {
            a.record
                .checked_at
                .cmp(&b.record.checked_at)
                .then_with(|| a.id.cmp(&b.id))
        })
        .cloned()
}

fn select_recent(
    uptime: &[Stored<UptimeRecord>],
    seo: &[Stored<SeoRecord>],
    site_id: SiteId,
    kind: ReportKind,
    limit: usize,
) -> Vec<ReportEntry> {
    let mut entries = match kind {
        ReportKind::Uptime => uptime
            .iter()
            .filter(|stored| stored.site_id == site_id)
            .cloned()
            .map(ReportEntry::Uptime)
            .collect::<Vec<_>>(),
        ReportKind::Seo => seo
            .iter()
            .filter(|stored| stored.site_id == site_id)
            .cloned()
            .map(ReportEntry::Seo)
            .collect::<Vec<_>>(),
    };
    newest_first(&mut entries);
    entries.truncate(limit);
    entries
}

#[derive(Default)]
struct Tables {
    next_id: RecordId,
    uptime: Vec<Stored<UptimeRecord>>,
    seo: Vec<Stored<SeoRecord>>,
}

impl Tables {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store. Ids are shared across both record kinds.
#[derive(Default)]
pub struct MemoryReportStore {
    tables: Mutex<Tables>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Every mutation is a single push, so a poisoned lock still holds whole records.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn uptime_count(&self) -> usize {
        self.lock().uptime.len()
    }

    pub fn seo_count(&self) -> usize {
        self.lock().seo.len()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn record_uptime(
        &self,
        site_id: SiteId,
        record: UptimeRecord,
    ) -> Result<RecordId, StoreError> {
        let mut tables = self.lock();
        let id = tables.allocate_id();
        tables.uptime.push(Stored {
            id,
            site_id,
            record,
        });
        Ok(id)
    }

    async fn record_seo(&self, site_id: SiteId, record: SeoRecord) -> Result<RecordId, StoreError> {
        let mut tables = self.lock();
        let id = tables.allocate_id();
        tables.seo.push(Stored {
            id,
            site_id,
            record,
        });
        Ok(id)
    }

    async fn latest_seo(&self, site_id: SiteId) -> Result<Option<Stored<SeoRecord>>, StoreError> {
        Ok(latest_of(&self.lock().seo, site_id))
    }

    async fn recent(
        &self,
        site_id: SiteId,
        kind: ReportKind,
        limit: usize,
    ) -> Result<Vec<ReportEntry>, StoreError> {
        let tables = self.lock();
        Ok(select_recent(
            &tables.uptime,
            &tables.seo,
            site_id,
            kind,
            limit,
        ))
    }
}

const UPTIME_FILE: &str = "uptime.jsonl";
const SEO_FILE: &str = "seo.jsonl";

/// File-backed store: one JSON document per line, one file per record kind.
pub struct JsonlReportStore {
    dir: PathBuf,
    // Held across the whole append so ids and line order agree.
    next_id: AsyncMutex<RecordId>,
}

impl JsonlReportStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir).await?;

        let uptime = read_lines::<UptimeRecord>(&dir.join(UPTIME_FILE)).await?;
        let seo = read_lines::<SeoRecord>(&dir.join(SEO_FILE)).await?;
        let max_id = uptime
            .iter()
            .map(|s| s.id)
            .chain(seo.iter().map(|s| s.id))
            .max()
            .unwrap_or(0);

        Ok(Self {
            dir,
            next_id: AsyncMutex::new(max_id),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append<T: Serialize>(
        &self,
        file_name: &str,
        site_id: SiteId,
        record: T,
    ) -> Result<RecordId, StoreError> {
        let mut next_id = self.next_id.lock().await;
        let id = *next_id + 1;
        let stored = Stored {
            id,
            site_id,
            record,
        };
        let encoded = serde_json::to_vec(&stored)?;

        let path = self.dir.join(file_name);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;
        let len = file.metadata().await?.len();

        let mut line = Vec::with_capacity(encoded.len() + 2);
        if !ends_with_newline(&mut file, len).await? {
            warn!(path = %path.display(), "sealing incomplete trailing record");
            line.push(b'\n');
        }
        line.extend_from_slice(&encoded);
        line.push(b'\n');

        if let Err(err) = write_line(&mut file, &line).await {
            if let Err(rollback) = file.set_len(len).await {
                warn!(
                    path = %path.display(),
                    error = %rollback,
                    "could not roll back partial record"
                );
            }
            return Err(err.into());
        }

        *next_id = id;
        Ok(id)
    }
}

async fn ends_with_newline(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1)).await?;
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

async fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<Stored<T>>, StoreError> {
    let bytes = match read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut out = Vec::new();
    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let parsed = std::str::from_utf8(raw)
            .map_err(|err| err.to_string())
            .map(str::trim)
            .and_then(|line| {
                if line.is_empty() {
                    Ok(None)
                } else {
                    serde_json::from_str::<Stored<T>>(line)
                        .map(Some)
                        .map_err(|err| err.to_string())
                }
            });
        match parsed {
            Ok(Some(stored)) => out.push(stored),
            Ok(None) => {}
            Err(error) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %error,
                "skipping unreadable record"
            ),
        }
    }
    Ok(out)
}

#[async_trait]
impl ReportStore for JsonlReportStore {
    async fn record_uptime(
        &self,
        site_id: SiteId,
        record: UptimeRecord,
    ) -> Result<RecordId, StoreError> {
        self.append(UPTIME_FILE, site_id, record).await
    }

    async fn record_seo(&self, site_id: SiteId, record: SeoRecord) -> Result<RecordId, StoreError> {
        self.append(SEO_FILE, site_id, record).await
    }

    async fn latest_seo(&self, site_id: SiteId) -> Result<Option<Stored<SeoRecord>>, StoreError> {
        let seo = read_lines::<SeoRecord>(&self.dir.join(SEO_FILE)).await?;
        Ok(latest_of(&seo, site_id))
    }

    async fn recent(
        &self,
        site_id: SiteId,
        kind: ReportKind,
        limit: usize,
    ) -> Result<Vec<ReportEntry>, StoreError> {
        let (uptime, seo) = match kind {
            ReportKind::Uptime => (read_lines(&self.dir.join(UPTIME_FILE)).await?, Vec::new()),
            ReportKind::Seo => (Vec::new(), read_lines(&self.dir.join(SEO_FILE)).await?),
        };
        Ok(select_recent(&uptime, &seo, site_id, kind, limit))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::app::types::Liveness;

    fn append_fragment(path: &Path, fragment: &[u8]) {
        use std::io::Write;

        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(fragment).unwrap();
    }

    fn uptime_at(checked_at: DateTime<Utc>, liveness: Liveness) -> UptimeRecord {
        UptimeRecord {
            status_code: Some(200),
            response_time_seconds: 0.25,
            liveness,
            error_message: None,
            checked_at,
        }
    }

    fn seo_at(checked_at: DateTime<Utc>, seo_score: u8) -> SeoRecord {
        let mut record = SeoRecord::degraded("placeholder", checked_at);
        record.error = None;
        record.seo_score = seo_score;
        record
    }

    #[tokio::test]
    async fn memory_store_returns_newest_first() {
        let store = MemoryReportStore::new();
        let base = Utc::now();
        let site = SiteId(1);

        store
            .record_uptime(site, uptime_at(base, Liveness::Up))
            .await
            .unwrap();
        store
            .record_uptime(site, uptime_at(base + Duration::seconds(60), Liveness::Slow))
            .await
            .unwrap();
        store
            .record_uptime(site, uptime_at(base - Duration::seconds(60), Liveness::Down))
            .await
            .unwrap();
        store
            .record_uptime(SiteId(2), uptime_at(base, Liveness::Timeout))
            .await
            .unwrap();

        let recent = store.recent(site, ReportKind::Uptime, 10).await.unwrap();
        let liveness = recent
            .iter()
            .map(|entry| match entry {
                ReportEntry::Uptime(stored) => stored.record.liveness,
                ReportEntry::Seo(_) => panic!("unexpected seo entry"),
            })
            .collect::<Vec<_>>();
        assert_eq!(liveness, vec![Liveness::Slow, Liveness::Up, Liveness::Down]);

        let limited = store.recent(site, ReportKind::Uptime, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert!(store.recent(site, ReportKind::Seo, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_ties_break_on_id() {
        let store = MemoryReportStore::new();
        let at = Utc::now();
        let first = store.record_seo(SiteId(3), seo_at(at, 10)).await.unwrap();
        let second = store.record_seo(SiteId(3), seo_at(at, 20)).await.unwrap();
        assert!(second > first);

        let latest = store.latest_seo(SiteId(3)).await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.record.seo_score, 20);

        let recent = store.recent(SiteId(3), ReportKind::Seo, 5).await.unwrap();
        assert_eq!(
            recent.iter().map(ReportEntry::id).collect::<Vec<_>>(),
            vec![second, first]
        );
        assert!(store.latest_seo(SiteId(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn jsonl_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc::now();
        {
            let store = JsonlReportStore::open(dir.path()).await.unwrap();
            let a = store
                .record_uptime(SiteId(1), uptime_at(at, Liveness::Up))
                .await
                .unwrap();
            let b = store.record_seo(SiteId(1), seo_at(at, 77)).await.unwrap();
            assert_eq!((a, b), (1, 2));
        }

        let store = JsonlReportStore::open(dir.path()).await.unwrap();
        let c = store
            .record_uptime(SiteId(1), uptime_at(at + Duration::seconds(5), Liveness::Down))
            .await
            .unwrap();
        assert_eq!(c, 3);

        let recent = store.recent(SiteId(1), ReportKind::Uptime, 10).await.unwrap();
        assert_eq!(recent.iter().map(ReportEntry::id).collect::<Vec<_>>(), vec![3, 1]);

        let latest = store.latest_seo(SiteId(1)).await.unwrap().unwrap();
        assert_eq!(latest.record.seo_score, 77);
    }

    #[tokio::test]
    async fn jsonl_store_skips_torn_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlReportStore::open(dir.path()).await.unwrap();
        store
            .record_uptime(SiteId(9), uptime_at(Utc::now(), Liveness::Up))
            .await
            .unwrap();

        append_fragment(&dir.path().join(UPTIME_FILE), b"{\"id\": 2, \"site_id\": 9, \"rec");

        let reopened = JsonlReportStore::open(dir.path()).await.unwrap();
        let recent = reopened
            .recent(SiteId(9), ReportKind::Uptime, 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let id = reopened
            .record_uptime(SiteId(9), uptime_at(Utc::now(), Liveness::Slow))
            .await
            .unwrap();
        assert_eq!(id, 2);
        let recent = reopened
            .recent(SiteId(9), ReportKind::Uptime, 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn jsonl_append_after_torn_write_stays_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlReportStore::open(dir.path()).await.unwrap();
        store
            .record_uptime(SiteId(5), uptime_at(Utc::now(), Liveness::Up))
            .await
            .unwrap();

        // A write that died halfway leaves an unterminated line behind.
        append_fragment(&dir.path().join(UPTIME_FILE), b"{\"id\": 2, \"site");

        let id = store
            .record_uptime(SiteId(5), uptime_at(Utc::now(), Liveness::Down))
            .await
            .unwrap();
        assert_eq!(id, 2);

        let recent = store.recent(SiteId(5), ReportKind::Uptime, 10).await.unwrap();
        assert_eq!(recent.iter().map(ReportEntry::id).collect::<Vec<_>>(), vec![2, 1]);

        let reopened = JsonlReportStore::open(dir.path()).await.unwrap();
        let id = reopened
            .record_seo(SiteId(5), seo_at(Utc::now(), 60))
            .await
            .unwrap();
        assert_eq!(id, 3);
    }

    #[tokio::test]
    async fn jsonl_store_handles_concurrent_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonlReportStore::open(dir.path()).await.unwrap());
        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..16u64 {
            let store = std::sync::Arc::clone(&store);
            tasks.spawn(async move {
                store
                    .record_uptime(SiteId(n % 2), uptime_at(Utc::now(), Liveness::Up))
                    .await
                    .unwrap()
            });
        }
        let mut ids = tasks.join_all().await;
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());

        let even = store.recent(SiteId(0), ReportKind::Uptime, 100).await.unwrap();
        let odd = store.recent(SiteId(1), ReportKind::Uptime, 100).await.unwrap();
        assert_eq!(even.len() + odd.len(), 16);
    }
}
