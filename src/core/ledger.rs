use std::fs;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::core::models::usage::{CallUsage, DailyLedger, UsageRecord};

/// Lock file name within the ledger directory.
const LEDGER_LOCK: &str = "ledger.lock";

/// Date key used in ledger file names, e.g. "25-08-2026".
const DATE_FORMAT: &str = "%d-%m-%Y";

/// Wall-clock stamp stored on each record.
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Corrupt ledger file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read ledger file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write ledger file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode ledger file {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to lock ledger directory via {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid cost value: {0} (must be finite and non-negative)")]
    InvalidCost(f64),
}

/// Handle to a directory of per-day usage ledgers.
///
/// Each day's records live in `<dir>/<DD-MM-YYYY>_usage.json`, created on the
/// first record of that day. Queries derive the path from the date on every
/// call, so a store constructed yesterday still reads today's file.
pub struct LedgerStore {
    dir: PathBuf,
}

/// Exclusive advisory lock on the ledger directory.
/// Released when the file handle drops.
struct DirLock {
    _file: fs::File,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ledger file path for the given date.
    pub fn ledger_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_usage.json", date.format(DATE_FORMAT)))
    }

    /// Parse a date in the ledger key format ("25-08-2026").
    pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
    }

    /// Records one completed call into today's ledger.
    ///
    /// The whole read-append-write cycle runs under an exclusive lock on the
    /// ledger directory, so concurrent writers serialize instead of losing
    /// updates. The rewrite is atomic (sibling temp file + rename); a failure
    /// leaves the previous ledger intact.
    pub fn record(&self, usage: &CallUsage) -> Result<(), LedgerError> {
        let now = Local::now();
        self.record_at(usage, now.date_naive(), now.format(TIME_FORMAT).to_string())
    }

    // Date and stamp are parameters so day-boundary behavior stays testable.
    fn record_at(
        &self,
        usage: &CallUsage,
        date: NaiveDate,
        time_stamp: String,
    ) -> Result<(), LedgerError> {
        if !usage.total_cost.is_finite() || usage.total_cost < 0.0 {
            return Err(LedgerError::InvalidCost(usage.total_cost));
        }

        fs::create_dir_all(&self.dir).map_err(|source| LedgerError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let _lock = self.lock_exclusive()?;

        let path = self.ledger_path(date);
        let mut ledger = self.read_ledger(&path)?.unwrap_or_default();
        ledger.push(UsageRecord::from_usage(usage, time_stamp));
        self.write_ledger(&path, &ledger)
    }

    /// Running cost for today. `Ok(None)` means nothing recorded yet; a
    /// present but malformed ledger is an error, never a silent zero.
    pub fn daily_total(&self) -> Result<Option<f64>, LedgerError> {
        self.day_total(Local::now().date_naive())
    }

    /// Running cost for an arbitrary date.
    pub fn day_total(&self, date: NaiveDate) -> Result<Option<f64>, LedgerError> {
        Ok(self.load_day(date)?.map(|ledger| ledger.day_cost))
    }

    /// Full ledger for a date, or `None` when no file exists yet.
    pub fn load_day(&self, date: NaiveDate) -> Result<Option<DailyLedger>, LedgerError> {
        self.read_ledger(&self.ledger_path(date))
    }

    fn read_ledger(&self, path: &Path) -> Result<Option<DailyLedger>, LedgerError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let ledger = serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(ledger))
    }

    fn write_ledger(&self, path: &Path, ledger: &DailyLedger) -> Result<(), LedgerError> {
        let json =
            serde_json::to_string_pretty(ledger).map_err(|source| LedgerError::Encode {
                path: path.to_path_buf(),
                source,
            })?;

        // Write a sibling temp file, then rename over the ledger so readers
        // never observe a partial file.
        let tmp_path = path.with_extension("json.tmp");
        if let Err(source) = fs::write(&tmp_path, json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(LedgerError::Write {
                path: tmp_path,
                source,
            });
        }
        if let Err(source) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(LedgerError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(())
    }

    /// Blocking exclusive flock on `<dir>/ledger.lock`. The lock file itself
    /// is never renamed or removed, so the lock identity is stable.
    fn lock_exclusive(&self) -> Result<DirLock, LedgerError> {
        let lock_path = self.dir.join(LEDGER_LOCK);
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|source| LedgerError::Lock {
                path: lock_path.clone(),
                source,
            })?;

        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if ret != 0 {
            return Err(LedgerError::Lock {
                path: lock_path,
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(DirLock { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aim_test_ledger_{}", name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn ledger_path_uses_day_month_year_key() {
        let store = LedgerStore::new("/data/ledgers");
        let path = store.ledger_path(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap());
        assert_eq!(path, PathBuf::from("/data/ledgers/03-01-2026_usage.json"));
    }

    #[test]
    fn parse_date_round_trips_ledger_key() {
        let date = LedgerStore::parse_date("25-08-2026").unwrap();
        assert_eq!(date, fixed_date());
        assert!(LedgerStore::parse_date("2026-08-25").is_err());
    }

    #[test]
    fn first_record_creates_ledger_with_one_entry() {
        let dir = test_dir("first_record");
        let store = LedgerStore::new(&dir);

        let usage = CallUsage::from_split(60, 40, 0.002);
        store
            .record_at(&usage, fixed_date(), "10:30:00".to_string())
            .unwrap();

        let path = store.ledger_path(fixed_date());
        assert!(path.exists());

        let ledger = store.load_day(fixed_date()).unwrap().unwrap();
        assert_eq!(ledger.usage_track.len(), 1);
        assert_eq!(ledger.usage_track[0].total_tokens, 100);
        assert_eq!(ledger.usage_track[0].prompt_tokens, 60);
        assert_eq!(ledger.usage_track[0].completion_tokens, 40);
        assert!((ledger.usage_track[0].total_cost - 0.002).abs() < 1e-10);
        assert!((ledger.day_cost - 0.002).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn second_record_appends_and_accumulates() {
        let dir = test_dir("second_record");
        let store = LedgerStore::new(&dir);

        store
            .record_at(
                &CallUsage::from_split(60, 40, 0.002),
                fixed_date(),
                "10:30:00".to_string(),
            )
            .unwrap();
        store
            .record_at(
                &CallUsage::from_split(30, 20, 0.001),
                fixed_date(),
                "10:31:05".to_string(),
            )
            .unwrap();

        let ledger = store.load_day(fixed_date()).unwrap().unwrap();
        assert_eq!(ledger.usage_track.len(), 2);
        assert!((ledger.day_cost - 0.003).abs() < 1e-10);
        // Insertion order preserved
        assert_eq!(ledger.usage_track[0].time_stamp, "10:30:00");
        assert_eq!(ledger.usage_track[1].time_stamp, "10:31:05");
        assert!(ledger.usage_track[0].time_stamp <= ledger.usage_track[1].time_stamp);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn day_cost_matches_sum_over_many_records() {
        let dir = test_dir("many_records");
        let store = LedgerStore::new(&dir);

        let costs = [0.002, 0.001, 0.0005, 0.01, 0.0, 0.0031, 0.0007];
        for (i, cost) in costs.iter().enumerate() {
            store
                .record_at(
                    &CallUsage::from_split(100 + i as u64, 50, *cost),
                    fixed_date(),
                    format!("11:00:{:02}", i),
                )
                .unwrap();
        }

        let ledger = store.load_day(fixed_date()).unwrap().unwrap();
        assert_eq!(ledger.usage_track.len(), costs.len());
        let sum: f64 = costs.iter().sum();
        assert!((ledger.day_cost - sum).abs() < 1e-10);
        let track_sum: f64 = ledger.usage_track.iter().map(|r| r.total_cost).sum();
        assert!((ledger.day_cost - track_sum).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn total_without_ledger_is_none_and_creates_nothing() {
        let dir = test_dir("no_ledger");
        let store = LedgerStore::new(&dir);

        assert!(store.day_total(fixed_date()).unwrap().is_none());
        assert!(store.daily_total().unwrap().is_none());
        assert!(store.load_day(fixed_date()).unwrap().is_none());
        // Reads never create the directory or any file
        assert!(!dir.exists());
    }

    #[test]
    fn totals_are_idempotent_and_leave_file_untouched() {
        let dir = test_dir("idempotent");
        let store = LedgerStore::new(&dir);

        store
            .record_at(
                &CallUsage::from_split(10, 5, 0.004),
                fixed_date(),
                "09:00:00".to_string(),
            )
            .unwrap();

        let path = store.ledger_path(fixed_date());
        let before = fs::read_to_string(&path).unwrap();

        let first = store.day_total(fixed_date()).unwrap();
        let second = store.day_total(fixed_date()).unwrap();
        assert_eq!(first, second);
        assert!((first.unwrap() - 0.004).abs() < 1e-10);

        let after = fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn records_on_different_days_use_separate_files() {
        let dir = test_dir("day_boundary");
        let store = LedgerStore::new(&dir);

        let day1 = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

        store
            .record_at(
                &CallUsage::from_split(60, 40, 0.002),
                day1,
                "23:59:58".to_string(),
            )
            .unwrap();
        store
            .record_at(
                &CallUsage::from_split(30, 20, 0.001),
                day2,
                "00:00:02".to_string(),
            )
            .unwrap();

        assert!(store.ledger_path(day1).exists());
        assert!(store.ledger_path(day2).exists());

        let first = store.load_day(day1).unwrap().unwrap();
        assert_eq!(first.usage_track.len(), 1);
        assert!((first.day_cost - 0.002).abs() < 1e-10);

        let second = store.load_day(day2).unwrap().unwrap();
        assert_eq!(second.usage_track.len(), 1);
        assert!((second.day_cost - 0.001).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn total_for_one_day_ignores_other_days() {
        let dir = test_dir("cross_day_total");
        let store = LedgerStore::new(&dir);

        // A record far in the past never bleeds into today's total.
        let past = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        store
            .record_at(
                &CallUsage::from_split(60, 40, 5.0),
                past,
                "12:00:00".to_string(),
            )
            .unwrap();

        assert!(store.daily_total().unwrap().is_none());
        assert!((store.day_total(past).unwrap().unwrap() - 5.0).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_ledger_errors_and_stays_untouched() {
        let dir = test_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let store = LedgerStore::new(&dir);

        let path = store.ledger_path(fixed_date());
        fs::write(&path, "{ not valid json !!").unwrap();

        let err = store
            .record_at(
                &CallUsage::from_split(10, 5, 0.001),
                fixed_date(),
                "10:00:00".to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));

        // File left byte-for-byte as found, no temp file behind
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not valid json !!");
        assert!(!path.with_extension("json.tmp").exists());

        let total_err = store.day_total(fixed_date()).unwrap_err();
        assert!(matches!(total_err, LedgerError::Corrupt { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn wrong_shape_json_is_corrupt_too() {
        let dir = test_dir("wrong_shape");
        fs::create_dir_all(&dir).unwrap();
        let store = LedgerStore::new(&dir);

        let path = store.ledger_path(fixed_date());
        fs::write(&path, r#"{"usage_track": "oops"}"#).unwrap();

        let err = store.load_day(fixed_date()).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_cost_is_rejected_before_touching_disk() {
        let dir = test_dir("invalid_cost");
        let store = LedgerStore::new(&dir);

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.001] {
            let err = store
                .record_at(
                    &CallUsage::from_split(10, 5, bad),
                    fixed_date(),
                    "10:00:00".to_string(),
                )
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidCost(_)));
        }
        assert!(!dir.exists());
    }

    #[test]
    fn no_temp_file_remains_after_record() {
        let dir = test_dir("no_tmp");
        let store = LedgerStore::new(&dir);

        store
            .record_at(
                &CallUsage::from_split(10, 5, 0.001),
                fixed_date(),
                "10:00:00".to_string(),
            )
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "stray temp files: {:?}", leftovers);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn record_stamps_parseable_wall_clock_time() {
        let dir = test_dir("wall_clock");
        let store = LedgerStore::new(&dir);

        store.record(&CallUsage::from_split(10, 5, 0.001)).unwrap();

        let today = Local::now().date_naive();
        let ledger = store.load_day(today).unwrap().unwrap();
        assert_eq!(ledger.usage_track.len(), 1);
        let stamp = &ledger.usage_track[0].time_stamp;
        assert!(
            NaiveTime::parse_from_str(stamp, "%H:%M:%S").is_ok(),
            "unparseable stamp: {}",
            stamp
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_records_are_all_kept() {
        let dir = test_dir("concurrent");
        let date = fixed_date();

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    let store = LedgerStore::new(dir);
                    for i in 0..5 {
                        store
                            .record_at(
                                &CallUsage::from_split(100, 50, 0.001),
                                date,
                                format!("14:{:02}:{:02}", t, i),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let store = LedgerStore::new(&dir);
        let ledger = store.load_day(date).unwrap().unwrap();
        assert_eq!(ledger.usage_track.len(), 40);
        assert!((ledger.day_cost - 0.04).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn persisted_file_uses_historical_field_names() {
        let dir = test_dir("field_names");
        let store = LedgerStore::new(&dir);

        store
            .record_at(
                &CallUsage::from_split(60, 40, 0.002),
                fixed_date(),
                "10:30:00".to_string(),
            )
            .unwrap();

        let content = fs::read_to_string(store.ledger_path(fixed_date())).unwrap();
        assert!(content.contains("\"usage_track\""));
        assert!(content.contains("\"day_cost\""));
        assert!(content.contains("\"Total Tokens\""));
        assert!(content.contains("\"Prompt Tokens\""));
        assert!(content.contains("\"Completion Tokens\""));
        assert!(content.contains("\"Total Cost (USD)\""));
        assert!(content.contains("\"Time Stamp\""));

        let _ = fs::remove_dir_all(&dir);
    }
}
