use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use crate::drivers::{DashboardError, ModelScores, Record, SCORE_KEYS};

/// Session log: one CSV row per live record while connected.
pub struct DataRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    keys: Vec<String>,
}

impl DataRecorder {
    pub fn new() -> Self {
        Self { writer: None, path: None, keys: Vec::new() }
    }

    pub fn start(&mut self, dir: &Path, keys: &[String]) -> Result<PathBuf, DashboardError> {
        self.stop();
        fs::create_dir_all(dir)?;
        // 文件名带时间戳，避免覆盖上一次会话
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("vitals_log_{}.csv", stamp));
        // 同一秒内重新连接时追加到同一个文件，不覆盖已有数据
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut w = BufWriter::new(file);
        if fresh {
            // CSV 表头: Timestamp, 各通道, 各模型评分
            write!(w, "Timestamp")?;
            for key in keys.iter().map(String::as_str).chain(SCORE_KEYS) {
                write!(w, ",{}", key)?;
            }
            writeln!(w)?;
        }
        log::info!("recording session to {}", path.display());
        self.writer = Some(w);
        self.path = Some(path.clone());
        self.keys = keys.to_vec();
        Ok(path)
    }

    pub fn stop(&mut self) {
        if let Some(mut w) = self.writer.take() {
            if let Err(err) = w.flush() {
                log::warn!("failed to flush session log: {err}");
            }
            if let Some(path) = &self.path {
                log::info!("session log saved: {}", path.display());
            }
        }
    }

    /// Missing channel values and absent scores are left blank.
    pub fn write_record(
        &mut self,
        record: &Record,
        scores: Option<&ModelScores>,
    ) -> Result<(), DashboardError> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        write!(w, "{}", record.timestamp)?;
        for key in &self.keys {
            match record.value(key) {
                Some(v) => write!(w, ",{}", v)?,
                None => write!(w, ",")?,
            }
        }
        match scores {
            Some(scores) => {
                for (_, _, value) in scores.entries() {
                    write!(w, ",{:.2}", value)?;
                }
            }
            None => write!(w, "{}", ",".repeat(SCORE_KEYS.len()))?,
        }
        writeln!(w)?;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for DataRecorder {
    fn default() -> Self {
        Self::new()
    }
}
