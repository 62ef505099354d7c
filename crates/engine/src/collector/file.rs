//! 파일 기반 로그 수집기
//!
//! 로그 파일을 주기적으로 폴링하며 새로 추가된 라인을 수집합니다.
//! `tail -f`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 잘림 감지
//! 파일 크기가 마지막 읽기 위치보다 작아지면 처음부터 다시 읽습니다.
//! 아직 개행이 붙지 않은 마지막 조각은 다음 폴링까지 보류합니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use metrics::counter;
use procmeter_core::metrics as m;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};

use super::{CollectorStatus, LogLine};
use crate::error::ProcEngineError;

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct FileTailConfig {
    /// 감시할 파일 경로
    pub path: PathBuf,
    /// 파일 상태 체크 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 기존 내용부터 읽을지 여부 (`false`면 현재 끝에서 시작)
    pub from_beginning: bool,
    /// 최대 라인 길이 (바이트, 초과분은 잘라냄)
    pub max_line_length: usize,
}

impl FileTailConfig {
    /// 경로로 기본 설정을 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval_ms: 250,
            from_beginning: false,
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 파일 tail 수집기
pub struct FileTailCollector {
    config: FileTailConfig,
    tx: mpsc::Sender<LogLine>,
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 개행 전까지 보류 중인 조각 (최대 `max_line_length`)
    pending: Vec<u8>,
    /// 잘라서 내보낸 라인의 나머지를 개행까지 버리는 중
    discarding: bool,
    /// 시작 위치 결정 여부
    positioned: bool,
    status: CollectorStatus,
    source: String,
}

impl FileTailCollector {
    /// 새 파일 수집기를 생성합니다.
    pub fn new(config: FileTailConfig, tx: mpsc::Sender<LogLine>) -> Self {
        let source = format!("file:{}", config.path.display());
        Self {
            config,
            tx,
            offset: 0,
            pending: Vec::new(),
            discarding: false,
            positioned: false,
            status: CollectorStatus::Idle,
            source,
        }
    }

    /// 수집기를 실행합니다.
    ///
    /// `shutdown`이 `true`가 되거나 수신 측이 닫힐 때까지 실행됩니다.
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProcEngineError> {
        self.status = CollectorStatus::Running;
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        tracing::info!(
            path = %self.config.path.display(),
            poll_interval_ms = self.config.poll_interval_ms,
            "file tail collector started"
        );

        loop {
            let lines = match self.poll_once().await {
                Ok(lines) => lines,
                Err(e) => {
                    self.status = CollectorStatus::Error(e.to_string());
                    return Err(e);
                }
            };

            for text in lines {
                let line = LogLine::new(text, self.source.clone());
                if self.tx.send(line).await.is_err() {
                    tracing::debug!("line receiver closed, stopping collector");
                    self.status = CollectorStatus::Stopped;
                    return Ok(());
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(path = %self.config.path.display(), "file tail collector stopping");
                        self.status = CollectorStatus::Stopped;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// 파일을 한 번 폴링하여 완성된 새 라인을 반환합니다.
    ///
    /// 파일이 아직 없으면 빈 목록을 반환합니다.
    pub async fn poll_once(&mut self) -> Result<Vec<String>, ProcEngineError> {
        let path = self.config.path.clone();
        let len = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "watched file does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(collector_error(&path, "failed to read metadata", e)),
        };

        if !self.positioned {
            self.offset = if self.config.from_beginning { 0 } else { len };
            self.positioned = true;
        }

        if len < self.offset {
            tracing::warn!(
                path = %path.display(),
                previous_offset = self.offset,
                new_len = len,
                "file truncated, reading from start"
            );
            counter!(m::COLLECTOR_TRUNCATIONS_TOTAL).increment(1);
            self.offset = 0;
            self.pending.clear();
            self.discarding = false;
        }

        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| collector_error(&path, "failed to open file", e))?;
        file.seek(std::io::SeekFrom::Start(self.offset))
            .await
            .map_err(|e| collector_error(&path, "failed to seek", e))?;

        let mut buf = Vec::new();
        let read = file
            .read_to_end(&mut buf)
            .await
            .map_err(|e| collector_error(&path, "failed to read", e))?;
        self.offset += read as u64;

        let lines = self.absorb(&buf);
        counter!(m::COLLECTOR_LINES_READ_TOTAL).increment(lines.len() as u64);
        Ok(lines)
    }

    /// 읽은 바이트를 보류 버퍼에 합치고 완성된 라인을 꺼냅니다.
    ///
    /// 개행 없이 `max_line_length`를 넘은 조각은 잘라서 한 라인으로 내보내고,
    /// 그 라인의 나머지는 다음 개행까지 버립니다.
    fn absorb(&mut self, mut buf: &[u8]) -> Vec<String> {
        if self.discarding {
            match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    buf = &buf[pos + 1..];
                    self.discarding = false;
                }
                None => return Vec::new(),
            }
        }

        self.pending.extend_from_slice(buf);
        let mut lines = self.drain_complete_lines();

        if self.pending.len() > self.config.max_line_length {
            tracing::warn!(
                length = self.pending.len(),
                max = self.config.max_line_length,
                "line too long without newline, truncating"
            );
            let mut piece = std::mem::take(&mut self.pending);
            piece.truncate(self.config.max_line_length);
            lines.push(String::from_utf8_lossy(&piece).into_owned());
            self.discarding = true;
        }
        lines
    }

    /// 보류 버퍼에서 개행으로 끝난 라인을 꺼냅니다.
    fn drain_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|raw| {
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                if raw.is_empty() {
                    return None;
                }
                let raw = if raw.len() > self.config.max_line_length {
                    tracing::warn!(
                        length = raw.len(),
                        max = self.config.max_line_length,
                        "line too long, truncating"
                    );
                    &raw[..self.config.max_line_length]
                } else {
                    raw
                };
                Some(String::from_utf8_lossy(raw).into_owned())
            })
            .collect()
    }

    /// 현재 읽기 위치
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &CollectorStatus {
        &self.status
    }
}

/// 파일 전체를 읽어 비어 있지 않은 라인 목록을 반환합니다.
pub async fn read_all_lines(path: impl AsRef<Path>) -> Result<Vec<String>, ProcEngineError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| collector_error(path, "failed to read file", e))?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn collector_error(path: &Path, what: &str, err: std::io::Error) -> ProcEngineError {
    ProcEngineError::Collector {
        path: path.display().to_string(),
        reason: format!("{what}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn collector(path: &Path, from_beginning: bool) -> (FileTailCollector, mpsc::Receiver<LogLine>) {
        let (tx, rx) = mpsc::channel(16);
        let mut config = FileTailConfig::new(path);
        config.from_beginning = from_beginning;
        config.poll_interval_ms = 10;
        (FileTailCollector::new(config, tx), rx)
    }

    #[test]
    fn default_config() {
        let config = FileTailConfig::new("/tmp/game.log");
        assert_eq!(config.poll_interval_ms, 250);
        assert!(!config.from_beginning);
    }

    #[test]
    fn collector_starts_idle() {
        let (tx, _rx) = mpsc::channel(10);
        let collector = FileTailCollector::new(FileTailConfig::new("/tmp/x.log"), tx);
        assert_eq!(*collector.status(), CollectorStatus::Idle);
    }

    #[tokio::test]
    async fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut c, _rx) = collector(&dir.path().join("absent.log"), true);
        assert!(c.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_existing_content_from_beginning() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "line one").unwrap();
        writeln!(file, "line two").unwrap();

        let (mut c, _rx) = collector(file.path(), true);
        assert_eq!(c.poll_once().await.unwrap(), vec!["line one", "line two"]);
        assert!(c.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skips_existing_content_when_tailing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "old").unwrap();

        let (mut c, _rx) = collector(file.path(), false);
        assert!(c.poll_once().await.unwrap().is_empty());

        writeln!(file, "new").unwrap();
        assert_eq!(c.poll_once().await.unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn holds_partial_line_until_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let (mut c, _rx) = collector(file.path(), true);

        write!(file, "You heal your").unwrap();
        file.flush().unwrap();
        assert!(c.poll_once().await.unwrap().is_empty());

        writeln!(file, "self for 5 hitpoints.").unwrap();
        assert_eq!(
            c.poll_once().await.unwrap(),
            vec!["You heal yourself for 5 hitpoints."]
        );
    }

    #[tokio::test]
    async fn strips_carriage_returns_and_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a\r\n\r\nb\n").unwrap();
        file.flush().unwrap();

        let (mut c, _rx) = collector(file.path(), true);
        assert_eq!(c.poll_once().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn detects_truncation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first session line").unwrap();

        let (mut c, _rx) = collector(file.path(), true);
        assert_eq!(c.poll_once().await.unwrap().len(), 1);

        // 파일을 비우고 더 짧은 내용으로 다시 씀
        file.as_file().set_len(0).unwrap();
        std::fs::write(file.path(), "new\n").unwrap();

        assert_eq!(c.poll_once().await.unwrap(), vec!["new"]);
        assert_eq!(c.offset(), 4);
    }

    #[tokio::test]
    async fn run_sends_lines_and_stops_on_shutdown() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "A dragon hits you for 75 hitpoints").unwrap();

        let (mut c, mut rx) = collector(file.path(), true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let result = c.run(shutdown_rx).await;
            (result, c.status().clone())
        });

        let line = rx.recv().await.unwrap();
        assert_eq!(line.text, "A dragon hits you for 75 hitpoints");
        assert!(line.source.starts_with("file:"));

        shutdown_tx.send(true).unwrap();
        let (result, status) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(status, CollectorStatus::Stopped);
    }

    #[tokio::test]
    async fn caps_unterminated_line_and_discards_its_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let mut config = FileTailConfig::new(file.path());
        config.from_beginning = true;
        config.max_line_length = 8;
        let mut c = FileTailCollector::new(config, tx);

        write!(file, "abcdefghijkl").unwrap();
        file.flush().unwrap();
        assert_eq!(c.poll_once().await.unwrap(), vec!["abcdefgh"]);
        assert!(c.pending.is_empty());

        write!(file, "mnop").unwrap();
        file.flush().unwrap();
        assert!(c.poll_once().await.unwrap().is_empty());
        assert!(c.pending.is_empty());

        writeln!(file, "qr").unwrap();
        writeln!(file, "next").unwrap();
        assert_eq!(c.poll_once().await.unwrap(), vec!["next"]);
    }

    #[tokio::test]
    async fn read_all_lines_skips_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "one\n\n  \ntwo  \n").unwrap();
        file.flush().unwrap();
        let lines = read_all_lines(file.path()).await.unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn read_all_lines_missing_file_errors() {
        let result = read_all_lines("/nonexistent/game.log").await;
        assert!(matches!(result, Err(ProcEngineError::Collector { .. })));
    }
}
