//! Tesseract 文字识别
//!
//! 调用 `tesseract` 命令行输出 TSV，再解析为单词、行和整体置信度。

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::TextExtractor;
use crate::config::Config;
use crate::error::{ExtractionError, ExtractionFailure};
use crate::models::{BBox, OcrLine, OcrResult, OcrWord};

/// 支持的图片扩展名
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// 等待 tesseract 退出时的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tesseract 识别器
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    languages: String,
    psm: u32,
    /// 超时后结束 tesseract 进程，`None` 表示不限时
    timeout: Option<Duration>,
}

impl TesseractExtractor {
    pub fn new(languages: impl Into<String>, psm: u32) -> Self {
        Self {
            languages: languages.into(),
            psm,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ocr_languages.clone(), config.ocr_psm)
            .with_timeout(Duration::from_secs(config.ocr_timeout_secs))
    }

    fn run_tesseract_tsv(&self, path: &Path) -> Result<String, ExtractionFailure> {
        let mut child = Command::new("tesseract")
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractionFailure::EngineUnavailable)?;

        // 管道需要边跑边读，否则输出较多时子进程会阻塞
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => child.wait().map_err(wait_failed)?,
        };

        if !status.success() {
            return Err(ExtractionFailure::EngineError {
                status: status.code(),
                stderr: collect(stderr).trim().to_string(),
            });
        }
        Ok(collect(stdout))
    }
}

/// 等待子进程退出，超过时限则结束进程
///
/// 返回 `Timeout` 时子进程已被回收。
pub fn wait_with_deadline(
    child: &mut Child,
    limit: Duration,
) -> Result<ExitStatus, ExtractionFailure> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(wait_failed)? {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractionFailure::Timeout {
                secs: limit.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn wait_failed(e: std::io::Error) -> ExtractionFailure {
    ExtractionFailure::EngineError {
        status: None,
        stderr: e.to_string(),
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("eng", 3)
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image_path: &Path) -> Result<OcrResult, ExtractionError> {
        let path_text = image_path.display().to_string();
        check_supported_format(image_path)?;

        if !image_path.exists() {
            return Err(ExtractionError::failed(path_text, ExtractionFailure::NotFound));
        }

        // 只读取文件头，损坏或伪装的图片在这里失败
        let (width, height) = image::ImageReader::open(image_path)
            .map_err(|e| ExtractionError::failed(&path_text, ExtractionFailure::Unreadable(e)))?
            .with_guessed_format()
            .map_err(|e| ExtractionError::failed(&path_text, ExtractionFailure::Unreadable(e)))?
            .into_dimensions()
            .map_err(|e| ExtractionError::failed(&path_text, ExtractionFailure::ImageDecode(e)))?;

        debug!(
            "OCR 进度: 0% ({}，{}x{}，语言 {})",
            path_text, width, height, self.languages
        );
        let tsv = self
            .run_tesseract_tsv(image_path)
            .map_err(|failure| ExtractionError::failed(&path_text, failure))?;
        debug!("OCR 进度: 50% (识别完成，解析 TSV)");

        let result = parse_tsv(&tsv);
        debug!(
            "OCR 进度: 100% ({} 个单词, {} 行, 置信度 {:.1})",
            result.words.len(),
            result.lines.len(),
            result.confidence
        );
        Ok(result)
    }
}

/// 检查扩展名，PDF 等非图片格式直接拒绝
pub fn check_supported_format(path: &Path) -> Result<(), ExtractionError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ExtractionError::UnsupportedFormat {
            path: path.display().to_string(),
            extension,
        })
    }
}

/// (page, block, paragraph, line)
type LineKey = (u32, u32, u32, u32);

/// 解析 tesseract TSV 输出
///
/// 只使用 level 5（单词）的行；行置信度为该行单词置信度的平均值，
/// 整体置信度为全部单词置信度的平均值。
pub fn parse_tsv(tsv: &str) -> OcrResult {
    let mut grouped: Vec<(LineKey, Vec<OcrWord>)> = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 11 {
            continue;
        }
        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let conf: f64 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols.get(11).map(|t| t.trim()).unwrap_or_default();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let parse = |i: usize| -> u32 { cols[i].trim().parse().unwrap_or(0) };
        let key = (parse(1), parse(2), parse(3), parse(4));
        let (left, top, width, height) = (parse(6), parse(7), parse(8), parse(9));
        let word = OcrWord {
            text: text.to_string(),
            confidence: conf,
            bbox: BBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        };

        match grouped.last_mut() {
            Some((last_key, words)) if *last_key == key => words.push(word),
            _ => grouped.push((key, vec![word])),
        }
    }

    let mut text = String::new();
    let mut lines = Vec::with_capacity(grouped.len());
    let mut words = Vec::new();
    let mut previous_paragraph: Option<(u32, u32, u32)> = None;

    for ((page, block, par, _), line_words) in grouped {
        let line_text = line_words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let line_conf = mean(line_words.iter().map(|w| w.confidence));

        let paragraph = (page, block, par);
        if let Some(previous) = previous_paragraph {
            text.push('\n');
            if previous != paragraph {
                text.push('\n');
            }
        }
        previous_paragraph = Some(paragraph);
        text.push_str(&line_text);

        lines.push(OcrLine {
            text: line_text,
            confidence: line_conf,
        });
        words.extend(line_words);
    }

    let confidence = mean(words.iter().map(|w| w.confidence));
    OcrResult {
        text,
        confidence,
        words,
        lines,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn sample_tsv() -> String {
        [
            HEADER,
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t300\t20\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t90\tStudent",
            "5\t1\t1\t1\t1\t2\t95\t10\t60\t20\t80\tName:",
            "5\t1\t1\t1\t1\t3\t160\t10\t60\t20\t70\tJane",
            "5\t1\t1\t1\t2\t1\t10\t40\t90\t20\t60\tQuestion",
            "5\t1\t1\t1\t2\t2\t105\t40\t20\t20\t-1\t ",
            "5\t1\t1\t1\t2\t3\t130\t40\t20\t20\t100\t1:",
            "5\t1\t2\t1\t1\t1\t10\t90\t30\t20\t50\t42",
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_tsv_groups_lines_and_paragraphs() {
        let result = parse_tsv(&sample_tsv());
        assert_eq!(result.words.len(), 6);
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.lines[0].text, "Student Name: Jane");
        assert!((result.lines[0].confidence - 80.0).abs() < 1e-9);
        assert_eq!(result.text, "Student Name: Jane\nQuestion 1:\n\n42");
        assert!((result.confidence - 75.0).abs() < 1e-9);
        assert_eq!(
            result.words[0].bbox,
            BBox {
                x0: 10,
                y0: 10,
                x1: 90,
                y1: 30
            }
        );
    }

    #[test]
    fn test_parse_empty_tsv() {
        let result = parse_tsv(HEADER);
        assert!(result.text.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.words.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_slow_process() {
        let mut child = Command::new("sleep").arg("10").spawn().unwrap();
        let started = Instant::now();
        let err = wait_with_deadline(&mut child, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ExtractionFailure::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        // 已被回收
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_returns_exit_status() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_with_deadline(&mut child, Duration::from_secs(5)).unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_valid_image_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        // 未安装 tesseract 时为 EngineUnavailable，安装时识别结果为空白
        let extractor = TesseractExtractor::default().with_timeout(Duration::from_secs(30));
        match extractor.extract(&path) {
            Ok(result) => assert!(result.text.trim().is_empty()),
            Err(ExtractionError::Failed { failure, .. }) => assert!(!matches!(
                failure,
                ExtractionFailure::NotFound | ExtractionFailure::ImageDecode(_)
            )),
            Err(e) => panic!("意外的错误: {}", e),
        }
    }

    #[test]
    fn test_from_config_applies_timeout() {
        let config = Config {
            ocr_timeout_secs: 7,
            ..Default::default()
        };
        let extractor = TesseractExtractor::from_config(&config);
        assert_eq!(extractor.timeout, Some(Duration::from_secs(7)));
        assert_eq!(TesseractExtractor::default().timeout, None);
    }

    #[test]
    fn test_pdf_is_unsupported() {
        let err = check_supported_format(Path::new("uploads/essay.PDF")).unwrap_err();
        assert!(err.is_unsupported_format());
        assert!(check_supported_format(Path::new("scan.JPG")).is_ok());
        assert!(check_supported_format(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_pdf_fails_before_touching_disk() {
        let extractor = TesseractExtractor::default();
        let err = extractor.extract(Path::new("/does/not/exist.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_image_is_extraction_failure() {
        let extractor = TesseractExtractor::default();
        let err = extractor.extract(Path::new("/does/not/exist.png")).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Failed {
                failure: ExtractionFailure::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_image_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = TesseractExtractor::default().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Failed { .. }));
        assert!(!err.is_unsupported_format());
    }
}
