//! The detector: a compiled forest plus match configuration.
//!
//! A [`Detector`] owns an `Arc<RuleForest>` and is cheap to clone; every
//! match call owns its byte source and transient buffers exclusively, so
//! one detector can serve concurrent calls without locking.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mime_magic_core::{Error, MarkRead, MmapSource, RandomAccess, Result, RuleForest, RuleId};

use crate::eval::collect_matches;
use crate::specificity::specificity;

/// MIME type reported when no rule matches, unless the caller configures
/// another.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// How many matches a detection call reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Report only the most specific match.
    #[default]
    MostSpecific,
    /// Report every contributing match, most specific first.
    CollectAll,
}

/// Per-detector options. No ambient globals: every knob lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// MIME type returned by [`Detector::mime_type`] when nothing matches.
    pub unknown_mime: String,
    /// Single best match, or all matches.
    pub mode: MatchMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            unknown_mime: UNKNOWN_MIME_TYPE.to_string(),
            mode: MatchMode::default(),
        }
    }
}

/// One contributing match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The matched rule.
    pub rule: RuleId,
    /// The rule's MIME type.
    pub mime_type: String,
    /// Ranking score; see the `specificity` module.
    pub specificity: f64,
}

/// Result of one detection call.
///
/// Matches are ordered by descending specificity, then source order. Under
/// [`MatchMode::MostSpecific`] at most one entry is present. An empty list
/// is the normal "no match" outcome, not an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    /// Contributing matches, best first.
    pub matches: Vec<MatchResult>,
}

impl Detection {
    /// The most specific match, if any rule matched.
    pub fn best(&self) -> Option<&MatchResult> {
        self.matches.first()
    }

    /// MIME type of the most specific match.
    pub fn mime_type(&self) -> Option<&str> {
        self.best().map(|m| m.mime_type.as_str())
    }

    /// Whether nothing matched.
    pub fn is_no_match(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Matches byte sources against a compiled rule forest.
#[derive(Debug, Clone)]
pub struct Detector {
    forest: Arc<RuleForest>,
    config: DetectorConfig,
}

impl Detector {
    /// Create a detector with default configuration.
    pub fn new(forest: impl Into<Arc<RuleForest>>) -> Self {
        Detector {
            forest: forest.into(),
            config: DetectorConfig::default(),
        }
    }

    /// Create a detector with explicit configuration.
    pub fn with_config(forest: impl Into<Arc<RuleForest>>, config: DetectorConfig) -> Self {
        Detector {
            forest: forest.into(),
            config,
        }
    }

    /// The compiled forest this detector matches against.
    pub fn forest(&self) -> &RuleForest {
        &self.forest
    }

    /// This detector's configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Match a random-access source.
    ///
    /// Root rules are evaluated in source order; each match call reads
    /// through the source independently and leaves no state behind.
    pub fn detect<S: RandomAccess + ?Sized>(&self, src: &S) -> Result<Detection> {
        let mut candidates: Vec<RuleId> = Vec::new();
        for &root in self.forest.roots() {
            collect_matches(&self.forest, root, src, &mut candidates)?;
        }

        let mut matches: Vec<MatchResult> = candidates
            .into_iter()
            .map(|id| MatchResult {
                rule: id,
                mime_type: self
                    .forest
                    .rule(id)
                    .mime_type
                    .clone()
                    .unwrap_or_default(),
                specificity: specificity(&self.forest, id),
            })
            .collect();
        // Best first; equal scores fall back to source order, so the
        // earliest rule wins.
        matches.sort_by(|a, b| {
            b.specificity
                .total_cmp(&a.specificity)
                .then(a.rule.cmp(&b.rule))
        });

        debug!(
            "detection complete: {} candidate(s), best {:?}",
            matches.len(),
            matches.first().map(|m| m.mime_type.as_str())
        );

        if self.config.mode == MatchMode::MostSpecific {
            matches.truncate(1);
        }
        Ok(Detection { matches })
    }

    /// Match an in-memory buffer.
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<Detection> {
        self.detect(bytes)
    }

    /// Match a file through a memory mapping.
    pub fn detect_file(&self, path: impl AsRef<Path>) -> Result<Detection> {
        let src = MmapSource::open(path)?;
        self.detect(&src)
    }

    /// Match a forward stream with mark/reset support.
    ///
    /// The stream is marked once with the forest's precomputed maximum read
    /// length, a prefix of at most that many bytes is buffered, and the
    /// stream is reset before the buffer is matched — the call never
    /// consumes the stream beyond the mark.
    pub fn detect_stream<R: MarkRead + ?Sized>(&self, stream: &mut R) -> Result<Detection> {
        if !stream.mark_supported() {
            return Err(Error::usage("stream does not support mark/reset"));
        }

        let limit = self.forest.max_read_length() as usize;
        stream.mark(limit);
        let mut prefix = vec![0u8; limit];
        let read_result = read_full(stream, &mut prefix);
        let reset_result = stream.reset();

        let filled = read_result?;
        reset_result?;
        prefix.truncate(filled);
        self.detect(prefix.as_slice())
    }

    /// Convenience: the selected MIME type of a random-access source, with
    /// the configured unknown type standing in when nothing matches.
    pub fn mime_type<S: RandomAccess + ?Sized>(&self, src: &S) -> Result<String> {
        let detection = self.detect(src)?;
        Ok(detection
            .mime_type()
            .unwrap_or(&self.config.unknown_mime)
            .to_string())
    }
}

/// Read into `buf` until it is full or the reader hits EOF.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mime_magic_core::{ReplayReader, Rule, RuleKind, RuleOp};

    fn pdf_forest() -> RuleForest {
        let mut forest = RuleForest::new();
        let mut rule = Rule::new(0, RuleKind::string(), RuleOp::Equals);
        rule.content = b"%PDF".to_vec();
        rule.mime_type = Some("application/pdf".to_string());
        forest.attach(rule, None);
        forest
    }

    #[test]
    fn detect_bytes_best_match() {
        let detector = Detector::new(pdf_forest());
        let detection = detector.detect_bytes(b"%PDF-1.4").unwrap();
        assert_eq!(detection.mime_type(), Some("application/pdf"));
        assert!(!detection.is_no_match());
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let detector = Detector::new(pdf_forest());
        let detection = detector.detect_bytes(b"GIF89a").unwrap();
        assert!(detection.is_no_match());
        assert_eq!(detection.mime_type(), None);
    }

    #[test]
    fn mime_type_falls_back_to_unknown() {
        let detector = Detector::new(pdf_forest());
        assert_eq!(
            detector.mime_type(&b"GIF89a"[..]).unwrap(),
            UNKNOWN_MIME_TYPE
        );

        let custom = Detector::with_config(
            pdf_forest(),
            DetectorConfig {
                unknown_mime: "application/x-unknown".to_string(),
                mode: MatchMode::MostSpecific,
            },
        );
        assert_eq!(
            custom.mime_type(&b"GIF89a"[..]).unwrap(),
            "application/x-unknown"
        );
    }

    #[test]
    fn collect_all_reports_every_match() {
        let mut forest = RuleForest::new();
        for mime in ["a/first", "a/second"] {
            let mut rule = Rule::new(0, RuleKind::string(), RuleOp::Equals);
            rule.content = b"PK".to_vec();
            rule.mime_type = Some(mime.to_string());
            forest.attach(rule, None);
        }

        let all = Detector::with_config(
            forest.clone(),
            DetectorConfig {
                unknown_mime: UNKNOWN_MIME_TYPE.to_string(),
                mode: MatchMode::CollectAll,
            },
        );
        let detection = all.detect_bytes(b"PK\x03\x04").unwrap();
        let mimes: Vec<&str> = detection.matches.iter().map(|m| m.mime_type.as_str()).collect();
        assert_eq!(mimes, vec!["a/first", "a/second"]);

        let best_only = Detector::new(forest);
        let detection = best_only.detect_bytes(b"PK\x03\x04").unwrap();
        assert_eq!(detection.matches.len(), 1);
        assert_eq!(detection.mime_type(), Some("a/first"));
    }

    #[test]
    fn stream_detection_resets_to_mark() {
        let detector = Detector::new(pdf_forest());
        let mut stream = ReplayReader::new(&b"%PDF-1.7 rest of document"[..]);

        let detection = detector.detect_stream(&mut stream).unwrap();
        assert_eq!(detection.mime_type(), Some("application/pdf"));

        // The stream is positioned back at the start afterwards.
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"%PDF-1.7 rest of document");
    }

    #[test]
    fn stream_without_mark_support_is_a_usage_error() {
        struct NoMark;
        impl Read for NoMark {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Ok(0)
            }
        }
        impl MarkRead for NoMark {
            fn mark_supported(&self) -> bool {
                false
            }
            fn mark(&mut self, _limit: usize) {}
            fn reset(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let detector = Detector::new(pdf_forest());
        let err = detector.detect_stream(&mut NoMark).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn detect_file_uses_mmap_source() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.5\n%stuff").unwrap();
        tmp.flush().unwrap();

        let detector = Detector::new(pdf_forest());
        let detection = detector.detect_file(tmp.path()).unwrap();
        assert_eq!(detection.mime_type(), Some("application/pdf"));
    }

    #[test]
    fn detector_is_shareable_across_threads() {
        let detector = Detector::new(pdf_forest());
        let other = detector.clone();

        let handle = std::thread::spawn(move || {
            other.detect_bytes(b"%PDF-1.4").unwrap().mime_type().map(str::to_owned)
        });
        let here = detector.detect_bytes(b"%PDF-1.4").unwrap();

        assert_eq!(
            handle.join().unwrap().as_deref(),
            here.mime_type()
        );
    }
}
