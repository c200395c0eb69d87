//! Prometheus text exposition parsing
//!
//! Parses the line-based text format into metric families and extracts the
//! reading of a single gauge. A metric that is missing from the body is
//! reported as [`ExpositionError::MetricNotFound`], never as a zero reading.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Declared type of a metric family (`# TYPE` line)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricKind {
    fn from_type_token(token: &str) -> Option<Self> {
        match token {
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "histogram" => Some(MetricKind::Histogram),
            "summary" => Some(MetricKind::Summary),
            "untyped" => Some(MetricKind::Untyped),
            _ => None,
        }
    }

    fn has_child_series(&self) -> bool {
        matches!(self, MetricKind::Histogram | MetricKind::Summary)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::Untyped => "untyped",
        };
        f.write_str(s)
    }
}

/// A single sample line
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Series name as written (may carry a `_bucket`/`_sum`/`_count` suffix)
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// All samples published under one metric name, in body order
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub kind: MetricKind,
    pub help: Option<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MetricKind::Untyped,
            help: None,
            samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpositionError {
    #[error("malformed exposition at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("metric {name} not found")]
    MetricNotFound { name: String },

    #[error("metric {name} has no samples")]
    NoSamples { name: String },

    #[error("metric {name} is a {kind}, expected a gauge")]
    WrongKind { name: String, kind: MetricKind },

    #[error("metric {name} has unusable reading {value}")]
    InvalidReading { name: String, value: f64 },
}

impl ExpositionError {
    /// Short stable label for logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            ExpositionError::Malformed { .. } => "malformed",
            ExpositionError::MetricNotFound { .. } => "metric_not_found",
            ExpositionError::NoSamples { .. } => "no_samples",
            ExpositionError::WrongKind { .. } => "wrong_kind",
            ExpositionError::InvalidReading { .. } => "invalid_reading",
        }
    }
}

/// Parse a full exposition body into families keyed by name
pub fn parse(body: &str) -> Result<BTreeMap<String, MetricFamily>, ExpositionError> {
    let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
    let mut declared: HashMap<String, MetricKind> = HashMap::new();

    for (idx, raw) in body.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let malformed = |reason: String| ExpositionError::Malformed {
            line: line_no,
            reason,
        };

        if let Some(comment) = line.strip_prefix('#') {
            let mut parts = comment.trim_start().splitn(3, char::is_whitespace);
            match parts.next() {
                Some("HELP") => {
                    let name = parts
                        .next()
                        .filter(|n| is_metric_name(n))
                        .ok_or_else(|| malformed("HELP line without a valid metric name".into()))?;
                    let text = unescape_help(parts.next().unwrap_or("").trim());
                    families
                        .entry(name.to_string())
                        .or_insert_with(|| MetricFamily::new(name))
                        .help = Some(text);
                }
                Some("TYPE") => {
                    let name = parts
                        .next()
                        .filter(|n| is_metric_name(n))
                        .ok_or_else(|| malformed("TYPE line without a valid metric name".into()))?;
                    let token = parts.next().map(str::trim).unwrap_or("");
                    let kind = MetricKind::from_type_token(token)
                        .ok_or_else(|| malformed(format!("unknown metric type '{}'", token)))?;
                    if declared.insert(name.to_string(), kind).is_some() {
                        return Err(malformed(format!("duplicate TYPE line for {}", name)));
                    }
                    if families.get(name).is_some_and(|f| !f.samples.is_empty()) {
                        return Err(malformed(format!("TYPE line for {} after its samples", name)));
                    }
                    families
                        .entry(name.to_string())
                        .or_insert_with(|| MetricFamily::new(name))
                        .kind = kind;
                }
                _ => {}
            }
            continue;
        }

        let sample = parse_sample(line).map_err(malformed)?;
        let family = family_name(&sample.name, &declared).to_string();
        families
            .entry(family.clone())
            .or_insert_with(|| MetricFamily::new(&family))
            .samples
            .push(sample);
    }

    Ok(families)
}

/// Value of the first sample of the named gauge
pub fn gauge_value(body: &str, metric_name: &str) -> Result<f64, ExpositionError> {
    let families = parse(body)?;
    let family = families
        .get(metric_name)
        .ok_or_else(|| ExpositionError::MetricNotFound {
            name: metric_name.to_string(),
        })?;

    if !matches!(family.kind, MetricKind::Gauge | MetricKind::Untyped) {
        return Err(ExpositionError::WrongKind {
            name: metric_name.to_string(),
            kind: family.kind,
        });
    }

    family
        .samples
        .first()
        .map(|s| s.value)
        .ok_or_else(|| ExpositionError::NoSamples {
            name: metric_name.to_string(),
        })
}

/// Gauge reading interpreted as a queue depth
///
/// Fractional readings round up so any non-zero gauge counts as pending work.
pub fn queue_depth(body: &str, metric_name: &str) -> Result<u64, ExpositionError> {
    let value = gauge_value(body, metric_name)?;
    if !value.is_finite() || value < 0.0 {
        return Err(ExpositionError::InvalidReading {
            name: metric_name.to_string(),
            value,
        });
    }
    Ok(value.ceil() as u64)
}

fn family_name<'a>(sample_name: &'a str, declared: &HashMap<String, MetricKind>) -> &'a str {
    for suffix in ["_bucket", "_sum", "_count", "_created"] {
        if let Some(base) = sample_name.strip_suffix(suffix) {
            if declared.get(base).is_some_and(|k| k.has_child_series()) {
                return base;
            }
        }
    }
    sample_name
}

fn parse_sample(line: &str) -> Result<Sample, String> {
    let mut cur = Cursor::new(line);

    let name = cur.take_while(is_metric_name_char);
    if !is_metric_name(name) {
        return Err(format!("invalid metric name in '{}'", line));
    }

    let labels = if cur.eat('{') {
        parse_labels(&mut cur)?
    } else {
        Vec::new()
    };

    let rest = cur.rest();
    if !rest.starts_with(char::is_whitespace) {
        return Err(format!("expected whitespace before value of {}", name));
    }

    let mut tokens = rest.split_whitespace();
    let value = tokens
        .next()
        .ok_or_else(|| format!("missing value for {}", name))
        .and_then(parse_value)?;
    let timestamp_ms = tokens
        .next()
        .map(|t| {
            t.parse::<i64>()
                .map_err(|_| format!("invalid timestamp '{}' for {}", t, name))
        })
        .transpose()?;
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected trailing token '{}' after {}", extra, name));
    }

    Ok(Sample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

fn parse_labels(cur: &mut Cursor<'_>) -> Result<Vec<(String, String)>, String> {
    let mut labels = Vec::new();
    loop {
        cur.skip_ws();
        if cur.eat('}') {
            return Ok(labels);
        }

        let name = cur.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err("invalid label name".to_string());
        }
        cur.skip_ws();
        if !cur.eat('=') {
            return Err(format!("expected '=' after label {}", name));
        }
        cur.skip_ws();
        if !cur.eat('"') {
            return Err(format!("expected quoted value for label {}", name));
        }

        let mut value = String::new();
        loop {
            match cur.bump() {
                Some('"') => break,
                Some('\\') => match cur.bump() {
                    Some('n') => value.push('\n'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(format!("unterminated value for label {}", name)),
                },
                Some(c) => value.push(c),
                None => return Err(format!("unterminated value for label {}", name)),
            }
        }
        labels.push((name.to_string(), value));

        cur.skip_ws();
        if cur.eat(',') {
            continue;
        }
        if cur.eat('}') {
            return Ok(labels);
        }
        return Err("expected ',' or '}' in label set".to_string());
    }
}

fn parse_value(token: &str) -> Result<f64, String> {
    match token {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => token
            .parse::<f64>()
            .map_err(|_| format!("invalid sample value '{}'", token)),
    }
}

fn unescape_help(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\\\", "\\")
}

fn is_metric_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn is_metric_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(is_metric_name_char)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }
}
