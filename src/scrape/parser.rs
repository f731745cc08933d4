//! Prometheus text exposition parser
//!
//! Parses the text format (version 0.0.4) into [`Metric`] series:
//!
//! ```text
//! # HELP redis_up Information about the Redis instance
//! # TYPE redis_up gauge
//! redis_up{addr="redis:6379"} 1 1530627536000
//! ```
//!
//! `# HELP` and free-form comments are skipped. Timestamps are accepted and
//! discarded.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::labels::LabelSet;
use crate::transformer::{Metric, MetricType};

/// Parser result type
pub type ParseResult<T> = Result<T, ParseError>;

/// Suffixes of the series that make up a histogram or summary family
const FAMILY_SUFFIXES: [&str; 3] = ["_bucket", "_sum", "_count"];

fn metric_name_re() -> &'static Regex {
    static METRIC_NAME_RE: OnceLock<Regex> = OnceLock::new();
    METRIC_NAME_RE
        .get_or_init(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("invalid metric name regex"))
}

/// Parse an exposition payload into metric series, in payload order
///
/// # Errors
/// Returns the first malformed sample line, with its 1-based line number.
pub fn parse_exposition(text: &str) -> ParseResult<Vec<Metric>> {
    let mut types: HashMap<String, MetricType> = HashMap::new();
    let mut metrics = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if let Some((name, metric_type)) = parse_type_comment(comment) {
                types.insert(name.to_string(), metric_type);
            }
            continue;
        }

        let mut metric = parse_sample(line, line_no)?;
        metric.metric_type = lookup_type(&types, &metric.name);
        metrics.push(metric);
    }

    tracing::trace!(series = metrics.len(), "Parsed exposition payload");
    Ok(metrics)
}

/// Extract `(name, type)` from a `# TYPE` comment body
fn parse_type_comment(comment: &str) -> Option<(&str, MetricType)> {
    let mut parts = comment.split_whitespace();
    if parts.next()? != "TYPE" {
        return None;
    }
    let name = parts.next()?;
    let metric_type = parts.next().and_then(MetricType::parse).unwrap_or_default();
    Some((name, metric_type))
}

fn lookup_type(types: &HashMap<String, MetricType>, name: &str) -> MetricType {
    if let Some(metric_type) = types.get(name) {
        return *metric_type;
    }

    FAMILY_SUFFIXES
        .iter()
        .filter_map(|suffix| name.strip_suffix(suffix))
        .filter_map(|family| types.get(family))
        .find(|t| matches!(t, MetricType::Histogram | MetricType::Summary))
        .copied()
        .unwrap_or_default()
}

fn parse_sample(line: &str, line_no: usize) -> ParseResult<Metric> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];

    if !metric_name_re().is_match(name) {
        return Err(ParseError::InvalidMetricName {
            line: line_no,
            name: name.to_string(),
        });
    }

    let mut rest = &line[name_end..];
    let mut attributes = LabelSet::new();
    if let Some(body) = rest.strip_prefix('{') {
        let (labels, consumed) = parse_labels(body, line_no)?;
        attributes = labels;
        rest = &body[consumed..];
    }

    let mut fields = rest.split_whitespace();
    let raw_value = fields
        .next()
        .ok_or(ParseError::MissingValue { line: line_no })?;
    let value = parse_value(raw_value).ok_or_else(|| ParseError::InvalidValue {
        line: line_no,
        value: raw_value.to_string(),
    })?;

    if let Some(timestamp) = fields.next() {
        if timestamp.parse::<i64>().is_err() {
            return Err(ParseError::InvalidValue {
                line: line_no,
                value: timestamp.to_string(),
            });
        }
    }

    Ok(Metric::new(name, value).with_attributes(attributes))
}

/// Parse a sample value, including the `NaN` and `±Inf` spellings
fn parse_value(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => raw.parse().ok(),
    }
}

/// Parse the label block following `{`
///
/// Returns the labels and the number of bytes consumed, closing brace
/// included.
fn parse_labels(body: &str, line_no: usize) -> ParseResult<(LabelSet, usize)> {
    let malformed = |reason: &str| ParseError::MalformedLabels {
        line: line_no,
        reason: reason.to_string(),
    };

    let mut labels = LabelSet::new();
    let mut chars = body.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let (start, first) = chars.next().ok_or_else(|| malformed("unterminated label set"))?;
        match first {
            '}' => return Ok((labels, start + 1)),
            '=' => return Err(malformed("empty label name")),
            _ => {}
        }

        let mut key_end = start + first.len_utf8();
        let mut found_eq = false;
        for (i, c) in chars.by_ref() {
            if c == '=' {
                found_eq = true;
                break;
            }
            key_end = i + c.len_utf8();
        }
        if !found_eq {
            return Err(malformed("expected '=' after label name"));
        }
        let key = body[start..key_end].trim();
        if key.is_empty() {
            return Err(malformed("empty label name"));
        }

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if !matches!(chars.next(), Some((_, '"'))) {
            return Err(malformed(&format!("label '{}' value must be quoted", key)));
        }

        let mut value = String::new();
        let mut closed = false;
        while let Some((_, c)) = chars.next() {
            match c {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                _ => value.push(c),
            }
        }
        if !closed {
            return Err(malformed(&format!("unterminated value for label '{}'", key)));
        }
        labels.insert(key, value);

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        match chars.next() {
            Some((_, ',')) => continue,
            Some((i, '}')) => return Ok((labels, i + 1)),
            _ => return Err(malformed("expected ',' or '}' after label value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIS_PAYLOAD: &str = r#"# HELP redis_exporter_build_info redis exporter build_info
# TYPE redis_exporter_build_info gauge
redis_exporter_build_info{build_date="2018-07-03-14:18:56",commit_sha="3e15af27aac37e114b32a07f5e9dc0510f4cbfc4",golang_version="go1.9.4",version="v0.20.2"} 1
# HELP redis_exporter_scrapes_total Current total redis scrapes.
# TYPE redis_exporter_scrapes_total counter
redis_exporter_scrapes_total{cosa="fina"} 42
# TYPE redis_instantaneous_input_kbps gauge
redis_instantaneous_input_kbps{addr="ohai-playground-redis-master:6379",alias="ohai-playground-redis"} 0.05
redis_instantaneous_input_kbps{addr="ohai-playground-redis-slave:6379",alias="ohai-playground-redis"} 0
some_undecorated_stuff 3
"#;

    #[test]
    fn test_parse_redis_payload() {
        let metrics = parse_exposition(REDIS_PAYLOAD).unwrap();

        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0].name, "redis_exporter_build_info");
        assert_eq!(metrics[0].metric_type, MetricType::Gauge);
        assert_eq!(metrics[0].attributes.get("version"), Some("v0.20.2"));
        assert_eq!(metrics[1].metric_type, MetricType::Counter);
        assert_eq!(metrics[1].value, 42.0);
        assert_eq!(metrics[2].value, 0.05);
        assert_eq!(
            metrics[3].attributes.get("addr"),
            Some("ohai-playground-redis-slave:6379")
        );
        assert_eq!(metrics[4].metric_type, MetricType::Untyped);
        assert!(metrics[4].attributes.is_empty());
    }

    #[test]
    fn test_parse_special_values_and_timestamp() {
        let metrics = parse_exposition("a NaN\nb +Inf 1530627536000\nc -Inf\nd 1.5e3").unwrap();

        assert!(metrics[0].value.is_nan());
        assert_eq!(metrics[1].value, f64::INFINITY);
        assert_eq!(metrics[2].value, f64::NEG_INFINITY);
        assert_eq!(metrics[3].value, 1500.0);
    }

    #[test]
    fn test_parse_label_escapes() {
        let metrics =
            parse_exposition(r#"msg{text="say \"hi\"\nback\\slash", empty=""} 1"#).unwrap();

        assert_eq!(
            metrics[0].attributes.get("text"),
            Some("say \"hi\"\nback\\slash")
        );
        assert_eq!(metrics[0].attributes.get("empty"), Some(""));
    }

    #[test]
    fn test_parse_braces_inside_value_and_trailing_comma() {
        let metrics = parse_exposition(r#"x{a="{b}",} 2"#).unwrap();
        assert_eq!(metrics[0].attributes.get("a"), Some("{b}"));
        assert_eq!(metrics[0].value, 2.0);
    }

    #[test]
    fn test_family_type_applies_to_histogram_series() {
        let payload = "# TYPE rpc histogram\n\
                       rpc_bucket{le=\"+Inf\"} 3\n\
                       rpc_sum 1.2\n\
                       rpc_count 3\n\
                       # TYPE jobs_count gauge\n\
                       jobs_count 7\n";
        let metrics = parse_exposition(payload).unwrap();

        assert!(metrics[..3]
            .iter()
            .all(|m| m.metric_type == MetricType::Histogram));
        assert_eq!(metrics[3].metric_type, MetricType::Gauge);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            parse_exposition("ok 1\nmissing\n"),
            Err(ParseError::MissingValue { line: 2 })
        );
        assert_eq!(
            parse_exposition("\n\nbad abc"),
            Err(ParseError::InvalidValue {
                line: 3,
                value: "abc".to_string()
            })
        );
        assert_eq!(
            parse_exposition("9lives 1"),
            Err(ParseError::InvalidMetricName {
                line: 1,
                name: "9lives".to_string()
            })
        );
        assert!(matches!(
            parse_exposition("x{a=b} 1"),
            Err(ParseError::MalformedLabels { line: 1, .. })
        ));
        assert!(matches!(
            parse_exposition("x{a=\"b\" 1"),
            Err(ParseError::MalformedLabels { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_payload() {
        assert!(parse_exposition("").unwrap().is_empty());
        assert!(parse_exposition("# just a comment\n\n").unwrap().is_empty());
    }
}
