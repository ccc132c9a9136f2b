//! Formatting of samples into Warp10 wire lines

use crate::errors::Result;
use crate::rewrite::RewriteEngine;
use crate::sample::Sample;
use std::collections::BTreeMap;
use std::fmt;
use urlencoding::encode;

/// One wire record, ready to be buffered.
///
/// Rendered as `<timestamp_us>// <classname>{<labels>} <value>` with the
/// classname percent-encoded and each label key and value form-encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedLine {
    pub timestamp_us: i64,
    pub classname: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl fmt::Display for FormattedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        write!(
            f,
            "{}// {}{{{}}} {:.6}",
            self.timestamp_us, self.classname, labels, self.value
        )
    }
}

/// Turns one sample value into a wire line for a single endpoint
#[derive(Debug)]
pub struct Formatter {
    default_labels: BTreeMap<String, String>,
    engine: RewriteEngine,
}

impl Formatter {
    pub fn new(default_labels: BTreeMap<String, String>, engine: RewriteEngine) -> Self {
        Self {
            default_labels,
            engine,
        }
    }

    /// Format one data-source value of a sample.
    ///
    /// Returns `None` when the value is NaN or a rewrite rule destroyed the
    /// point. Label precedence on key collisions: endpoint defaults, then
    /// sample metadata, then rewrite-derived labels.
    pub fn format(&self, sample: &Sample, ds_name: &str, value: f64) -> Result<Option<FormattedLine>> {
        if value.is_nan() {
            return Ok(None);
        }

        let joined = [
            sample.plugin.as_str(),
            sample.plugin_instance.as_str(),
            sample.type_name.as_str(),
            sample.type_instance.as_str(),
            ds_name,
        ]
        .iter()
        .map(|component| component.trim())
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(".");

        let candidate = encode(&joined).into_owned();

        let rewritten = match self.engine.rewrite(&candidate)? {
            Some(rewritten) => rewritten,
            None => return Ok(None),
        };

        let mut labels = self.default_labels.clone();
        labels.extend(sample.meta.clone());
        labels.extend(rewritten.labels);

        let labels = labels
            .into_iter()
            .filter_map(|(key, value)| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some((key, trimmed.to_string()))
                }
            })
            .collect();

        Ok(Some(FormattedLine {
            timestamp_us: (sample.time * 1_000_000.0) as i64,
            classname: rewritten.classname,
            labels,
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{RewriteFlag, RewriteRule};

    fn formatter(default_labels: &[(&str, &str)]) -> Formatter {
        let labels = default_labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Formatter::new(labels, RewriteEngine::new(vec![], 10))
    }

    #[test]
    fn test_nan_produces_no_line() {
        let formatter = formatter(&[]);
        let sample = Sample::new("cpu", "load").at(1.0);

        assert_eq!(formatter.format(&sample, "value", f64::NAN).unwrap(), None);
    }

    #[test]
    fn test_golden_line_format() {
        let formatter = formatter(&[("env", "prod")]);
        let sample = Sample::new("cpu", "load").at(1.0);

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(line.to_string(), "1000000// cpu.load.value{env=prod} 0.500000");
    }

    #[test]
    fn test_empty_components_are_skipped() {
        let formatter = formatter(&[]);
        let sample = Sample::new("cpu", "load")
            .at(2.0)
            .with_plugin_instance("   ");

        let line = formatter.format(&sample, "value", 1.0).unwrap().unwrap();
        assert_eq!(line.classname, "cpu.load.value");
        assert_eq!(line.timestamp_us, 2_000_000);
    }

    #[test]
    fn test_classname_is_percent_encoded() {
        let formatter = formatter(&[]);
        let sample = Sample::new("disk io", "ops/sec").at(1.0);

        let line = formatter.format(&sample, "value", 1.0).unwrap().unwrap();
        assert_eq!(line.classname, "disk%20io.ops%2Fsec.value");
    }

    #[test]
    fn test_meta_labels_override_defaults() {
        let formatter = formatter(&[("host", "a")]);
        let sample = Sample::new("cpu", "load").at(1.0).with_meta("host", "b");

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(line.labels.get("host").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_rewrite_labels_override_meta() {
        let rule = RewriteRule::new(
            "^cpu",
            "cpu",
            vec![RewriteFlag::TagExtract {
                name: "host".to_string(),
                value: "c".to_string(),
            }],
        )
        .unwrap();
        let formatter = Formatter::new(
            [("host".to_string(), "a".to_string())].into(),
            RewriteEngine::new(vec![rule], 10),
        );
        let sample = Sample::new("cpu", "load").at(1.0).with_meta("host", "b");

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(line.labels.get("host").map(String::as_str), Some("c"));
    }

    #[test]
    fn test_blank_label_values_are_dropped() {
        let formatter = formatter(&[("dc", "   ")]);
        let sample = Sample::new("cpu", "load").at(1.0);

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert!(line.labels.is_empty());
        assert_eq!(line.to_string(), "1000000// cpu.load.value{} 0.500000");
    }

    #[test]
    fn test_label_values_are_trimmed() {
        let formatter = formatter(&[("env", " prod ")]);
        let sample = Sample::new("cpu", "load").at(1.0);

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(line.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_forbid_rule_produces_no_line() {
        let rule = RewriteRule::new("^cpu", "cpu", vec![RewriteFlag::Forbid]).unwrap();
        let formatter = Formatter::new(BTreeMap::new(), RewriteEngine::new(vec![rule], 10));
        let sample = Sample::new("cpu", "load").at(1.0);

        assert_eq!(formatter.format(&sample, "value", 0.5).unwrap(), None);
    }

    #[test]
    fn test_label_pairs_are_form_encoded() {
        let formatter = formatter(&[("region", "eu west")]);
        let sample = Sample::new("cpu", "load").at(1.0);

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(
            line.to_string(),
            "1000000// cpu.load.value{region=eu%20west} 0.500000"
        );
    }

    #[test]
    fn test_fractional_timestamp_truncates_to_microseconds() {
        let formatter = formatter(&[]);
        let sample = Sample::new("cpu", "load").at(1.5);

        let line = formatter.format(&sample, "value", 0.5).unwrap().unwrap();
        assert_eq!(line.timestamp_us, 1_500_000);
    }
}
