use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 按帧顺序追加的输出
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    output: String,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, glyph: char) {
        self.output.push(glyph);
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn len(&self) -> usize {
        self.output.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    pub fn histogram(&self) -> BTreeMap<char, usize> {
        histogram(&self.output)
    }

    pub fn clear(&mut self) {
        self.output.clear();
    }
}

pub fn histogram(text: &str) -> BTreeMap<char, usize> {
    let mut counts = BTreeMap::new();
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
}

/// 提取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub decoded_frames: u64,
    pub sampled_frames: u64,
    pub accepted_frames: u64,
    pub recognized_frames: u64,
    pub corrected_glyphs: u64,
    pub unknown_glyphs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub text: String,
    pub histogram: BTreeMap<char, usize>,
    pub stats: ExtractionStats,
}

impl DecodeReport {
    pub fn new(accumulator: &Accumulator, stats: ExtractionStats) -> Self {
        Self {
            text: accumulator.as_str().to_string(),
            histogram: accumulator.histogram(),
            stats,
        }
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text)?;
        for (glyph, count) in &self.histogram {
            writeln!(f, "{}: {}", glyph, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        let mut acc = Accumulator::new();
        for c in "AABW".chars() {
            acc.push(c);
        }

        let expected = BTreeMap::from([('A', 2), ('B', 1), ('W', 1)]);
        assert_eq!(acc.histogram(), expected);
        assert_eq!(acc.as_str(), "AABW");
        assert_eq!(acc.len(), 4);
    }

    #[test]
    fn test_empty() {
        let acc = Accumulator::new();
        assert!(acc.is_empty());
        assert!(acc.histogram().is_empty());
    }

    #[test]
    fn test_report_display() {
        let mut acc = Accumulator::new();
        "WAB".chars().for_each(|c| acc.push(c));
        let report = DecodeReport::new(&acc, ExtractionStats::default());

        assert_eq!(report.to_string(), "WAB\nA: 1\nB: 1\nW: 1\n");
    }

    #[test]
    fn test_report_json() {
        let mut acc = Accumulator::new();
        "AAB".chars().for_each(|c| acc.push(c));
        let report = DecodeReport::new(&acc, ExtractionStats::default());
        let json = serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(json["text"], "AAB");
        assert_eq!(json["histogram"]["A"], 2);
        assert_eq!(json["stats"]["sampled_frames"], 0);
    }
}
