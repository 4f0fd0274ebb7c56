//! A subset of the NIST SP 800-22 statistical test suite.
//!
//! Each test reduces the sample to a statistic and converts it into a
//! p-value; the sample passes a test when `p >= 0.01`. Passing is
//! necessary, not sufficient, for a source to be usable.

use super::special::{erfc, igamc, std_normal};
use super::AnalysisError;
use crate::bits::BitVector;
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::SQRT_2;

/// Significance level shared by every test.
pub const SIGNIFICANCE: f64 = 0.01;

/// Shortest sample the full battery accepts.
pub const MIN_SAMPLE_BITS: usize = 128;

/// Templates for the non-overlapping template matching test.
const TEMPLATES: [&str; 3] = ["010101", "001100", "000111"];

/// Blocks used by the template matching test.
const TEMPLATE_BLOCKS: usize = 8;

/// Outcome of one statistical test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Test name, with parameters where they vary.
    pub name: String,
    /// Computed p-value.
    pub p_value: f64,
    /// Threshold the p-value is compared against.
    pub significance: f64,
    /// True if `p_value >= significance`.
    pub passed: bool,
}

impl TestResult {
    fn new(name: impl Into<String>, p_value: f64) -> Self {
        Self {
            name: name.into(),
            p_value,
            significance: SIGNIFICANCE,
            passed: p_value >= SIGNIFICANCE,
        }
    }

    fn failed(name: impl Into<String>) -> Self {
        Self::new(name, 0.0)
    }
}

/// Results of the whole battery for one sample.
#[derive(Debug, Clone, Serialize)]
pub struct BatteryReport {
    /// True iff every test passed.
    pub passed: bool,
    /// Sample length in bits.
    pub sample_bits: usize,
    /// Individual results, in execution order.
    pub results: Vec<TestResult>,
}

impl BatteryReport {
    /// Tests that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Number of tests that did not pass.
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs every test over `bits`.
pub fn check_random(bits: &BitVector) -> Result<BatteryReport, AnalysisError> {
    let n = bits.len();
    if n < MIN_SAMPLE_BITS {
        return Err(AnalysisError::SampleTooShort {
            got: n,
            need: MIN_SAMPLE_BITS,
        });
    }
    let log2_n = n.ilog2() as usize;

    let mut results = vec![
        frequency(bits),
        block_frequency(bits, n / 10),
        runs(bits),
        longest_run(bits),
    ];
    for template in TEMPLATES {
        let template: BitVector = template.parse()?;
        results.push(non_overlapping_template(bits, &template, TEMPLATE_BLOCKS));
    }
    results.push(serial(bits, log2_n - 3));
    results.push(approximate_entropy(bits, log2_n - 5));
    results.push(cumulative_sums(bits));

    for result in &results {
        tracing::debug!(
            test = %result.name,
            p_value = result.p_value,
            passed = result.passed,
            "statistical test"
        );
    }

    Ok(BatteryReport {
        passed: results.iter().all(|r| r.passed),
        sample_bits: n,
        results,
    })
}

/// Monobit test: are ones and zeros roughly balanced?
pub fn frequency(bits: &BitVector) -> TestResult {
    let n = bits.len();
    if n == 0 {
        return TestResult::failed("Frequency");
    }
    let sum = 2 * bits.ones() as i64 - n as i64;
    let statistic = sum.unsigned_abs() as f64 / (n as f64).sqrt();
    TestResult::new("Frequency", erfc(statistic / SQRT_2))
}

/// Proportion of ones within consecutive blocks of `block_len` bits.
pub fn block_frequency(bits: &BitVector, block_len: usize) -> TestResult {
    let name = format!("Block Frequency ({})", block_len);
    let blocks = bits.partition(block_len);
    if blocks.is_empty() {
        return TestResult::failed(name);
    }

    let sum: f64 = blocks.iter().map(|b| (b.proportion() - 0.5).powi(2)).sum();
    let chi = 4.0 * block_len as f64 * sum;
    TestResult::new(name, igamc(blocks.len() as f64 / 2.0, chi / 2.0))
}

/// Number of uninterrupted runs of identical bits.
pub fn runs(bits: &BitVector) -> TestResult {
    let n = bits.len();
    if n == 0 {
        return TestResult::failed("Runs");
    }

    // The runs test is meaningless if the frequency test would fail.
    let pi = bits.proportion();
    if (pi - 0.5).abs() >= 2.0 / (n as f64).sqrt() {
        return TestResult::failed("Runs");
    }

    let slice = bits.as_slice();
    let changes = slice.windows(2).filter(|w| w[0] != w[1]).count();
    let observed = (changes + 1) as f64;

    let spread = 2.0 * pi * (1.0 - pi);
    let n = n as f64;
    let p = erfc((observed - spread * n).abs() / (spread * (2.0 * n).sqrt()));
    TestResult::new("Runs", p)
}

/// Category probabilities of the longest-run test for each sample regime.
const LONGEST_RUN_PI_128: [f64; 4] = [0.2148, 0.3672, 0.2305, 0.1875];
const LONGEST_RUN_PI_6272: [f64; 6] = [0.1174, 0.2430, 0.2493, 0.1752, 0.1027, 0.1124];
const LONGEST_RUN_PI_750K: [f64; 7] = [0.0882, 0.2092, 0.2483, 0.1933, 0.1208, 0.0675, 0.0727];

/// Longest run of ones within fixed-size blocks.
///
/// Uses the 128, 6272 or 750000 bit regime, whichever is the largest that
/// fits the sample; extra bits are ignored.
pub fn longest_run(bits: &BitVector) -> TestResult {
    const NAME: &str = "Longest Run";

    let (sample, block_len, shortest, pi) = match bits.len() {
        n if n < 128 => return TestResult::failed(NAME),
        n if n < 6272 => (128, 8, 1, &LONGEST_RUN_PI_128[..]),
        n if n < 750_000 => (6272, 128, 4, &LONGEST_RUN_PI_6272[..]),
        _ => (750_000, 10_000, 10, &LONGEST_RUN_PI_750K[..]),
    };

    let categories = pi.len();
    let mut counts = vec![0usize; categories];
    for block in bits.as_slice()[..sample].chunks_exact(block_len) {
        let longest = block
            .split(|&b| !b)
            .map(<[bool]>::len)
            .max()
            .unwrap_or(0);
        let category = longest.saturating_sub(shortest).min(categories - 1);
        counts[category] += 1;
    }

    let blocks = (sample / block_len) as f64;
    let chi: f64 = counts
        .iter()
        .zip(pi)
        .map(|(&v, &p)| (v as f64 - blocks * p).powi(2) / (blocks * p))
        .sum();
    TestResult::new(NAME, igamc((categories - 1) as f64 / 2.0, chi / 2.0))
}

/// Occurrences of an aperiodic `template` in each of `block_count` blocks.
pub fn non_overlapping_template(
    bits: &BitVector,
    template: &BitVector,
    block_count: usize,
) -> TestResult {
    let name = format!("Non-overlapping Template ({})", template);
    let m = template.len();
    let block_len = bits.len().checked_div(block_count).unwrap_or(0);
    if m == 0 || block_len < m {
        return TestResult::failed(name);
    }

    let mean = (block_len - m + 1) as f64 / 2f64.powi(m as i32);
    let variance = block_len as f64
        * (1.0 / 2f64.powi(m as i32) - (2 * m - 1) as f64 / 2f64.powi(2 * m as i32));

    let chi: f64 = bits
        .partition(block_len)
        .iter()
        .take(block_count)
        .map(|block| {
            let mut hits = 0usize;
            let mut j = 0;
            while j + m <= block_len {
                if block.has_pattern_at(template, j) {
                    hits += 1;
                    j += m;
                } else {
                    j += 1;
                }
            }
            (hits as f64 - mean).powi(2) / variance
        })
        .sum();

    TestResult::new(name, igamc(block_count as f64 / 2.0, chi / 2.0))
}

/// Uniformity of all overlapping `m`-bit patterns.
///
/// Reports the first failing of the two p-values, or their mean if both
/// pass.
pub fn serial(bits: &BitVector, m: usize) -> TestResult {
    if m < 2 || bits.len() < m {
        return TestResult::failed("Serial");
    }

    let psi_m = psi_squared(bits, m);
    let psi_m1 = psi_squared(bits, m - 1);
    let psi_m2 = psi_squared(bits, m - 2);

    let p1 = igamc(2f64.powi(m as i32 - 2), (psi_m - psi_m1) / 2.0);
    let p2 = igamc(
        2f64.powi(m as i32 - 3),
        (psi_m - 2.0 * psi_m1 + psi_m2) / 2.0,
    );

    if p1 < SIGNIFICANCE {
        TestResult::new("Serial (p1)", p1)
    } else if p2 < SIGNIFICANCE {
        TestResult::new("Serial (p2)", p2)
    } else {
        TestResult::new("Serial", (p1 + p2) / 2.0)
    }
}

/// Compares the frequencies of overlapping `m` and `m + 1` bit patterns.
pub fn approximate_entropy(bits: &BitVector, m: usize) -> TestResult {
    let n = bits.len();
    if m == 0 || n <= m {
        return TestResult::failed("Approximate Entropy");
    }

    let phi = |len: usize| -> f64 {
        pattern_counts(bits, len)
            .into_iter()
            .filter(|&c| c > 0)
            .map(|c| {
                let freq = c as f64 / n as f64;
                freq * freq.ln()
            })
            .sum()
    };

    let apen = phi(m) - phi(m + 1);
    let chi = 2.0 * n as f64 * (2f64.ln() - apen);
    TestResult::new(
        "Approximate Entropy",
        igamc(2f64.powi(m as i32 - 1), chi / 2.0),
    )
}

/// Maximal excursion of the running sum of ±1 steps (forward mode).
pub fn cumulative_sums(bits: &BitVector) -> TestResult {
    let n = bits.len() as i64;
    if n == 0 {
        return TestResult::failed("Cumulative Sums");
    }

    let mut sum = 0i64;
    let mut z = 0i64;
    for bit in bits.iter() {
        sum += if bit { 1 } else { -1 };
        z = z.max(sum.abs());
    }

    let sqrt_n = (n as f64).sqrt();
    let term = |k: i64, a: i64, b: i64| {
        std_normal(((4 * k + a) * z) as f64 / sqrt_n) - std_normal(((4 * k + b) * z) as f64 / sqrt_n)
    };

    // Integer division truncates toward zero, matching the reference bounds.
    let upper = (n / z - 1) / 4;
    let sum1: f64 = ((-n / z + 1) / 4..=upper).map(|k| term(k, 1, -1)).sum();
    let sum2: f64 = ((-n / z - 3) / 4..=upper).map(|k| term(k, 3, 1)).sum();

    TestResult::new("Cumulative Sums", 1.0 - sum1 + sum2)
}

/// `psi^2_m` statistic of the serial test; zero for `m == 0`.
fn psi_squared(bits: &BitVector, m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len() as f64;
    let squares: f64 = pattern_counts(bits, m)
        .into_iter()
        .map(|c| (c * c) as f64)
        .sum();
    2f64.powi(m as i32) / n * squares - n
}

/// Counts of every `m`-bit pattern over the `n` cyclic windows of `bits`,
/// in ascending pattern order.
fn pattern_counts(bits: &BitVector, m: usize) -> Vec<usize> {
    let n = bits.len();
    let wrapped: BitVector = bits.iter().cycle().take(n + m - 1).collect();

    let mut counts: HashMap<BitVector, usize> = HashMap::new();
    for start in 0..n {
        if let Ok(window) = wrapped.substring(start, m) {
            *counts.entry(window).or_default() += 1;
        }
    }

    BitVector::all_of_length(m)
        .iter()
        .map(|pattern| counts.get(pattern).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::hashed_bits;

    fn bv(s: &str) -> BitVector {
        BitVector::from_bits(s).unwrap()
    }

    fn close(result: &TestResult, expected: f64, tolerance: f64) -> bool {
        (result.p_value - expected).abs() <= tolerance
    }

    // Worked examples from NIST SP 800-22 rev 1a.

    #[test]
    fn test_frequency_reference() {
        assert!(close(&frequency(&bv("1011010101")), 0.527_089, 1e-5));
    }

    #[test]
    fn test_block_frequency_reference() {
        let result = block_frequency(&bv("0110011010"), 3);
        assert!(close(&result, 0.801_252, 1e-5));
        assert_eq!(result.name, "Block Frequency (3)");
    }

    #[test]
    fn test_runs_reference() {
        assert!(close(&runs(&bv("1001101011")), 0.147_232, 1e-5));
    }

    #[test]
    fn test_longest_run_reference() {
        let sample = bv(concat!(
            "11001100000101010110110001001100111000000000001001001101010100010001",
            "001111010110100000001101011111001100111001101101100010110010"
        ));
        assert_eq!(sample.len(), 128);
        assert!(close(&longest_run(&sample), 0.180_609, 1e-3));
    }

    #[test]
    fn test_template_reference() {
        let result = non_overlapping_template(&bv("10100100101110010110"), &bv("001"), 2);
        assert!(close(&result, 0.344_154, 1e-5));
    }

    #[test]
    fn test_serial_reference() {
        // p1 = 0.808792, p2 = 0.670320
        let result = serial(&bv("0011011101"), 3);
        assert!(result.passed);
        assert!(close(&result, (0.808_792 + 0.670_320) / 2.0, 1e-5));
    }

    #[test]
    fn test_approximate_entropy_reference() {
        assert!(close(&approximate_entropy(&bv("0100110101"), 3), 0.261_961, 1e-5));
    }

    #[test]
    fn test_cumulative_sums_reference() {
        assert!(close(&cumulative_sums(&bv("1011010111")), 0.411_659, 1e-5));
    }

    #[test]
    fn test_short_sample_rejected() {
        let result = check_random(&BitVector::zeros(127));
        assert!(matches!(
            result,
            Err(AnalysisError::SampleTooShort { got: 127, need: 128 })
        ));
    }

    #[test]
    fn test_hashed_samples_pass() {
        for tag in [1, 2, 4] {
            let report = check_random(&hashed_bits(tag, 128)).unwrap();
            assert_eq!(report.results.len(), 10);
            assert!(report.passed, "tag {}: {:?}", tag, report.failures().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_constant_sample_fails() {
        let report = check_random(&BitVector::from_bytes(&[0xFF; 128])).unwrap();
        assert!(!report.passed);
        assert!(report.failures().any(|r| r.name == "Frequency"));
    }

    #[test]
    fn test_alternating_sample_fails_runs() {
        let report = check_random(&BitVector::from_bytes(&[0x55; 128])).unwrap();
        assert!(!report.passed);
        assert!(report.results.iter().any(|r| r.name == "Frequency" && r.passed));
        assert!(report.failures().any(|r| r.name == "Runs"));
    }

    #[test]
    fn test_pattern_counts_wrap() {
        // Windows of "0011" with wrap: 00, 01, 11, 10.
        assert_eq!(pattern_counts(&bv("0011"), 2), vec![1, 1, 1, 1]);
        assert_eq!(pattern_counts(&bv("0011"), 1), vec![2, 2]);
    }
}
