//! Student t significance tests.
//!
//! One-sample mode tests whether the mean of a sample differs from zero:
//! `t = mean / (s / sqrt(n))` with `n - 1` degrees of freedom, where `s` is the
//! sample standard deviation.
//!
//! Paired mode applies the one-sample test to the differences `before - after`
//! of matched observations.

use crate::{EventStudyError, Result, config::TestDirection};
use serde::{Deserialize, Serialize};
use statrs::{
    distribution::{ContinuousCDF, StudentsT},
    statistics::Statistics,
};

/// Result of a significance test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// t statistic
    pub statistic: f64,
    /// p-value under the configured alternative
    pub p_value: f64,
    /// Number of observations that entered the test
    pub observations: usize,
}

/// Runs one-sample and paired t-tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignificanceTester {
    direction: TestDirection,
}

impl SignificanceTester {
    /// Create a tester for the given alternative hypothesis.
    pub const fn new(direction: TestDirection) -> Self {
        Self { direction }
    }

    /// Alternative hypothesis in use.
    pub const fn direction(&self) -> TestDirection {
        self.direction
    }

    /// Test whether the mean of `sample` is zero.
    ///
    /// Non-finite observations are dropped first. A single observation has no
    /// degrees of freedom and yields `NaN` for both statistic and p-value.
    ///
    /// # Errors
    /// [`EventStudyError::EmptySample`] when no finite observation remains.
    pub fn one_sample(&self, sample: &[f64]) -> Result<TestOutcome> {
        let values: Vec<f64> = sample.iter().copied().filter(|v| v.is_finite()).collect();
        let n = values.len();
        if n == 0 {
            return Err(EventStudyError::EmptySample);
        }
        if n == 1 {
            return Ok(TestOutcome {
                statistic: f64::NAN,
                p_value: f64::NAN,
                observations: 1,
            });
        }

        let mean = values.iter().mean();
        let se = (values.iter().variance() / n as f64).sqrt();

        let (statistic, two_sided) = if se == 0.0 {
            if mean == 0.0 {
                (0.0, 1.0)
            } else {
                (f64::INFINITY.copysign(mean), 0.0)
            }
        } else {
            let t = mean / se;
            let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64)
                .map_err(|e| EventStudyError::Statistics(e.to_string()))?;
            (t, (2.0 * dist.sf(t.abs())).min(1.0))
        };

        Ok(TestOutcome {
            statistic,
            p_value: self.directional(statistic, two_sided),
            observations: n,
        })
    }

    /// Test whether matched `before`/`after` observations share a mean.
    ///
    /// Pairs where either side is missing or non-finite are omitted.
    ///
    /// # Errors
    /// - [`EventStudyError::Computation`] when the inputs differ in length
    /// - [`EventStudyError::EmptySample`] when no complete pair remains
    pub fn paired(&self, before: &[Option<f64>], after: &[Option<f64>]) -> Result<TestOutcome> {
        if before.len() != after.len() {
            return Err(EventStudyError::Computation(format!(
                "paired samples differ in length: {} vs {}",
                before.len(),
                after.len()
            )));
        }
        let diffs: Vec<f64> = before
            .iter()
            .zip(after)
            .filter_map(|pair| match pair {
                (Some(b), Some(a)) if b.is_finite() && a.is_finite() => Some(b - a),
                _ => None,
            })
            .collect();
        self.one_sample(&diffs)
    }

    fn directional(&self, statistic: f64, two_sided: f64) -> f64 {
        match self.direction {
            TestDirection::TwoSided => two_sided,
            TestDirection::Greater if statistic > 0.0 => two_sided / 2.0,
            TestDirection::Greater => 1.0 - two_sided / 2.0,
            TestDirection::Less if statistic < 0.0 => two_sided / 2.0,
            TestDirection::Less => 1.0 - two_sided / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[test]
    fn test_zero_sample_has_no_effect() {
        let outcome = SignificanceTester::default().one_sample(&[0.0; 8]).unwrap();
        assert_eq!(outcome.statistic, 0.0);
        assert_eq!(outcome.p_value, 1.0);
        assert_eq!(outcome.observations, 8);
    }

    #[test]
    fn test_one_sample_reference_values() {
        let outcome = SignificanceTester::default()
            .one_sample(&[1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_abs_diff_eq!(outcome.statistic, 4.242_640_687, epsilon = 1e-8);
        assert_abs_diff_eq!(outcome.p_value, 0.013_235_6, epsilon = 1e-6);
    }

    #[rstest]
    #[case(TestDirection::TwoSided, 0.013_235_6)]
    #[case(TestDirection::Greater, 0.006_617_8)]
    #[case(TestDirection::Less, 0.993_382_2)]
    fn test_directional_p_values(#[case] direction: TestDirection, #[case] expected: f64) {
        let outcome = SignificanceTester::new(direction)
            .one_sample(&[1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_abs_diff_eq!(outcome.p_value, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_values_are_excluded() {
        let tester = SignificanceTester::default();
        let with_gaps = tester
            .one_sample(&[1.0, f64::NAN, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_eq!(with_gaps.observations, 5);
        assert_abs_diff_eq!(with_gaps.statistic, 4.242_640_687, epsilon = 1e-8);
    }

    #[test]
    fn test_empty_sample_is_reported() {
        let tester = SignificanceTester::default();
        assert!(matches!(tester.one_sample(&[]), Err(EventStudyError::EmptySample)));
        assert!(matches!(
            tester.one_sample(&[f64::NAN]),
            Err(EventStudyError::EmptySample)
        ));
    }

    #[test]
    fn test_single_observation_is_undefined() {
        let outcome = SignificanceTester::default().one_sample(&[0.02]).unwrap();
        assert!(outcome.statistic.is_nan());
        assert!(outcome.p_value.is_nan());
    }

    #[test]
    fn test_constant_nonzero_sample() {
        let outcome = SignificanceTester::default().one_sample(&[0.25; 4]).unwrap();
        assert_eq!(outcome.statistic, f64::INFINITY);
        assert_eq!(outcome.p_value, 0.0);
    }

    #[test]
    fn test_paired_reference_values() {
        let before = [Some(1.0), Some(2.0), Some(3.0)];
        let after = [Some(2.0), Some(4.0), Some(6.0)];
        let outcome = SignificanceTester::default().paired(&before, &after).unwrap();
        assert_abs_diff_eq!(outcome.statistic, -3.464_101_615, epsilon = 1e-8);
        assert_abs_diff_eq!(outcome.p_value, 0.074_179_9, epsilon = 1e-6);
    }

    #[test]
    fn test_paired_omits_incomplete_pairs() {
        let before = [Some(1.0), None, Some(2.0), Some(3.0), Some(f64::NAN)];
        let after = [Some(2.0), Some(9.0), Some(4.0), Some(6.0), Some(1.0)];
        let outcome = SignificanceTester::default().paired(&before, &after).unwrap();
        assert_eq!(outcome.observations, 3);
        assert_abs_diff_eq!(outcome.statistic, -3.464_101_615, epsilon = 1e-8);

        let err = SignificanceTester::default()
            .paired(&[None, Some(1.0)], &[Some(1.0), None])
            .unwrap_err();
        assert!(matches!(err, EventStudyError::EmptySample));
    }

    #[test]
    fn test_paired_length_mismatch() {
        let err = SignificanceTester::default()
            .paired(&[Some(1.0)], &[Some(1.0), Some(2.0)])
            .unwrap_err();
        assert!(matches!(err, EventStudyError::Computation(_)));
    }
}
