#![forbid(unsafe_code)]

//! Pipeline sequence checks.
//!
//! [`expect_sequence`] wires a pipeline onto a fresh source, emits the input
//! values, and compares everything the pipeline produced against the
//! expected output, element by element and by count.

use std::fmt::Debug;

use eventful::Observable;

use crate::error::HarnessError;
use crate::recorder::Recorder;

/// Run `input` through the pipeline built by `build` and compare the output.
pub fn expect_sequence<V, T, F>(
    input: impl IntoIterator<Item = Option<V>>,
    expected: &[Option<T>],
    build: F,
) -> Result<(), HarnessError>
where
    V: Send + Sync + 'static,
    T: Clone + Debug + PartialEq + Send + Sync + 'static,
    F: FnOnce(&Observable<V>) -> Observable<T>,
{
    let source = Observable::new();
    let sink = build(&source);
    let recorder = Recorder::attach(&sink);

    for value in input {
        source.emit(value);
    }

    compare(expected, &recorder.values())
}

/// Like [`expect_sequence`] for inputs and outputs that are always present.
pub fn expect_values<V, T, F>(input: &[V], expected: &[T], build: F) -> Result<(), HarnessError>
where
    V: Clone + Send + Sync + 'static,
    T: Clone + Debug + PartialEq + Send + Sync + 'static,
    F: FnOnce(&Observable<V>) -> Observable<T>,
{
    let expected: Vec<Option<T>> = expected.iter().cloned().map(Some).collect();
    expect_sequence(input.iter().cloned().map(Some), &expected, build)
}

fn compare<T: Debug + PartialEq>(expected: &[Option<T>], actual: &[Option<T>]) -> Result<(), HarnessError> {
    if let Some((index, (want, got))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (want, got))| want != got)
    {
        return Err(HarnessError::Mismatch {
            index,
            expected: format!("{want:?}"),
            actual: format!("{got:?}"),
        });
    }
    if expected.len() != actual.len() {
        let unmatched = if actual.len() < expected.len() {
            format!("{:?}", &expected[actual.len()..])
        } else {
            format!("{:?}", &actual[expected.len()..])
        };
        return Err(HarnessError::Count {
            expected: expected.len(),
            actual: actual.len(),
            unmatched,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sequence() {
        let result = expect_values(&[1, 2, 3], &["1".to_owned(), "2".into(), "3".into()], |o| {
            o.map(|v| v.map(ToString::to_string).unwrap_or_default())
        });
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn absent_values() {
        let input = [Some(1), None, Some(2), None];
        assert!(expect_sequence(input, &[Some(1), Some(2)], |o| o.present()).is_ok());
        assert!(
            expect_sequence(input, &[Some(1), Some(0), Some(2), Some(0)], |o| o
                .default_value(0))
            .is_ok()
        );
    }

    #[test]
    fn reports_mismatch() {
        let err = expect_values(&[1, 2], &[1, 3], |o| o.skip(0)).unwrap_err();
        assert_eq!(
            err,
            HarnessError::Mismatch {
                index: 1,
                expected: "Some(3)".into(),
                actual: "Some(2)".into(),
            }
        );
    }

    #[test]
    fn reports_missing_values() {
        let err = expect_values(&[1, 2, 3], &[2, 3, 4], |o| o.skip(1)).unwrap_err();
        assert_eq!(
            err,
            HarnessError::Count {
                expected: 3,
                actual: 2,
                unmatched: "[Some(4)]".into(),
            }
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn identity_pipeline_always_matches(
                input in proptest::collection::vec(proptest::option::of(any::<u16>()), 0..48),
            ) {
                prop_assert_eq!(expect_sequence(input.clone(), &input, |o| o.skip(0)), Ok(()));
            }

            #[test]
            fn truncated_expectation_is_a_count_error(
                input in proptest::collection::vec(any::<u16>(), 1..48),
            ) {
                let short = &input[..input.len() - 1];
                let err = expect_values(&input, short, |o| o.skip(0));
                let is_count = matches!(err, Err(HarnessError::Count { .. }));
                prop_assert!(is_count);
            }
        }
    }
}
