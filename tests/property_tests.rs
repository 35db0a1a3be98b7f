use png_squeeze::model::percentage_saved;
use png_squeeze::{
    default_output_path, is_png_file, BatchOptions, BatchSummary, CompressionLevel,
    CompressionResult,
};
use proptest::prelude::*;
use std::path::{Path, PathBuf};

fn arb_result() -> impl Strategy<Value = CompressionResult> {
    prop_oneof![
        (0u64..1_000_000, 0u64..1_000_000).prop_map(|(original, new)| {
            CompressionResult::succeeded("in.png".into(), "out.png".into(), original, new)
        }),
        (0u64..1_000_000).prop_map(|original| {
            CompressionResult::failed("in.png".into(), None, original, "input not found")
        }),
    ]
}

proptest! {
    #[test]
    fn level_in_range_is_accepted(level in 1u8..=9u8) {
        prop_assert_eq!(CompressionLevel::new(level).unwrap().get(), level);
        prop_assert!(BatchOptions::new(None, Some(level), None).is_ok());
    }

    #[test]
    fn level_out_of_range_is_rejected(level in 0u8..=255u8) {
        let result = CompressionLevel::new(level);
        if (1..=9).contains(&level) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn result_size_arithmetic(original in 0u64..u32::MAX as u64, new in 0u64..u32::MAX as u64) {
        let result = CompressionResult::succeeded("a.png".into(), "b.png".into(), original, new);
        let saved = result.bytes_saved().unwrap();

        prop_assert_eq!(saved, original as i64 - new as i64);
        if original == 0 {
            prop_assert_eq!(result.percentage_saved().unwrap(), 0.0);
        } else {
            let expected = saved as f64 / original as f64 * 100.0;
            prop_assert!((result.percentage_saved().unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn summary_arithmetic(results in prop::collection::vec(arb_result(), 0..40)) {
        let summary = BatchSummary::from_results(&results);
        let successes: Vec<_> = results.iter().filter(|r| r.success()).collect();

        prop_assert_eq!(summary.total_files, results.len());
        prop_assert_eq!(summary.succeeded_count, successes.len());
        prop_assert_eq!(
            summary.total_bytes_saved,
            summary.total_original_bytes as i64 - summary.total_new_bytes as i64
        );
        let original: u64 = successes.iter().map(|r| r.original_size).sum();
        prop_assert_eq!(summary.total_original_bytes, original);

        if successes.is_empty() {
            prop_assert_eq!(summary.average_percentage_saved, 0.0);
        } else {
            let mean = successes
                .iter()
                .map(|r| r.percentage_saved().unwrap())
                .sum::<f64>()
                / successes.len() as f64;
            prop_assert!((summary.average_percentage_saved - mean).abs() < 1e-6);
        }
    }

    #[test]
    fn default_output_path_is_sibling_with_suffix(
        dir in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        stem in "[a-zA-Z0-9_-]{1,12}",
        ext in prop::sample::select(vec!["png", "PNG", "Png"])
    ) {
        let input = Path::new(&dir).join(format!("{stem}.{ext}"));
        let output = default_output_path(&input);

        prop_assert_eq!(output.parent(), input.parent());
        prop_assert_eq!(output, PathBuf::from(&dir).join(format!("{stem}_compressed.{ext}")));
    }

    #[test]
    fn png_detection_is_case_insensitive(
        stem in "[a-z]{1,10}",
        ext in prop::sample::select(vec!["png", "PNG", "pNg", "jpg", "jpeg", "gif", "txt", "webp"])
    ) {
        let name = format!("{stem}.{ext}");
        prop_assert_eq!(is_png_file(Path::new(&name)), ext.eq_ignore_ascii_case("png"));
    }

    #[test]
    fn percentage_never_exceeds_hundred(original in 1u64..1_000_000, new in 0u64..1_000_000) {
        let pct = percentage_saved(original, original as i64 - new as i64);
        prop_assert!(pct <= 100.0);
    }
}
