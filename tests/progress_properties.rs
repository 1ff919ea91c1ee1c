// tests/progress_properties.rs

use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;
use renderq::job::{
    FailureKind, FrameRange, JobFailure, JobId, Phase, RenderDefaults, RenderParams,
    RenderRequest, ValidationError,
};
use renderq::progress::ProgressParser;
use renderq::store::JobStore;
use renderq::types::OutputFormat;

fn defaults() -> RenderDefaults {
    RenderDefaults {
        format: OutputFormat::Png,
        samples: 128,
        resolution_x: 1920,
        resolution_y: 1080,
        use_gpu: true,
    }
}

/// Lines built from the markers the parser knows, mixed with noise.
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (-5i64..5000).prop_map(|f| format!("Fra:{f} Mem:12.00M")),
        (0u64..10_000, 0u64..10_000).prop_map(|(a, b)| format!("Sample {a}/{b}")),
        (0i64..500, 0u64..500, 1u64..500)
            .prop_map(|(f, a, b)| format!("Fra:{f} | Sample {a}/{b}")),
        "[a-zA-Z ]{0,20}".prop_map(|s| format!("Saved: {s}")),
        ".{0,40}",
    ]
}

#[derive(Debug, Clone)]
enum StoreOp {
    Run,
    Progress(u8),
    Succeed(usize),
    Fail,
}

fn op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        Just(StoreOp::Run),
        any::<u8>().prop_map(StoreOp::Progress),
        (0usize..3).prop_map(StoreOp::Succeed),
        Just(StoreOp::Fail),
    ]
}

fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::Queued => 0,
        Phase::Running => 1,
        Phase::Succeeded | Phase::Failed => 2,
    }
}

proptest! {
    #[test]
    fn parsed_percent_stays_below_completion(
        line in line_strategy(),
        range in proptest::option::of((1i64..100, 0i64..200)),
        elapsed_ms in 0u64..10_000_000,
    ) {
        let range = range.map(|(start, len)| FrameRange { start, end: start + len });
        let parser = ProgressParser::new(range);
        if let Some(event) = parser.parse_line(&line, Duration::from_millis(elapsed_ms)) {
            prop_assert!(event.percent <= 95);
            if range.is_none() {
                prop_assert!(event.current_frame.is_none());
            }
        }
    }

    #[test]
    fn store_phases_only_move_forward(ops in proptest::collection::vec(op_strategy(), 0..20)) {
        let store = JobStore::new();
        let job_id = JobId::new();
        let params = RenderParams {
            format: OutputFormat::Png,
            samples: 1,
            resolution_x: 1,
            resolution_y: 1,
            frame_range: None,
            gpu: false,
        };
        store.insert(job_id, PathBuf::from("in.blend"), PathBuf::from("out"), params);

        let mut last = store.get(&job_id).unwrap();
        for op in ops {
            let _ = match op {
                StoreOp::Run => store.mark_running(&job_id),
                StoreOp::Progress(p) => store.update_progress(
                    &job_id,
                    renderq::job::Progress::new(p, "p"),
                ),
                StoreOp::Succeed(n) => store.succeed(
                    &job_id,
                    (0..n).map(|i| format!("f{i}.png")).collect(),
                ),
                StoreOp::Fail => store.fail(&job_id, JobFailure::new(FailureKind::Lost, "")),
            };

            let now = store.get(&job_id).unwrap();
            prop_assert!(now.progress.percent <= 100);
            prop_assert_eq!(now.progress.percent == 100, now.phase() == Phase::Succeeded);
            prop_assert!(phase_rank(now.phase()) >= phase_rank(last.phase()));
            if last.phase().is_terminal() {
                prop_assert_eq!(&now, &last);
            }
            if now.phase() == Phase::Succeeded {
                prop_assert!(!now.artifacts().unwrap().is_empty());
            }
            last = now;
        }
    }

    #[test]
    fn half_frame_ranges_are_always_rejected(bound in any::<i64>(), start_only in any::<bool>()) {
        let mut request = RenderRequest::new("scene.blend");
        if start_only {
            request.frame_start = Some(bound);
        } else {
            request.frame_end = Some(bound);
        }
        prop_assert_eq!(
            request.validate(&defaults()).unwrap_err(),
            ValidationError::PartialFrameRange
        );
    }

    #[test]
    fn positive_parameters_are_accepted_verbatim(
        samples in 1i64..100_000,
        x in 1i64..16_384,
        y in 1i64..16_384,
    ) {
        let mut request = RenderRequest::new("scene.blend");
        request.samples = Some(samples);
        request.resolution_x = Some(x);
        request.resolution_y = Some(y);

        let (_, params) = request.validate(&defaults()).unwrap();
        prop_assert_eq!(i64::from(params.samples), samples);
        prop_assert_eq!(i64::from(params.resolution_x), x);
        prop_assert_eq!(i64::from(params.resolution_y), y);
        prop_assert!(params.gpu);
    }

    #[test]
    fn validated_frame_ranges_parse_any_frame_marker(
        start in any::<i64>(),
        end in any::<i64>(),
        frame in 0i64..=i64::MAX,
    ) {
        let mut request = RenderRequest::new("scene.blend");
        request.frame_start = Some(start);
        request.frame_end = Some(end);

        match request.validate(&defaults()) {
            Ok((_, params)) => {
                let range = params.frame_range.unwrap();
                prop_assert!(range.start >= i64::from(i32::MIN) && range.end <= i64::from(i32::MAX));
                let event = ProgressParser::new(Some(range))
                    .parse_line(&format!("Fra:{frame}"), Duration::from_secs(3))
                    .unwrap();
                prop_assert!(event.percent <= 90);
                prop_assert_eq!(event.total_frames, Some(range.total_frames()));
            }
            Err(e) => {
                let expected_kind = matches!(
                    e,
                    ValidationError::OutOfRange { .. } | ValidationError::InvertedFrameRange { .. }
                );
                prop_assert!(expected_kind);
            }
        }
    }
}
