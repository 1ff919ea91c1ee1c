// tests/progress_parser.rs

use std::time::Duration;

use renderq::job::FrameRange;
use renderq::progress::{ProgressParser, estimate_eta, format_eta};

fn still() -> ProgressParser {
    ProgressParser::new(None)
}

fn animation(start: i64, end: i64) -> ProgressParser {
    ProgressParser::new(Some(FrameRange { start, end }))
}

#[test]
fn sample_line_on_still_image_maps_to_ninety_percent_scale() {
    let event = still()
        .parse_line("Sample 64/128", Duration::ZERO)
        .expect("sample line should produce an event");

    assert_eq!(event.percent, 45);
    assert!(event.message.contains("64/128"), "message: {}", event.message);
    assert_eq!(event.current_frame, None);
}

#[test]
fn frame_line_on_animation_reports_frame_percent_and_eta() {
    let event = animation(1, 10)
        .parse_line("Fra:5 Mem:12.00M (Peak 14.00M) | Time:00:40.00", Duration::from_secs(40))
        .expect("frame line should produce an event");

    assert_eq!(event.current_frame, Some(5));
    assert_eq!(event.total_frames, Some(10));
    assert_eq!(event.percent, 45);
    assert_eq!(event.eta, Some(Duration::from_secs(40)));
    assert_eq!(event.message, "Rendering frame 5/10 - ETA: 40s");
}

#[test]
fn frame_percent_is_capped_at_ninety() {
    let event = animation(1, 4)
        .parse_line("Fra:4", Duration::from_secs(8))
        .unwrap();
    assert_eq!(event.percent, 90);
    assert_eq!(event.eta, Some(Duration::ZERO));
}

#[test]
fn frame_before_range_start_has_no_eta() {
    let event = animation(10, 20)
        .parse_line("Fra:3", Duration::from_secs(5))
        .unwrap();
    assert_eq!(event.percent, 0);
    assert_eq!(event.eta, None);
    assert_eq!(event.message, "Rendering frame 3/20");
}

#[test]
fn frame_line_on_still_is_a_heartbeat() {
    let event = still().parse_line("Fra:1 Mem:3.2M", Duration::ZERO).unwrap();
    assert_eq!(event.percent, 50);
    assert_eq!(event.current_frame, None);
    assert_eq!(event.message, "Rendering...");
}

#[test]
fn frame_marker_beats_sample_marker_on_still() {
    let event = still()
        .parse_line("Fra:1 Mem:3.2M | Rendered 1/1 Tiles, Sample 32/128", Duration::ZERO)
        .unwrap();
    assert_eq!(event.percent, 50);
    assert_eq!(event.message, "Rendering...");
    assert_eq!(event.current_frame, None);
}

#[test]
fn sample_marker_is_ignored_for_animations() {
    assert_eq!(
        animation(1, 10).parse_line("Sample 64/128", Duration::ZERO),
        None
    );
}

#[test]
fn extreme_frame_values_do_not_overflow() {
    let widest = animation(i64::MIN, i64::MAX);
    let event = widest.parse_line("Fra:1", Duration::from_secs(1)).unwrap();
    assert_eq!(event.total_frames, Some(u64::MAX));
    assert!(event.percent <= 90);

    let event = animation(1, 10)
        .parse_line("Fra:9223372036854775807", Duration::from_secs(1))
        .unwrap();
    assert_eq!(event.percent, 90);
    assert_eq!(event.eta, Some(Duration::ZERO));

    let event = animation(i64::MAX - 1, i64::MAX)
        .parse_line("Fra:0", Duration::from_secs(1))
        .unwrap();
    assert_eq!(event.percent, 0);
    assert_eq!(event.eta, None);
}

#[test]
fn huge_sample_counts_stay_on_the_ninety_scale() {
    let event = still()
        .parse_line("Sample 18446744073709551615/18446744073709551615", Duration::ZERO)
        .unwrap();
    assert_eq!(event.percent, 90);
}

#[test]
fn zero_sample_total_produces_no_event() {
    assert_eq!(still().parse_line("Sample 3/0", Duration::ZERO), None);
}

#[test]
fn save_marker_means_finalizing() {
    for parser in [still(), animation(1, 3)] {
        let event = parser
            .parse_line("Saved: '/tmp/out/frame_0001.png'", Duration::ZERO)
            .unwrap();
        assert_eq!(event.percent, 95);
        assert_eq!(event.message, "Finalizing");
    }
}

#[test]
fn unrelated_lines_produce_no_event() {
    let parser = animation(1, 10);
    for line in [
        "",
        "Blender 4.1.0 (hash abc123 built 2024-03-25)",
        "Read blend: /tmp/scene.blend",
        "Fra: no digits here",
        "Sampling without numbers",
    ] {
        assert_eq!(parser.parse_line(line, Duration::ZERO), None, "line: {line:?}");
    }
}

#[test]
fn eta_is_average_time_per_frame_times_remaining() {
    assert_eq!(
        estimate_eta(Duration::from_secs(40), 5, 10),
        Some(Duration::from_secs(40))
    );
    assert_eq!(
        estimate_eta(Duration::from_secs(30), 3, 12),
        Some(Duration::from_secs(90))
    );
    assert_eq!(estimate_eta(Duration::from_secs(30), 0, 12), None);
}

#[test]
fn eta_formatting_switches_to_minutes_at_sixty_seconds() {
    assert_eq!(format_eta(Duration::from_secs(0)), "0s");
    assert_eq!(format_eta(Duration::from_secs(59)), "59s");
    assert_eq!(format_eta(Duration::from_secs(60)), "1m 0s");
    assert_eq!(format_eta(Duration::from_secs(150)), "2m 30s");
}

#[test]
fn event_converts_to_store_progress_with_formatted_eta() {
    let progress = animation(1, 10)
        .parse_line("Fra:5", Duration::from_secs(40))
        .unwrap()
        .into_progress();
    assert_eq!(progress.percent, 45);
    assert_eq!(progress.current_frame, Some(5));
    assert_eq!(progress.eta.as_deref(), Some("40s"));
}
