use super::*;

fn spec(n: usize, hold: f64, transition: f64, fps: u32) -> TimelineSpec {
    TimelineSpec {
        image_count: n,
        fps,
        hold_secs: hold,
        first_hold_secs: hold,
        transition_secs: transition,
        loop_back: false,
        ease: Ease::InOutCubic,
    }
}

#[test]
fn five_images_two_second_hold_one_second_transition() {
    let t = Timeline::new(spec(5, 2.0, 1.0, 10)).unwrap();
    assert_eq!(t.hold_frames(), 20);
    assert_eq!(t.transition_frames(), 10);
    assert_eq!(t.total_frames(), 140);

    assert_eq!(
        t.position_at(FrameIndex(19)),
        FramePosition {
            index: 0,
            offset: 0.0
        }
    );
    let p20 = t.position_at(FrameIndex(20));
    assert_eq!(p20.index, 0);
    assert_eq!(p20.offset, Ease::InOutCubic.apply(0.0));
    let p29 = t.position_at(FrameIndex(29));
    assert_eq!(p29.index, 0);
    assert_eq!(p29.offset, Ease::InOutCubic.apply(0.9));
}

#[test]
fn later_segments_use_uniform_length() {
    let t = Timeline::new(spec(5, 2.0, 1.0, 10)).unwrap();
    assert_eq!(t.position_at(FrameIndex(30)).index, 1);
    assert_eq!(t.position_at(FrameIndex(30)).offset, 0.0);
    assert_eq!(t.position_at(FrameIndex(49)).offset, 0.0);
    let p50 = t.position_at(FrameIndex(50));
    assert_eq!(p50.index, 1);
    assert_eq!(p50.offset, 0.0);
    let p55 = t.position_at(FrameIndex(55));
    assert_eq!(p55.offset, Ease::InOutCubic.apply(0.5));
    // Last segment is a pure hold on the final image.
    assert_eq!(
        t.position_at(FrameIndex(139)),
        FramePosition {
            index: 4,
            offset: 0.0
        }
    );
}

#[test]
fn distinct_first_hold_shifts_later_segments() {
    let mut s = spec(3, 1.0, 1.0, 10);
    s.first_hold_secs = 3.0;
    let t = Timeline::new(s).unwrap();
    assert_eq!(t.first_hold_frames(), 30);
    assert_eq!(t.total_frames(), 30 + 2 * 10 + 2 * 10);
    assert_eq!(t.position_at(FrameIndex(29)).offset, 0.0);
    assert_eq!(t.position_at(FrameIndex(29)).index, 0);
    assert!(t.position_at(FrameIndex(35)).offset > 0.0);
    assert_eq!(t.position_at(FrameIndex(40)).index, 1);
}

#[test]
fn loop_appends_a_transition_from_last_image() {
    let mut s = spec(5, 2.0, 1.0, 10);
    s.loop_back = true;
    let t = Timeline::new(s).unwrap();
    assert_eq!(t.total_frames(), 150);
    let p = t.position_at(FrameIndex(145));
    assert_eq!(p.index, 4);
    assert_eq!(p.offset, Ease::InOutCubic.apply(0.5));
    assert_eq!(t.position_at(FrameIndex(139)).offset, 0.0);
}

#[test]
fn single_image_is_a_single_hold() {
    let t = Timeline::new(spec(1, 2.0, 1.0, 10)).unwrap();
    assert_eq!(t.total_frames(), 20);
    assert_eq!(t.position_at(FrameIndex(19)).offset, 0.0);
}

#[test]
fn durations_round_to_nearest_frame() {
    let t = Timeline::new(spec(2, 0.55, 0.34, 10)).unwrap();
    assert_eq!(t.hold_frames(), 6);
    assert_eq!(t.transition_frames(), 3);
}

#[test]
fn frames_past_the_end_clamp() {
    let t = Timeline::new(spec(5, 2.0, 1.0, 10)).unwrap();
    assert_eq!(t.position_at(FrameIndex(10_000)), t.position_at(FrameIndex(139)));
}

#[test]
fn invalid_timing_is_rejected() {
    assert!(Timeline::new(spec(0, 2.0, 1.0, 10)).is_err());
    assert!(Timeline::new(spec(3, 2.0, 1.0, 0)).is_err());
    assert!(Timeline::new(spec(3, -1.0, 1.0, 10)).is_err());
    assert!(Timeline::new(spec(1, 0.0, 0.0, 10)).is_err());
}

#[test]
fn preview_resolution_and_statistics() {
    let t = Timeline::new(spec(5, 2.0, 1.0, 10)).unwrap();
    assert_eq!(t.resolve_preview(PreviewAt::Frame(42)), FrameIndex(42));
    assert_eq!(t.resolve_preview(PreviewAt::Seconds(2.55)), FrameIndex(25));
    assert_eq!(t.resolve_preview(PreviewAt::Frame(9_999)), FrameIndex(139));
    assert_eq!(PreviewAt::from_number(12.0), PreviewAt::Frame(12));
    assert_eq!(PreviewAt::from_number(1.5), PreviewAt::Seconds(1.5));

    let stats = t.statistics();
    assert_eq!(stats.images, 5);
    assert_eq!(stats.total_frames, 140);
    assert_eq!(
        stats.to_string(),
        "Statistics:\n  Images: 5\n  Total frames: 140\n  Duration: 14.00 seconds"
    );
}

#[test]
fn continuous_position_round_trips() {
    let p = FramePosition {
        index: 3,
        offset: 0.25,
    };
    assert_eq!(p.continuous(), 3.25);
    assert_eq!(FramePosition::from_continuous(3.25), p);
}
