use super::*;

fn sink_cfg() -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: 25,
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn crf_mode_args() {
    let opts = FfmpegSinkOpts::new("out/video.mp4");
    let args = ffmpeg_args(&opts, &sink_cfg());
    let joined = args.join(" ");
    assert!(joined.starts_with("-y "));
    assert!(joined.contains("-s 640x360"));
    assert!(joined.contains("-r 25"));
    assert!(joined.contains("-c:v libx264"));
    assert!(joined.contains("-preset medium"));
    assert!(joined.contains("-crf 23"));
    assert!(!joined.contains("-b:v"));
    assert_eq!(args.last().map(String::as_str), Some("out/video.mp4"));
}

#[test]
fn bitrate_replaces_crf() {
    let opts = FfmpegSinkOpts::from(&EncodeConfig {
        codec: "libx265".to_owned(),
        bitrate: Some("8M".to_owned()),
        overwrite: false,
        ..EncodeConfig::default()
    });
    let joined = ffmpeg_args(&opts, &sink_cfg()).join(" ");
    assert!(joined.starts_with("-n "));
    assert!(joined.contains("-c:v libx265"));
    assert!(joined.contains("-b:v 8M"));
    assert!(!joined.contains("-crf"));
}

#[test]
fn odd_dimensions_are_rejected() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(
        std::env::temp_dir().join("coverflow-odd.mp4"),
    ));
    let err = sink
        .begin(SinkConfig {
            width: 641,
            height: 360,
            fps: 25,
        })
        .unwrap_err();
    assert!(matches!(err, CoverflowError::Validation(_)));
}

#[test]
fn end_without_begin_is_noop() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    sink.end().unwrap();
}

#[test]
fn abort_before_begin_is_harmless() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    let abort = sink.abort_handle().unwrap();
    abort.abort();
    abort.abort();
    sink.end().unwrap();
}
