use super::*;

const CANVAS: Canvas = Canvas {
    width: 8,
    height: 10,
};

#[test]
fn default_is_dark_gradient() {
    let bg = build_background(CANVAS, &BackgroundConfig::default(), None);
    assert_eq!(bg.pixel(0, 0), [40, 40, 40, 255]);
    assert_eq!(bg.pixel(7, 5), [20, 20, 20, 255]);
    let last = bg.pixel(3, 9);
    assert!(last[0] <= 4 && last[0] == last[2] && last[3] == 255);
}

#[test]
fn solid_color() {
    let spec = BackgroundConfig {
        color: Some(Color::rgb(10, 20, 30)),
        ..BackgroundConfig::default()
    };
    let bg = build_background(CANVAS, &spec, None);
    assert!(bg.data.chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
}

#[test]
fn two_color_gradient_hits_both_ends() {
    let spec = BackgroundConfig {
        color: Some(Color::rgb(0, 0, 0)),
        color_bottom: Some(Color::rgb(90, 180, 255)),
        ..BackgroundConfig::default()
    };
    let bg = build_background(CANVAS, &spec, None);
    assert_eq!(bg.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(bg.pixel(0, 9), [90, 180, 255, 255]);
    assert_eq!(bg.pixel(0, 3), [30, 60, 85, 255]);
}

#[test]
fn bottom_color_alone_starts_from_default_top() {
    let spec = BackgroundConfig {
        color_bottom: Some(Color::rgb(0, 0, 0)),
        ..BackgroundConfig::default()
    };
    let bg = build_background(CANVAS, &spec, None);
    assert_eq!(bg.pixel(0, 0), [40, 40, 40, 255]);
    assert_eq!(bg.pixel(0, 9), [0, 0, 0, 255]);
}

#[test]
fn image_covers_the_canvas() {
    let spec = BackgroundConfig {
        color: Some(Color::rgb(255, 0, 0)),
        ..BackgroundConfig::default()
    };
    // Wide image: height drives the cover scale, sides are cropped.
    let img = Surface::filled(40, 5, [0, 0, 255, 255]);
    let bg = build_background(CANVAS, &spec, Some(&img));
    assert_eq!((bg.width, bg.height), (8, 10));
    assert!(bg.data.chunks_exact(4).all(|p| p == [0, 0, 255, 255]));
}

#[test]
fn transparent_image_shows_the_base() {
    let spec = BackgroundConfig {
        color: Some(Color::rgb(255, 0, 0)),
        ..BackgroundConfig::default()
    };
    let img = Surface::new(4, 4);
    let bg = build_background(CANVAS, &spec, Some(&img));
    assert!(bg.data.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
}
