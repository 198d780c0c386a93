use super::*;

#[test]
fn parses_hex_with_and_without_alpha() {
    assert_eq!(Color::parse_hex("#FF8000").unwrap(), Color::rgb(255, 128, 0));
    assert_eq!(Color::parse_hex("ff800080").unwrap().a, 0x80);
    assert!(Color::parse_hex("#12345").is_err());
    assert!(Color::parse_hex("#zzzzzz").is_err());
}

#[test]
fn deserializes_hex_and_arrays() {
    let c: Color = serde_json::from_str("\"#102030\"").unwrap();
    assert_eq!(c, Color::rgb(16, 32, 48));
    let c: Color = serde_json::from_str("[1, 2, 3]").unwrap();
    assert_eq!(c, Color::rgb(1, 2, 3));
    let c: Color = serde_json::from_str("[1, 2, 3, 4]").unwrap();
    assert_eq!(c.a, 4);
    assert!(serde_json::from_str::<Color>("[1, 2]").is_err());
}

#[test]
fn serializes_as_hex() {
    assert_eq!(
        serde_json::to_string(&Color::rgb(16, 32, 48)).unwrap(),
        "\"#102030\""
    );
    assert_eq!(
        Color {
            r: 0,
            g: 0,
            b: 0,
            a: 0x7f
        }
        .to_hex(),
        "#0000007f"
    );
}

#[test]
fn premultiplies_alpha() {
    assert_eq!(Color::rgb(200, 100, 0).to_premul(), [200, 100, 0, 255]);
    let half = Color {
        r: 200,
        g: 100,
        b: 0,
        a: 128,
    };
    assert_eq!(half.to_premul(), [100, 50, 0, 128]);
}
