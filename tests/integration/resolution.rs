use skin_manager::{
    Category, Color, DecodeQuality, Drawable, FontFormat, LineOrientation, ResolvedAsset, TargetId,
    ThemeUpdate,
};

use crate::fixture::{font_bytes, harness, png_bytes, BundleWriter, CountingOpener, NS};

const LEGACY: &str = "com.github.legacy";

#[tokio::test]
async fn test_fallback_to_default_package() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorPrimary", "#FF0000AA")
        .color(NS, "colorText", "#FF0000BB")
        .asset("Public/title.png", &png_bytes(4, 4, [1, 2, 3, 255]))
        .write();
    let custom = BundleWriter::new(&dir.path().join("custom"))
        .color(NS, "colorText", "#FFCC0000")
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async(&custom).await.unwrap();

    assert_eq!(h.resolver.color("colorText"), Color(0xFFCC_0000));
    assert_eq!(h.resolver.color("colorPrimary"), Color(0xFF00_00AA));
    assert_eq!(h.resolver.drawable("title").dimensions(), Some((4, 4)));
    assert_eq!(
        h.resolver.resolve(Category::Color, "colorMissing"),
        ResolvedAsset::NotFound
    );
}

#[tokio::test]
async fn test_compatible_namespace_alias() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(LEGACY, "colorTextLight", "#FF0A0A0A")
        .write();
    let custom = BundleWriter::new(&dir.path().join("custom"))
        .color(LEGACY, "colorText", "#FF0B0B0B")
        .color(NS, "colorAccent", "#FF0C0C0C")
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async(&custom).await.unwrap();

    assert_eq!(h.resolver.color("colorText"), Color(0xFF0B_0B0B));
    assert_eq!(h.resolver.color("colorTextLight"), Color(0xFF0A_0A0A));
    assert_eq!(h.resolver.color_or("colorHighlight", "colorAccent"), Color(0xFF0C_0C0C));
    assert_eq!(h.resolver.color_with_result("nothing"), (false, Color(0xFFFF_FFFF)));
}

#[tokio::test]
async fn test_resource_drawables() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .drawable(NS, "dialog_background", "#FF202020")
        .drawable(NS, "dialog_fram", "res/dialog_frame.png")
        .file("res/dialog_frame.png", &png_bytes(8, 5, [4, 4, 4, 255]))
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async(&default).await.unwrap();

    assert_eq!(
        h.resolver.res_drawable("dialog_background"),
        Drawable::Color(Color(0xFF20_2020))
    );
    assert_eq!(h.resolver.theme().dialog_background().dimensions(), Some((8, 5)));
    assert_eq!(
        h.resolver.res_drawable("missing"),
        Drawable::Color(Color::TRANSPARENT)
    );
}

#[tokio::test]
async fn test_line_uses_color_line_without_image() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorLine", "#FF445566")
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async("").await.unwrap();

    let target = TargetId::next();
    h.resolver.set_line(target, LineOrientation::Horizontal);
    h.sink.wait_for(1).await;
    assert_eq!(
        h.sink.for_target(target),
        vec![ThemeUpdate::Background(Drawable::Color(Color(0xFF44_5566)))]
    );
}

#[tokio::test]
async fn test_image_variants_and_folders() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .asset("Public/alpha.png", &png_bytes(2, 2, [0, 0, 0, 64]))
        .asset("Home/tile.png", &png_bytes(3, 3, [9, 9, 9, 255]))
        .asset("Home/normal.png", &png_bytes(5, 5, [9, 9, 9, 255]))
        .asset("Home/pressed.png", &png_bytes(6, 6, [9, 9, 9, 255]))
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async("").await.unwrap();

    match (h.resolver.drawable("alpha"), h.resolver.hd_drawable("alpha")) {
        (Drawable::Image(low), Drawable::Image(high)) => {
            assert!(!low.color().has_alpha());
            assert!(high.color().has_alpha());
        }
        other => panic!("unexpected drawables {:?}", other),
    }

    // Not in the default folder
    assert!(h.resolver.drawable("tile").is_color());
    assert_eq!(h.resolver.drawable_in("tile", "Home").dimensions(), Some((3, 3)));
    assert!(h.resolver.jpg_drawable("alpha").is_color());

    h.resolver.set_default_folder("Home");
    assert_eq!(h.resolver.drawable("tile").dimensions(), Some((3, 3)));
    let (normal, pressed) = h.resolver.selector("normal", "pressed");
    assert_eq!(normal.dimensions(), Some((5, 5)));
    assert_eq!(pressed.dimensions(), Some((6, 6)));

    h.resolver.set_decode_quality(DecodeQuality::High);
    match h.resolver.drawable_in("alpha", "Public") {
        Drawable::Image(image) => assert!(image.color().has_alpha()),
        other => panic!("unexpected drawable {:?}", other),
    }
}

#[tokio::test]
async fn test_font_cache_memoizes_hits_and_misses() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .asset("Typeface/title.ttf", &font_bytes())
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async("").await.unwrap();

    let font = h.resolver.font("title.ttf").unwrap();
    assert_eq!(font.format(), FontFormat::TrueType);
    assert_eq!(h.resolver.font("title.ttf"), Some(font));

    assert!(h.resolver.font("missing.ttf").is_none());
    assert!(h.resolver.font("missing.ttf").is_none());

    let theme = h.resolver.theme();
    assert_eq!(theme.fonts().decode_attempts(), 2);
    assert_eq!(theme.fonts().len(), 2);

    // A new generation starts with an empty cache
    h.resolver.reload_async("").await.unwrap();
    assert!(h.resolver.theme().fonts().is_empty());

    let target = TargetId::next();
    h.resolver.set_typeface(target, "title.ttf");
    h.sink.wait_for(1).await;
    assert_eq!(h.resolver.theme().fonts().decode_attempts(), 1);
}
