use std::sync::mpsc;
use std::time::Duration;

use skin_manager::{Color, Error, Generation, LoadState, TargetId, TextColorVariant, ThemeUpdate};

use crate::fixture::{harness, png_bytes, BundleWriter, CountingOpener, NS};

#[tokio::test]
async fn test_single_flight_load() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default")).write();
    let custom = BundleWriter::new(&dir.path().join("custom"))
        .color(NS, "colorText", "#FF112233")
        .write();

    let h = harness(
        &default,
        CountingOpener::new().with_delay(Duration::from_millis(100)),
    );

    let (tx, rx) = mpsc::channel();
    let first = tx.clone();
    h.resolver
        .load(&custom, move |result| first.send(result.unwrap()).unwrap());
    assert_eq!(h.resolver.state(), LoadState::Loading);
    h.resolver
        .load(&custom, move |result| tx.send(result.unwrap()).unwrap());

    let generation = tokio::task::spawn_blocking(move || {
        let a = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let b = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(a, b);
        a
    })
    .await
    .unwrap();

    assert_eq!(generation, Generation(1));
    assert_eq!(h.opener.opens(&custom), 1);
    assert_eq!(h.opener.opens(&default), 1);
    assert_eq!(h.resolver.color("colorText"), Color(0xFF11_2233));
}

#[tokio::test]
async fn test_buffered_requests_replay_latest() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default")).write();
    let custom = BundleWriter::new(&dir.path().join("custom"))
        .color(NS, "colorText", "#FF00AA00")
        .asset("Public/b.png", &png_bytes(2, 2, [0, 0, 255, 255]))
        .write();

    let h = harness(&default, CountingOpener::new());
    let target = TargetId::next();

    h.resolver.set_background(target, "a");
    h.resolver.set_background(target, "b");
    h.resolver.set_text_color(target, TextColorVariant::Text);
    assert_eq!(h.sink.updates().len(), 0);

    h.resolver.load_async(&custom).await.unwrap();

    let updates = h.sink.for_target(target);
    assert_eq!(updates.len(), 2);
    match &updates[0] {
        ThemeUpdate::Background(drawable) => assert_eq!(drawable.dimensions(), Some((2, 2))),
        other => panic!("unexpected update {:?}", other),
    }
    assert_eq!(updates[1], ThemeUpdate::TextColor(Color(0xFF00_AA00)));
}

#[tokio::test]
async fn test_requests_after_ready_apply_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorPrimary", "#FF0000FF")
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver.load_async("").await.unwrap();

    let target = TargetId::next();
    h.resolver.set_text_color(target, TextColorVariant::Primary);
    h.resolver.set_typeface(target, "missing.ttf");
    h.sink.wait_for(2).await;

    let updates = h.sink.for_target(target);
    assert_eq!(updates[0], ThemeUpdate::TextColor(Color(0xFF00_00FF)));
    assert_eq!(updates[1], ThemeUpdate::Typeface(None));
}

#[tokio::test]
async fn test_reload_replaces_theme() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorBackground", "#FF010101")
        .write();
    let light = BundleWriter::new(&dir.path().join("light"))
        .color(NS, "colorText", "#FFFFFFFF")
        .color(NS, "colorBackground", "#FFEEEEEE")
        .write();
    let dark = BundleWriter::new(&dir.path().join("dark"))
        .color(NS, "colorText", "#FF000000")
        .write();

    let h = harness(&default, CountingOpener::new());
    let first = h.resolver.load_async(&light).await.unwrap();
    assert_eq!(h.resolver.color("colorBackground"), Color(0xFFEE_EEEE));

    let second = h.resolver.reload_async(&dark).await.unwrap();
    assert!(second > first);
    assert!(h.resolver.is_stale(first));
    assert_eq!(h.resolver.color("colorText"), Color(0xFF00_0000));
    // Missing in dark, served by the default package
    assert_eq!(h.resolver.color("colorBackground"), Color(0xFF01_0101));
    // The default package is reused across reloads
    assert_eq!(h.opener.opens(&default), 1);
    assert_eq!(h.resolver.common().color_text, Color(0xFF00_0000));
}

#[tokio::test]
async fn test_empty_path_without_default_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nowhere").display().to_string();

    let h = harness(&missing, CountingOpener::new());
    let generation = h.resolver.load_async("").await.unwrap();

    assert_eq!(generation, Generation(1));
    assert_eq!(h.resolver.state(), LoadState::Ready);
    assert_eq!(h.resolver.color("colorText"), Color(0xFFFF_FFFF));
    assert_eq!(h.resolver.color_with_result("colorText"), (false, Color(0xFFFF_FFFF)));
    assert_eq!(h.resolver.drawable("anything").as_color(), Some(Color::TRANSPARENT));
    assert!(h.resolver.font("any.ttf").is_none());
}

#[tokio::test]
async fn test_nonexistent_path_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorText", "#FF123456")
        .write();

    let h = harness(&default, CountingOpener::new());
    h.resolver
        .load_async(&dir.path().join("gone").display().to_string())
        .await
        .unwrap();

    assert_eq!(h.resolver.theme().path(), Some(default.as_str()));
    assert_eq!(h.resolver.color("colorText"), Color(0xFF12_3456));
    assert_eq!(h.opener.opens(&default), 1);
}

#[tokio::test]
async fn test_superseded_load_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default")).write();
    let first = BundleWriter::new(&dir.path().join("first"))
        .color(NS, "colorText", "#FF000001")
        .write();
    let second = BundleWriter::new(&dir.path().join("second"))
        .color(NS, "colorText", "#FF000002")
        .write();

    let h = harness(
        &default,
        CountingOpener::new().with_delay(Duration::from_millis(50)),
    );

    let resolver = h.resolver.clone();
    let early = tokio::spawn(async move { resolver.reload_async(&first).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let late = h.resolver.reload_async(&second).await.unwrap();
    let early = early.await.unwrap().unwrap();

    assert_eq!(early, late);
    assert_eq!(late, Generation(1));
    assert_eq!(h.resolver.color("colorText"), Color(0xFF00_0002));
}

#[tokio::test]
async fn test_failed_load_keeps_pending_requests() {
    let dir = tempfile::tempdir().unwrap();
    let default = BundleWriter::new(&dir.path().join("default"))
        .color(NS, "colorTextDim", "#FF777777")
        .write();

    let h = harness(&default, CountingOpener::new().panicking_on("broken"));
    let target = TargetId::next();
    h.resolver.set_text_color(target, TextColorVariant::Dim);

    let result = h.resolver.load_async("/skins/broken").await;
    assert!(matches!(result, Err(Error::LoadFailed(_))));
    assert_eq!(h.resolver.state(), LoadState::Failed);
    assert_eq!(h.resolver.pending_len(), 1);

    h.resolver.load_async(&default).await.unwrap();
    assert_eq!(h.resolver.pending_len(), 0);
    assert_eq!(
        h.sink.for_target(target),
        vec![ThemeUpdate::TextColor(Color(0xFF77_7777))]
    );
}
