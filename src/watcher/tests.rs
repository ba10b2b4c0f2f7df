use super::*;
use crate::report::Reporter;
use crate::sanitizer::Sanitizer;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use notify::EventKind;
use notify::event::{CreateKind, DataChange, ModifyKind};
use std::thread;
use tempfile::tempdir;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn quick_config() -> Config {
    Config {
        debounce_ms: 80,
        ..Config::default()
    }
}

fn writes() -> SelfWrites {
    self_writes_for(&quick_config())
}

fn write_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.to_path_buf()))
}

/// JPEG real con un comentario COM justo después de SOI.
fn jpeg_with_comment(comment: &str) -> Vec<u8> {
    let pixels = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 60]));
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90)
        .encode_image(&pixels)
        .expect("codificar JPEG de prueba");

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xFE]);
    out.extend_from_slice(&((comment.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(comment.as_bytes());
    out.extend_from_slice(&jpeg[2..]);
    out
}

#[test]
fn rapid_writes_are_cleaned_once() -> TestResult {
    let dir = tempdir()?;
    let photo = dir.path().join("rafaga.jpg");
    fs::write(&photo, b"contenido")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let sender_path = photo.clone();
    let sender = thread::spawn(move || {
        for _ in 0..3 {
            tx.send(write_event(&sender_path)).expect("canal abierto");
            thread::sleep(Duration::from_millis(10));
        }
        thread::sleep(Duration::from_millis(300));
    });

    let mut calls = Vec::new();
    pump(&rx, &quick_config(), &ShutdownSignal::detached(), &mut writes(), |event| {
        calls.push(event.clone())
    });
    sender.join().expect("hilo emisor");

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, photo);
    assert_eq!(calls[0].coalesced, 3);
    Ok(())
}

#[test]
fn pending_paths_are_flushed_when_the_channel_closes() -> TestResult {
    let dir = tempdir()?;
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.webp");
    fs::write(&first, b"a")?;
    fs::write(&second, b"b")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(write_event(&first))?;
    tx.send(write_event(&second))?;
    tx.send(write_event(&first))?;
    drop(tx);

    let config = Config {
        debounce_ms: 10_000,
        ..Config::default()
    };
    let mut seen = Vec::new();
    pump(&rx, &config, &ShutdownSignal::detached(), &mut writes(), |event| {
        seen.push(event.path.clone())
    });

    assert_eq!(seen, vec![second, first]);
    Ok(())
}

#[test]
fn ignored_events_never_reach_the_handler() -> TestResult {
    let dir = tempdir()?;
    let notes = dir.path().join("notas.txt");
    let folder = dir.path().join("album.jpg");
    fs::write(&notes, b"texto")?;
    fs::create_dir(&folder)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(write_event(&notes))?;
    tx.send(Ok(Event::new(EventKind::Create(CreateKind::Folder)).add_path(folder)))?;
    tx.send(Err(notify::Error::generic("fallo del backend")))?;
    drop(tx);

    let mut calls = 0;
    pump(&rx, &quick_config(), &ShutdownSignal::detached(), &mut writes(), |_| calls += 1);

    assert_eq!(calls, 0);
    Ok(())
}

#[test]
fn vanished_files_are_skipped() -> TestResult {
    let dir = tempdir()?;
    let photo = dir.path().join("efimera.jpg");

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(write_event(&photo))?;
    drop(tx);

    let mut calls = 0;
    pump(&rx, &quick_config(), &ShutdownSignal::detached(), &mut writes(), |_| calls += 1);

    assert_eq!(calls, 0);
    Ok(())
}

#[test]
fn shutdown_stops_the_loop() {
    let (tx, rx) = crossbeam_channel::unbounded::<notify::Result<Event>>();
    let shutdown = ShutdownSignal::detached();

    let requester = shutdown.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        requester.request();
    });

    let started = Instant::now();
    pump(&rx, &quick_config(), &shutdown, &mut writes(), |_| panic!("no hay eventos que despachar"));
    stopper.join().expect("hilo de parada");

    assert!(started.elapsed() < Duration::from_secs(5));
    drop(tx);
}

#[test]
fn watcher_rejects_missing_or_file_roots() -> TestResult {
    let dir = tempdir()?;
    let config = Config::default();

    let missing = DirectoryWatcher::new(&dir.path().join("no_existe"), &config);
    assert!(matches!(missing, Err(Error::WatchSetup { .. })));

    let file = dir.path().join("foto.jpg");
    fs::write(&file, b"x")?;
    let not_a_dir = DirectoryWatcher::new(&file, &config);
    assert!(matches!(not_a_dir, Err(Error::WatchSetup { .. })));
    Ok(())
}

#[test]
fn watcher_canonicalizes_the_root() -> TestResult {
    let dir = tempdir()?;
    let nested = dir.path().join("fotos");
    fs::create_dir(&nested)?;

    let watcher = DirectoryWatcher::new(&nested.join("..").join("fotos"), &Config::default())?;
    assert_eq!(watcher.root(), fs::canonicalize(&nested)?);
    Ok(())
}

#[test]
fn handle_event_cleans_the_file() -> TestResult {
    let dir = tempdir()?;
    let photo = dir.path().join("comentada.jpg");
    fs::write(&photo, jpeg_with_comment("tomada en casa de Ana"))?;

    let sanitizer = Sanitizer::new(&Config::default());
    let event = WatchEvent {
        path: photo.clone(),
        first_seen: SystemTime::now(),
        coalesced: 1,
    };
    handle_event(&sanitizer, &Reporter::new(true), &event);

    let cleaned = fs::read(&photo)?;
    assert!(!cleaned.windows(4).any(|w| w == b"casa"));
    image::load_from_memory(&cleaned)?;
    Ok(())
}

#[test]
fn handle_event_swallows_errors() -> TestResult {
    let dir = tempdir()?;
    let bogus = dir.path().join("falsa.png");
    fs::write(&bogus, b"no soy un png")?;

    let sanitizer = Sanitizer::new(&Config::default());
    let event = WatchEvent {
        path: bogus.clone(),
        first_seen: SystemTime::now(),
        coalesced: 1,
    };
    handle_event(&sanitizer, &Reporter::new(true), &event);

    assert_eq!(fs::read(&bogus)?, b"no soy un png");
    Ok(())
}

#[test]
fn scan_existing_visits_matching_files_recursively() -> TestResult {
    let dir = tempdir()?;
    let nested = dir.path().join("viaje").join("dia1");
    fs::create_dir_all(&nested)?;
    fs::write(dir.path().join("b.jpg"), b"x")?;
    fs::write(nested.join("a.PNG"), b"x")?;
    fs::write(dir.path().join("leeme.md"), b"x")?;
    fs::write(dir.path().join(".exifguard-abc.tmp"), b"x")?;

    let mut seen = Vec::new();
    let count = scan_existing(dir.path(), &Config::default(), &ShutdownSignal::detached(), |event| {
        seen.push(event.path.clone())
    });

    assert_eq!(count, 2);
    seen.sort();
    let mut expected = vec![dir.path().join("b.jpg"), nested.join("a.PNG")];
    expected.sort();
    assert_eq!(seen, expected);
    Ok(())
}

#[test]
fn scan_existing_stops_on_shutdown() -> TestResult {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.jpg"), b"x")?;
    let shutdown = ShutdownSignal::detached();
    shutdown.request();

    let count = scan_existing(dir.path(), &Config::default(), &shutdown, |_| {});
    assert_eq!(count, 0);
    Ok(())
}

#[test]
fn own_rewrite_is_not_processed_again() -> TestResult {
    let dir = tempdir()?;
    let photo = dir.path().join("eco.jpg");
    fs::write(&photo, b"original con metadata")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let sender_path = photo.clone();
    let sender = thread::spawn(move || {
        tx.send(write_event(&sender_path)).expect("canal abierto");
        thread::sleep(Duration::from_millis(300));
        // Eco del rename hecho por el manejador.
        tx.send(write_event(&sender_path)).expect("canal abierto");
        thread::sleep(Duration::from_millis(300));
        fs::write(&sender_path, b"foto nueva del usuario, mas larga").expect("reescribir");
        tx.send(write_event(&sender_path)).expect("canal abierto");
        thread::sleep(Duration::from_millis(300));
    });

    let mut seen = Vec::new();
    pump(&rx, &quick_config(), &ShutdownSignal::detached(), &mut writes(), |event| {
        let contents = fs::read(&event.path).expect("leer");
        seen.push(contents.clone());
        if contents.starts_with(b"original") {
            fs::write(&event.path, b"limpia").expect("limpiar");
        }
    });
    sender.join().expect("hilo emisor");

    assert_eq!(
        seen,
        vec![
            b"original con metadata".to_vec(),
            b"foto nueva del usuario, mas larga".to_vec()
        ]
    );
    Ok(())
}

#[test]
fn unchanged_files_are_not_remembered() -> TestResult {
    let dir = tempdir()?;
    let photo = dir.path().join("intacta.jpg");
    fs::write(&photo, b"sin metadata")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let sender_path = photo.clone();
    let sender = thread::spawn(move || {
        tx.send(write_event(&sender_path)).expect("canal abierto");
        thread::sleep(Duration::from_millis(300));
        tx.send(write_event(&sender_path)).expect("canal abierto");
        thread::sleep(Duration::from_millis(300));
    });

    let mut self_writes = writes();
    let mut calls = 0;
    pump(&rx, &quick_config(), &ShutdownSignal::detached(), &mut self_writes, |_| calls += 1);
    sender.join().expect("hilo emisor");

    assert_eq!(calls, 2);
    assert!(self_writes.is_empty());
    Ok(())
}
