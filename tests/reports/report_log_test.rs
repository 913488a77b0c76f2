//! Tests for the append-only report log.

use std::sync::Arc;

use plexgram::reports::{single_line, NoteKind, ReportLog};

#[tokio::test]
async fn appends_one_line_per_entry() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("reportes.txt");
    let log = ReportLog::new(&path);
    assert_eq!(log.path(), path.as_path());

    log.append(NoteKind::Report, "Heat no carga").await.expect("append");
    log.append(NoteKind::Request, "Dune\nParte 2").await.expect("append");

    let contents = std::fs::read_to_string(&path).expect("read");
    assert_eq!(contents, "[REPORTE] Heat no carga\n[SOLICITUD] Dune Parte 2\n");
}

#[tokio::test]
async fn creates_missing_parent_directory() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("nested").join("dir").join("reportes.txt");

    ReportLog::new(&path)
        .append(NoteKind::Report, "x")
        .await
        .expect("append");

    assert!(path.exists());
}

#[tokio::test]
async fn keeps_existing_contents() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("reportes.txt");
    std::fs::write(&path, "viejo\n").expect("seed");

    ReportLog::new(&path)
        .append(NoteKind::Report, "nuevo")
        .await
        .expect("append");

    let contents = std::fs::read_to_string(&path).expect("read");
    assert_eq!(contents, "viejo\n[REPORTE] nuevo\n");
}

#[tokio::test]
async fn concurrent_appends_do_not_interleave() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("reportes.txt");
    let log = Arc::new(ReportLog::new(&path));

    let mut handles = Vec::new();
    for i in 0..20 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            log.append(NoteKind::Report, &format!("entrada {i}")).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("append");
    }

    let contents = std::fs::read_to_string(&path).expect("read");
    assert_eq!(contents.lines().count(), 20);
    assert!(contents.lines().all(|l| l.starts_with("[REPORTE] entrada ")));
}

#[tokio::test]
async fn whitespace_only_entry_is_skipped() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("reportes.txt");

    ReportLog::new(&path)
        .append(NoteKind::Report, " \n\t ")
        .await
        .expect("append");

    assert!(!path.exists());
}

#[test]
fn single_line_collapses_whitespace() {
    assert_eq!(single_line("  a\r\nb\t c  ").as_deref(), Some("a b c"));
    assert_eq!(single_line("\n"), None);
}
