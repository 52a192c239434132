//! Request/response bridging between documents and the engine.

use std::sync::Arc;

use super::CompileError;
use crate::engine::scripted::{
    auto_engine, engine, markup, options, path, pdf, sample_document, suggestion,
};
use crate::engine::{CompileOutput, Diagnostic, Highlighted, LineCol};
use crate::source::SourceEntry;

/// Let spawned tasks run until `ready` holds.
async fn until(ready: impl Fn() -> bool) {
    for _ in 0..200 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

const MAIN_TEXT: &str = "#include \"chapters/intro.typ\"";

// ============================================================================
// compile
// ============================================================================

#[tokio::test]
async fn test_concurrent_compiles_share_one_delivery() {
    let (engine, handle) = engine();
    let document = Arc::new(sample_document(engine, options()));

    let first = tokio::spawn({
        let document = Arc::clone(&document);
        async move { document.compile(true).await }
    });
    until(|| handle.compiles() == 1).await;
    let second = tokio::spawn({
        let document = Arc::clone(&document);
        async move { document.compile(false).await }
    });
    until(|| handle.compiles() == 2).await;
    assert_eq!(document.coordinator().pending_count(), 2);

    handle.finish_compile(CompileOutput::Document {
        artifact: pdf(2).into(),
        warnings: vec![Diagnostic::warning("unused import")],
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.page_count(), 2);
    assert_eq!(second, first);
    assert_eq!(document.coordinator().pending_count(), 0);
    assert_eq!(document.current_diagnostics(), vec![Diagnostic::warning("unused import")]);
    assert_eq!(document.current_preview(), Some(first));

    // A second delivery has nobody left to resolve
    handle.finish_compile(CompileOutput::Failed(vec![]));
    assert_eq!(document.coordinator().orphan_count(), 1);
}

#[tokio::test]
async fn test_compile_reads_sources_through_file_access() {
    let (engine, handle) = auto_engine();
    let document = sample_document(engine, options());
    document
        .set_text(&path("/main.typ"), "= One\n#pagebreak()\n= Two\n#pagebreak()\n= Three")
        .unwrap();

    let preview = document.compile(true).await.unwrap();
    assert_eq!(preview.page_count(), 3);
    assert_eq!(handle.with(|s| s.main.clone()), Some(path("/main.typ")));
    assert!(document.current_diagnostics().is_empty());
}

#[tokio::test]
async fn test_failed_compile_keeps_previous_preview() {
    let (engine, _) = auto_engine();
    let document = sample_document(engine, options());
    let good = document.compile(true).await.unwrap();

    document.set_text(&path("/main.typ"), "#error").unwrap();
    let err = document.compile(true).await.unwrap_err();
    assert!(matches!(err, CompileError::Diagnostics(ref d) if d.len() == 1));
    assert_eq!(document.current_diagnostics(), err.diagnostics());
    assert_eq!(document.current_preview(), Some(good));
}

#[tokio::test]
async fn test_missing_main_is_diagnosed_without_the_engine() {
    let (engine, handle) = auto_engine();
    let document = sample_document(engine, options());
    document.compile(true).await.unwrap();
    let before = document.current_preview();

    document.remove(&path("/main.typ")).unwrap();
    let err = document.compile(true).await.unwrap_err();

    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("/main.typ"));
    assert_eq!(diagnostics[0].path, Some(path("/main.typ")));
    assert!(diagnostics[0].hints[0].contains("/chapters/intro.typ"));
    assert_eq!(document.current_preview(), before);
    assert_eq!(handle.compiles(), 1);
}

#[tokio::test]
async fn test_main_source_that_is_not_text() {
    let (engine, _) = auto_engine();
    let document = sample_document(engine, options());
    assert!(document.set_main_source(&path("/assets/logo.png")).is_err());
    assert!(document.set_main_source(&path("/chapters/intro.typ")).is_ok());
    assert_eq!(document.compile(true).await.unwrap().page_count(), 1);
}

#[tokio::test]
async fn test_main_source_inside_a_sources_folder() {
    let (engine, _) = auto_engine();
    let document = sample_document(engine, options());
    document
        .add_source(
            SourceEntry::folder("Sources", vec![SourceEntry::text("main.typ", "= A\n#pagebreak()\n= B")]),
            None,
        )
        .unwrap();
    document.set_main_source(&path("/Sources/main.typ")).unwrap();
    assert_eq!(document.metadata().main_source, path("/Sources/main.typ"));
    assert_eq!(document.compile(true).await.unwrap().page_count(), 2);
}

#[tokio::test]
async fn test_preview_updates_are_observable() {
    let (engine, _) = auto_engine();
    let document = sample_document(engine, options());
    let mut previews = document.preview();
    assert!(previews.borrow().is_none());

    document.compile(false).await.unwrap();
    assert!(!previews.has_changed().unwrap());

    document.compile(true).await.unwrap();
    assert!(previews.has_changed().unwrap());
    assert_eq!(previews.borrow_and_update().as_ref().map(|p| p.page_count()), Some(1));
}

// ============================================================================
// highlight & autocomplete
// ============================================================================

#[tokio::test]
async fn test_newer_highlight_supersedes_older() {
    let (engine, handle) = engine();
    let document = Arc::new(sample_document(engine, options()));
    let main = path("/main.typ");

    let first = tokio::spawn({
        let document = Arc::clone(&document);
        let main = main.clone();
        async move { document.highlight(&main, "draft").await }
    });
    until(|| handle.highlights().len() == 1).await;
    let second = tokio::spawn({
        let document = Arc::clone(&document);
        let main = main.clone();
        async move { document.highlight(&main, MAIN_TEXT).await }
    });
    until(|| handle.highlights().len() == 2).await;

    // The older request resolved neutral as soon as the newer one arrived
    assert_eq!(first.await.unwrap(), Highlighted::default());

    let requests = handle.highlights();
    let (old_ticket, new_ticket) = (requests[0].0, requests[1].0);
    assert_ne!(old_ticket, new_ticket);

    // The engine still answers the old request; it must not reach the new waiter
    handle.finish_highlight(old_ticket, &main, markup("draft"));
    assert_eq!(document.coordinator().orphan_count(), 1);
    assert_eq!(document.coordinator().pending_count(), 1);

    handle.finish_highlight(new_ticket, &main, markup(MAIN_TEXT));
    assert_eq!(second.await.unwrap(), markup(MAIN_TEXT));
    assert_eq!(document.coordinator().pending_count(), 0);
}

#[tokio::test]
async fn test_highlights_for_different_sources_do_not_interfere() {
    let (engine, handle) = engine();
    let document = Arc::new(sample_document(engine, options()));

    let main = tokio::spawn({
        let document = Arc::clone(&document);
        async move { document.highlight(&path("/main.typ"), MAIN_TEXT).await }
    });
    let intro = tokio::spawn({
        let document = Arc::clone(&document);
        async move { document.highlight(&path("/chapters/intro.typ"), "= Intro").await }
    });
    until(|| handle.highlights().len() == 2).await;

    for (ticket, key, text) in handle.highlights() {
        handle.finish_highlight(ticket, &key, markup(&text));
    }
    assert_eq!(main.await.unwrap(), markup(MAIN_TEXT));
    assert_eq!(intro.await.unwrap(), markup("= Intro"));
    assert_eq!(document.coordinator().orphan_count(), 0);
}

#[tokio::test]
async fn test_highlight_cache_follows_text() {
    let (engine, handle) = auto_engine();
    let document = sample_document(engine, options());
    let main = path("/main.typ");

    assert_eq!(document.highlight(&main, MAIN_TEXT).await, markup(MAIN_TEXT));
    assert_eq!(document.highlight(&main, MAIN_TEXT).await, markup(MAIN_TEXT));
    assert_eq!(handle.highlights().len(), 1);

    document.set_text(&main, "= Changed").unwrap();
    assert_eq!(document.highlight(&main, "= Changed").await, markup("= Changed"));
    assert_eq!(handle.highlights().len(), 2);
}

#[tokio::test]
async fn test_newer_autocomplete_supersedes_older() {
    let (engine, handle) = engine();
    let document = Arc::new(sample_document(engine, options()));
    let main = path("/main.typ");

    let first = tokio::spawn({
        let document = Arc::clone(&document);
        let main = main.clone();
        async move { document.autocomplete(&main, LineCol::new(0, 1)).await }
    });
    until(|| handle.autocompletes().len() == 1).await;
    let second = tokio::spawn({
        let document = Arc::clone(&document);
        let main = main.clone();
        async move { document.autocomplete(&main, LineCol::new(0, 2)).await }
    });
    until(|| handle.autocompletes().len() == 2).await;

    assert!(first.await.unwrap().is_empty());
    let requests = handle.autocompletes();
    assert_eq!(requests[1].2, LineCol::new(0, 2));

    handle.finish_autocomplete(requests[0].0, &main, vec![suggestion("stale")]);
    handle.finish_autocomplete(requests[1].0, &main, vec![suggestion("heading")]);
    assert_eq!(second.await.unwrap(), vec![suggestion("heading")]);
    assert_eq!(document.coordinator().orphan_count(), 1);
}

#[tokio::test]
async fn test_synchronous_engine_answers_do_not_deadlock() {
    let (engine, handle) = auto_engine();
    let document = sample_document(engine, options());
    let suggestions = document.autocomplete(&path("/main.typ"), LineCol::new(0, 0)).await;
    assert_eq!(suggestions, vec![suggestion("heading")]);
    assert_eq!(handle.autocompletes().len(), 1);
}

// ============================================================================
// file access
// ============================================================================

#[tokio::test]
async fn test_engine_file_access() {
    use crate::engine::{FileError, PackageSpec};

    let (engine, handle) = engine();
    let document = sample_document(engine, options());
    let files = handle.files();

    assert_eq!(files.read_file("/chapters/intro.typ").unwrap(), b"= Intro");
    assert!(files.file_exists("/assets/logo.png"));
    assert!(!files.file_exists("/missing.typ"));
    assert!(matches!(
        files.write_file("/main.typ", b"nope"),
        Err(FileError::ReadOnly(_))
    ));

    let spec = PackageSpec::new("preview", "cetz", "0.3.1");
    assert!(files.list_directory(&spec).is_err());
    files.create_directory(&spec).unwrap();
    files.write_file("@preview/cetz:0.3.1/src/lib.typ", b"#let x = 1").unwrap();
    assert_eq!(files.list_directory(&spec).unwrap(), ["src/lib.typ"]);
    assert_eq!(files.read_file("@preview/cetz:0.3.1/src/lib.typ").unwrap(), b"#let x = 1");

    // Edits are visible to the engine immediately
    document.set_text(&path("/chapters/intro.typ"), "= Changed").unwrap();
    assert_eq!(files.read_file("chapters/intro.typ").unwrap(), b"= Changed");

    // Package-root relative paths reach the same sources
    assert_eq!(files.read_file("Sources/chapters/intro.typ").unwrap(), b"= Changed");
}
