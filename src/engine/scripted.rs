//! Test-only engine driven by the test, plus document fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    CompileOutput, CompletionSink, Diagnostic, Engine, EngineError, FileAccess, FontData,
    HighlightSpan, Highlighted, LineCol, Suggestion, SuggestionKind, Ticket,
};
use crate::document::{Document, DocumentOptions};
use crate::package::{DocumentMetadata, PackageContents};
pub(crate) use crate::preview::tests::sample_pdf as pdf;
pub(crate) use crate::source::tests::sample_png as png;
use crate::source::{SourceEntry, SourcePath};

pub(crate) fn path(raw: &str) -> SourcePath {
    SourcePath::parse(raw).unwrap()
}

// ============================================================================
// Scripted engine
// ============================================================================

/// Everything the engine was asked to do, plus its connection.
#[derive(Default)]
pub(crate) struct Script {
    pub sink: Option<CompletionSink>,
    pub files: Option<Arc<dyn FileAccess>>,
    pub main: Option<SourcePath>,
    pub compiles: usize,
    pub highlights: Vec<(Ticket, SourcePath, String)>,
    pub autocompletes: Vec<(Ticket, SourcePath, LineCol)>,
    pub fonts: Vec<String>,
    /// Answer every submission synchronously.
    pub auto: bool,
}

/// Engine driven by the test through an [`EngineHandle`].
///
/// In auto mode a compile reads the main source through `FileAccess`: a
/// text containing `#error` fails, otherwise the artifact has one page per
/// `#pagebreak` plus one. Highlighting tags the whole text `markup`.
pub(crate) struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

#[derive(Clone)]
pub(crate) struct EngineHandle {
    script: Arc<Mutex<Script>>,
}

pub(crate) fn engine() -> (Box<dyn Engine>, EngineHandle) {
    let script = Arc::new(Mutex::new(Script::default()));
    let engine = ScriptedEngine {
        script: Arc::clone(&script),
    };
    (Box::new(engine), EngineHandle { script })
}

pub(crate) fn auto_engine() -> (Box<dyn Engine>, EngineHandle) {
    let (engine, handle) = engine();
    handle.script.lock().auto = true;
    (engine, handle)
}

impl EngineHandle {
    pub fn with<R>(&self, f: impl FnOnce(&Script) -> R) -> R {
        f(&self.script.lock())
    }

    pub fn compiles(&self) -> usize {
        self.script.lock().compiles
    }

    pub fn highlights(&self) -> Vec<(Ticket, SourcePath, String)> {
        self.script.lock().highlights.clone()
    }

    pub fn autocompletes(&self) -> Vec<(Ticket, SourcePath, LineCol)> {
        self.script.lock().autocompletes.clone()
    }

    pub fn files(&self) -> Arc<dyn FileAccess> {
        self.script.lock().files.clone().unwrap()
    }

    /// The sink is cloned out so no script lock is held while reporting.
    pub fn sink(&self) -> CompletionSink {
        self.script.lock().sink.clone().unwrap()
    }

    pub fn finish_compile(&self, output: CompileOutput) {
        self.sink().compile_finished(output);
    }

    pub fn finish_highlight(&self, ticket: Ticket, key: &SourcePath, result: Highlighted) {
        self.sink().highlight_finished(ticket, key, result);
    }

    pub fn finish_autocomplete(&self, ticket: Ticket, key: &SourcePath, suggestions: Vec<Suggestion>) {
        self.sink().autocomplete_finished(ticket, key, suggestions);
    }
}

impl Engine for ScriptedEngine {
    fn connect(&mut self, files: Arc<dyn FileAccess>, sink: CompletionSink) {
        let mut script = self.script.lock();
        script.files = Some(files);
        script.sink = Some(sink);
    }

    fn set_main_entry(&mut self, path: &SourcePath) -> Result<(), EngineError> {
        self.script.lock().main = Some(path.clone());
        Ok(())
    }

    fn submit_compile(&mut self) {
        let (auto, files, main, sink) = {
            let mut script = self.script.lock();
            script.compiles += 1;
            (script.auto, script.files.clone(), script.main.clone(), script.sink.clone())
        };
        if !auto {
            return;
        }
        let (Some(files), Some(main), Some(sink)) = (files, main, sink) else {
            return;
        };
        sink.compile_finished(compile_text(files.as_ref(), &main));
    }

    fn submit_highlight(&mut self, ticket: Ticket, path: &SourcePath, text: &str) {
        let (auto, sink) = {
            let mut script = self.script.lock();
            script.highlights.push((ticket, path.clone(), text.to_string()));
            (script.auto, script.sink.clone())
        };
        if auto && let Some(sink) = sink {
            sink.highlight_finished(ticket, path, markup(text));
        }
    }

    fn submit_autocomplete(&mut self, ticket: Ticket, path: &SourcePath, position: LineCol) {
        let (auto, sink) = {
            let mut script = self.script.lock();
            script.autocompletes.push((ticket, path.clone(), position));
            (script.auto, script.sink.clone())
        };
        if auto && let Some(sink) = sink {
            sink.autocomplete_finished(ticket, path, vec![suggestion("heading")]);
        }
    }

    fn add_font(&mut self, font: FontData) {
        self.script.lock().fonts.push(font.name);
    }
}

fn compile_text(files: &dyn FileAccess, main: &SourcePath) -> CompileOutput {
    let text = match files.read_file(&main.to_string()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return CompileOutput::Failed(vec![Diagnostic::error(e.to_string())]),
    };
    if text.contains("#error") {
        return CompileOutput::Failed(vec![
            Diagnostic::error("unknown variable: error").at(main.clone(), None),
        ]);
    }
    CompileOutput::Document {
        artifact: pdf(text.matches("#pagebreak").count() + 1).into(),
        warnings: Vec::new(),
    }
}

pub(crate) fn markup(text: &str) -> Highlighted {
    Highlighted::new(vec![HighlightSpan {
        range: 0..text.len(),
        tag: "markup".to_string(),
    }])
}

pub(crate) fn suggestion(label: &str) -> Suggestion {
    Suggestion {
        kind: SuggestionKind::Function,
        label: label.to_string(),
        apply: format!("{label}(${{}})"),
        detail: None,
    }
}

// ============================================================================
// Documents
// ============================================================================

pub(crate) fn options() -> DocumentOptions {
    DocumentOptions {
        watch: false,
        ..DocumentOptions::default()
    }
}

/// `/main.typ`, `/chapters/intro.typ`, `/assets/logo.png`.
pub(crate) fn sample_sources() -> Vec<SourceEntry> {
    vec![
        SourceEntry::text("main.typ", "#include \"chapters/intro.typ\""),
        SourceEntry::folder("chapters", vec![SourceEntry::text("intro.typ", "= Intro")]),
        SourceEntry::folder("assets", vec![SourceEntry::image("logo.png", png())]),
    ]
}

pub(crate) fn sample_document(engine: Box<dyn Engine>, options: DocumentOptions) -> Document {
    Document::from_contents(
        "Sample",
        PackageContents {
            sources: sample_sources(),
            metadata: DocumentMetadata::new(path("/main.typ")),
            preview: None,
            thumbnail: None,
        },
        engine,
        options,
    )
    .unwrap()
}
