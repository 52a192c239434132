//! Engine used when no typesetter is attached.
//!
//! Answers every request immediately: compiles fail with one diagnostic,
//! highlighting is neutral and there are no suggestions. The command-line
//! front end uses it, since it only edits and inspects packages.

use std::sync::Arc;

use super::{
    CompileOutput, CompletionSink, Diagnostic, Engine, EngineError, FileAccess, FontData,
    Highlighted, LineCol, Ticket,
};
use crate::source::SourcePath;

#[derive(Debug, Default)]
pub struct DetachedEngine {
    sink: Option<CompletionSink>,
    main: Option<SourcePath>,
}

impl DetachedEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for DetachedEngine {
    fn connect(&mut self, _files: Arc<dyn FileAccess>, sink: CompletionSink) {
        self.sink = Some(sink);
    }

    fn set_main_entry(&mut self, path: &SourcePath) -> Result<(), EngineError> {
        self.main = Some(path.clone());
        Ok(())
    }

    fn submit_compile(&mut self) {
        let Some(sink) = &self.sink else { return };
        let mut diagnostic = Diagnostic::error("no typesetting engine is attached");
        if let Some(main) = &self.main {
            diagnostic = diagnostic.at(main.clone(), None);
        }
        sink.compile_finished(CompileOutput::Failed(vec![diagnostic]));
    }

    fn submit_highlight(&mut self, ticket: Ticket, path: &SourcePath, _text: &str) {
        if let Some(sink) = &self.sink {
            sink.highlight_finished(ticket, path, Highlighted::default());
        }
    }

    fn submit_autocomplete(&mut self, ticket: Ticket, path: &SourcePath, _position: LineCol) {
        if let Some(sink) = &self.sink {
            sink.autocomplete_finished(ticket, path, Vec::new());
        }
    }

    fn add_font(&mut self, _font: FontData) {}
}
