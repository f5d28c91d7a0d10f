use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The page hosting the assistant and the search overlay.
///
/// Scrolling, highlighting and the consultation/vacancies dialogs belong to
/// the host; the core only decides when to ask for them.
pub trait HostPage {
    fn has_anchor(&self, anchor: &str) -> bool;
    /// Scroll to the anchor and highlight it for `highlight_for`.
    fn reveal(&mut self, anchor: &str, highlight_for: Duration);
    fn open_consultation(&mut self, subject: Option<&str>);
    fn open_vacancies(&mut self);
    fn open_link(&mut self, url: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Reveal { anchor: String, highlight_for: Duration },
    OpenConsultation { subject: Option<String> },
    OpenVacancies,
    OpenLink { url: String },
}

/// Headless host that records every request. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    anchors: HashSet<String>,
    calls: Arc<Mutex<Vec<HostCall>>>,
}

impl RecordingHost {
    pub fn new<I, S>(anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchors: anchors.into_iter().map(Into::into).collect(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: HostCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl HostPage for RecordingHost {
    fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors.contains(anchor)
    }

    fn reveal(&mut self, anchor: &str, highlight_for: Duration) {
        self.record(HostCall::Reveal {
            anchor: anchor.to_string(),
            highlight_for,
        });
    }

    fn open_consultation(&mut self, subject: Option<&str>) {
        self.record(HostCall::OpenConsultation {
            subject: subject.map(str::to_string),
        });
    }

    fn open_vacancies(&mut self) {
        self.record(HostCall::OpenVacancies);
    }

    fn open_link(&mut self, url: &str) {
        self.record(HostCall::OpenLink {
            url: url.to_string(),
        });
    }
}
