//! Inspector draft state for the selected captured request
//!
//! The inspector owns at most one editable draft at a time, seeded from a
//! captured request and holding copies of its fields — edits never reach the
//! captured record. All transitions are plain methods so the behavior is
//! testable without any rendering layer.

use super::rows::{self, HeaderRow, RowField};
use gatewatch_common::{CapturedRequest, RequestPayload, ResponsePreview};

/// Body view modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Pretty,
    Raw,
    Hex,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Pretty => "pretty",
            ViewMode::Raw => "raw",
            ViewMode::Hex => "hex",
        }
    }
}

/// Inspector tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Request,
    Response,
}

/// The editable working copy of one captured request
#[derive(Debug, Clone)]
pub struct Draft {
    pub method: String,
    pub url: String,
    pub body: String,
    pub headers: Vec<HeaderRow>,
    pub response: Option<ResponsePreview>,
    pub error: Option<String>,
    pub sending: bool,
}

/// Issued by [`Inspector::begin_send`]; a replay outcome is applied only if
/// the ticket still matches the draft generation it targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    epoch: u64,
}

/// Explicit state object for the request inspector
#[derive(Debug, Default)]
pub struct Inspector {
    draft: Option<Draft>,
    view_mode: ViewMode,
    tab: Tab,
    epoch: u64,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// (Re)seed the draft from a captured request, or clear the selection.
    /// Replacing the draft resets the tab and discards any previous response
    /// or error; the view mode survives reselection. Every call bumps the
    /// generation so an in-flight replay response for the old draft is
    /// discarded when it lands.
    pub fn select(&mut self, request: Option<&CapturedRequest>) {
        self.epoch += 1;
        self.tab = Tab::Request;
        self.draft = request.map(|req| Draft {
            method: if req.method.is_empty() {
                "GET".to_string()
            } else {
                req.method.clone()
            },
            url: req.url.clone(),
            body: req.body_text().to_string(),
            headers: rows::rows_from_map(&req.headers),
            response: None,
            error: None,
            sending: false,
        });
    }

    pub fn set_method(&mut self, method: &str) {
        if let Some(draft) = &mut self.draft {
            draft.method = method.to_string();
        }
    }

    pub fn set_url(&mut self, url: &str) {
        if let Some(draft) = &mut self.draft {
            draft.url = url.to_string();
        }
    }

    /// Store body text exactly as typed. The stored value is the literal
    /// edit even while the pretty view is active.
    pub fn set_body(&mut self, body: &str) {
        if let Some(draft) = &mut self.draft {
            draft.body = body.to_string();
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Replace one field of the header row matching `id`
    pub fn update_header(&mut self, id: &str, field: RowField, value: &str) {
        if let Some(draft) = &mut self.draft {
            draft.headers = rows::update_row(&draft.headers, id, field, value);
        }
    }

    /// Append a blank header row, returning its id
    pub fn add_header(&mut self) -> Option<String> {
        let draft = self.draft.as_mut()?;
        draft.headers = rows::add_row(&draft.headers);
        draft.headers.last().map(|row| row.id.clone())
    }

    /// Drop the header row matching `id`
    pub fn remove_header(&mut self, id: &str) {
        if let Some(draft) = &mut self.draft {
            draft.headers = rows::remove_row(&draft.headers, id);
        }
    }

    /// Render the body for the active view mode. Rendering never modifies
    /// the stored value: pretty re-indents JSON (falling back to the raw
    /// text when the body is not JSON), raw shows the text unchanged, and
    /// hex shows a byte-level dump.
    pub fn display_body(&self) -> String {
        let Some(draft) = &self.draft else {
            return String::new();
        };
        match self.view_mode {
            ViewMode::Pretty => pretty_json(&draft.body),
            ViewMode::Raw => draft.body.clone(),
            ViewMode::Hex => hex_dump(draft.body.as_bytes()),
        }
    }

    /// Guarded entry into the sending state. Refused while a send is
    /// already in flight; an empty URL records a validation error without
    /// ever setting `sending`. On success the error is cleared and a ticket
    /// for the current draft generation is issued.
    pub fn begin_send(&mut self) -> Option<SendTicket> {
        let draft = self.draft.as_mut()?;
        if draft.sending {
            tracing::debug!("Replay already in flight; send refused");
            return None;
        }
        if draft.url.trim().is_empty() {
            draft.error = Some("URL is required".to_string());
            return None;
        }
        draft.sending = true;
        draft.error = None;
        Some(SendTicket { epoch: self.epoch })
    }

    /// Serialized form the replay and analyze endpoints accept. Header rows
    /// collapse with map semantics: empty names dropped, last row wins.
    pub fn to_payload(&self) -> Option<RequestPayload> {
        let draft = self.draft.as_ref()?;
        Some(RequestPayload {
            method: draft.method.clone(),
            url: draft.url.clone(),
            headers: rows::rows_to_map(&draft.headers),
            body: draft.body.clone(),
        })
    }

    /// Apply a replay outcome. A ticket from a superseded draft generation
    /// is discarded so a stale response can never overwrite a newer draft.
    /// Whatever the outcome, `sending` is reset.
    pub fn finish_send(&mut self, ticket: SendTicket, outcome: Result<ResponsePreview, String>) {
        if ticket.epoch != self.epoch {
            tracing::debug!("Discarding replay response for a superseded draft");
            return;
        }
        let Some(draft) = &mut self.draft else {
            return;
        };
        draft.sending = false;
        match outcome {
            Ok(preview) => {
                draft.response = Some(preview);
                draft.error = None;
                self.tab = Tab::Response;
            }
            Err(message) => {
                draft.response = None;
                draft.error = Some(message);
            }
        }
    }
}

fn pretty_json(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}

const HEX_BYTES_PER_ROW: usize = 16;

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(HEX_BYTES_PER_ROW).enumerate() {
        let mut hex = String::new();
        for (i, byte) in chunk.iter().enumerate() {
            if i > 0 {
                hex.push(' ');
                if i == HEX_BYTES_PER_ROW / 2 {
                    hex.push(' ');
                }
            }
            hex.push_str(&format!("{:02x}", byte));
        }
        let ascii: String = chunk
            .iter()
            .map(|b| {
                if b.is_ascii_graphic() || *b == b' ' {
                    *b as char
                } else {
                    '.'
                }
            })
            .collect();
        out.push_str(&format!(
            "{:08x}  {:<48} |{}|\n",
            row * HEX_BYTES_PER_ROW,
            hex,
            ascii
        ));
    }
    out
}
