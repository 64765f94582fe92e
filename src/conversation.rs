//! Building the request for this run.
//!
//! A run either starts a fresh conversation or continues the one in the session file, then
//! appends its own user turn.

use std::fs;

use crate::cli::Params;
use crate::error::{Error, Result};
use crate::observability::SESSION_LOAD_FAILURES;
use crate::session::SessionStore;
use crate::types::{ChatCompletionMessage, ChatCompletionRequest};

/// A fresh request for `model`, shaped by `params`.
///
/// The system message, when given, is the first message of the conversation.  A `max_tokens`
/// of zero leaves the limit to the server.
pub fn new_completion_request(params: &Params, model: &str) -> ChatCompletionRequest {
    let max_tokens = Some(params.max_tokens).filter(|&n| n > 0);
    let mut request = ChatCompletionRequest::new(model)
        .with_max_tokens(max_tokens)
        .with_temperature(params.temperature);
    if let Some(system_msg) = params.system_msg.as_deref().filter(|msg| !msg.is_empty()) {
        request.push(ChatCompletionMessage::system(system_msg));
    }
    request
}

/// The request this run starts from.
///
/// With `-c`, the last session is reused as saved: its model, parameters, and messages win
/// over the flags of this run.  If it cannot be loaded, a fresh request is built instead.
pub fn completion_request(
    params: &Params,
    model: &str,
    store: &SessionStore,
) -> ChatCompletionRequest {
    if params.continue_session {
        match store.load() {
            Ok(request) => {
                tracing::debug!(
                    path = %store.path().display(),
                    messages = request.messages.len(),
                    "continuing previous session"
                );
                return request;
            }
            Err(err) => {
                SESSION_LOAD_FAILURES.click();
                tracing::warn!(
                    path = %store.path().display(),
                    error = %err,
                    "failed to load previous session, starting a new one"
                );
            }
        }
    }
    new_completion_request(params, model)
}

/// Append this run's user turn to `request`.
///
/// The message comes first; the contents of `-includeFile`, if any, follow as a second user
/// message.
pub fn append_messages(request: &mut ChatCompletionRequest, params: &Params) -> Result<()> {
    request.push(ChatCompletionMessage::user(params.msg.clone()));
    if let Some(path) = &params.include_file {
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::io(
                format!("failed to read include file {}", path.display()),
                err,
            )
        })?;
        request.push(ChatCompletionMessage::user(contents));
    }
    Ok(())
}
