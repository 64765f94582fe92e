//! Streaming execution of one completion.
//!
//! Fragments are forwarded to the renderer one at a time, in arrival order, and the next chunk
//! is not awaited until the renderer has returned.  Any error ends the completion and the text
//! collected so far is dropped.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};

use crate::client::OpenAI;
use crate::error::{Error, Result};
use crate::observability::{STREAM_CHUNKS, STREAM_DURATION};
use crate::render::Renderer;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

/// Consume `stream`, forwarding each non-empty fragment to `renderer`.
///
/// Returns the concatenation of every fragment once the stream ends.
pub async fn stream_completion<S>(stream: S, renderer: &mut dyn Renderer) -> Result<String>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    let start = Instant::now();
    let response = forward_fragments(stream, renderer).await;
    STREAM_DURATION.add(start.elapsed().as_secs_f64());
    response
}

async fn forward_fragments<S>(stream: S, renderer: &mut dyn Renderer) -> Result<String>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    futures::pin_mut!(stream);
    let mut response = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        STREAM_CHUNKS.click();
        let Some(fragment) = chunk.fragment().filter(|f| !f.is_empty()) else {
            continue;
        };
        renderer.print_text(fragment)?;
        response.push_str(fragment);
    }
    Ok(response)
}

/// Run `work` under `deadline`.
///
/// When the deadline passes first, `work` is dropped, which aborts any request in flight.
pub async fn with_deadline<T, F>(deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(
            "chat completion did not finish before the deadline",
            Some(deadline.as_secs_f64()),
        )),
    }
}

/// Send `request` and stream the reply to `renderer`, all within `deadline`.
///
/// Returns the full reply text.
pub async fn complete(
    client: &OpenAI,
    request: &ChatCompletionRequest,
    renderer: &mut dyn Renderer,
    deadline: Duration,
) -> Result<String> {
    with_deadline(deadline, async {
        let stream = client.stream(request).await?;
        stream_completion(stream, renderer).await
    })
    .await
}
