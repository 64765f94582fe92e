//! Send a single prompt to a chat completion endpoint and stream the reply.
//!
//! The reply is written to stdout as it arrives.  The whole conversation, reply included, is
//! then saved so that the next run can continue it with `-c`.
//!
//! # Usage
//!
//! ```bash
//! # Ask a question
//! chatgpt "What is the capital of France?"
//!
//! # Ask a follow-up in the same conversation
//! chatgpt -c "And of Germany?"
//!
//! # Frame the conversation and attach a file
//! chatgpt -systemMsg "You are a code reviewer" -includeFile main.rs "Review this"
//!
//! # Read the prompt from stdin
//! git diff | chatgpt -
//! ```
//!
//! # Environment
//!
//! - `OPENAI_API_KEY` (required): the API key.
//! - `OPENAI_AZURE_ENDPOINT`: talk to an Azure OpenAI resource instead of OpenAI.
//! - `OPENAI_AZURE_MODEL`: the Azure deployment; defaults to the model name.
//! - `OPENAI_MODEL`: the model; defaults to `gpt-3.5-turbo`.
//! - `OPENAI_BASE_URL`: an OpenAI-compatible endpoint to use instead of api.openai.com.
//! - `RUST_LOG`: log filter for diagnostics on stderr; defaults to `warn`.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use chatgpt_cli::config::DEFAULT_TIMEOUT;
use chatgpt_cli::{
    ArgsError, ChatCompletionMessage, OpenAI, PlainTextRenderer, Renderer, SessionStore,
    append_messages, complete, completion_request, model_from_env, parse_args, usage,
};

const PROGRAM: &str = "chatgpt";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| PROGRAM.to_string());
    let args: Vec<String> = std::env::args().skip(1).collect();
    let params = match parse_args(&args, io::stdin().lock()) {
        Ok(params) => params,
        Err(err) => return args_error(&program, err),
    };

    let mut renderer = PlainTextRenderer::with_color(io::stderr().is_terminal());
    match run(&params, &mut renderer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            renderer.print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(
    params: &chatgpt_cli::Params,
    renderer: &mut PlainTextRenderer,
) -> chatgpt_cli::Result<()> {
    let client = OpenAI::from_env()?;
    let model = model_from_env();
    let store = SessionStore::default();

    let mut request = completion_request(params, &model, &store);
    append_messages(&mut request, params)?;

    let reply = complete(&client, &request, renderer, DEFAULT_TIMEOUT).await;
    // The reply, or whatever part of it was printed, always ends with a newline.
    renderer.finish_response()?;
    request.push(ChatCompletionMessage::assistant(reply?));
    store.save(&request)
}

fn args_error(program: &str, err: ArgsError) -> ExitCode {
    match &err {
        ArgsError::Help => eprintln!("{}", usage(program)),
        _ if err.wants_usage() => eprintln!("{err}\n\n{}", usage(program)),
        _ => eprintln!("{err}"),
    }
    ExitCode::from(err.exit_code() as u8)
}
