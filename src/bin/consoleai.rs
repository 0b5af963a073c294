//! Interactive chat against OpenAI or Azure OpenAI.
//!
//! This binary reads settings from `appsettings.json` and the environment,
//! picks a provider, and then streams replies to whatever is typed at the
//! `Q (or exit): ` prompt.
//!
//! # Usage
//!
//! ```bash
//! # OpenAI, with ConnectionStrings:openAi set in appsettings.json
//! consoleai
//!
//! # Azure OpenAI, configured from the environment
//! AI__AzureOrOpenAI=Azure \
//! ConnectionStrings__azureOpenAi='Endpoint=https://my-resource.openai.azure.com/;Key=...' \
//! consoleai
//!
//! # Another settings file, model and a request log
//! consoleai --config settings.yaml --model gpt-4o --log chat.jsonl
//! ```
//!
//! Type `exit`, an empty line, Ctrl-D or Ctrl-C to leave.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use consoleai::chat::{
    ChatArgs, ChatConfig, ChatSession, Interrupt, LineSource, PlainTextRenderer, Renderer,
};
use consoleai::{ClientOptions, Configuration, JsonLinesLogger, ProviderSelection};

/// Reads prompt lines with history and line editing.
struct EditorInput {
    editor: DefaultEditor,
    /// Set while blocked in `readline`.
    reading: Arc<AtomicBool>,
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.reading.store(true, Ordering::SeqCst);
        let line = self.editor.readline(prompt);
        self.reading.store(false, Ordering::SeqCst);
        match line {
            Ok(line) => {
                if !line.is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Some(line)
            }
            // Ctrl-C at the prompt or Ctrl-D
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(err) => {
                eprintln!("Input error: {err}");
                None
            }
        }
    }
}

fn resolve(config: &ChatConfig) -> consoleai::Result<(Configuration, ProviderSelection)> {
    let settings = config.load_configuration()?;
    let selection = ProviderSelection::from_config(&settings)?;
    Ok((settings, selection))
}

/// Startup lines naming the model and the provider as configured.
fn banner(settings: &Configuration, selection: &ProviderSelection) -> [String; 2] {
    [
        format!("**** Chat deployment name: {}", selection.model()),
        format!("**** Using {} services", settings.provider()),
    ]
}

/// Main entry point for the consoleai application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("consoleai [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let (settings, selection) = match resolve(&config) {
        Ok(resolved) => resolved,
        Err(err) => {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
    };

    let mut options = ClientOptions::new();
    if let Some(path) = &config.log_path {
        options = options.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }
    let provider = selection.connect(options)?;

    for line in banner(&settings, &selection) {
        renderer.print_info(&line);
    }

    // Ctrl-C while a reply is streaming abandons it and ends the session. On a
    // terminal rustyline reports Ctrl-C itself; this handler only sees it at
    // the prompt when stdin is not a terminal, and that read cannot be woken.
    let interrupt = Interrupt::new();
    let reading = Arc::new(AtomicBool::new(false));
    let handler = interrupt.clone();
    let blocked = Arc::clone(&reading);
    ctrlc::set_handler(move || {
        handler.trigger();
        if blocked.load(Ordering::SeqCst) {
            std::process::exit(0);
        }
    })?;

    let mut input = EditorInput {
        editor: DefaultEditor::new()?,
        reading,
    };
    let mut session = ChatSession::new(provider, settings.system_prompt());
    session.run(&mut input, &mut renderer, &interrupt).await;

    Ok(())
}
