use std::path::Path;

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::SendError;
use crate::ingest::FileSelection;
use crate::models::{self, Responder};
use crate::orchestrator::ChatOrchestrator;
use crate::preview::{self, PreviewBody, PreviewView};
use crate::session::{ChatEntry, Sender};

const HELP: &str = "commands: /attach <path>, /remove, /preview, /models, /model <id>, /dismiss, /quit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Attach(&'a str),
    Remove,
    Preview,
    Models,
    Model(&'a str),
    Dismiss,
    Help,
    Quit,
    Send(&'a str),
}

fn parse(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Send(line);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "attach" => Command::Attach(arg),
        "remove" => Command::Remove,
        "preview" => Command::Preview,
        "models" => Command::Models,
        "model" => Command::Model(arg),
        "dismiss" => Command::Dismiss,
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        _ => Command::Send(line),
    }
}

fn format_entry(entry: &ChatEntry) -> String {
    let who = match entry.sender {
        Sender::User => "you",
        Sender::Ai => "ai",
    };
    let time = entry.created_at.with_timezone(&Local).format("%H:%M:%S");
    let mut line = format!("[{}] {}: {}", time, who, entry.text);
    if let Some(file) = &entry.attachment {
        line.push_str(&format!(" (File: {})", file.name));
    }
    line
}

fn format_preview(view: &PreviewView) -> String {
    let mut out = format!("Name: {}\nType: {}\nSize: {} KB\n", view.name, view.media_type, view.size_kb);
    match &view.body {
        PreviewBody::Image { data_url } => {
            out.push_str(&format!("[image, {} chars of data url]", data_url.len()));
        }
        PreviewBody::Text { content } => out.push_str(content),
        PreviewBody::Notice { message } => out.push_str(message),
    }
    out
}

struct Printer<W> {
    out: W,
    shown: usize,
    banner: Option<String>,
}

impl<W: AsyncWrite + Unpin> Printer<W> {
    async fn line(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    /// Prints transcript entries not shown yet and a changed error banner.
    async fn sync(&mut self, chat: &ChatOrchestrator) -> std::io::Result<()> {
        let transcript = chat.state().transcript();
        let fresh: Vec<String> = transcript[self.shown..].iter().map(format_entry).collect();
        self.shown = transcript.len();
        for line in fresh {
            self.line(&line).await?;
        }
        let banner = chat.state().last_error.clone();
        if banner != self.banner {
            if let Some(msg) = &banner {
                self.line(&format!("! {}", msg)).await?;
            }
            self.banner = banner;
        }
        Ok(())
    }
}

async fn attach<W: AsyncWrite + Unpin>(
    chat: &mut ChatOrchestrator,
    printer: &mut Printer<W>,
    path: &str,
) -> std::io::Result<()> {
    if path.is_empty() {
        return printer.line("usage: /attach <path>").await;
    }
    let file = match FileSelection::from_path(Path::new(path)).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path, error = %e, "cannot open file");
            return printer.line(&format!("cannot open {}: {}", path, e)).await;
        }
    };
    if !preview::accepts(&file.name, &file.media_type) {
        return printer.line(&format!("file type not accepted: {}", file.name)).await;
    }
    if let Ok(staged) = chat.ingest(file).await {
        let msg = format!("attached {} ({:?})", staged.name, staged.preview_category);
        printer.line(&msg).await?;
    }
    Ok(())
}

/// Drives one session from line-oriented input until EOF or `/quit`.
pub async fn run<R, W>(
    mut chat: ChatOrchestrator,
    responder: &dyn Responder,
    input: R,
    output: W,
) -> anyhow::Result<ChatOrchestrator>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut printer = Printer { out: output, shown: 0, banner: None };
    printer.sync(&chat).await?;
    printer.line(HELP).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Command::Attach(path) => attach(&mut chat, &mut printer, path).await?,
            Command::Remove => {
                if chat.remove_attachment().is_none() {
                    printer.line("no file attached").await?;
                }
            }
            Command::Preview => {
                let text = match &chat.state().pending {
                    Some(file) => format_preview(&PreviewView::of(file)),
                    None => preview::EMPTY_PREVIEW.to_string(),
                };
                printer.line(&text).await?;
            }
            Command::Models => {
                for m in models::MODEL_CATALOG {
                    let marker = if m.id == chat.state().selected_model_id { "*" } else { " " };
                    let backend = if m.is_real_backend { "" } else { " [mock]" };
                    let line = format!("{} {} - {}{}: {}", marker, m.id, m.display_name, backend, m.description);
                    printer.line(&line).await?;
                }
            }
            Command::Model(id) => match chat.select_model(id) {
                Ok(()) => printer.line(&format!("model set to {}", id)).await?,
                Err(e) => printer.line(&e.to_string()).await?,
            },
            Command::Dismiss => {
                chat.dismiss_error();
                printer.banner = None;
            }
            Command::Help => printer.line(HELP).await?,
            Command::Quit => break,
            Command::Send(text) => match chat.send(text, responder).await {
                // empty input with nothing attached is ignored
                Ok(_) | Err(SendError::Empty) => {}
                Err(e) => printer.line(&format!("! {}", e)).await?,
            },
        }
        printer.sync(&chat).await?;
    }
    Ok(chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockResponder;
    use crate::settings::EffectiveSettings;
    use std::time::Duration;
    use tempfile::tempdir;

    fn chat() -> ChatOrchestrator {
        ChatOrchestrator::new(&EffectiveSettings {
            api_key: Some("k".into()),
            model: "grok-1".into(),
            max_attachment_bytes: 5_242_880,
            responder_delay_ms: 0,
        })
    }

    #[test]
    fn parses_commands_and_plain_text() {
        assert_eq!(parse("/attach  /tmp/a b.txt "), Command::Attach("/tmp/a b.txt"));
        assert_eq!(parse("/model grok-1"), Command::Model("grok-1"));
        assert_eq!(parse("/quit"), Command::Quit);
        assert_eq!(parse("hello"), Command::Send("hello"));
        assert_eq!(parse("/shrug"), Command::Send("/shrug"));
    }

    #[tokio::test]
    async fn scripted_session() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, "remember the milk").unwrap();

        let script = format!(
            "/attach {}\nwhat does it say?\n\n/preview\n/model nope\n/remove\n/quit\nnever sent\n",
            p.display()
        );
        let mut out = Vec::new();
        let responder = MockResponder { delay: Duration::ZERO };
        let chat = run(chat(), &responder, script.as_bytes(), &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("attached notes.txt (Text)"));
        assert!(printed.contains("you: what does it say? (File: notes.txt)"));
        assert!(printed.contains("Regarding your file: \"notes.txt\""));
        assert!(printed.contains("remember the milk"));
        assert!(printed.contains("unknown model: nope"));

        // greeting + two send cycles (the blank line re-sends the staged file)
        assert_eq!(chat.state().transcript().len(), 5);
        assert!(chat.state().pending.is_none());
    }

    #[tokio::test]
    async fn oversized_attachment_shows_banner() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("big.csv");
        std::fs::write(&p, vec![b'x'; 32]).unwrap();

        let small = ChatOrchestrator::new(&EffectiveSettings {
            api_key: Some("k".into()),
            model: "grok-1".into(),
            max_attachment_bytes: 8,
            responder_delay_ms: 0,
        });
        let script = format!("/attach {}\n/preview\n", p.display());
        let mut out = Vec::new();
        let responder = MockResponder { delay: Duration::ZERO };
        let chat = run(small, &responder, script.as_bytes(), &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("! File exceeds 8 bytes limit: big.csv"));
        assert!(printed.contains(preview::EMPTY_PREVIEW));
        assert!(chat.state().pending.is_none());
    }
}
