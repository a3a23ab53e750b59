use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use mdlinkattr::{Config, MarkdownRenderer};
use std::fs;
use std::io::{self, Read, Write};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Wraps rendered markdown in a complete HTML document.
///
/// # Arguments
///
/// * `title`: Document title
/// * `body`: Rendered HTML fragment
fn standalone_page(title: &str, body: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                main class="markdown-body" {
                    (PreEscaped(body))
                }
            }
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins over the verbosity flag. Without either only warnings
/// and errors are printed.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose >= 2)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();
}

fn read_input(config: &Config) -> Result<String> {
    if config.reads_stdin() {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read markdown from stdin")?;
        return Ok(content);
    }

    fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.verbose);

    // Options are rejected before any input is touched
    let link_options = config.link_options().context("Invalid link options")?;
    config.validate().context("Invalid configuration")?;
    debug!(?link_options, "Loaded link options");

    let renderer = MarkdownRenderer::with_link_options(link_options);
    let markdown = read_input(&config)?;
    let fragment = renderer
        .render(&markdown)
        .context("Failed to render markdown")?;

    let html = if config.standalone {
        standalone_page(&config.document_title(), &fragment).into_string()
    } else {
        fragment
    };

    match &config.output {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "Generated HTML");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(html.as_bytes())
                .context("Failed to write HTML to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_page_wraps_body() {
        // Arrange
        let body = "<p><a href=\"https://example.com/\" target=\"_blank\">x</a></p>";

        // Act
        let html = standalone_page("Guide & Notes", body).into_string();

        // Assert
        assert!(html.starts_with("<!DOCTYPE html>"), "{}", html);
        assert!(
            html.contains("<title>Guide &amp; Notes</title>"),
            "Title should be escaped: {}",
            html
        );
        assert!(
            html.contains(body),
            "Body HTML should be embedded verbatim: {}",
            html
        );
    }
}
