use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use corogen::compile;
use corogen::diagnostics;
use corogen::language;

#[derive(Parser)]
#[command(name = "corogen")]
#[command(about = "Statement-level C generator for suspendible functions.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    LangId,
    Compile {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Prefix each statement with a `// file:line` comment.
        #[arg(long)]
        line_comments: bool,
        #[arg(long)]
        report_json: bool,
    },
}

fn main() -> std::process::ExitCode {
    env_logger::init();
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::LangId => {
            println!("{}", language::LANG_ID);
            Ok(std::process::ExitCode::SUCCESS)
        }
        Cmd::Compile {
            input,
            out: out_path,
            line_comments,
            report_json,
        } => {
            let bytes =
                std::fs::read(&input).with_context(|| format!("read: {}", input.display()))?;
            let options = compile::CompileOptions {
                line_comments,
                ..Default::default()
            };

            let funcs = match compile::compile_file_to_c(&bytes, &options) {
                Ok(funcs) => funcs,
                Err(err) => {
                    log::debug!("compile failed: {err}");
                    if report_json {
                        let report = diagnostics::Report::ok()
                            .with_diagnostics(vec![err.to_diagnostic()])
                            .with_meta("in", serde_json::json!(input.display().to_string()));
                        println!("{}", serde_json::to_string(&report)?);
                    } else {
                        eprintln!("{err}");
                    }
                    return Ok(std::process::ExitCode::from(1));
                }
            };

            let mut c_src = String::new();
            for f in &funcs {
                c_src.push_str(&format!("// fn {}\n", f.name));
                c_src.push_str(&f.c_src);
                c_src.push('\n');
            }

            match &out_path {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("create output dir: {}", parent.display()))?;
                    }
                    std::fs::write(path, c_src.as_bytes())
                        .with_context(|| format!("write: {}", path.display()))?;
                }
                None if !report_json => print!("{c_src}"),
                None => {}
            }

            if report_json {
                let report = diagnostics::Report::ok()
                    .with_meta("in", serde_json::json!(input.display().to_string()))
                    .with_meta(
                        "funcs",
                        serde_json::Value::Array(funcs.iter().map(|f| f.meta()).collect()),
                    );
                println!("{}", serde_json::to_string(&report)?);
            }
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}
