use clap::error::ErrorKind;
use clap::Parser;
use colored::*;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "burpview",
    version,
    about = "Decodes exported attack-result XML into an offline HTML report",
    override_usage = "burpview <INPUT_XML> <OUTPUT_HTML>",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Convert an Intruder export:     burpview attack.xml report.html
  Verbose decoding decisions:     RUST_LOG=debug burpview attack.xml report.html"
)]
pub struct Args {
    /// Exported attack-result XML file to read
    pub input_xml: String,

    /// HTML report file to write (overwritten if it already exists)
    pub output_html: String,
}

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            // Wrong argument count is a usage error: message on stderr, exit 1.
            let _ = e.print();
            process::exit(1);
        }
    };

    match burpview_core::run(&args.input_xml, &args.output_html) {
        Ok(count) => {
            if count == 0 {
                println!(
                    "{}",
                    "[*] No recognizable result items; the report contains a placeholder note."
                        .yellow()
                );
            }
            println!(
                "{}",
                format!("[+] Wrote {} ({} item(s))", args.output_html, count)
                    .green()
                    .bold()
            );
        }
        Err(e) => {
            eprintln!("{}", format!("[!] {:#}", e).red());
            process::exit(1);
        }
    }
}
