fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if handle_cli_flags(&args) {
        return;
    }

    let result = apod_tui::app::RunOptions::parse(args).and_then(apod_tui::run);
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags(args: &[String]) -> bool {
    let mut saw_flag = false;
    for arg in args {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("APOD-TUI {}", apod_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "APOD-TUI — Browse NASA's Astronomy Picture of the Day from the terminal.\n\n  --version, -V          Show version and exit\n  --help,    -h          Show this help message\n  --config PATH          Read configuration from PATH\n  --dataset URL          Dataset URL (https:// or file://)\n  --start DATE           Window start (YYYY-MM-DD); end follows 8 days later\n  --end DATE             Window end (YYYY-MM-DD)\n  --category NAME        all, nebula, galaxy, planet or star\n  --favorites-only       Show favorited items only\n  --page N               Page to show\n  --print                Print the page to stdout instead of starting the UI"
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
