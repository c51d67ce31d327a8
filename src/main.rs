use std::io::{self, BufRead, Write};

use coveshell::{RecordKind, Session, SessionConfig, SessionEvent};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut session = Session::new(SessionConfig::default());
    let mut events = session.subscribe();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "{} \u{276f} ", session.prompt_label())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim() == "exit" {
            break;
        }
        session.submit(&line);

        while let Ok(Some(event)) = events.try_next() {
            match event {
                SessionEvent::RecordAppended(record) => match record.kind {
                    RecordKind::Command => {}
                    RecordKind::StandardError => eprintln!("{}", record.text),
                    RecordKind::Interrupted => println!("^C {}", record.text),
                    _ => println!("{}", record.text),
                },
                SessionEvent::OpenViewer(path) => println!("(view) {}", path.display()),
                SessionEvent::OpenEditor(path) => println!("(edit) {}", path.display()),
                SessionEvent::OpenWithSystem(path) => println!("(open) {}", path.display()),
                SessionEvent::Cleared => print!("\x1b[2J\x1b[H"),
                SessionEvent::RecordFinished(_) | SessionEvent::CwdChanged(_) => {}
            }
        }
    }

    Ok(())
}
