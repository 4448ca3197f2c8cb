//=========================================================================
// fs-watch
//
// Prints file creation, removal and update events for one directory.
// Exits after ten events.
//
// Usage: fs-watch <directory to watch>
//
//=========================================================================

use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;

use log::error;

use lodestone::app::{ApplicationBuilder, RunHandle};
use lodestone::io::event::{FileCreation, FileRemoval, FileUpdate};
use lodestone::io::{Event, EventSink, FilesystemMonitor, Listener};
use lodestone::logging::LoggingConfig;

const EVENT_LIMIT: usize = 10;
const POLL_RATE: f64 = 20.0;

//=== Printer =============================================================

struct Printer {
    count: usize,
    handle: RunHandle,
}

impl Printer {
    fn print(&mut self, event: &Event) {
        if let Some(e) = event.try_as::<FileCreation>() {
            println!("file_creation_event{{{}}}", e.name.display());
        } else if let Some(e) = event.try_as::<FileRemoval>() {
            println!("file_removal_event{{{}}}", e.name.display());
        } else if let Some(e) = event.try_as::<FileUpdate>() {
            println!("file_update_event{{{}}}", e.name.display());
        } else {
            return;
        }

        self.count += 1;
        if self.count >= EVENT_LIMIT {
            self.handle.stop();
        }
    }
}

impl Listener for Printer {
    fn on_event(&mut self, event: &Event, _sink: &mut dyn EventSink) {
        self.print(event);
    }
}

//=== Entry ===============================================================

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        let program = args.first().map(String::as_str).unwrap_or("fs-watch");
        eprintln!("Usage: {} <directory to watch>", program);
        return ExitCode::from(1);
    }
    let directory = &args[1];

    let mut app = ApplicationBuilder::new()
        .with_target_fps(POLL_RATE)
        .with_logging(LoggingConfig::default())
        .build();

    let monitor = match FilesystemMonitor::new() {
        Ok(monitor) => Rc::new(RefCell::new(monitor)),
        Err(e) => {
            error!(target: "app", "{}", e);
            return ExitCode::FAILURE;
        }
    };
    if monitor.borrow_mut().watch(directory).is_err() {
        return ExitCode::FAILURE;
    }

    println!("Watching '{}'", directory);

    let printer = Rc::new(RefCell::new(Printer {
        count: 0,
        handle: app.run_handle(),
    }));

    app.pump_mut().register_source(&monitor);
    app.pump_mut().register_listener(&printer);

    app.run(|_, _| {});

    ExitCode::SUCCESS
}
