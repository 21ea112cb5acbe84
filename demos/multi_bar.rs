//! Four workers reporting to one manager: two finish, one overshoots its
//! total, one gives up. Run with `RUST_LOG=debug` to see the manager's logs.

use std::{process::ExitCode, thread, time::Duration};

use progress_relay::{Bar, BarManager, Layout};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut single = Bar::single(20u64, "warmup", Layout::SingleLine);
    for _ in 0..20 {
        let _ = single.advance(1, "preparing workers");
        thread::sleep(Duration::from_millis(15));
    }

    let mut manager = BarManager::new(Duration::from_secs(2));
    let mut handles = vec![];

    for (name, total, pace) in [("download", 40u64, 30u64), ("checksum", 25, 50)] {
        let mut bar = manager.create(total, name);
        handles.push(thread::spawn(move || {
            for i in 0..total {
                let _ = bar.advance(1, &format!("chunk {i}/{total}"));
                thread::sleep(Duration::from_millis(pace));
            }
        }));
    }

    let mut greedy = manager.create(10u64, "decompress");
    handles.push(thread::spawn(move || {
        for i in 0..12 {
            let _ = greedy.advance(1, &format!("block {i}"));
            thread::sleep(Duration::from_millis(80));
        }
    }));

    let mut flaky = manager.create(30u64, "upload");
    handles.push(thread::spawn(move || {
        for i in 0..8 {
            let _ = flaky.advance(1, &format!("part {i}"));
            thread::sleep(Duration::from_millis(60));
        }
        flaky.force_stop_with_error("connection reset");
    }));

    let unfinished = manager.show_and_wait();
    for handle in handles {
        let _ = handle.join();
    }

    if unfinished.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
