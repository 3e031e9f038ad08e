//! Root logger construction: a `TermDecorator` + `FullFormat` drain with a
//! custom `chrono`-based timestamp, wrapped in `slog_async::Async` and fused
//! into a root `Logger`.

use std::io::Write;

use chrono::Local;
use slog::o;
use slog::Drain;
use slog::Logger;
use slog_term::FullFormat;
use slog_term::TermDecorator;

pub fn logger() -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator)
        .use_custom_timestamp(move |rd: &mut dyn Write| write!(rd, "{}", Local::now().format("%T %Z")))
        .build()
        .fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}
