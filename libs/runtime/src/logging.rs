use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" | "" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_level(s).map_or(LevelFilter::OFF, LevelFilter::from_level)
}

/// Per-target levels; the "default" section becomes the fallback level.
fn targets_for(cfg: &LoggingConfig, level_of: impl Fn(&Section) -> Option<&str>) -> Targets {
    let mut targets = Targets::new().with_default(LevelFilter::OFF);
    for (name, section) in cfg {
        let Some(level) = level_of(section) else {
            continue;
        };
        if name == DEFAULT_SECTION {
            targets = targets.with_default(level_filter(level));
        } else {
            targets = targets.with_target(name.clone(), level_filter(level));
        }
    }
    targets
}

fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

fn poisoned<T>(_: PoisonError<T>) -> io::Error {
    io::Error::other("log file lock poisoned")
}

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().map_err(poisoned)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().map_err(poisoned)?.flush()
    }
}

/// Writer that drops everything; used for targets without a file.
struct Discard;

impl Write for Discard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes each record to the file of the longest matching target prefix,
/// falling back to the "default" section's file.
struct FileRouter {
    fallback: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.fallback.clone())
    }

    fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = Box<dyn Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match &self.fallback {
            Some(w) => Box::new(w.clone()),
            None => Box::new(Discard),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        match self.resolve(meta.target()) {
            Some(w) => Box::new(w),
            None => Box::new(Discard),
        }
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(path: &Path, section: &Section) -> io::Result<RotWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(section.max_backups.unwrap_or(3))),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter {
        fallback: None,
        by_prefix: Vec::new(),
    };
    let mut opened: HashMap<PathBuf, RotWriter> = HashMap::new();

    for (name, section) in cfg {
        if section.file.trim().is_empty() || parse_level(&section.file_level).is_none() {
            continue;
        }
        let path = resolve_log_path(&section.file, base_dir);
        // Sections sharing a path share one writer.
        let writer = match opened.get(&path) {
            Some(w) => w.clone(),
            None => match open_rotating(&path, section) {
                Ok(w) => {
                    opened.insert(path.clone(), w.clone());
                    w
                }
                Err(e) => {
                    eprintln!("failed to open log file '{}': {e}", path.display());
                    continue;
                }
            },
        };
        if name == DEFAULT_SECTION {
            router.fallback = Some(writer);
        } else {
            router.by_prefix.push((name.clone(), writer));
        }
    }
    router
}

/// Install the global subscriber: a console layer plus, when any section
/// names a file, a JSON layer writing to rotating files.
///
/// Relative file paths resolve against `base_dir`. Calling this twice is a no-op.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` records before the subscriber is installed.
    let _ = tracing_log::LogTracer::init();

    let console_targets = targets_for(cfg, |s| Some(s.console_level.as_str()));
    let console = fmt::layer()
        .with_ansi(io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets);

    let router = build_file_router(cfg, base_dir);
    let file = (!router.is_empty()).then(|| {
        let file_targets = targets_for(cfg, |s| {
            (!s.file.trim().is_empty()).then_some(s.file_level.as_str())
        });
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets)
    });

    let _ = Registry::default().with(console).with(file).try_init();
}
