//! Startup wiring: schema + transport configuration → [`Loggers`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use field_redactor::{PathError, Redactor};
use log_schema::{loader, CategorySchema, Category, ConfigurationError, FieldValidator};
use log_transport::{
    flush, BufferedTransport, ConsoleSink, ConsoleTransport, DatedFileSink, DestinationTemplate,
    FileTransport, FlushHandle, RotatingSink, RotatingTransport, RotationPolicy, SinkWriteError,
    Target, TemplateError, Transport, TransportRouter,
};
use tracing::info;

use crate::config::{TargetConfig, TransportConfig};
use crate::logger::{Logger, Loggers};

/// Initialization failures. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Schema(#[from] ConfigurationError),

    #[error("logger '{logger}': {source}")]
    Redaction {
        logger: String,
        #[source]
        source: PathError,
    },

    #[error("invalid destination template '{template}': {source}")]
    Destination {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("failed to open rotating sink: {0}")]
    Sink(#[from] SinkWriteError),

    #[error("destination {} is configured both buffered and unbuffered", .0.display())]
    ConflictingDestination(PathBuf),
}

/// A rotating destination shared by every target that resolves to it.
enum Archive {
    Buffered(FlushHandle),
    Inline(Arc<Mutex<RotatingSink>>),
}

/// Builds one [`Logger`] per schema entry.
///
/// Routers are built once per category and shared by every logger of that
/// category. Rotating destinations are opened once per resolved path, so
/// two targets that resolve to the same file share one sink (and one flush
/// worker when buffered).
pub struct LoggerFactory {
    config: TransportConfig,
}

impl LoggerFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Validate `schema` against this configuration without opening any
    /// file or spawning any worker.
    ///
    /// Catches everything [`build`](Self::build) would reject before it
    /// touches the filesystem: schema errors, malformed redact paths, bad
    /// destination templates and conflicting buffering on one destination.
    pub fn check(&self, schema: &CategorySchema) -> Result<(), BuildError> {
        loader::validate(schema)?;

        for (key, entry) in schema.iter() {
            redactor_for(key, &entry.redact_fields)?;
        }

        let today = chrono::Utc::now().date_naive();
        let mut archives: HashMap<PathBuf, bool> = HashMap::new();
        for target in &self.config.targets {
            let Some(destination) = target.destination() else {
                continue;
            };
            let template = parse_template(destination)?;
            let TargetConfig::RotatingCompressed {
                min_level, buffered, ..
            } = target
            else {
                continue;
            };
            for category in categories(schema) {
                let path = template.resolve(&self.config.log_root, category, *min_level, today);
                match archives.get(&path) {
                    Some(seen) if seen != buffered => {
                        return Err(BuildError::ConflictingDestination(path));
                    }
                    Some(_) => {}
                    None => {
                        archives.insert(path, *buffered);
                    }
                }
            }
        }
        Ok(())
    }

    /// Build every logger declared in `schema`.
    ///
    /// # Panics
    ///
    /// Buffered targets spawn flush workers, so this must be called from
    /// within a tokio runtime when any are configured.
    pub fn build(&self, schema: &CategorySchema) -> Result<Loggers, BuildError> {
        self.check(schema)?;

        let today = chrono::Utc::now().date_naive();

        let consoles: Vec<Option<Arc<dyn Transport>>> = self
            .config
            .targets
            .iter()
            .map(|target| match target {
                TargetConfig::Console { colorize, .. } => {
                    Some(Arc::new(ConsoleTransport::new(ConsoleSink::stdout(*colorize)))
                        as Arc<dyn Transport>)
                }
                _ => None,
            })
            .collect();

        let mut archives: HashMap<PathBuf, Archive> = HashMap::new();
        let mut workers = Vec::new();
        let mut routers: BTreeMap<Category, Arc<TransportRouter>> = BTreeMap::new();

        for category in categories(schema) {
            let mut router = TransportRouter::new(category);

            for (index, target) in self.config.targets.iter().enumerate() {
                let transport: Arc<dyn Transport> = match target {
                    TargetConfig::Console { .. } => match &consoles[index] {
                        Some(console) => Arc::clone(console),
                        None => continue,
                    },
                    TargetConfig::File { destination, .. } => {
                        let template = parse_template(destination)?;
                        Arc::new(FileTransport::new(
                            format!("file:{category}"),
                            DatedFileSink::new(&self.config.log_root, category, template),
                        ))
                    }
                    TargetConfig::RotatingCompressed {
                        min_level,
                        destination,
                        max_bytes,
                        max_age_secs,
                        retention,
                        compress,
                        buffered,
                    } => {
                        let path = parse_template(destination)?.resolve(
                            &self.config.log_root,
                            category,
                            *min_level,
                            today,
                        );
                        let policy = RotationPolicy {
                            max_bytes: *max_bytes,
                            max_age: max_age_secs.map(Duration::from_secs),
                            retention: *retention,
                            compress: *compress,
                        };
                        let name = format!("archive:{category}");

                        match archives.get(&path) {
                            Some(Archive::Buffered(handle)) if *buffered => {
                                Arc::new(BufferedTransport::new(handle.clone()))
                            }
                            Some(Archive::Inline(sink)) if !*buffered => {
                                Arc::new(RotatingTransport::new(name, Arc::clone(sink)))
                            }
                            Some(_) => return Err(BuildError::ConflictingDestination(path)),
                            None => {
                                let sink = RotatingSink::open(&path, policy)?;
                                if *buffered {
                                    let (handle, _task) =
                                        flush::spawn(name, sink, self.config.flush_interval());
                                    workers.push(handle.clone());
                                    archives.insert(path, Archive::Buffered(handle.clone()));
                                    Arc::new(BufferedTransport::new(handle))
                                } else {
                                    let sink = Arc::new(Mutex::new(sink));
                                    archives.insert(path, Archive::Inline(Arc::clone(&sink)));
                                    Arc::new(RotatingTransport::new(name, sink))
                                }
                            }
                        }
                    }
                };
                router.push(Target::new(target.min_level(), transport));
            }

            routers.insert(category, Arc::new(router));
        }

        let mut loggers = BTreeMap::new();
        for (key, entry) in schema.iter() {
            // Routers were built for exactly the schema's categories.
            let router = Arc::clone(&routers[&entry.category]);

            loggers.insert(
                key.to_string(),
                Logger::new(
                    key.to_string(),
                    entry.category,
                    FieldValidator::new(key, entry),
                    redactor_for(key, &entry.redact_fields)?,
                    router,
                ),
            );
        }

        info!(
            loggers = loggers.len(),
            categories = routers.len(),
            workers = workers.len(),
            "loggers built"
        );

        Ok(Loggers::new(loggers, workers))
    }
}

fn categories(schema: &CategorySchema) -> BTreeSet<Category> {
    schema.iter().map(|(_, entry)| entry.category).collect()
}

fn redactor_for(logger: &str, paths: &[String]) -> Result<Redactor, BuildError> {
    Redactor::new(paths).map_err(|source| BuildError::Redaction {
        logger: logger.to_string(),
        source,
    })
}

fn parse_template(raw: &str) -> Result<DestinationTemplate, BuildError> {
    DestinationTemplate::parse(raw).map_err(|source| BuildError::Destination {
        template: raw.to_string(),
        source,
    })
}
