use crate::ExtensionOptions;
use env_logger::Builder;
use log::{debug, error, info};
use std::sync::{Arc, OnceLock};

pub enum ExtensionLayer {
    Runtime,
    Planner,
    Module(String), //Module name
}

static LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

pub struct Logger {
    options: Arc<ExtensionOptions>,
}

pub fn logger() -> Arc<Logger> {
    LOGGER.get().expect("Logger is not initialized").clone()
}

impl Logger {
    pub fn init(options: Arc<ExtensionOptions>) {
        if LOGGER.get().is_none() {
            let mut builder = Builder::new();
            builder.filter_level(log::LevelFilter::Debug);
            let _ = builder.try_init();

            let logger = Arc::new(Logger { options });
            let _ = LOGGER.set(logger);
        }
    }

    pub fn info(&self, layer: ExtensionLayer, message: &str) {
        info!("[{}] {}", layer.to_string(), message);
    }

    pub fn error(&self, layer: ExtensionLayer, message: &str) {
        error!("[{}] {}", layer.to_string(), message);
    }

    pub fn debug(&self, layer: ExtensionLayer, message: &str) {
        if self.options.use_debug_logging {
            debug!("[{}] {}", layer.to_string(), message);
        }
    }
}

impl ExtensionLayer {
    pub fn to_string(&self) -> String {
        match self {
            ExtensionLayer::Runtime => "Runtime".to_string(),
            ExtensionLayer::Planner => "Planner".to_string(),
            ExtensionLayer::Module(module_name) => format!("Module: {}", module_name),
        }
    }
}
