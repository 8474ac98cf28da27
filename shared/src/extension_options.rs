#[derive(Clone)]
pub struct ExtensionOptions {
    pub use_debug_logging: bool,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        ExtensionOptions {
            use_debug_logging: false,
        }
    }
}

pub fn start_extension_options_builder() -> ExtensionOptionsBuilder {
    ExtensionOptionsBuilder {
        options: ExtensionOptions::default()
    }
}

pub struct ExtensionOptionsBuilder {
    options: ExtensionOptions,
}

impl ExtensionOptionsBuilder {
    pub fn use_debug_logging(mut self, use_debug_logging: bool) -> Self {
        self.options.use_debug_logging = use_debug_logging;
        self
    }

    pub fn build(self) -> ExtensionOptions {
        self.options
    }
}
