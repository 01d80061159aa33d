/// Per-codec compilation switches.
///
/// Options are baked into the compiled converters, so a codec compiles each
/// type once for its own options.
///
/// ```
/// use vc_codegen::Options;
///
/// let options = Options::new().with_deny_unknown_keys(true);
/// assert!(options.deny_unknown_keys());
/// assert!(!options.omit_null());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Options {
    debug: bool,
    deny_unknown_keys: bool,
    omit_null: bool,
}

impl Options {
    #[inline]
    pub const fn new() -> Self {
        Self {
            debug: false,
            deny_unknown_keys: false,
            omit_null: false,
        }
    }

    /// Log the rendered source of every compiled unit at `debug` level.
    #[inline]
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Loading fails on mapping keys that match no field.
    #[inline]
    pub const fn with_deny_unknown_keys(mut self, enabled: bool) -> Self {
        self.deny_unknown_keys = enabled;
        self
    }

    /// Dumping skips fields whose dumped value is `null`.
    #[inline]
    pub const fn with_omit_null(mut self, enabled: bool) -> Self {
        self.omit_null = enabled;
        self
    }

    #[inline]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    #[inline]
    pub const fn deny_unknown_keys(&self) -> bool {
        self.deny_unknown_keys
    }

    #[inline]
    pub const fn omit_null(&self) -> bool {
        self.omit_null
    }
}
