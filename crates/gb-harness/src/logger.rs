use std::sync::Arc;

use gb_runtime::HostApi;
use parking_lot::Mutex;
use rhai::Engine;

/// Host callback object handed to guest scripts as a global.
///
/// Clones share the last message, so the host keeps one handle while the
/// scope holds another.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    last_message: Arc<Mutex<String>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, message: &str) {
        *self.last_message.lock() = message.to_string();
    }

    pub fn last_message(&self) -> String {
        self.last_message.lock().clone()
    }
}

/// Registers [`Logger`] as `Logger` with a `write(message)` method and a
/// read-only `last_message` property.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerApi;

impl HostApi for LoggerApi {
    fn register(&self, engine: &mut Engine) {
        engine
            .register_type_with_name::<Logger>("Logger")
            .register_fn("write", |logger: &mut Logger, message: &str| {
                logger.write(message)
            })
            .register_get("last_message", |logger: &mut Logger| logger.last_message());
    }
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    use rhai::Scope;

    #[test]
    fn logger_starts_empty_and_keeps_last_write() {
        let mut logger = Logger::new();
        assert_eq!(logger.last_message(), "");
        logger.write("first");
        logger.write("second");
        assert_eq!(logger.last_message(), "second");
    }

    #[test]
    fn clones_share_the_message() {
        let logger = Logger::new();
        let mut other = logger.clone();
        other.write("from clone");
        assert_eq!(logger.last_message(), "from clone");
    }

    #[test]
    fn guest_code_writes_through_registered_api() {
        let mut engine = Engine::new();
        LoggerApi.register(&mut engine);

        let logger = Logger::new();
        let mut scope = Scope::new();
        scope.push("log", logger.clone());
        let echoed = engine
            .eval_with_scope::<String>(&mut scope, "log.write(\"hello host\"); log.last_message")
            .expect("script should run");

        assert_eq!(echoed, "hello host");
        assert_eq!(logger.last_message(), "hello host");
    }
}
